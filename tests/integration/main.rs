//! Integration tests against a mock API server

mod crawl_tests;
mod gateway_tests;
