//! Integration tests for discovery and the collectors
//!
//! These tests run complete crawls against a wiremock server standing in for
//! the remote API, writing to a temporary SQLite database.

use serde_json::json;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use venue_trawler::api::ApiClient;
use venue_trawler::collect::{FriendCrawl, StatisticsSweep};
use venue_trawler::config::{parse_config, Config};
use venue_trawler::crawler::{run_search, Termination};
use venue_trawler::output::export_kml;
use venue_trawler::storage::{CrawlFlag, SqliteStorage, Storage, VenueRecord, VenueStore};
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Answers nearby searches with the venues lying within `radius` of `ll`
struct VenueUniverse {
    venues: Vec<(&'static str, f64, f64)>,
    radius: f64,
}

impl Respond for VenueUniverse {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let ll = request
            .url
            .query_pairs()
            .find(|(k, _)| k == "ll")
            .map(|(_, v)| v.into_owned())
            .unwrap_or_default();
        let Some((lat, lng)) = ll
            .split_once(',')
            .and_then(|(lat, lng)| Some((lat.parse::<f64>().ok()?, lng.parse::<f64>().ok()?)))
        else {
            return ResponseTemplate::new(400).set_body_json(json!({
                "meta": {"code": 400, "errorType": "param_error", "errorDetail": "Must provide ll"}
            }));
        };

        let venues: Vec<_> = self
            .venues
            .iter()
            .filter(|(_, vlat, vlng)| {
                (vlat - lat).abs() <= self.radius && (vlng - lng).abs() <= self.radius
            })
            .map(|(id, vlat, vlng)| {
                json!({
                    "id": id,
                    "name": format!("Venue {}", id),
                    "location": {"lat": vlat, "lng": vlng},
                    "stats": {"checkinsCount": 3, "usersCount": 2}
                })
            })
            .collect();

        ResponseTemplate::new(200)
            .set_body_json(json!({"meta": {"code": 200}, "response": {"venues": venues}}))
    }
}

fn create_test_config(base_url: &str, db_path: &str) -> Config {
    parse_config(&format!(
        r#"
[api]
base-url = "{base_url}/v2"
timeout-secs = 5

[authenticated]
hourly-quota = 3600000
tokens = ["tok-a"]

[userless]
hourly-quota = 3600000
clients = [{{ client-id = "app-id", client-secret = "app-secret" }}]

[retry]
base-backoff-secs = 0.01
max-backoff-secs = 0.04

[search]
region = "CDF"
seeds = [{{ lat = 51.48, lng = -3.18 }}]
initial-delta = 0.005
min-delta = 0.0025
rng-seed = 7

[output]
database-path = "{db_path}"
"#
    ))
    .expect("Failed to parse test config")
}

#[tokio::test]
async fn test_search_discovers_cluster() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("venues.db");

    Mock::given(method("GET"))
        .and(path("/v2/venues/search"))
        .respond_with(VenueUniverse {
            venues: vec![
                ("v1", 51.4801, -3.1802),
                ("v2", 51.4830, -3.1790),
                ("v3", 51.4850, -3.1750),
                ("far", 52.0000, -3.0000),
            ],
            radius: 0.004,
        })
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), db_path.to_str().unwrap());
    let report = run_search(&config, "test-hash", CancellationToken::new())
        .await
        .expect("Search failed");

    assert_eq!(report.termination, Termination::FrontierExhausted);
    assert_eq!(report.venues_after, 3);
    assert_eq!(report.failed_queries, 0);

    let storage = SqliteStorage::new(&db_path).expect("Failed to open database");
    assert_eq!(storage.count().unwrap(), 3);
    assert_eq!(storage.counts().unwrap().searches, report.queries);
    assert_eq!(storage.venues_in_region("CDF").unwrap().len(), 3);
    assert!(storage.get_venue("far").unwrap().is_none());

    let log = storage.recent_crawls(2).unwrap();
    assert_eq!(log[0].flag, CrawlFlag::Finish);
    assert_eq!(log[1].flag, CrawlFlag::Start);
    assert_eq!(log[0].config_hash.as_deref(), Some("test-hash"));

    // every search point is queried at most once
    let requests = mock_server.received_requests().await.unwrap();
    let mut points: Vec<String> = requests
        .iter()
        .filter_map(|r| {
            r.url
                .query_pairs()
                .find(|(k, _)| k == "ll")
                .map(|(_, v)| v.into_owned())
        })
        .collect();
    let total = points.len();
    points.sort();
    points.dedup();
    assert_eq!(points.len(), total);

    let kml_path = temp_dir.path().join("venues.kml");
    assert_eq!(export_kml(&storage, &kml_path).unwrap(), 3);
}

#[tokio::test]
async fn test_cancelled_search_is_logged_interrupted() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("venues.db");

    let config = create_test_config(&mock_server.uri(), db_path.to_str().unwrap());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = run_search(&config, "test-hash", cancel)
        .await
        .expect("Search failed");
    assert_eq!(report.termination, Termination::Cancelled);
    assert_eq!(report.queries, 0);

    let storage = SqliteStorage::new(&db_path).expect("Failed to open database");
    assert_eq!(storage.recent_crawls(1).unwrap()[0].flag, CrawlFlag::Interrupted);
}

#[tokio::test]
async fn test_stats_sweep_and_friend_crawl() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("venues.db");

    Mock::given(method("GET"))
        .and(path_regex(r"^/v2/venues/[^/]+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": {"code": 200},
            "response": {"venue": {"stats": {"checkinsCount": 9, "usersCount": 5}}}
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/users/u1/friends"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": {"code": 200},
            "response": {"friends": {"count": 2, "items": [
                {"id": "f1", "firstName": "Cy", "type": "user"},
                {"id": "f2", "firstName": "Di", "type": "user"}
            ]}}
        })))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), db_path.to_str().unwrap());
    let mut storage = SqliteStorage::new(&db_path).expect("Failed to open database");
    for id in ["v1", "v2"] {
        let venue = VenueRecord::from_json(&json!({
            "id": id,
            "name": "Cafe",
            "location": {"lat": 51.48, "lng": -3.18},
            "stats": {"checkinsCount": 3, "usersCount": 2}
        }))
        .unwrap();
        storage.upsert(&venue).unwrap();
    }
    storage
        .add_checkin(
            &venue_trawler::storage::CheckinRecord::from_json(
                &json!({"id": "c1", "createdAt": 1300000000, "user": {"id": "u1", "firstName": "Ana"}}),
                "v1",
            )
            .unwrap(),
        )
        .unwrap();

    let mut client =
        ApiClient::from_config(&config, CancellationToken::new()).expect("Failed to build client");

    let sweep = StatisticsSweep
        .run(&mut client, &mut storage, Some("test-hash"))
        .await
        .expect("Sweep failed");
    assert_eq!(sweep.items_processed, 2);
    assert!(storage.is_active("v2").unwrap());

    let friends = FriendCrawl
        .run(&mut client, &mut storage, Some("test-hash"))
        .await
        .expect("Friend crawl failed");
    assert_eq!(friends.records_added, 4);
    assert_eq!(storage.max_friendship_crawl_id().unwrap(), Some(1));
    assert_eq!(storage.counts().unwrap().users, 3);
}
