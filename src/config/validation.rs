use crate::api::AccessClass;
use crate::config::types::{
    ApiConfig, Config, CoordinateConfig, MonitorConfig, OutputConfig, RetryConfig, SearchConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_api_config(&config.api)?;
    validate_credentials(config)?;
    validate_retry_config(&config.retry)?;
    validate_search_config(&config.search)?;
    if !class_configured(config, config.search.access) {
        return Err(ConfigError::Validation(format!(
            "search access class '{}' has no credentials configured",
            config.search.access
        )));
    }
    if let Some(monitor) = &config.monitor {
        validate_monitor_config(monitor)?;
    }
    validate_output_config(&config.output)?;
    Ok(())
}

fn class_configured(config: &Config, class: AccessClass) -> bool {
    match class {
        AccessClass::Authenticated => config.authenticated.is_some(),
        AccessClass::Userless => config.userless.is_some(),
    }
}

fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' must use http or https",
            config.base_url
        )));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates both credential classes; at least one must be present
fn validate_credentials(config: &Config) -> Result<(), ConfigError> {
    if config.authenticated.is_none() && config.userless.is_none() {
        return Err(ConfigError::Validation(
            "at least one of [authenticated] or [userless] must be configured".to_string(),
        ));
    }

    if let Some(auth) = &config.authenticated {
        if auth.hourly_quota < 1 {
            return Err(ConfigError::Validation(format!(
                "authenticated hourly_quota must be >= 1, got {}",
                auth.hourly_quota
            )));
        }
        if auth.tokens.is_empty() {
            return Err(ConfigError::Validation(
                "authenticated access needs at least one token".to_string(),
            ));
        }
        if auth.tokens.iter().any(|t| t.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "authenticated tokens cannot be empty".to_string(),
            ));
        }
    }

    if let Some(userless) = &config.userless {
        if userless.hourly_quota < 1 {
            return Err(ConfigError::Validation(format!(
                "userless hourly_quota must be >= 1, got {}",
                userless.hourly_quota
            )));
        }
        if userless.clients.is_empty() {
            return Err(ConfigError::Validation(
                "userless access needs at least one client".to_string(),
            ));
        }
        for client in &userless.clients {
            if client.client_id.trim().is_empty() || client.client_secret.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "userless client_id and client_secret cannot be empty".to_string(),
                ));
            }
        }
    }

    Ok(())
}

fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if !(config.base_backoff_secs > 0.0) || !config.base_backoff_secs.is_finite() {
        return Err(ConfigError::Validation(format!(
            "base_backoff_secs must be positive, got {}",
            config.base_backoff_secs
        )));
    }

    if !config.max_backoff_secs.is_finite() || config.max_backoff_secs < config.base_backoff_secs {
        return Err(ConfigError::Validation(format!(
            "max_backoff_secs ({}) must be >= base_backoff_secs ({})",
            config.max_backoff_secs, config.base_backoff_secs
        )));
    }

    for status in &config.transient_statuses {
        if !(500..=599).contains(status) {
            return Err(ConfigError::Validation(format!(
                "transient status {} is not a server error",
                status
            )));
        }
    }

    Ok(())
}

fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    if !(config.min_delta > 0.0) {
        return Err(ConfigError::Validation(format!(
            "min_delta must be positive, got {}",
            config.min_delta
        )));
    }

    if config.min_delta > config.initial_delta {
        return Err(ConfigError::Validation(format!(
            "min_delta ({}) must not exceed initial_delta ({})",
            config.min_delta, config.initial_delta
        )));
    }

    if config.initial_delta >= 90.0 {
        return Err(ConfigError::Validation(format!(
            "initial_delta must be below 90 degrees, got {}",
            config.initial_delta
        )));
    }

    if config.seeds.is_empty() {
        return Err(ConfigError::Validation(
            "search needs at least one seed coordinate".to_string(),
        ));
    }

    for seed in &config.seeds {
        validate_coordinate(seed)?;
    }

    if config.limit < 1 || config.limit > 50 {
        return Err(ConfigError::Validation(format!(
            "limit must be between 1 and 50, got {}",
            config.limit
        )));
    }

    if let Some(region) = &config.region {
        if region.trim().is_empty() {
            return Err(ConfigError::Validation(
                "region cannot be empty when set".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_monitor_config(config: &MonitorConfig) -> Result<(), ConfigError> {
    if config.region.trim().is_empty() {
        return Err(ConfigError::Validation(
            "monitor region cannot be empty".to_string(),
        ));
    }

    validate_coordinate(&config.centre)?;

    if !(config.radius > 0.0) {
        return Err(ConfigError::Validation(format!(
            "monitor radius must be positive, got {}",
            config.radius
        )));
    }

    Ok(())
}

fn validate_coordinate(coordinate: &CoordinateConfig) -> Result<(), ConfigError> {
    if !(-90.0..=90.0).contains(&coordinate.lat) {
        return Err(ConfigError::Validation(format!(
            "latitude {} is out of range",
            coordinate.lat
        )));
    }

    if !(-180.0..=180.0).contains(&coordinate.lng) {
        return Err(ConfigError::Validation(format!(
            "longitude {} is out of range",
            coordinate.lng
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.kml_path.is_empty() {
        return Err(ConfigError::Validation(
            "kml_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}
