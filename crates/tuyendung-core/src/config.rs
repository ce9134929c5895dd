use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

pub const DEFAULT_GEO_BASE_URL: &str = "https://provinces.open-api.vn/api/v2/";
pub const DEFAULT_GEO_USER_AGENT: &str = "tuyendung/0.1 (job-location)";
pub const DEFAULT_GEO_REFRESH_CRON: &str = "0 0 */6 * * *";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a variable is set to an invalid value.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a variable is set to an invalid value.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Parsing is decoupled from the real environment so it can be tested with a
/// plain `HashMap`.
///
/// # Errors
///
/// Returns `ConfigError` if a variable is set to an invalid value.
pub fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let env = parse_environment(&or_default("TUYENDUNG_ENV", "development"))?;

    let bind_addr = or_default("TUYENDUNG_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("TUYENDUNG_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("TUYENDUNG_LOG_LEVEL", "info");

    let geo_base_url = or_default("TUYENDUNG_GEO_BASE_URL", DEFAULT_GEO_BASE_URL);
    if !(geo_base_url.starts_with("http://") || geo_base_url.starts_with("https://")) {
        return Err(invalid(
            "TUYENDUNG_GEO_BASE_URL",
            format!("expected an http(s) URL, got '{geo_base_url}'"),
        ));
    }

    let geo_request_timeout_secs = parse_u64("TUYENDUNG_GEO_REQUEST_TIMEOUT_SECS", "30")?;
    if geo_request_timeout_secs == 0 {
        return Err(invalid(
            "TUYENDUNG_GEO_REQUEST_TIMEOUT_SECS",
            "must be greater than zero".to_string(),
        ));
    }
    let geo_user_agent = or_default("TUYENDUNG_GEO_USER_AGENT", DEFAULT_GEO_USER_AGENT);
    let geo_max_retries = parse_u32("TUYENDUNG_GEO_MAX_RETRIES", "3")?;
    let geo_retry_backoff_base_ms = parse_u64("TUYENDUNG_GEO_RETRY_BACKOFF_BASE_MS", "1000")?;

    let geo_refresh_cron = or_default("TUYENDUNG_GEO_REFRESH_CRON", DEFAULT_GEO_REFRESH_CRON);
    if geo_refresh_cron.split_whitespace().count() != 6 {
        return Err(invalid(
            "TUYENDUNG_GEO_REFRESH_CRON",
            format!("expected 6 cron fields (sec min hour day month weekday), got '{geo_refresh_cron}'"),
        ));
    }

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        geo_base_url,
        geo_request_timeout_secs,
        geo_user_agent,
        geo_max_retries,
        geo_retry_backoff_base_ms,
        geo_refresh_cron,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "TUYENDUNG_ENV".to_string(),
            reason: format!("expected development, test, or production; got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
