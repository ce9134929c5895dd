use std::collections::HashMap;
use std::env::VarError;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

fn config_with(pairs: &[(&'static str, &'static str)]) -> Result<AppConfig, ConfigError> {
    let map: HashMap<&str, &str> = pairs.iter().copied().collect();
    build_app_config(lookup_from_map(&map))
}

fn assert_invalid(result: Result<AppConfig, ConfigError>, expected_var: &str) {
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == expected_var),
        "expected InvalidEnvVar({expected_var}), got: {result:?}"
    );
}

#[test]
fn parse_environment_development() {
    assert_eq!(
        parse_environment("development").unwrap(),
        Environment::Development
    );
}

#[test]
fn parse_environment_test() {
    assert_eq!(parse_environment("test").unwrap(), Environment::Test);
}

#[test]
fn parse_environment_production() {
    assert_eq!(
        parse_environment("production").unwrap(),
        Environment::Production
    );
}

#[test]
fn parse_environment_unknown_fails() {
    let err = parse_environment("staging").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnvVar { ref var, .. } if var == "TUYENDUNG_ENV"));
}

#[test]
fn build_app_config_defaults_with_empty_env() {
    let cfg = config_with(&[]).expect("defaults should be valid");
    assert_eq!(cfg.env, Environment::Development);
    assert!(cfg.is_development());
    assert_eq!(cfg.bind_addr.to_string(), "0.0.0.0:3000");
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.geo_base_url, DEFAULT_GEO_BASE_URL);
    assert_eq!(cfg.geo_request_timeout_secs, 30);
    assert_eq!(cfg.geo_user_agent, DEFAULT_GEO_USER_AGENT);
    assert_eq!(cfg.geo_max_retries, 3);
    assert_eq!(cfg.geo_retry_backoff_base_ms, 1000);
    assert_eq!(cfg.geo_refresh_cron, DEFAULT_GEO_REFRESH_CRON);
}

#[test]
fn build_app_config_reads_overrides() {
    let cfg = config_with(&[
        ("TUYENDUNG_ENV", "production"),
        ("TUYENDUNG_BIND_ADDR", "127.0.0.1:8080"),
        ("TUYENDUNG_LOG_LEVEL", "debug"),
        ("TUYENDUNG_GEO_BASE_URL", "http://localhost:9000/api/v2"),
        ("TUYENDUNG_GEO_REQUEST_TIMEOUT_SECS", "5"),
        ("TUYENDUNG_GEO_USER_AGENT", "custom-agent/2.0"),
        ("TUYENDUNG_GEO_MAX_RETRIES", "0"),
        ("TUYENDUNG_GEO_RETRY_BACKOFF_BASE_MS", "250"),
        ("TUYENDUNG_GEO_REFRESH_CRON", "0 30 3 * * *"),
    ])
    .expect("overrides should be valid");
    assert_eq!(cfg.env, Environment::Production);
    assert!(!cfg.is_development());
    assert_eq!(cfg.bind_addr.to_string(), "127.0.0.1:8080");
    assert_eq!(cfg.log_level, "debug");
    assert_eq!(cfg.geo_base_url, "http://localhost:9000/api/v2");
    assert_eq!(cfg.geo_request_timeout_secs, 5);
    assert_eq!(cfg.geo_user_agent, "custom-agent/2.0");
    assert_eq!(cfg.geo_max_retries, 0);
    assert_eq!(cfg.geo_retry_backoff_base_ms, 250);
    assert_eq!(cfg.geo_refresh_cron, "0 30 3 * * *");
}

#[test]
fn build_app_config_fails_with_unknown_env() {
    assert_invalid(config_with(&[("TUYENDUNG_ENV", "staging")]), "TUYENDUNG_ENV");
}

#[test]
fn build_app_config_fails_with_invalid_bind_addr() {
    assert_invalid(
        config_with(&[("TUYENDUNG_BIND_ADDR", "not-a-socket-addr")]),
        "TUYENDUNG_BIND_ADDR",
    );
}

#[test]
fn build_app_config_fails_with_non_http_base_url() {
    assert_invalid(
        config_with(&[("TUYENDUNG_GEO_BASE_URL", "ftp://example.com")]),
        "TUYENDUNG_GEO_BASE_URL",
    );
}

#[test]
fn build_app_config_fails_with_invalid_timeout() {
    assert_invalid(
        config_with(&[("TUYENDUNG_GEO_REQUEST_TIMEOUT_SECS", "not-a-number")]),
        "TUYENDUNG_GEO_REQUEST_TIMEOUT_SECS",
    );
}

#[test]
fn build_app_config_fails_with_zero_timeout() {
    assert_invalid(
        config_with(&[("TUYENDUNG_GEO_REQUEST_TIMEOUT_SECS", "0")]),
        "TUYENDUNG_GEO_REQUEST_TIMEOUT_SECS",
    );
}

#[test]
fn build_app_config_fails_with_invalid_max_retries() {
    assert_invalid(
        config_with(&[("TUYENDUNG_GEO_MAX_RETRIES", "-1")]),
        "TUYENDUNG_GEO_MAX_RETRIES",
    );
}

#[test]
fn build_app_config_fails_with_invalid_backoff() {
    assert_invalid(
        config_with(&[("TUYENDUNG_GEO_RETRY_BACKOFF_BASE_MS", "fast")]),
        "TUYENDUNG_GEO_RETRY_BACKOFF_BASE_MS",
    );
}

#[test]
fn build_app_config_fails_with_five_field_cron() {
    assert_invalid(
        config_with(&[("TUYENDUNG_GEO_REFRESH_CRON", "0 */6 * * *")]),
        "TUYENDUNG_GEO_REFRESH_CRON",
    );
}
