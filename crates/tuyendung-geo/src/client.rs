//! HTTP client for the administrative-division REST service.
//!
//! The service exposes the post-2025 two-tier division lists as plain JSON
//! arrays: `GET {base}p/` for provinces and `GET {base}w/` for wards. Codes
//! are numeric there, but the client does not rely on that; entries are read
//! as [`GeographicUnit`]s and anything that does not fit is skipped.

use std::time::Duration;

use reqwest::{Client, Url};
use tuyendung_core::{AppConfig, GeographicUnit, DEFAULT_GEO_BASE_URL, DEFAULT_GEO_USER_AGENT};

use crate::error::GeoError;
use crate::retry::retry_with_backoff;

const PROVINCES_PATH: &str = "p/";
const WARDS_PATH: &str = "w/";

/// Client for the province/ward listing endpoints.
///
/// Use [`GeoClient::new`] for production, [`GeoClient::from_config`] to pick
/// up the application settings, or [`GeoClient::with_base_url`] to point at
/// a mock server in tests.
#[derive(Debug, Clone)]
pub struct GeoClient {
    client: Client,
    base_url: Url,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl GeoClient {
    /// Creates a client for the public service with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(timeout_secs: u64) -> Result<Self, GeoError> {
        Self::with_base_url(DEFAULT_GEO_BASE_URL, timeout_secs, DEFAULT_GEO_USER_AGENT)
    }

    /// Creates a client from application configuration, including its retry
    /// policy.
    ///
    /// # Errors
    ///
    /// Same as [`GeoClient::with_base_url`].
    pub fn from_config(config: &AppConfig) -> Result<Self, GeoError> {
        Ok(Self::with_base_url(
            &config.geo_base_url,
            config.geo_request_timeout_secs,
            &config.geo_user_agent,
        )?
        .with_retry(config.geo_max_retries, config.geo_retry_backoff_base_ms))
    }

    /// Creates a client with a custom base URL. Retries are off until
    /// [`GeoClient::with_retry`] is applied.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`GeoError::InvalidBaseUrl`] if `base_url`
    /// does not parse.
    pub fn with_base_url(
        base_url: &str,
        timeout_secs: u64,
        user_agent: &str,
    ) -> Result<Self, GeoError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        // Exactly one trailing slash, so `Url::join` appends the endpoint path
        // instead of replacing the last segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let parsed = Url::parse(&normalised).map_err(|e| GeoError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url: parsed,
            max_retries: 0,
            backoff_base_ms: 0,
        })
    }

    #[must_use]
    pub fn with_retry(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    /// Fetches every province.
    ///
    /// # Errors
    ///
    /// - [`GeoError::Http`] on network failure or non-2xx status (after retries).
    /// - [`GeoError::Deserialize`] if the body is not JSON.
    /// - [`GeoError::UnexpectedShape`] if the body is not a JSON array.
    pub async fn list_provinces(&self) -> Result<Vec<GeographicUnit>, GeoError> {
        self.fetch_units(PROVINCES_PATH).await
    }

    /// Fetches every ward nationwide. Each ward carries its `province_code`
    /// when the service provides it.
    ///
    /// # Errors
    ///
    /// Same as [`GeoClient::list_provinces`].
    pub async fn list_wards(&self) -> Result<Vec<GeographicUnit>, GeoError> {
        self.fetch_units(WARDS_PATH).await
    }

    async fn fetch_units(&self, path: &str) -> Result<Vec<GeographicUnit>, GeoError> {
        let url = self.endpoint(path)?;
        let body = retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            self.request_json(&url)
        })
        .await?;

        let entries = match body {
            serde_json::Value::Array(entries) => entries,
            other => {
                return Err(GeoError::UnexpectedShape {
                    context: url.to_string(),
                    found: json_kind(&other),
                })
            }
        };

        let (units, skipped) = parse_units(entries);
        if skipped > 0 {
            tracing::warn!(
                url = %url,
                skipped,
                kept = units.len(),
                "skipped reference entries that are not administrative units"
            );
        }
        tracing::debug!(url = %url, count = units.len(), "fetched administrative units");
        Ok(units)
    }

    fn endpoint(&self, path: &str) -> Result<Url, GeoError> {
        self.base_url
            .join(path)
            .map_err(|e| GeoError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })
    }

    /// Sends a GET request, asserts a 2xx status, and parses the body as JSON.
    async fn request_json(&self, url: &Url) -> Result<serde_json::Value, GeoError> {
        let response = self.client.get(url.clone()).send().await?;
        let response = response.error_for_status()?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| GeoError::Deserialize {
            context: url.to_string(),
            source: e,
        })
    }
}

/// Reads each entry as a unit, returning the readable ones and how many were
/// dropped.
fn parse_units(entries: Vec<serde_json::Value>) -> (Vec<GeographicUnit>, usize) {
    let total = entries.len();
    let units: Vec<GeographicUnit> = entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value(entry).ok())
        .collect();
    let skipped = total - units.len();
    (units, skipped)
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
