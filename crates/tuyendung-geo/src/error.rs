use thiserror::Error;

/// Errors returned by the geography service client.
#[derive(Debug, Error)]
pub enum GeoError {
    /// Network or TLS failure, or a non-2xx status, from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The configured base URL could not be parsed.
    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// The response body was not valid JSON.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The response was JSON, but not the list of units the endpoint promises.
    #[error("unexpected response shape for {context}: expected a JSON array, got {found}")]
    UnexpectedShape {
        context: String,
        found: &'static str,
    },
}
