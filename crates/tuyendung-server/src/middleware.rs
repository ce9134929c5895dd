//! Request middleware: request IDs, API-key auth, and per-caller rate limits.
//!
//! Auth runs first on protected routes and tags the request with a
//! [`Caller`]; the rate limiter then charges that caller's own window, so one
//! integration pushing large batches through `/jobs/locations` cannot use up
//! the budget of another.

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, RETRY_AFTER},
        HeaderValue,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::api::ApiError;

const API_KEYS_VAR: &str = "TUYENDUNG_API_KEYS";
const REQUEST_ID_HEADER: &str = "x-request-id";

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Identity of whoever sent a protected request.
///
/// Keys are identified by position in `TUYENDUNG_API_KEYS`, so the token
/// itself never reaches logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Caller {
    /// Auth is disabled; all requests share one identity.
    Anonymous,
    Key(usize),
}

impl fmt::Display for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Caller::Anonymous => f.write_str("anonymous"),
            Caller::Key(index) => write!(f, "key-{index}"),
        }
    }
}

/// Why a protected request was turned away before reaching a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    MissingToken,
    UnknownToken,
    RateLimited { caller: Caller, retry_after: Duration },
}

impl Rejection {
    fn code(&self) -> &'static str {
        match self {
            Rejection::MissingToken | Rejection::UnknownToken => "unauthorized",
            Rejection::RateLimited { .. } => "rate_limited",
        }
    }

    fn message(&self) -> &'static str {
        match self {
            Rejection::MissingToken => "missing bearer token",
            Rejection::UnknownToken => "unknown bearer token",
            Rejection::RateLimited { .. } => "rate limit exceeded for this API key",
        }
    }

    /// Whole seconds to wait, rounded up; never zero.
    fn retry_after_secs(retry_after: Duration) -> u64 {
        let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
        secs.max(1)
    }

    /// Renders the rejection in the API error envelope, tagged with the
    /// request's ID.
    fn into_response_for(self, req: &Request) -> Response {
        let request_id = req
            .extensions()
            .get::<RequestId>()
            .map(|id| id.0.clone())
            .unwrap_or_default();

        let retry_after = match &self {
            Rejection::RateLimited {
                caller,
                retry_after,
            } => {
                tracing::warn!(%caller, path = %req.uri().path(), "rate limit exceeded");
                Some(Self::retry_after_secs(*retry_after))
            }
            _ => {
                tracing::debug!(path = %req.uri().path(), reason = self.message(), "auth rejected");
                None
            }
        };

        let mut response = ApiError::new(request_id, self.code(), self.message()).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

/// API keys accepted on protected routes. An empty key set means auth is off.
#[derive(Debug, Clone)]
pub struct AuthState {
    keys: Arc<HashMap<String, Caller>>,
}

impl AuthState {
    /// Reads comma-separated bearer tokens from `TUYENDUNG_API_KEYS`.
    ///
    /// # Errors
    ///
    /// See [`AuthState::from_keys`].
    pub fn from_env(is_development: bool) -> anyhow::Result<Self> {
        let raw = std::env::var(API_KEYS_VAR).unwrap_or_default();
        Self::from_keys(&raw, is_development)
    }

    /// Builds auth settings from a comma-separated token list. A token listed
    /// twice keeps its first position.
    ///
    /// # Errors
    ///
    /// Returns an error when `raw` holds no tokens outside development.
    pub fn from_keys(raw: &str, is_development: bool) -> anyhow::Result<Self> {
        let mut keys = HashMap::new();
        for (index, token) in raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .enumerate()
        {
            keys.entry(token.to_owned()).or_insert(Caller::Key(index));
        }

        if keys.is_empty() {
            if is_development {
                tracing::warn!("{API_KEYS_VAR} not set; bearer auth disabled in development");
                return Ok(Self::disabled());
            }
            anyhow::bail!(
                "{API_KEYS_VAR} is required outside development; provide comma-separated bearer tokens"
            );
        }

        tracing::info!(keys = keys.len(), "bearer auth enabled");
        Ok(Self {
            keys: Arc::new(keys),
        })
    }

    #[must_use]
    pub fn disabled() -> Self {
        Self {
            keys: Arc::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.keys.is_empty()
    }

    fn authenticate(&self, token: Option<&str>) -> Result<Caller, Rejection> {
        if !self.is_enabled() {
            return Ok(Caller::Anonymous);
        }
        let token = token.ok_or(Rejection::MissingToken)?;
        self.keys.get(token).copied().ok_or(Rejection::UnknownToken)
    }
}

#[derive(Debug, Clone, Copy)]
struct CallerWindow {
    started_at: Instant,
    count: usize,
}

/// Fixed-window request budget, tracked separately for every [`Caller`].
///
/// Callers are bounded by the configured key list, so the window map never
/// grows past `keys + 1` entries.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    windows: Arc<Mutex<HashMap<Caller, CallerWindow>>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Counts one request for `caller` at `now`.
    fn admit(&self, caller: Caller, now: Instant) -> Result<(), Rejection> {
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = windows.entry(caller).or_insert(CallerWindow {
            started_at: now,
            count: 0,
        });

        let elapsed = now.saturating_duration_since(entry.started_at);
        if elapsed >= self.window {
            *entry = CallerWindow {
                started_at: now,
                count: 0,
            };
        }

        if entry.count >= self.max_requests {
            return Err(Rejection::RateLimited {
                caller,
                retry_after: self.window.saturating_sub(elapsed),
            });
        }
        entry.count += 1;
        Ok(())
    }
}

/// Uses the incoming `x-request-id` header or a fresh UUIDv4, stores it as a
/// [`RequestId`] extension, and echoes it on the response.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert(REQUEST_ID_HEADER, val);
    }

    res
}

/// Resolves the bearer token to a [`Caller`] and stores it as an extension.
pub async fn require_bearer_auth(
    State(auth): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Response {
    match auth.authenticate(extract_bearer_token(req.headers().get(AUTHORIZATION))) {
        Ok(caller) => {
            req.extensions_mut().insert(caller);
            next.run(req).await
        }
        Err(rejection) => rejection.into_response_for(&req),
    }
}

/// Charges the request to its [`Caller`]; untagged requests count as anonymous.
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let caller = req
        .extensions()
        .get::<Caller>()
        .copied()
        .unwrap_or(Caller::Anonymous);

    match rate_limit.admit(caller, Instant::now()) {
        Ok(()) => next.run(req).await,
        Err(rejection) => rejection.into_response_for(&req),
    }
}

fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_bearer_token_trims_valid_header() {
        let header = HeaderValue::from_static("Bearer  test-token ");
        assert_eq!(extract_bearer_token(Some(&header)), Some("test-token"));
    }

    #[test]
    fn extract_bearer_token_rejects_other_schemes_and_absence() {
        let header = HeaderValue::from_static("Basic abc123");
        assert_eq!(extract_bearer_token(Some(&header)), None);
        assert_eq!(extract_bearer_token(None), None);
    }

    #[test]
    fn from_keys_disables_auth_in_development_without_keys() {
        let state = AuthState::from_keys("", true).expect("dev should allow missing keys");
        assert!(!state.is_enabled());
        assert_eq!(state.authenticate(None), Ok(Caller::Anonymous));
    }

    #[test]
    fn from_keys_requires_keys_outside_development() {
        assert!(AuthState::from_keys(" , ", false).is_err());
    }

    #[test]
    fn from_keys_numbers_callers_by_position() {
        let state = AuthState::from_keys(" alpha , beta, alpha", false).expect("keys present");
        assert_eq!(state.authenticate(Some("alpha")), Ok(Caller::Key(0)));
        assert_eq!(state.authenticate(Some("beta")), Ok(Caller::Key(1)));
    }

    #[test]
    fn authenticate_distinguishes_missing_and_unknown_tokens() {
        let state = AuthState::from_keys("alpha", false).expect("keys present");
        assert_eq!(state.authenticate(None), Err(Rejection::MissingToken));
        assert_eq!(state.authenticate(Some("gamma")), Err(Rejection::UnknownToken));
    }

    #[test]
    fn admit_tracks_each_caller_separately() {
        let limit = RateLimitState::new(2, Duration::from_secs(60));
        let now = Instant::now();

        assert!(limit.admit(Caller::Key(0), now).is_ok());
        assert!(limit.admit(Caller::Key(0), now).is_ok());
        assert!(matches!(
            limit.admit(Caller::Key(0), now),
            Err(Rejection::RateLimited {
                caller: Caller::Key(0),
                ..
            })
        ));

        assert!(limit.admit(Caller::Key(1), now).is_ok());
        assert!(limit.admit(Caller::Anonymous, now).is_ok());
    }

    #[test]
    fn admit_reports_time_left_in_window() {
        let limit = RateLimitState::new(1, Duration::from_secs(60));
        let start = Instant::now();

        assert!(limit.admit(Caller::Key(0), start).is_ok());
        let rejection = limit
            .admit(Caller::Key(0), start + Duration::from_secs(45))
            .expect_err("budget spent");
        assert_eq!(
            rejection,
            Rejection::RateLimited {
                caller: Caller::Key(0),
                retry_after: Duration::from_secs(15),
            }
        );
    }

    #[test]
    fn admit_resets_after_window_elapses() {
        let limit = RateLimitState::new(1, Duration::from_secs(60));
        let start = Instant::now();

        assert!(limit.admit(Caller::Key(0), start).is_ok());
        assert!(limit.admit(Caller::Key(0), start).is_err());
        assert!(limit
            .admit(Caller::Key(0), start + Duration::from_secs(60))
            .is_ok());
    }

    #[test]
    fn retry_after_rounds_up_to_whole_seconds() {
        assert_eq!(Rejection::retry_after_secs(Duration::from_millis(1500)), 2);
        assert_eq!(Rejection::retry_after_secs(Duration::from_secs(15)), 15);
        assert_eq!(Rejection::retry_after_secs(Duration::ZERO), 1);
    }

    #[test]
    fn rejection_codes_match_api_error_codes() {
        assert_eq!(Rejection::MissingToken.code(), "unauthorized");
        assert_eq!(Rejection::UnknownToken.code(), "unauthorized");
        let limited = Rejection::RateLimited {
            caller: Caller::Anonymous,
            retry_after: Duration::from_secs(1),
        };
        assert_eq!(limited.code(), "rate_limited");
    }

    #[test]
    fn caller_display_hides_token() {
        assert_eq!(Caller::Key(3).to_string(), "key-3");
        assert_eq!(Caller::Anonymous.to_string(), "anonymous");
    }
}
