use axum::{extract::State, Extension, Json};
use tuyendung_core::{JobLocation, JobLocationSource};

use crate::middleware::{Caller, RequestId};

use super::{ApiError, ApiResponse, AppState};

/// Upper bound on records per batch request.
pub(super) const MAX_BATCH: usize = 500;

/// Resolves a single job record. Any JSON body is accepted; a body that is
/// not an object simply resolves to nothing.
pub(super) async fn resolve_location(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(job): Json<serde_json::Value>,
) -> Json<ApiResponse<JobLocation>> {
    let snapshot = state.geo.snapshot();
    let location = snapshot
        .resolver()
        .resolve(&JobLocationSource::from_json(job));
    Json(ApiResponse::new(location, req_id.0))
}

/// Resolves an array of job records, answering in input order.
pub(super) async fn resolve_locations(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(caller): Extension<Caller>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<ApiResponse<Vec<JobLocation>>>, ApiError> {
    let serde_json::Value::Array(jobs) = body else {
        return Err(ApiError::new(
            req_id.0,
            "bad_request",
            "request body must be a JSON array of job records",
        ));
    };

    if jobs.len() > MAX_BATCH {
        return Err(ApiError::new(
            req_id.0,
            "bad_request",
            format!("at most {MAX_BATCH} job records per request"),
        ));
    }

    let snapshot = state.geo.snapshot();
    let locations = snapshot.resolver().resolve_values(jobs);
    tracing::debug!(%caller, count = locations.len(), "resolved job locations");

    Ok(Json(ApiResponse::new(locations, req_id.0)))
}
