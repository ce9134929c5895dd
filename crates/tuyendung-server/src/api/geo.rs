use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tuyendung_core::{AdminCode, GeographicUnit};

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct WardsQuery {
    pub province_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct RefreshData {
    pub provinces: usize,
    pub wards: usize,
    pub refreshed_at: DateTime<Utc>,
}

pub(super) async fn list_provinces(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<Vec<GeographicUnit>>> {
    let snapshot = state.geo.snapshot();
    Json(ApiResponse::new(snapshot.provinces.clone(), req_id.0))
}

pub(super) async fn list_wards(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<WardsQuery>,
) -> Result<Json<ApiResponse<Vec<GeographicUnit>>>, ApiError> {
    let snapshot = state.geo.snapshot();

    let data = match query.province_code {
        None => snapshot.wards.clone(),
        Some(code) if code.trim().is_empty() => {
            return Err(ApiError::new(
                req_id.0,
                "bad_request",
                "province_code must not be blank",
            ));
        }
        Some(code) => {
            let code = AdminCode::from(code);
            snapshot.wards_in(&code).cloned().collect()
        }
    };

    Ok(Json(ApiResponse::new(data, req_id.0)))
}

pub(super) async fn refresh(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<RefreshData>>, ApiError> {
    let summary = state.geo.refresh(&state.client).await.map_err(|e| {
        tracing::error!(error = %e, "manual reference-data refresh failed");
        ApiError::new(
            req_id.0.clone(),
            "upstream_error",
            "geography service unavailable; previous reference data kept",
        )
    })?;

    Ok(Json(ApiResponse::new(
        RefreshData {
            provinces: summary.provinces,
            wards: summary.wards,
            refreshed_at: summary.refreshed_at,
        },
        req_id.0,
    )))
}
