use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use crate::{
    fingerprint::fingerprint_model::Fingerprint,
    healing::error::HealError,
    server::{
        AppState,
        api_model::{
            ErrorBody, HealRequest, HealResponse, HealthResponse, LearnRequest, LearnResponse,
        },
    },
};

// ============================================================================
// Error mapping
// ============================================================================

impl HealError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            HealError::BadRequest(_) => StatusCode::BAD_REQUEST,
            HealError::NoFingerprint | HealError::NotFound { .. } => StatusCode::NOT_FOUND,
            HealError::Ambiguous { .. } => StatusCode::CONFLICT,
            HealError::RepositoryUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for HealError {
    fn into_response(self) -> Response {
        if let HealError::RepositoryUnavailable(source) = &self {
            error!(error = %source, "Fingerprint repository unavailable");
        }

        let tie_count = match &self {
            HealError::Ambiguous { tie_count, .. } => Some(*tie_count),
            _ => None,
        };

        let body = ErrorBody {
            message: self.to_string(),
            outcome: self.kind().to_string(),
            confidence: self.confidence(),
            tie_count,
        };

        (self.status_code(), Json(body)).into_response()
    }
}

// ============================================================================
// Endpoints
// ============================================================================

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// POST /learn - upsert the fingerprint of a located element
pub async fn learn(
    State(state): State<AppState>,
    payload: Result<Json<LearnRequest>, JsonRejection>,
) -> Result<Json<LearnResponse>, HealError> {
    let Json(request) = payload.map_err(|e| HealError::BadRequest(e.body_text()))?;
    let (page_key, id, descriptor) = request.into_parts()?;

    let stored = state.engine.learn(&page_key, &id, descriptor).await?;

    Ok(Json(LearnResponse {
        message: "Fingerprint stored".to_string(),
        stored,
    }))
}

/// POST /heal - find a replacement locator for a broken id
pub async fn heal(
    State(state): State<AppState>,
    payload: Result<Json<HealRequest>, JsonRejection>,
) -> Result<Json<HealResponse>, HealError> {
    let Json(request) = payload.map_err(|e| HealError::BadRequest(e.body_text()))?;
    let (page_key, broken_id, snapshot) = request.into_parts()?;

    let healed = state
        .engine
        .heal(&page_key, &broken_id, &snapshot)
        .await?
        .into_result()?;

    Ok(Json(HealResponse {
        message: "Healed".to_string(),
        selector: healed.selector,
        confidence: healed.confidence,
        matched_id: healed.matched_id,
    }))
}

/// GET /fingerprints/*page_key - everything learned for one page
pub async fn list_fingerprints(
    State(state): State<AppState>,
    Path(page_key): Path<String>,
) -> Result<Json<Vec<Fingerprint>>, HealError> {
    Ok(Json(state.engine.fingerprints(&page_key).await?))
}
