use crate::hashing::stable_hash;
use crate::infra::AppState;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::Ordering;
use valuation_engine::error::AppError;
use valuation_engine::valuation::{
    AdjustmentsPolicy, Comp, Subject, ValuationEngine, ValuationOutcome, ValuationRequest,
};

/// Wire request for one valuation run. The policy rides along with the
/// request; schema validation happened upstream.
#[derive(Debug, Deserialize)]
pub(crate) struct RunValuationRequest {
    pub(crate) subject: Subject,
    pub(crate) comps: Vec<Comp>,
    #[serde(default)]
    pub(crate) policy: AdjustmentsPolicy,
    #[serde(default)]
    pub(crate) as_of: Option<NaiveDate>,
    pub(crate) min_closed_comps: usize,
    pub(crate) median_set_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum RunStatus {
    Succeeded,
    Failed,
}

/// Run record returned to the caller, hashes included so the run can be
/// persisted and audited byte-for-byte.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct RunValuationResponse {
    pub(crate) status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) failure_reason: Option<String>,
    pub(crate) input_hash: String,
    pub(crate) output_hash: String,
    pub(crate) policy_hash: String,
    pub(crate) outcome: ValuationOutcome,
}

pub fn router() -> Router {
    Router::new()
        .route("/v1/valuation/run", post(run_valuation))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
}

async fn run_valuation(
    Json(request): Json<RunValuationRequest>,
) -> Result<Json<RunValuationResponse>, AppError> {
    let input_hash = stable_hash(&json!({
        "subject": &request.subject,
        "comps": &request.comps,
        "as_of": &request.as_of,
        "min_closed_comps": request.min_closed_comps,
        "median_set_size": request.median_set_size,
    }));
    let policy_hash = stable_hash(&serde_json::to_value(&request.policy).map_err(|err| {
        AppError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, err))
    })?);

    let engine = ValuationEngine::new(request.policy.clone());
    let outcome: ValuationOutcome = engine.run(&ValuationRequest {
        subject: request.subject,
        comps: request.comps,
        as_of: request.as_of,
        min_closed_comps: request.min_closed_comps,
        median_set_size: request.median_set_size,
    })?;

    let output_hash = stable_hash(&serde_json::to_value(&outcome).map_err(|err| {
        AppError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, err))
    })?);

    let (status, failure_reason) = if outcome.suggested_arv.is_some() {
        (RunStatus::Succeeded, None)
    } else {
        (RunStatus::Failed, Some("missing_suggested_arv".to_string()))
    };

    Ok(Json(RunValuationResponse {
        status,
        failure_reason,
        input_hash,
        output_hash,
        policy_hash,
        outcome,
    }))
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn readyz(Extension(state): Extension<AppState>) -> impl IntoResponse {
    if state.readiness.load(Ordering::Acquire) {
        (StatusCode::OK, Json(json!({ "ready": true })))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "ready": false })))
    }
}

async fn metrics(Extension(state): Extension<AppState>) -> impl IntoResponse {
    state.metrics.render()
}
