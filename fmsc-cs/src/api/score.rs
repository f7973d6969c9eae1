//! POST /score
//!
//! Scores a single test from its fault groups; no triage, no persistence.

use axum::{extract::rejection::JsonRejection, extract::State, routing::post, Json, Router};
use fmsc_common::calculator::{calculate_named, Calculation};
use fmsc_common::profile::Severity;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// POST /score request
#[derive(Debug, Deserialize)]
pub struct ScoreRequest {
    /// Test name, e.g. `overhead_squat`
    pub test: String,
    #[serde(default)]
    pub faults: BTreeMap<String, BTreeMap<String, Severity>>,
    #[serde(default)]
    pub pain_reported: bool,
}

/// POST /score
pub async fn score_test(
    State(state): State<AppState>,
    body: Result<Json<ScoreRequest>, JsonRejection>,
) -> ApiResult<Json<Calculation>> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let scale = state.config.scoring.severity_scale;

    for (category, faults) in &request.faults {
        if let Some((fault, severity)) = faults.iter().find(|(_, s)| **s > scale) {
            return Err(ApiError::BadRequest(format!(
                "{}.{}: severity {} out of range [0, {}]",
                category, fault, severity, scale
            )));
        }
    }

    let calculation = calculate_named(
        &request.test,
        &request.faults,
        request.pain_reported,
        &state.config.scoring,
    )?;

    Ok(Json(calculation))
}

/// Build scoring routes
pub fn score_routes() -> Router<AppState> {
    Router::new().route("/score", post(score_test))
}
