//! POST /assess
//!
//! Profile → cache lookup → assessment → plan → persist → cache insert.

use axum::{extract::rejection::JsonRejection, extract::State, routing::post, Json, Router};
use fmsc_common::assessment::FlaggedFault;
use fmsc_common::candidates::Shortlist;
use fmsc_common::{assess, MovementProfile, TriageResult, Warning};
use serde::Serialize;
use uuid::Uuid;

use crate::cache::cache_key;
use crate::db::assessments::{save_assessment, AssessmentRecord};
use crate::error::{ApiError, ApiResult};
use crate::plan::{write_plan, WorkoutSession};
use crate::AppState;

/// POST /assess response
#[derive(Debug, Clone, Serialize)]
pub struct AssessResponse {
    pub assessment_id: Uuid,
    /// Served from the response cache
    pub cached: bool,
    pub triage: TriageResult,
    pub shortlist: Shortlist,
    pub flagged_faults: Vec<FlaggedFault>,
    pub warnings: Vec<Warning>,
    pub plan: WorkoutSession,
}

/// POST /assess
///
/// A cache hit returns the first response for that profile, including its ID.
pub async fn assess_profile(
    State(state): State<AppState>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> ApiResult<Json<AssessResponse>> {
    let Json(value) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let profile = MovementProfile::from_json(value)?;
    profile.validate(state.config.scoring.severity_scale)?;

    // Generation first: a reload between the two reads only strands an entry
    let generation = state.catalog.generation();
    let catalog = state.catalog.snapshot();
    let key = cache_key(&profile, generation);

    if let Some(mut hit) = key.as_deref().and_then(|k| state.cache.get(k)) {
        tracing::debug!(assessment_id = %hit.assessment_id, "Assessment served from cache");
        hit.cached = true;
        return Ok(Json(hit));
    }

    let assessment = assess(&profile, &catalog, &state.config)?;
    let plan = write_plan(state.plan_writer.as_ref(), &assessment).await;

    let assessment_id = Uuid::new_v4();
    let record = AssessmentRecord::new(assessment_id, &profile, &assessment, &plan)?;
    save_assessment(&state.db, &record).await?;

    tracing::info!(
        assessment_id = %assessment_id,
        tier = %assessment.triage.tier,
        target_level = assessment.triage.target_level.value(),
        referral = assessment.triage.referral_required,
        exercises = plan.exercises.len(),
        "Assessment completed"
    );

    let response = AssessResponse {
        assessment_id,
        cached: false,
        triage: assessment.triage,
        shortlist: assessment.shortlist,
        flagged_faults: assessment.flagged_faults,
        warnings: assessment.warnings,
        plan,
    };
    if let Some(key) = key {
        state.cache.insert(key, response.clone());
    }

    Ok(Json(response))
}

/// Build assessment routes
pub fn assess_routes() -> Router<AppState> {
    Router::new().route("/assess", post(assess_profile))
}
