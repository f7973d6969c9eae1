//! GET /assessments/:assessment_id

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::db::assessments::{load_assessment, AssessmentRecord};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// GET /assessments/:assessment_id
pub async fn get_assessment(
    State(state): State<AppState>,
    Path(assessment_id): Path<String>,
) -> ApiResult<Json<AssessmentRecord>> {
    let id = Uuid::parse_str(&assessment_id)
        .map_err(|_| ApiError::BadRequest(format!("Invalid assessment ID: {}", assessment_id)))?;

    load_assessment(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Assessment {}", id)))
}

/// Build assessment lookup routes
pub fn assessment_routes() -> Router<AppState> {
    Router::new().route("/assessments/:assessment_id", get(get_assessment))
}
