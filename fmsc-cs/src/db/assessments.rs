//! Assessment persistence
//!
//! Each column holds the JSON text of one part of the assessment.

use chrono::{DateTime, Utc};
use fmsc_common::{Assessment, MovementProfile};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::plan::WorkoutSession;

/// Stored assessment as returned by `GET /assessments/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentRecord {
    pub assessment_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub input_profile: Value,
    pub effective_scores: Value,
    pub triage: Value,
    pub shortlist: Value,
    pub plan: Value,
}

impl AssessmentRecord {
    pub fn new(
        assessment_id: Uuid,
        profile: &MovementProfile,
        assessment: &Assessment,
        plan: &WorkoutSession,
    ) -> ApiResult<Self> {
        Ok(Self {
            assessment_id,
            created_at: Utc::now(),
            input_profile: to_value(profile, "input_profile")?,
            effective_scores: to_value(&assessment.triage.effective_scores, "effective_scores")?,
            triage: to_value(&assessment.triage, "triage")?,
            shortlist: to_value(&assessment.shortlist, "shortlist")?,
            plan: to_value(plan, "plan")?,
        })
    }
}

fn to_value<T: Serialize>(value: &T, column: &str) -> ApiResult<Value> {
    serde_json::to_value(value)
        .map_err(|e| ApiError::Internal(format!("Failed to serialize {}: {}", column, e)))
}

fn parse_column(row: &sqlx::sqlite::SqliteRow, column: &str) -> ApiResult<Value> {
    let text: String = row.get(column);
    serde_json::from_str(&text)
        .map_err(|e| ApiError::Internal(format!("Failed to deserialize {}: {}", column, e)))
}

/// Insert an assessment record
pub async fn save_assessment(pool: &SqlitePool, record: &AssessmentRecord) -> ApiResult<()> {
    sqlx::query(
        r#"
        INSERT INTO assessments (
            assessment_id, created_at, input_profile, effective_scores,
            triage, shortlist, plan
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.assessment_id.to_string())
    .bind(record.created_at.to_rfc3339())
    .bind(record.input_profile.to_string())
    .bind(record.effective_scores.to_string())
    .bind(record.triage.to_string())
    .bind(record.shortlist.to_string())
    .bind(record.plan.to_string())
    .execute(pool)
    .await?;

    tracing::debug!(assessment_id = %record.assessment_id, "Assessment saved");

    Ok(())
}

/// Load an assessment record by ID
pub async fn load_assessment(
    pool: &SqlitePool,
    assessment_id: Uuid,
) -> ApiResult<Option<AssessmentRecord>> {
    let row = sqlx::query(
        r#"
        SELECT assessment_id, created_at, input_profile, effective_scores,
               triage, shortlist, plan
        FROM assessments
        WHERE assessment_id = ?
        "#,
    )
    .bind(assessment_id.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let created_at: String = row.get("created_at");
            let created_at = DateTime::parse_from_rfc3339(&created_at)
                .map_err(|e| ApiError::Internal(format!("Failed to parse created_at: {}", e)))?
                .with_timezone(&Utc);

            Ok(Some(AssessmentRecord {
                assessment_id,
                created_at,
                input_profile: parse_column(&row, "input_profile")?,
                effective_scores: parse_column(&row, "effective_scores")?,
                triage: parse_column(&row, "triage")?,
                shortlist: parse_column(&row, "shortlist")?,
                plan: parse_column(&row, "plan")?,
            }))
        }
        None => Ok(None),
    }
}
