//! Plan writers
//!
//! Turn an [`Assessment`] into a human-readable workout session. Writers
//! only describe; scores, tier and color always come from the assessment.

use async_trait::async_trait;
use fmsc_common::config::{PlanWriterConfig, PlanWriterKind};
use fmsc_common::triage::DifficultyColor;
use fmsc_common::Assessment;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

pub mod chat;
pub mod template;

pub use chat::ChatPlanWriter;
pub use template::TemplatePlanWriter;

/// Plan writer errors
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    /// Session referenced exercises outside the shortlist
    #[error("Rejected session: {0}")]
    Rejected(String),

    #[error("Plan writer misconfigured: {0}")]
    Config(String),
}

/// One exercise in a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseCard {
    /// Exact catalog name
    pub name: String,
    /// Short uppercase badge, e.g. `HEELS LIFT`
    pub tag: String,
    pub sets_reps: String,
    pub tempo: String,
    pub coach_tip: String,
}

/// Session handed back to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutSession {
    pub session_title: String,
    pub estimated_duration: String,
    pub difficulty_color: DifficultyColor,
    pub coach_summary: String,
    pub exercises: Vec<ExerciseCard>,
}

/// Writes a session for an assessment
#[async_trait]
pub trait PlanWriter: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    async fn write(&self, assessment: &Assessment) -> Result<WorkoutSession, PlanError>;
}

/// Build the configured writer
pub fn build_plan_writer(config: &PlanWriterConfig) -> Result<Arc<dyn PlanWriter>, PlanError> {
    match config.kind {
        PlanWriterKind::Template => Ok(Arc::new(TemplatePlanWriter)),
        PlanWriterKind::Chat => Ok(Arc::new(ChatPlanWriter::from_config(config)?)),
    }
}

/// Produce the session for an assessment
///
/// Referral assessments never reach the configured writer. Any writer
/// failure falls back to the deterministic template.
pub async fn write_plan(writer: &dyn PlanWriter, assessment: &Assessment) -> WorkoutSession {
    if assessment.triage.referral_required {
        return TemplatePlanWriter::referral(assessment);
    }

    match writer.write(assessment).await {
        Ok(session) => session,
        Err(e) => {
            warn!(
                writer = writer.name(),
                error = %e,
                "Plan writer failed, falling back to template"
            );
            TemplatePlanWriter.compose(assessment)
        }
    }
}
