//! Chat-completion plan writer
//!
//! Sends the assessment to an OpenAI-compatible `chat/completions` endpoint
//! and parses the JSON session it returns. The model sees the tier,
//! rationale code, level, flagged faults and the shortlist; it never sees
//! scores and cannot change the color.

use async_trait::async_trait;
use fmsc_common::config::PlanWriterConfig;
use fmsc_common::Assessment;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

use super::{ExerciseCard, PlanError, PlanWriter, WorkoutSession};

const USER_AGENT: &str = concat!("fmsc-cs/", env!("CARGO_PKG_VERSION"));
const TEMPERATURE: f32 = 0.2;
const SEED: u64 = 42;

const SYSTEM_PROMPT: &str = "You are a strength coach writing one corrective training session. \
Use only the exercises listed, by their exact names, in the order given. \
For each exercise give a short uppercase badge naming the fault it targets, \
sets and reps, a tempo, and one coaching cue. Low levels use higher reps or holds with bodyweight; \
high levels use lower reps with load and faster tempo. \
Reply with a JSON object: {\"session_title\": string, \"estimated_duration\": string, \
\"coach_summary\": string, \"exercises\": [{\"name\", \"tag\", \"sets_reps\", \"tempo\", \"coach_tip\"}]}.";

/// Session body as returned by the model; color is not accepted from it
#[derive(Debug, Deserialize)]
struct DraftSession {
    session_title: String,
    #[serde(default = "default_duration")]
    estimated_duration: String,
    coach_summary: String,
    exercises: Vec<ExerciseCard>,
}

fn default_duration() -> String {
    "20-30 min".to_string()
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// OpenAI-compatible plan writer
pub struct ChatPlanWriter {
    http_client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl ChatPlanWriter {
    pub fn new(
        endpoint: String,
        model: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, PlanError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| PlanError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint,
            model,
            api_key,
        })
    }

    /// Build from config; the API key is read from the named env var
    pub fn from_config(config: &PlanWriterConfig) -> Result<Self, PlanError> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| PlanError::Config("chat writer requires an endpoint".to_string()))?;
        let model = config
            .model
            .clone()
            .ok_or_else(|| PlanError::Config("chat writer requires a model".to_string()))?;
        let api_key = std::env::var(&config.api_key_env).ok();
        if api_key.is_none() {
            tracing::warn!(
                env = %config.api_key_env,
                "No API key set for chat plan writer, sending unauthenticated requests"
            );
        }

        Self::new(
            endpoint,
            model,
            api_key,
            Duration::from_secs(config.timeout_seconds),
        )
    }
}

/// User message describing the assessment
fn user_prompt(assessment: &Assessment) -> String {
    let triage = &assessment.triage;

    let faults: Vec<String> = assessment
        .flagged_faults
        .iter()
        .map(|f| format!("{} ({})", f.fault.replace('_', " "), f.test))
        .collect();

    let exercises: Vec<String> = assessment
        .shortlist
        .candidates
        .iter()
        .map(|c| format!("- {} [{}]", c.name, c.matched_tags.join(", ")))
        .collect();

    format!(
        "Tier: {}\nRationale: {}\nTarget level: {} of 10\nFlagged faults: {}\nExercises:\n{}",
        triage.tier,
        serde_json::to_value(triage.rationale)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default(),
        triage.target_level,
        if faults.is_empty() {
            "none".to_string()
        } else {
            faults.join(", ")
        },
        exercises.join("\n")
    )
}

/// Turn the model's message content into a session for this assessment
fn parse_session(content: &str, assessment: &Assessment) -> Result<WorkoutSession, PlanError> {
    let draft: DraftSession =
        serde_json::from_str(content).map_err(|e| PlanError::ParseError(e.to_string()))?;

    for card in &draft.exercises {
        let listed = assessment
            .shortlist
            .candidates
            .iter()
            .any(|c| c.name == card.name);
        if !listed {
            return Err(PlanError::Rejected(format!(
                "'{}' is not in the shortlist",
                card.name
            )));
        }
    }

    Ok(WorkoutSession {
        session_title: draft.session_title,
        estimated_duration: draft.estimated_duration,
        difficulty_color: assessment.triage.difficulty_color,
        coach_summary: draft.coach_summary,
        exercises: draft.exercises,
    })
}

#[async_trait]
impl PlanWriter for ChatPlanWriter {
    fn name(&self) -> &'static str {
        "chat"
    }

    async fn write(&self, assessment: &Assessment) -> Result<WorkoutSession, PlanError> {
        let messages = vec![
            ChatMessage {
                role: "system".to_string(),
                content: SYSTEM_PROMPT.to_string(),
            },
            ChatMessage {
                role: "user".to_string(),
                content: user_prompt(assessment),
            },
        ];
        let body = json!({
            "model": self.model,
            "temperature": TEMPERATURE,
            "seed": SEED,
            "response_format": { "type": "json_object" },
            "messages": messages,
        });

        tracing::debug!(
            endpoint = %self.endpoint,
            model = %self.model,
            candidates = assessment.shortlist.candidates.len(),
            "Requesting plan from chat endpoint"
        );

        let mut request = self.http_client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PlanError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(PlanError::ApiError(status.as_u16(), error_text));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| PlanError::ParseError(e.to_string()))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| PlanError::ParseError("response has no choices".to_string()))?;

        let session = parse_session(&content, assessment)?;

        tracing::info!(
            exercises = session.exercises.len(),
            "Chat plan writer produced session"
        );

        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fmsc_common::profile::sheets::OsLowerLimb;
    use fmsc_common::triage::DifficultyColor;
    use fmsc_common::{assess, Catalog, CatalogEntry, CoachConfig, MovementProfile, Score};

    fn valgus_assessment() -> Assessment {
        let mut profile = MovementProfile::uniform(Score::THREE);
        profile.overhead_squat.faults.lower_limb = Some(OsLowerLimb {
            knee_valgus: 2,
            ..Default::default()
        });
        let catalog = Catalog::new(vec![CatalogEntry::new(
            "Banded Goblet Squat",
            7,
            &["fix_knee_valgus", "pattern_squat"],
        )])
        .unwrap();
        assess(&profile, &catalog, &CoachConfig::default()).unwrap()
    }

    #[test]
    fn test_prompt_omits_scores() {
        let assessment = valgus_assessment();
        let prompt = user_prompt(&assessment);

        assert!(prompt.contains("Tier: STRENGTH"));
        assert!(prompt.contains("Target level: 7 of 10"));
        assert!(prompt.contains("knee valgus (overhead_squat)"));
        assert!(prompt.contains("- Banded Goblet Squat"));
        assert!(!prompt.contains("score"));
    }

    #[test]
    fn test_parse_session_takes_color_from_triage() {
        let assessment = valgus_assessment();
        let content = r#"{
            "session_title": "Knee Control",
            "coach_summary": "Knees cave under load.",
            "difficulty_color": "Red",
            "exercises": [{
                "name": "Banded Goblet Squat",
                "tag": "KNEE VALGUS",
                "sets_reps": "3 × 8-10",
                "tempo": "2-1-2-0",
                "coach_tip": "Push knees out, engage glutes."
            }]
        }"#;

        let session = parse_session(content, &assessment).unwrap();
        assert_eq!(session.difficulty_color, DifficultyColor::Green);
        assert_eq!(session.estimated_duration, "20-30 min");
        assert_eq!(session.exercises.len(), 1);
    }

    #[test]
    fn test_parse_session_rejects_unlisted_exercise() {
        let assessment = valgus_assessment();
        let content = r#"{
            "session_title": "Knee Control",
            "coach_summary": "",
            "exercises": [{
                "name": "Barbell Back Squat",
                "tag": "KNEE VALGUS",
                "sets_reps": "5 × 5",
                "tempo": "Explosive",
                "coach_tip": ""
            }]
        }"#;

        let err = parse_session(content, &assessment).unwrap_err();
        assert!(matches!(err, PlanError::Rejected(_)));
    }

    #[test]
    fn test_parse_session_rejects_non_json() {
        let assessment = valgus_assessment();
        let err = parse_session("Here is your plan!", &assessment).unwrap_err();
        assert!(matches!(err, PlanError::ParseError(_)));
    }

    #[test]
    fn test_from_config_requires_endpoint() {
        let config = PlanWriterConfig {
            kind: fmsc_common::config::PlanWriterKind::Chat,
            model: Some("coach-small".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            ChatPlanWriter::from_config(&config),
            Err(PlanError::Config(_))
        ));
    }
}
