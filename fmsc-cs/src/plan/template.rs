//! Deterministic template plan writer

use async_trait::async_trait;
use fmsc_common::candidates::RankedCandidate;
use fmsc_common::triage::DifficultyColor;
use fmsc_common::{Assessment, Tier};

use super::{ExerciseCard, PlanError, PlanWriter, WorkoutSession};

pub const REFERRAL_TITLE: &str = "Medical Referral Required";
pub const NO_MATCH_TITLE: &str = "No Correctives Matched";

/// Builds sessions from fixed prescriptions; never fails
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplatePlanWriter;

struct Prescription {
    sets_reps: &'static str,
    tempo: &'static str,
    duration: &'static str,
}

/// Volume by level: holds and high reps low on the ladder, load and speed high
fn prescription(level: u8) -> Prescription {
    match level {
        0..=3 => Prescription {
            sets_reps: "3 × 30-45s hold",
            tempo: "Controlled",
            duration: "15-20 min",
        },
        4..=5 => Prescription {
            sets_reps: "3 × 12-15",
            tempo: "3-1-3-0",
            duration: "20-30 min",
        },
        6..=7 => Prescription {
            sets_reps: "3 × 8-10",
            tempo: "2-1-2-0",
            duration: "30-40 min",
        },
        _ => Prescription {
            sets_reps: "4 × 4-6",
            tempo: "Explosive",
            duration: "30-40 min",
        },
    }
}

fn cue(tag: Option<&str>) -> &'static str {
    match tag {
        Some("fix_heels_lift") => "Drive through the mid-foot and keep the heels heavy.",
        Some("fix_knee_valgus") => "Push the knees out over the toes and keep the glutes on.",
        Some("fix_forward_lean") => "Keep the chest tall with the ribs stacked over the pelvis.",
        Some("fix_thoracic_stiffness") => "Breathe into the upper back and reach long through the arms.",
        Some("fix_lumbar_extension") => "Brace the trunk and keep the pelvis under the ribs.",
        Some("fix_rib_flare") => "Exhale fully and keep the ribs down before each rep.",
        Some("fix_rotary_instability") => "Move slowly and keep the hips square to the floor.",
        Some("fix_asymmetry") => "Lead with the weaker side and match reps on both sides.",
        _ => "Own every position and stop the set when form breaks.",
    }
}

/// `fix_heels_lift` → `HEELS LIFT`
fn badge(tag: Option<&str>) -> String {
    match tag {
        Some(tag) => {
            let bare = tag
                .strip_prefix("fix_")
                .or_else(|| tag.strip_prefix("pattern_"))
                .unwrap_or(tag);
            bare.replace('_', " ").to_uppercase()
        }
        None => "GENERAL".to_string(),
    }
}

fn tier_title(tier: Tier) -> &'static str {
    match tier {
        Tier::Mobility => "Mobility Restoration",
        Tier::Stability => "Stability & Motor Control",
        Tier::Pattern => "Movement Patterning",
        Tier::Strength => "Strength Development",
        Tier::Power => "Power Development",
    }
}

fn card(candidate: &RankedCandidate, level: u8) -> ExerciseCard {
    let tag = candidate.primary_tag();
    let rx = prescription(level);
    ExerciseCard {
        name: candidate.name.clone(),
        tag: badge(tag),
        sets_reps: rx.sets_reps.to_string(),
        tempo: rx.tempo.to_string(),
        coach_tip: cue(tag).to_string(),
    }
}

impl TemplatePlanWriter {
    /// Session telling the athlete to stop and see a clinician
    pub fn referral(assessment: &Assessment) -> WorkoutSession {
        let tests: Vec<String> = assessment
            .triage
            .pain_tests
            .iter()
            .map(|t| t.as_str().replace('_', " "))
            .collect();

        WorkoutSession {
            session_title: REFERRAL_TITLE.to_string(),
            estimated_duration: "N/A".to_string(),
            difficulty_color: DifficultyColor::Red,
            coach_summary: format!(
                "Pain was reported during screening ({}). Do not proceed with training. \
                 Refer to a licensed medical professional for evaluation.",
                tests.join(", ")
            ),
            exercises: Vec::new(),
        }
    }

    /// Build the session synchronously
    pub fn compose(&self, assessment: &Assessment) -> WorkoutSession {
        if assessment.triage.referral_required {
            return Self::referral(assessment);
        }

        let triage = &assessment.triage;
        let level = triage.target_level.value();
        let rx = prescription(level);

        if assessment.shortlist.is_empty() {
            return WorkoutSession {
                session_title: NO_MATCH_TITLE.to_string(),
                estimated_duration: rx.duration.to_string(),
                difficulty_color: triage.difficulty_color,
                coach_summary: format!(
                    "No catalog exercises matched level {}. Train general {} work at this \
                     level and re-screen.",
                    level,
                    tier_title(triage.tier).to_lowercase()
                ),
                exercises: Vec::new(),
            };
        }

        let exercises: Vec<ExerciseCard> = assessment
            .shortlist
            .candidates
            .iter()
            .map(|c| card(c, level))
            .collect();

        let focus = exercises
            .first()
            .map(|e| e.tag.to_lowercase())
            .unwrap_or_default();

        let faults: Vec<String> = assessment
            .flagged_faults
            .iter()
            .take(3)
            .map(|f| f.fault.replace('_', " "))
            .collect();
        let fault_text = if faults.is_empty() {
            "No faults were flagged.".to_string()
        } else {
            format!("Priority faults: {}.", faults.join(", "))
        };

        WorkoutSession {
            session_title: format!("Level {} {}: {}", level, tier_title(triage.tier), focus),
            estimated_duration: rx.duration.to_string(),
            difficulty_color: triage.difficulty_color,
            coach_summary: format!(
                "{} tier, target level {}. {} {} exercise{} selected to address them.",
                triage.tier,
                level,
                fault_text,
                exercises.len(),
                if exercises.len() == 1 { "" } else { "s" }
            ),
            exercises,
        }
    }
}

#[async_trait]
impl PlanWriter for TemplatePlanWriter {
    fn name(&self) -> &'static str {
        "template"
    }

    async fn write(&self, assessment: &Assessment) -> Result<WorkoutSession, PlanError> {
        Ok(self.compose(assessment))
    }
}
