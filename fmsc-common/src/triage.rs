//! Triage classifier
//!
//! Fixed-priority gates, evaluated in order and terminal on the first match:
//! 1. Mobility: ASLR or shoulder mobility ≤ 1 → MOBILITY, level 1
//! 2. Stability: rotary or trunk stability ≤ 1 → STABILITY, level 3
//! 3. Pattern: `p = min(squat, hurdle, lunge)`; p ≤ 1 → PATTERN (5),
//!    p = 2 → STRENGTH (7), p = 3 → POWER (9)

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

use crate::profile::{MovementTest, Score};
use crate::resolver::EffectiveScores;

/// Coarse training classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    Mobility,
    Stability,
    Pattern,
    Strength,
    Power,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Mobility => "MOBILITY",
            Tier::Stability => "STABILITY",
            Tier::Pattern => "PATTERN",
            Tier::Strength => "STRENGTH",
            Tier::Power => "POWER",
        }
    }

    /// Anchor rung on the training ladder
    pub fn target_level(&self) -> TargetLevel {
        match self {
            Tier::Mobility => TargetLevel(1),
            Tier::Stability => TargetLevel(3),
            Tier::Pattern => TargetLevel(5),
            Tier::Strength => TargetLevel(7),
            Tier::Power => TargetLevel(9),
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rung on the training ladder; triage only produces 1, 3, 5, 7 or 9
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetLevel(u8);

impl TargetLevel {
    pub const ANCHORS: [TargetLevel; 5] = [
        TargetLevel(1),
        TargetLevel(3),
        TargetLevel(5),
        TargetLevel(7),
        TargetLevel(9),
    ];

    pub fn value(self) -> u8 {
        self.0
    }

    /// Catalog tag for this level (`level_N`)
    pub fn level_tag(self) -> String {
        format!("level_{}", self.0)
    }
}

impl fmt::Display for TargetLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why the tier was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rationale {
    /// The gate that fired was tripped by a pain-forced zero
    PainForced,
    MobilityRestriction,
    MotorControlFailure,
    PatternDysfunction,
    AcceptablePatterning,
    PerfectPatterning,
}

/// Traffic-light color shown with the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DifficultyColor {
    Red,
    Yellow,
    Green,
}

impl DifficultyColor {
    pub fn for_level(level: TargetLevel, referral_required: bool) -> Self {
        if referral_required || level.value() <= 3 {
            DifficultyColor::Red
        } else if level.value() <= 6 {
            DifficultyColor::Yellow
        } else {
            DifficultyColor::Green
        }
    }
}

/// Classification handed to the candidate scorer and plan writer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageResult {
    pub tier: Tier,
    pub target_level: TargetLevel,
    pub rationale: Rationale,
    /// Human-readable explanation naming the deciding tests
    pub reason: String,
    pub effective_scores: EffectiveScores,
    /// Tests with pain reported
    pub pain_tests: Vec<MovementTest>,
    /// Any pain anywhere; the session must be a referral notice
    pub referral_required: bool,
    pub difficulty_color: DifficultyColor,
}

struct Gate {
    tier: Tier,
    rationale: Rationale,
    tests: [MovementTest; 2],
}

const GATES: [Gate; 2] = [
    Gate {
        tier: Tier::Mobility,
        rationale: Rationale::MobilityRestriction,
        tests: [
            MovementTest::ActiveStraightLegRaise,
            MovementTest::ShoulderMobility,
        ],
    },
    Gate {
        tier: Tier::Stability,
        rationale: Rationale::MotorControlFailure,
        tests: [
            MovementTest::RotaryStability,
            MovementTest::TrunkStabilityPushup,
        ],
    },
];

const PATTERN_TESTS: [MovementTest; 3] = [
    MovementTest::OverheadSquat,
    MovementTest::HurdleStep,
    MovementTest::InlineLunge,
];

fn describe(tests: &[MovementTest], scores: &EffectiveScores) -> String {
    tests
        .iter()
        .map(|t| format!("{}={}", t, scores[*t]))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Classify seven effective scores
pub fn classify(scores: &EffectiveScores, pain_tests: &[MovementTest]) -> TriageResult {
    let (tier, rationale, reason) = evaluate_gates(scores, pain_tests);
    let target_level = tier.target_level();
    let referral_required = !pain_tests.is_empty();

    info!(
        tier = %tier,
        target_level = target_level.value(),
        rationale = ?rationale,
        referral = referral_required,
        "Triage classified"
    );

    TriageResult {
        tier,
        target_level,
        rationale,
        reason,
        effective_scores: *scores,
        pain_tests: pain_tests.to_vec(),
        referral_required,
        difficulty_color: DifficultyColor::for_level(target_level, referral_required),
    }
}

fn evaluate_gates(
    scores: &EffectiveScores,
    pain_tests: &[MovementTest],
) -> (Tier, Rationale, String) {
    for gate in &GATES {
        let tripped: Vec<MovementTest> = gate
            .tests
            .iter()
            .copied()
            .filter(|t| scores[*t] <= Score::ONE)
            .collect();
        if tripped.is_empty() {
            continue;
        }

        let rationale = if tripped.iter().any(|t| pain_tests.contains(t)) {
            Rationale::PainForced
        } else {
            gate.rationale
        };
        let reason = format!(
            "{} gate: {} at or below 1",
            gate.tier.as_str().to_lowercase(),
            describe(&tripped, scores)
        );
        return (gate.tier, rationale, reason);
    }

    let p = PATTERN_TESTS
        .iter()
        .map(|t| scores[*t])
        .min()
        .unwrap_or(Score::ZERO);
    let weakest: Vec<MovementTest> = PATTERN_TESTS
        .iter()
        .copied()
        .filter(|t| scores[*t] == p)
        .collect();
    let reason = format!("pattern gate: min pattern score {} ({})", p, describe(&weakest, scores));

    if p <= Score::ONE {
        let rationale = if weakest.iter().any(|t| pain_tests.contains(t)) {
            Rationale::PainForced
        } else {
            Rationale::PatternDysfunction
        };
        (Tier::Pattern, rationale, reason)
    } else if p == Score::TWO {
        (Tier::Strength, Rationale::AcceptablePatterning, reason)
    } else {
        (Tier::Power, Rationale::PerfectPatterning, reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(pairs: &[(MovementTest, Score)]) -> EffectiveScores {
        let mut s = EffectiveScores::uniform(Score::THREE);
        for (test, score) in pairs {
            s.set(*test, *score);
        }
        s
    }

    #[test]
    fn test_all_perfect_is_power() {
        let result = classify(&EffectiveScores::uniform(Score::THREE), &[]);
        assert_eq!(result.tier, Tier::Power);
        assert_eq!(result.target_level.value(), 9);
        assert_eq!(result.rationale, Rationale::PerfectPatterning);
        assert_eq!(result.difficulty_color, DifficultyColor::Green);
        assert!(!result.referral_required);
    }

    #[test]
    fn test_mobility_gate_dominates() {
        let result = classify(
            &scores(&[
                (MovementTest::ShoulderMobility, Score::ONE),
                (MovementTest::RotaryStability, Score::ONE),
                (MovementTest::OverheadSquat, Score::ZERO),
            ]),
            &[],
        );
        assert_eq!(result.tier, Tier::Mobility);
        assert_eq!(result.target_level.value(), 1);
        assert_eq!(result.rationale, Rationale::MobilityRestriction);
        assert_eq!(result.difficulty_color, DifficultyColor::Red);
    }

    #[test]
    fn test_stability_gate() {
        let result = classify(&scores(&[(MovementTest::TrunkStabilityPushup, Score::ONE)]), &[]);
        assert_eq!(result.tier, Tier::Stability);
        assert_eq!(result.target_level.value(), 3);
        assert_eq!(result.rationale, Rationale::MotorControlFailure);
    }

    #[test]
    fn test_pattern_tiers() {
        let pattern = classify(&scores(&[(MovementTest::InlineLunge, Score::ONE)]), &[]);
        assert_eq!(pattern.tier, Tier::Pattern);
        assert_eq!(pattern.target_level.value(), 5);
        assert_eq!(pattern.difficulty_color, DifficultyColor::Yellow);

        let strength = classify(&scores(&[(MovementTest::OverheadSquat, Score::TWO)]), &[]);
        assert_eq!(strength.tier, Tier::Strength);
        assert_eq!(strength.target_level.value(), 7);
        assert_eq!(strength.rationale, Rationale::AcceptablePatterning);
    }

    #[test]
    fn test_pain_forced_rationale() {
        let result = classify(
            &scores(&[(MovementTest::ShoulderMobility, Score::ZERO)]),
            &[MovementTest::ShoulderMobility],
        );
        assert_eq!(result.tier, Tier::Mobility);
        assert_eq!(result.rationale, Rationale::PainForced);
        assert!(result.referral_required);
    }

    #[test]
    fn test_pain_elsewhere_keeps_gate_rationale_but_requires_referral() {
        let result = classify(
            &scores(&[
                (MovementTest::ActiveStraightLegRaise, Score::ONE),
                (MovementTest::HurdleStep, Score::ZERO),
            ]),
            &[MovementTest::HurdleStep],
        );
        assert_eq!(result.tier, Tier::Mobility);
        assert_eq!(result.rationale, Rationale::MobilityRestriction);
        assert!(result.referral_required);
        assert_eq!(result.difficulty_color, DifficultyColor::Red);
    }

    #[test]
    fn test_pain_in_pattern_test() {
        let result = classify(
            &scores(&[(MovementTest::HurdleStep, Score::ZERO)]),
            &[MovementTest::HurdleStep],
        );
        assert_eq!(result.tier, Tier::Pattern);
        assert_eq!(result.rationale, Rationale::PainForced);
        assert_eq!(result.difficulty_color, DifficultyColor::Red);
    }

    #[test]
    fn test_target_levels_are_anchors() {
        for tier in [
            Tier::Mobility,
            Tier::Stability,
            Tier::Pattern,
            Tier::Strength,
            Tier::Power,
        ] {
            assert!(TargetLevel::ANCHORS.contains(&tier.target_level()));
        }
        assert_eq!(TargetLevel::ANCHORS[2].level_tag(), "level_5");
    }

    #[test]
    fn test_wire_names() {
        let result = classify(&EffectiveScores::uniform(Score::THREE), &[]);
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["tier"], "POWER");
        assert_eq!(value["rationale"], "PERFECT_PATTERNING");
        assert_eq!(value["target_level"], 9);
        assert_eq!(value["difficulty_color"], "Green");
    }
}
