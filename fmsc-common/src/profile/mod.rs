//! Movement profile data model
//!
//! A profile is exactly seven observations, one per screening test. Each
//! observation carries the coach's manual score, an optional pain group, and
//! a test-specific fault sheet (see [`sheets`]). Fault sheets are closed
//! types: every category and fault has a named field, and anything else in
//! the input is captured as an unknown key rather than silently scored.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

pub mod sheets;

pub use sheets::{
    ActiveStraightLegRaiseFaults, FaultSheet, HurdleStepFaults, InlineLungeFaults,
    OverheadSquatFaults, PainGroup, RotaryStabilityFaults, ShoulderMobilityFaults,
    TrunkStabilityPushupFaults,
};

/// Category name of the pain group within a view
pub const PAIN_CATEGORY: &str = "pain";

/// Fault severity on the deployment's scale `[0, S]`
pub type Severity = u8;

/// Vocabulary of one test: `(category, faults)` pairs in form order
pub type Vocabulary = &'static [(&'static str, &'static [&'static str])];

/// The seven standardized screening tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementTest {
    OverheadSquat,
    HurdleStep,
    InlineLunge,
    ShoulderMobility,
    ActiveStraightLegRaise,
    TrunkStabilityPushup,
    RotaryStability,
}

impl MovementTest {
    /// All tests in canonical order
    pub const ALL: [MovementTest; 7] = [
        MovementTest::OverheadSquat,
        MovementTest::HurdleStep,
        MovementTest::InlineLunge,
        MovementTest::ShoulderMobility,
        MovementTest::ActiveStraightLegRaise,
        MovementTest::TrunkStabilityPushup,
        MovementTest::RotaryStability,
    ];

    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementTest::OverheadSquat => "overhead_squat",
            MovementTest::HurdleStep => "hurdle_step",
            MovementTest::InlineLunge => "inline_lunge",
            MovementTest::ShoulderMobility => "shoulder_mobility",
            MovementTest::ActiveStraightLegRaise => "active_straight_leg_raise",
            MovementTest::TrunkStabilityPushup => "trunk_stability_pushup",
            MovementTest::RotaryStability => "rotary_stability",
        }
    }

    /// Position in [`MovementTest::ALL`]
    pub fn index(&self) -> usize {
        match self {
            MovementTest::OverheadSquat => 0,
            MovementTest::HurdleStep => 1,
            MovementTest::InlineLunge => 2,
            MovementTest::ShoulderMobility => 3,
            MovementTest::ActiveStraightLegRaise => 4,
            MovementTest::TrunkStabilityPushup => 5,
            MovementTest::RotaryStability => 6,
        }
    }

    /// True for the three tests evaluated by the pattern gate
    pub fn is_pattern(&self) -> bool {
        self.pattern_tag().is_some()
    }

    /// Generic corrective tag for pattern tests
    pub fn pattern_tag(&self) -> Option<&'static str> {
        match self {
            MovementTest::OverheadSquat => Some("pattern_squat"),
            MovementTest::HurdleStep => Some("pattern_step"),
            MovementTest::InlineLunge => Some("pattern_lunge"),
            MovementTest::ShoulderMobility
            | MovementTest::ActiveStraightLegRaise
            | MovementTest::TrunkStabilityPushup
            | MovementTest::RotaryStability => None,
        }
    }

    /// Fault vocabulary of this test's sheet
    pub fn vocabulary(&self) -> Vocabulary {
        match self {
            MovementTest::OverheadSquat => OverheadSquatFaults::VOCABULARY,
            MovementTest::HurdleStep => HurdleStepFaults::VOCABULARY,
            MovementTest::InlineLunge => InlineLungeFaults::VOCABULARY,
            MovementTest::ShoulderMobility => ShoulderMobilityFaults::VOCABULARY,
            MovementTest::ActiveStraightLegRaise => ActiveStraightLegRaiseFaults::VOCABULARY,
            MovementTest::TrunkStabilityPushup => TrunkStabilityPushupFaults::VOCABULARY,
            MovementTest::RotaryStability => RotaryStabilityFaults::VOCABULARY,
        }
    }

    /// Whether `category.fault` belongs to this test's vocabulary
    pub fn knows_fault(&self, category: &str, fault: &str) -> bool {
        self.vocabulary()
            .iter()
            .any(|(c, faults)| *c == category && faults.contains(&fault))
    }
}

impl fmt::Display for MovementTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementTest {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        MovementTest::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::Configuration(format!("unrecognized movement test '{}'", s)))
    }
}

/// Ordinal test score in `[0, 3]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Score(u8);

impl Score {
    pub const ZERO: Score = Score(0);
    pub const ONE: Score = Score(1);
    pub const TWO: Score = Score(2);
    pub const THREE: Score = Score(3);

    pub fn new(value: u8) -> Result<Self> {
        if value > 3 {
            return Err(Error::InvalidInput(format!(
                "score {} out of range [0, 3]",
                value
            )));
        }
        Ok(Score(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// One step lower, saturating at zero
    pub fn step_down(self) -> Score {
        Score(self.0.saturating_sub(1))
    }
}

impl TryFrom<u8> for Score {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Score::new(value)
    }
}

impl From<Score> for u8 {
    fn from(score: Score) -> u8 {
        score.0
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One `category.fault = severity` observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultReading<'a> {
    pub category: &'a str,
    pub fault: &'a str,
    pub severity: Severity,
}

/// Observation of one test
///
/// Wire shape matches the screening form: `{"score": 2, "pain": {...}, "<category>": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation<F> {
    /// Coach-entered final score, used when no faults are itemized or
    /// when manual scoring is selected
    #[serde(rename = "score")]
    pub manual_score: Score,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pain: Option<PainGroup>,

    #[serde(flatten)]
    pub faults: F,
}

impl<F: FaultSheet> Observation<F> {
    pub fn new(manual_score: Score, faults: F) -> Self {
        Self {
            manual_score,
            pain: None,
            faults,
        }
    }

    /// Any pain reported during this test
    pub fn pain_reported(&self) -> bool {
        self.pain.as_ref().is_some_and(|p| p.pain_reported > 0)
    }

    /// Uniform, test-agnostic view of this observation
    pub fn view(&self) -> TestView {
        let mut readings = self.faults.readings();
        let mut unknown_keys = self.faults.unknown_keys();
        if let Some(pain) = &self.pain {
            pain.push_readings(PAIN_CATEGORY, &mut readings);
            unknown_keys.extend(pain.unknown.keys().map(|k| format!("pain.{}", k)));
        }

        TestView {
            test: F::TEST,
            manual_score: self.manual_score,
            pain_reported: self.pain_reported(),
            readings,
            missing_categories: self.faults.missing_categories(),
            unknown_keys,
        }
    }
}

/// Test-agnostic view consumed by the resolver and candidate scorer
#[derive(Debug, Clone, PartialEq)]
pub struct TestView {
    pub test: MovementTest,
    pub manual_score: Score,
    pub pain_reported: bool,
    /// Every known field, including markers and the pain group
    pub readings: Vec<FaultReading<'static>>,
    pub missing_categories: Vec<&'static str>,
    pub unknown_keys: Vec<String>,
}

impl TestView {
    /// Build a view from loose `category -> fault -> severity` groups
    ///
    /// Keys outside the test's vocabulary are recorded as unknown, never
    /// scored. A `pain` group reporting pain forces the pain flag on.
    pub fn from_groups(
        test: MovementTest,
        groups: &BTreeMap<String, BTreeMap<String, Severity>>,
        pain_reported: bool,
    ) -> Self {
        let mut readings = Vec::new();
        let mut missing_categories = Vec::new();

        for &(category, faults) in test.vocabulary() {
            match groups.get(category) {
                Some(input) => {
                    for &fault in faults {
                        readings.push(FaultReading {
                            category,
                            fault,
                            severity: input.get(fault).copied().unwrap_or(0),
                        });
                    }
                }
                None => missing_categories.push(category),
            }
        }

        let mut unknown_keys = Vec::new();
        let mut pain_reported = pain_reported;
        if let Some(pain) = groups.get(PAIN_CATEGORY) {
            for &fault in PainGroup::FAULTS {
                let severity = pain.get(fault).copied().unwrap_or(0);
                if fault == "pain_reported" && severity > 0 {
                    pain_reported = true;
                }
                readings.push(FaultReading {
                    category: PAIN_CATEGORY,
                    fault,
                    severity,
                });
            }
            unknown_keys.extend(
                pain.keys()
                    .filter(|f| !PainGroup::FAULTS.contains(&f.as_str()))
                    .map(|f| format!("{}.{}", PAIN_CATEGORY, f)),
            );
        }

        for (category, faults) in groups {
            if category == PAIN_CATEGORY {
                continue;
            }
            match test
                .vocabulary()
                .iter()
                .find(|(c, _)| *c == category.as_str())
            {
                Some((_, known)) => unknown_keys.extend(
                    faults
                        .keys()
                        .filter(|f| !known.contains(&f.as_str()))
                        .map(|f| format!("{}.{}", category, f)),
                ),
                None => unknown_keys.push(category.clone()),
            }
        }

        Self {
            test,
            manual_score: Score::ZERO,
            pain_reported,
            readings,
            missing_categories,
            unknown_keys,
        }
    }

    /// Severity of `category.fault`, 0 when absent
    pub fn severity(&self, category: &str, fault: &str) -> Severity {
        self.readings
            .iter()
            .find(|r| r.category == category && r.fault == fault)
            .map(|r| r.severity)
            .unwrap_or(0)
    }

    /// True when the coach itemized at least one non-zero field outside
    /// the pain group
    pub fn has_itemized_data(&self) -> bool {
        self.readings
            .iter()
            .any(|r| r.category != PAIN_CATEGORY && r.severity > 0)
    }

    /// Readings whose severity exceeds `threshold`, excluding the pain group
    pub fn faults_above(&self, threshold: Severity) -> impl Iterator<Item = &FaultReading<'static>> {
        self.readings
            .iter()
            .filter(move |r| r.category != PAIN_CATEGORY && r.severity > threshold)
    }
}

/// Full seven-test screening profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementProfile {
    pub overhead_squat: Observation<OverheadSquatFaults>,
    pub hurdle_step: Observation<HurdleStepFaults>,
    pub inline_lunge: Observation<InlineLungeFaults>,
    pub shoulder_mobility: Observation<ShoulderMobilityFaults>,
    pub active_straight_leg_raise: Observation<ActiveStraightLegRaiseFaults>,
    pub trunk_stability_pushup: Observation<TrunkStabilityPushupFaults>,
    pub rotary_stability: Observation<RotaryStabilityFaults>,

    /// Score every test from its manual score
    #[serde(default)]
    pub use_manual_scores: bool,
}

impl MovementProfile {
    /// Parse a profile, rejecting unrecognized test names
    ///
    /// Plain serde would either ignore an unknown test or report a generic
    /// parse error; an unknown test here is a configuration mismatch between
    /// the form and the engine and is reported as such.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        let map = value.as_object().ok_or_else(|| {
            Error::InvalidInput("movement profile must be a JSON object".to_string())
        })?;

        for key in map.keys() {
            if key == "use_manual_scores" {
                continue;
            }
            key.parse::<MovementTest>()?;
        }

        for test in MovementTest::ALL {
            if !map.contains_key(test.as_str()) {
                return Err(Error::InvalidInput(format!(
                    "movement profile is missing test '{}'",
                    test
                )));
            }
        }

        Ok(serde_json::from_value(value)?)
    }

    /// Range-check every severity against the deployment scale
    pub fn validate(&self, severity_scale: Severity) -> Result<()> {
        for view in self.views() {
            if let Some(r) = view.readings.iter().find(|r| r.severity > severity_scale) {
                return Err(Error::InvalidInput(format!(
                    "{}.{}.{}: severity {} out of range [0, {}]",
                    view.test, r.category, r.fault, r.severity, severity_scale
                )));
            }
        }
        Ok(())
    }

    /// Views of all seven tests in canonical order
    pub fn views(&self) -> [TestView; 7] {
        [
            self.overhead_squat.view(),
            self.hurdle_step.view(),
            self.inline_lunge.view(),
            self.shoulder_mobility.view(),
            self.active_straight_leg_raise.view(),
            self.trunk_stability_pushup.view(),
            self.rotary_stability.view(),
        ]
    }

    /// Profile with every test at `score`, no faults itemized
    pub fn uniform(score: Score) -> Self {
        Self {
            overhead_squat: Observation::new(score, OverheadSquatFaults::default()),
            hurdle_step: Observation::new(score, HurdleStepFaults::default()),
            inline_lunge: Observation::new(score, InlineLungeFaults::default()),
            shoulder_mobility: Observation::new(score, ShoulderMobilityFaults::default()),
            active_straight_leg_raise: Observation::new(
                score,
                ActiveStraightLegRaiseFaults::default(),
            ),
            trunk_stability_pushup: Observation::new(score, TrunkStabilityPushupFaults::default()),
            rotary_stability: Observation::new(score, RotaryStabilityFaults::default()),
            use_manual_scores: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_movement_test_round_trips_wire_names() {
        for test in MovementTest::ALL {
            assert_eq!(test.as_str().parse::<MovementTest>().unwrap(), test);
            assert_eq!(MovementTest::ALL[test.index()], test);
        }
    }

    #[test]
    fn test_unknown_test_name_is_configuration_error() {
        let err = "deep_squat".parse::<MovementTest>().unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_score_range() {
        assert!(Score::new(3).is_ok());
        assert!(matches!(Score::new(4), Err(Error::InvalidInput(_))));
        assert_eq!(Score::ONE.step_down(), Score::ZERO);
        assert_eq!(Score::ZERO.step_down(), Score::ZERO);
    }

    #[test]
    fn test_only_pattern_tests_have_pattern_tags() {
        let patterns: Vec<_> = MovementTest::ALL.into_iter().filter(|t| t.is_pattern()).collect();
        assert_eq!(
            patterns,
            vec![
                MovementTest::OverheadSquat,
                MovementTest::HurdleStep,
                MovementTest::InlineLunge
            ]
        );
    }

    #[test]
    fn test_observation_parses_form_shape() {
        let obs: Observation<OverheadSquatFaults> = serde_json::from_value(json!({
            "score": 2,
            "feet": { "heels_lift": 3 },
            "pain": { "pain_reported": 0 }
        }))
        .unwrap();

        assert_eq!(obs.manual_score, Score::TWO);
        assert!(!obs.pain_reported());
        let view = obs.view();
        assert_eq!(view.severity("feet", "heels_lift"), 3);
        assert!(view.has_itemized_data());
        assert!(view.missing_categories.contains(&"trunk_torso"));
        assert!(!view.missing_categories.contains(&"feet"));
    }

    #[test]
    fn test_observation_captures_unknown_keys() {
        let obs: Observation<HurdleStepFaults> = serde_json::from_value(json!({
            "score": 3,
            "stance_leg": { "knee_wobble": 2 },
            "arm_swing": { "excessive": 1 }
        }))
        .unwrap();

        let view = obs.view();
        assert!(view.unknown_keys.contains(&"stance_leg.knee_wobble".to_string()));
        assert!(view.unknown_keys.contains(&"arm_swing".to_string()));
        assert!(!view.has_itemized_data());
    }

    #[test]
    fn test_from_json_rejects_unrecognized_test() {
        let mut value = serde_json::to_value(MovementProfile::uniform(Score::THREE)).unwrap();
        value["deep_squat_v2"] = json!({ "score": 3 });

        let err = MovementProfile::from_json(value).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_from_json_requires_all_seven_tests() {
        let mut value = serde_json::to_value(MovementProfile::uniform(Score::THREE)).unwrap();
        value.as_object_mut().unwrap().remove("rotary_stability");

        let err = MovementProfile::from_json(value).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_validate_rejects_severity_above_scale() {
        let mut profile = MovementProfile::uniform(Score::THREE);
        profile.inline_lunge.faults.alignment = Some(Default::default());
        if let Some(alignment) = profile.inline_lunge.faults.alignment.as_mut() {
            alignment.lateral_shift = 5;
        }

        assert!(profile.validate(4).is_err());
        assert!(profile.validate(5).is_ok());
    }
}
