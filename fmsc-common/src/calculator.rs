//! Fault-to-score calculator
//!
//! Interprets the per-test cascades in [`crate::rules`]:
//! 1. Pain reported: score 0, nothing else evaluated
//! 2. Base score from the first marked tier (or the floor), or 3 for tests
//!    without tiers. Markers count when above 0, whatever the presence
//!    threshold
//! 3. Every ceiling whose faults are present caps the score
//! 4. Any step-down fault lowers the result one step
//!
//! A score is never raised once capped.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::config::ScoringConfig;
use crate::profile::{MovementTest, Score, Severity, TestView};
use crate::rules::{self, FaultRef, FLOOR_LABEL, STEP_DOWN_LABEL};
use crate::Result;

/// Rule label reported for pain-forced zeros
pub const PAIN_RULE: &str = "pain_reported";

/// Outcome of scoring one test
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Calculation {
    pub test: MovementTest,
    pub score: Score,

    /// Rule that determined the final score; `None` for a clean 3
    pub fired_rule: Option<&'static str>,

    /// Categories were missing or unknown keys were ignored
    pub partial_data: bool,
}

/// Score one test from its fault readings
pub fn calculate(view: &TestView, config: &ScoringConfig) -> Calculation {
    let partial_data = !view.missing_categories.is_empty() || !view.unknown_keys.is_empty();
    if partial_data {
        warn!(
            test = %view.test,
            missing = ?view.missing_categories,
            ignored = ?view.unknown_keys,
            "Scoring on partial fault data"
        );
    }

    if view.pain_reported {
        debug!(test = %view.test, "Pain reported, score forced to 0");
        return Calculation {
            test: view.test,
            score: Score::ZERO,
            fired_rule: Some(PAIN_RULE),
            partial_data,
        };
    }

    let cascade = rules::cascade(view.test);
    let present =
        |r: &FaultRef| view.severity(r.category, r.fault) > config.presence_threshold;
    // Tier markers are positive observations; the presence threshold only filters faults
    let marked = |r: &FaultRef| view.severity(r.category, r.fault) > 0;

    let (mut score, mut fired_rule) = if cascade.tiers.is_empty() {
        (Score::THREE, None)
    } else {
        match cascade.tiers.iter().find(|t| marked(&t.marker)) {
            Some(tier) if tier.score == Score::THREE => (tier.score, None),
            Some(tier) => (tier.score, Some(tier.marker.fault)),
            None => (cascade.floor, Some(FLOOR_LABEL)),
        }
    };

    for ceiling in cascade.ceilings {
        if ceiling.cap < score && ceiling.faults.iter().any(present) {
            score = ceiling.cap;
            fired_rule = Some(ceiling.label);
        }
    }

    if cascade.step_down.iter().any(present) {
        score = score.step_down();
        fired_rule = Some(STEP_DOWN_LABEL);
    }

    debug!(
        test = %view.test,
        score = score.value(),
        rule = ?fired_rule,
        "Cascade evaluated"
    );

    Calculation {
        test: view.test,
        score,
        fired_rule,
        partial_data,
    }
}

/// Score a test identified by name from loose fault groups
///
/// Entry point for callers that do not hold a typed profile. An unknown
/// test name is a configuration error, never a default score.
pub fn calculate_named(
    name: &str,
    groups: &BTreeMap<String, BTreeMap<String, Severity>>,
    pain_reported: bool,
    config: &ScoringConfig,
) -> Result<Calculation> {
    let test: MovementTest = name.parse()?;
    let view = TestView::from_groups(test, groups, pain_reported);
    Ok(calculate(&view, config))
}
