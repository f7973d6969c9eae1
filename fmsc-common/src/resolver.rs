//! Score resolution
//!
//! Chooses, per test, between the calculated score and the coach's manual
//! score. Pain always wins: a test with pain reported resolves to 0 in every
//! mode.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Index;
use tracing::warn;

use crate::calculator::calculate;
use crate::config::ScoringConfig;
use crate::profile::{MovementProfile, MovementTest, Score};
use crate::{Error, Result, Warning};

/// Global resolution mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMode {
    /// Calculated score when faults are itemized, manual score otherwise
    Automatic,
    /// Manual score for every test
    Manual,
}

impl ResolutionMode {
    pub fn from_flag(use_manual_scores: bool) -> Self {
        if use_manual_scores {
            ResolutionMode::Manual
        } else {
            ResolutionMode::Automatic
        }
    }
}

/// Exactly seven resolved scores, one per test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<MovementTest, Score>",
    into = "BTreeMap<MovementTest, Score>"
)]
pub struct EffectiveScores([Score; 7]);

impl EffectiveScores {
    pub fn new(scores: [Score; 7]) -> Self {
        Self(scores)
    }

    /// Every test at the same score
    pub fn uniform(score: Score) -> Self {
        Self([score; 7])
    }

    pub fn get(&self, test: MovementTest) -> Score {
        self.0[test.index()]
    }

    pub fn set(&mut self, test: MovementTest, score: Score) {
        self.0[test.index()] = score;
    }

    /// `(test, score)` pairs in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (MovementTest, Score)> + '_ {
        MovementTest::ALL.into_iter().map(move |t| (t, self.get(t)))
    }
}

impl Index<MovementTest> for EffectiveScores {
    type Output = Score;

    fn index(&self, test: MovementTest) -> &Score {
        &self.0[test.index()]
    }
}

impl From<EffectiveScores> for BTreeMap<MovementTest, Score> {
    fn from(scores: EffectiveScores) -> Self {
        scores.iter().collect()
    }
}

impl TryFrom<BTreeMap<MovementTest, Score>> for EffectiveScores {
    type Error = Error;

    fn try_from(map: BTreeMap<MovementTest, Score>) -> Result<Self> {
        let mut scores = [Score::ZERO; 7];
        for test in MovementTest::ALL {
            scores[test.index()] = *map.get(&test).ok_or_else(|| {
                Error::InvalidInput(format!("effective scores missing '{}'", test))
            })?;
        }
        Ok(Self(scores))
    }
}

/// Where a resolved score came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    PainForced,
    Manual,
    Calculated,
    /// No faults itemized; manual score used as the direct entry
    ManualFallback,
}

/// Resolution detail for one test
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedTest {
    pub test: MovementTest,
    pub score: Score,
    pub source: ScoreSource,
    pub manual_score: Score,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fired_rule: Option<&'static str>,
}

/// Output of [`resolve`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub scores: EffectiveScores,
    pub details: Vec<ResolvedTest>,
    pub warnings: Vec<Warning>,
}

impl Resolution {
    /// Tests whose score was forced to 0 by pain
    pub fn pain_tests(&self) -> Vec<MovementTest> {
        self.details
            .iter()
            .filter(|d| d.source == ScoreSource::PainForced)
            .map(|d| d.test)
            .collect()
    }
}

/// Resolve all seven tests
///
/// Severities are range-checked first; everything after that is total.
pub fn resolve(
    profile: &MovementProfile,
    mode: ResolutionMode,
    config: &ScoringConfig,
) -> Result<Resolution> {
    profile.validate(config.severity_scale)?;

    let mut scores = EffectiveScores::uniform(Score::ZERO);
    let mut details = Vec::with_capacity(MovementTest::ALL.len());
    let mut warnings = Vec::new();

    for view in profile.views() {
        let (score, source, fired_rule) = if view.pain_reported {
            if view.manual_score != Score::ZERO {
                warn!(
                    test = %view.test,
                    manual_score = view.manual_score.value(),
                    "Pain reported, overriding score to 0"
                );
            }
            (Score::ZERO, ScoreSource::PainForced, None)
        } else if mode == ResolutionMode::Manual {
            (view.manual_score, ScoreSource::Manual, None)
        } else if view.has_itemized_data() {
            let calc = calculate(&view, config);
            if calc.partial_data {
                warnings.push(Warning::PartialData {
                    test: view.test,
                    missing_categories: view
                        .missing_categories
                        .iter()
                        .map(|c| c.to_string())
                        .collect(),
                    unknown_keys: view.unknown_keys.clone(),
                });
            }
            (calc.score, ScoreSource::Calculated, calc.fired_rule)
        } else {
            (view.manual_score, ScoreSource::ManualFallback, None)
        };

        scores.set(view.test, score);
        details.push(ResolvedTest {
            test: view.test,
            score,
            source,
            manual_score: view.manual_score,
            fired_rule,
        });
    }

    Ok(Resolution {
        scores,
        details,
        warnings,
    })
}
