//! Corrective candidate scorer
//!
//! Builds a tag query from the triage level, the faults present and the
//! weak pattern tests, then ranks catalog entries at the target level by
//! tag overlap. Corrective (`fix_*`) matches earn a fixed bonus so they
//! always outrank generic pattern matches.

use serde::Serialize;
use std::collections::BTreeSet;
use tracing::debug;

use crate::catalog::{self, Catalog, CatalogEntry};
use crate::config::{CandidateConfig, ScoringConfig};
use crate::profile::{MovementTest, Score, TestView};
use crate::resolver::EffectiveScores;
use crate::triage::TargetLevel;
use crate::{Error, Result};

/// Fault name → corrective tag
///
/// Keyed by fault name alone: the same fault seen in different tests maps
/// to the same corrective. Faults without an entry contribute no tag.
pub const FAULT_TAGS: &[(&str, &str)] = &[
    ("heels_lift", "fix_heels_lift"),
    ("heel_lift", "fix_heels_lift"),
    ("excessive_pronation", "fix_heels_lift"),
    ("excessive_supination", "fix_heels_lift"),
    ("ankle_instability", "fix_heels_lift"),
    ("knee_valgus", "fix_knee_valgus"),
    ("knee_instability", "fix_knee_valgus"),
    ("excessive_forward_lean", "fix_forward_lean"),
    ("forward_head", "fix_forward_lean"),
    ("bar_drifts_forward", "fix_thoracic_stiffness"),
    ("arms_fall_forward", "fix_thoracic_stiffness"),
    ("shoulder_mobility_restriction_suspected", "fix_thoracic_stiffness"),
    ("excessive_gap", "fix_thoracic_stiffness"),
    ("spine_flexion", "fix_thoracic_stiffness"),
    ("scapular_winging", "fix_thoracic_stiffness"),
    ("rib_flare", "fix_rib_flare"),
    ("lumbar_extension_sway_back", "fix_lumbar_extension"),
    ("excessive_lumbar_extension", "fix_lumbar_extension"),
    ("sagging_hips", "fix_lumbar_extension"),
    ("anterior_tilt", "fix_lumbar_extension"),
    ("excessive_rotation", "fix_rotary_instability"),
    ("lumbar_shift", "fix_rotary_instability"),
    ("unable_to_complete", "fix_rotary_instability"),
    ("asymmetrical_movement", "fix_asymmetry"),
    ("asymmetry_present", "fix_asymmetry"),
    ("left_side_deficit", "fix_asymmetry"),
    ("right_side_deficit", "fix_asymmetry"),
    ("unequal_weight_distribution", "fix_asymmetry"),
    ("uneven_arm_push", "fix_asymmetry"),
    ("lateral_shift", "fix_asymmetry"),
    ("toe_drag", "pattern_step"),
    ("pelvic_drop_trendelenburg", "pattern_step"),
    ("knee_misses_board", "pattern_lunge"),
    ("lt_60_hip_flexion", "pattern_hinge"),
    ("hamstring_restriction", "pattern_hinge"),
];

/// Pattern tag used by the fallback when no pattern test was weak
const DEFAULT_FALLBACK_TAG: &str = "pattern_squat";

/// Corrective tag for a fault, if any
pub fn tag_for_fault(fault: &str) -> Option<&'static str> {
    FAULT_TAGS
        .iter()
        .find(|(f, _)| *f == fault)
        .map(|(_, tag)| *tag)
}

/// Check the fault→tag table against fault sheets and tag vocabulary
pub fn validate_fault_tags() -> Result<()> {
    let mut seen = BTreeSet::new();
    for (fault, tag) in FAULT_TAGS {
        if !seen.insert(*fault) {
            return Err(Error::Configuration(format!(
                "fault '{}' mapped more than once",
                fault
            )));
        }
        let in_some_sheet = MovementTest::ALL.iter().any(|t| {
            t.vocabulary()
                .iter()
                .any(|(_, faults)| faults.contains(fault))
        });
        if !in_some_sheet {
            return Err(Error::Configuration(format!(
                "fault '{}' is not in any fault sheet",
                fault
            )));
        }
        let in_vocabulary =
            catalog::CORRECTIVE_TAGS.contains(tag) || catalog::PATTERN_TAGS.contains(tag);
        if !in_vocabulary {
            return Err(Error::Configuration(format!(
                "fault '{}' maps to tag '{}' outside vocabulary version {}",
                fault,
                tag,
                catalog::VOCABULARY_VERSION
            )));
        }
    }
    Ok(())
}

/// Tags to match against the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagQuery {
    pub target_level: TargetLevel,
    pub tags: BTreeSet<String>,
    /// Pattern tags from weak pattern tests, used by the fallback
    pub pattern_tags: BTreeSet<String>,
}

impl TagQuery {
    /// Query containing only the level tag
    pub fn for_level(target_level: TargetLevel) -> Self {
        let mut tags = BTreeSet::new();
        tags.insert(target_level.level_tag());
        Self {
            target_level,
            tags,
            pattern_tags: BTreeSet::new(),
        }
    }
}

/// Build the tag query for a triaged profile
pub fn build_query(
    target_level: TargetLevel,
    views: &[TestView],
    scores: &EffectiveScores,
    config: &ScoringConfig,
) -> TagQuery {
    let mut query = TagQuery::for_level(target_level);

    for view in views {
        for reading in view.faults_above(config.presence_threshold) {
            if let Some(tag) = tag_for_fault(reading.fault) {
                query.tags.insert(tag.to_string());
            }
        }
    }

    for test in MovementTest::ALL {
        if let Some(tag) = test.pattern_tag() {
            if scores[test] <= Score::TWO {
                query.tags.insert(tag.to_string());
                query.pattern_tags.insert(tag.to_string());
            }
        }
    }

    debug!(
        target_level = target_level.value(),
        tags = ?query.tags,
        "Candidate query built"
    );
    query
}

/// One shortlisted exercise
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedCandidate {
    pub name: String,
    pub difficulty_level: u8,
    pub match_score: u32,
    pub matched_tags: Vec<String>,
    pub tags: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RankedCandidate {
    fn new(entry: &CatalogEntry, match_score: u32, matched_tags: Vec<String>) -> Self {
        Self {
            name: entry.name.clone(),
            difficulty_level: entry.difficulty_level,
            match_score,
            matched_tags,
            tags: entry.tags.clone(),
            category: entry.category.clone(),
            description: entry.description.clone(),
        }
    }

    /// First corrective tag matched, else first matched tag
    pub fn primary_tag(&self) -> Option<&str> {
        self.matched_tags
            .iter()
            .find(|t| catalog::is_corrective(t))
            .or_else(|| self.matched_tags.first())
            .map(String::as_str)
    }
}

/// Ranked output, at most `shortlist_size` entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Shortlist {
    pub candidates: Vec<RankedCandidate>,
    pub query_tags: Vec<String>,
    /// Ranking matched nothing; candidates come from the pattern fallback
    pub fallback_used: bool,
}

impl Shortlist {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Rank catalog entries at the query's level
///
/// Never fails: an empty catalog or no matches yields an empty shortlist.
pub fn rank(query: &TagQuery, catalog: &Catalog, config: &CandidateConfig) -> Shortlist {
    let level = query.target_level.value();

    let mut ranked: Vec<RankedCandidate> = catalog
        .entries_at(level)
        .filter_map(|entry| {
            let matched: Vec<String> = entry
                .tags
                .iter()
                .filter(|t| query.tags.contains(*t))
                .cloned()
                .collect();
            if matched.is_empty() {
                return None;
            }
            let bonus = if matched.iter().any(|t| catalog::is_corrective(t)) {
                config.corrective_bonus
            } else {
                0
            };
            let score = matched.len() as u32 + bonus;
            Some(RankedCandidate::new(entry, score, matched))
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.match_score
            .cmp(&a.match_score)
            .then_with(|| a.name.cmp(&b.name))
    });
    ranked.truncate(config.shortlist_size);

    let fallback_used = ranked.is_empty();
    if fallback_used {
        ranked = fallback(query, catalog, config);
        debug!(
            target_level = level,
            found = ranked.len(),
            "No tag matches, using pattern fallback"
        );
    }

    Shortlist {
        candidates: ranked,
        query_tags: query.tags.iter().cloned().collect(),
        fallback_used,
    }
}

fn fallback(query: &TagQuery, catalog: &Catalog, config: &CandidateConfig) -> Vec<RankedCandidate> {
    let pattern_tags: Vec<&str> = if query.pattern_tags.is_empty() {
        vec![DEFAULT_FALLBACK_TAG]
    } else {
        query.pattern_tags.iter().map(String::as_str).collect()
    };

    let mut found: Vec<RankedCandidate> = catalog
        .entries_at(query.target_level.value())
        .filter_map(|entry| {
            let matched: Vec<String> = pattern_tags
                .iter()
                .filter(|t| entry.has_tag(t))
                .map(|t| t.to_string())
                .collect();
            if matched.is_empty() {
                None
            } else {
                Some(RankedCandidate::new(entry, 0, matched))
            }
        })
        .collect();

    found.sort_by(|a, b| a.name.cmp(&b.name));
    found.truncate(config.shortlist_size);
    found
}
