//! Exercise catalog
//!
//! Read-only reference data, ingested offline. Accepted on disk either as a
//! bare JSON array of entries or as
//! `{"vocabulary_version": N, "exercises": [...]}`.
//!
//! Tags carry one of three prefixes the scorer understands: `fix_`
//! (corrective), `pattern_` (generic movement pattern) and `level_`
//! (difficulty). Any other tag is descriptive and ignored for ranking.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::info;

use crate::{Error, Result};

/// Tag vocabulary version this build understands
pub const VOCABULARY_VERSION: u32 = 2;

/// Corrective tags (`fix_*`)
pub const CORRECTIVE_TAGS: &[&str] = &[
    "fix_heels_lift",
    "fix_knee_valgus",
    "fix_forward_lean",
    "fix_thoracic_stiffness",
    "fix_lumbar_extension",
    "fix_rib_flare",
    "fix_rotary_instability",
    "fix_asymmetry",
];

/// Generic pattern tags (`pattern_*`)
pub const PATTERN_TAGS: &[&str] = &[
    "pattern_squat",
    "pattern_step",
    "pattern_lunge",
    "pattern_hinge",
];

pub const MIN_LEVEL: u8 = 1;
pub const MAX_LEVEL: u8 = 10;

/// True for tags in the `fix_` namespace
pub fn is_corrective(tag: &str) -> bool {
    tag.starts_with("fix_")
}

/// Level encoded by a `level_N` tag
fn parse_level_tag(tag: &str) -> Option<u8> {
    tag.strip_prefix("level_")?.parse().ok()
}

/// Whether a prefixed tag belongs to the vocabulary
///
/// Unprefixed tags are descriptive and always accepted.
pub fn is_known_tag(tag: &str) -> bool {
    if is_corrective(tag) {
        CORRECTIVE_TAGS.contains(&tag)
    } else if tag.starts_with("pattern_") {
        PATTERN_TAGS.contains(&tag)
    } else if tag.starts_with("level_") {
        parse_level_tag(tag).is_some_and(|l| (MIN_LEVEL..=MAX_LEVEL).contains(&l))
    } else {
        true
    }
}

/// One exercise
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(alias = "exercise_name")]
    pub name: String,

    pub difficulty_level: u8,

    #[serde(default)]
    pub tags: BTreeSet<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CatalogEntry {
    pub fn new(name: &str, difficulty_level: u8, tags: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            difficulty_level,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            category: None,
            description: None,
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    Versioned {
        vocabulary_version: u32,
        exercises: Vec<CatalogEntry>,
    },
    Bare(Vec<CatalogEntry>),
}

/// Validated, immutable exercise catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Catalog {
    pub vocabulary_version: u32,
    pub entries: Vec<CatalogEntry>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::empty()
    }
}

impl Catalog {
    /// Catalog with no entries (valid; ranks to an empty shortlist)
    pub fn empty() -> Self {
        Self {
            vocabulary_version: VOCABULARY_VERSION,
            entries: Vec::new(),
        }
    }

    /// Normalize and validate entries at the current vocabulary version
    pub fn new(entries: Vec<CatalogEntry>) -> Result<Self> {
        Self::with_version(VOCABULARY_VERSION, entries)
    }

    /// Normalize and validate entries tagged against `vocabulary_version`
    pub fn with_version(vocabulary_version: u32, entries: Vec<CatalogEntry>) -> Result<Self> {
        if vocabulary_version > VOCABULARY_VERSION {
            return Err(Error::MalformedCatalog(format!(
                "vocabulary version {} is newer than supported version {}",
                vocabulary_version, VOCABULARY_VERSION
            )));
        }

        let entries = entries
            .into_iter()
            .map(|mut e| {
                e.name = e.name.trim().to_string();
                e.tags = e.tags.iter().map(|t| t.trim().to_lowercase()).collect();
                e
            })
            .collect();

        let catalog = Self {
            vocabulary_version,
            entries,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Parse JSON text (bare array or versioned object)
    pub fn from_json_str(content: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(content)
            .map_err(|e| Error::MalformedCatalog(format!("invalid catalog JSON: {}", e)))?;

        match file {
            CatalogFile::Versioned {
                vocabulary_version,
                exercises,
            } => Self::with_version(vocabulary_version, exercises),
            CatalogFile::Bare(entries) => Self::new(entries),
        }
    }

    /// Load from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let catalog = Self::from_json_str(&content)?;
        info!(
            path = %path.display(),
            entries = catalog.len(),
            version = catalog.vocabulary_version,
            "Exercise catalog loaded"
        );
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries at exactly `level`, in catalog order
    pub fn entries_at(&self, level: u8) -> impl Iterator<Item = &CatalogEntry> {
        self.entries
            .iter()
            .filter(move |e| e.difficulty_level == level)
    }

    /// Entry count per difficulty level
    pub fn level_counts(&self) -> BTreeMap<u8, usize> {
        let mut counts = BTreeMap::new();
        for entry in &self.entries {
            *counts.entry(entry.difficulty_level).or_insert(0) += 1;
        }
        counts
    }

    /// Structural checks
    pub fn validate(&self) -> Result<()> {
        let mut names = BTreeSet::new();

        for entry in &self.entries {
            if entry.name.is_empty() {
                return Err(Error::MalformedCatalog(
                    "entry with empty name".to_string(),
                ));
            }
            if !names.insert(entry.name.as_str()) {
                return Err(Error::MalformedCatalog(format!(
                    "duplicate entry '{}'",
                    entry.name
                )));
            }
            if !(MIN_LEVEL..=MAX_LEVEL).contains(&entry.difficulty_level) {
                return Err(Error::MalformedCatalog(format!(
                    "'{}': difficulty level {} out of range [{}, {}]",
                    entry.name, entry.difficulty_level, MIN_LEVEL, MAX_LEVEL
                )));
            }
            for tag in &entry.tags {
                if !is_known_tag(tag) {
                    return Err(Error::MalformedCatalog(format!(
                        "'{}': tag '{}' is not in vocabulary version {}",
                        entry.name, tag, self.vocabulary_version
                    )));
                }
                if let Some(level) = parse_level_tag(tag) {
                    if level != entry.difficulty_level {
                        return Err(Error::MalformedCatalog(format!(
                            "'{}': tag '{}' contradicts difficulty level {}",
                            entry.name, tag, entry.difficulty_level
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}
