//! End-to-end assessment pipeline
//!
//! Profile → resolver → triage → candidate scorer. The result is the
//! hand-off to the plan writer; the writer may describe it but never alters
//! scores or tiers.

use serde::Serialize;
use tracing::debug;

use crate::candidates::{build_query, rank, tag_for_fault, Shortlist};
use crate::catalog::Catalog;
use crate::config::CoachConfig;
use crate::profile::{MovementProfile, MovementTest, Severity};
use crate::resolver::{resolve, ResolutionMode, ResolvedTest};
use crate::rules;
use crate::triage::{classify, TriageResult};
use crate::{Result, Warning};

/// A fault observed above the presence threshold
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlaggedFault {
    pub test: MovementTest,
    pub category: &'static str,
    pub fault: &'static str,
    pub severity: Severity,
}

/// Everything the plan writer receives
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assessment {
    pub triage: TriageResult,
    pub shortlist: Shortlist,
    pub flagged_faults: Vec<FlaggedFault>,
    pub details: Vec<ResolvedTest>,
    pub warnings: Vec<Warning>,
}

/// Run the full pipeline for one profile
pub fn assess(
    profile: &MovementProfile,
    catalog: &Catalog,
    config: &CoachConfig,
) -> Result<Assessment> {
    let mode = ResolutionMode::from_flag(profile.use_manual_scores);
    let resolution = resolve(profile, mode, &config.scoring)?;
    let triage = classify(&resolution.scores, &resolution.pain_tests());

    let views = profile.views();
    let query = build_query(
        triage.target_level,
        &views,
        &resolution.scores,
        &config.scoring,
    );
    let shortlist = rank(&query, catalog, &config.candidates);

    let flagged_faults: Vec<FlaggedFault> = views
        .iter()
        .flat_map(|view| {
            let cascade = rules::cascade(view.test);
            view.faults_above(config.scoring.presence_threshold)
                .filter(move |r| {
                    cascade.penalizes(r.category, r.fault) || tag_for_fault(r.fault).is_some()
                })
                .map(move |r| FlaggedFault {
                    test: view.test,
                    category: r.category,
                    fault: r.fault,
                    severity: r.severity,
                })
        })
        .collect();

    let mut warnings = resolution.warnings;
    if shortlist.is_empty() {
        warnings.push(Warning::EmptyShortlist {
            target_level: triage.target_level.value(),
        });
    }

    debug!(
        tier = %triage.tier,
        shortlisted = shortlist.candidates.len(),
        flagged = flagged_faults.len(),
        warnings = warnings.len(),
        "Assessment complete"
    );

    Ok(Assessment {
        triage,
        shortlist,
        flagged_faults,
        details: resolution.details,
        warnings,
    })
}
