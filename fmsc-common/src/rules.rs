//! Per-test scoring cascades
//!
//! Each screening test's decision tree is data: optional tier rules that set
//! a base score from positive markers, ceiling rules that cap the score when
//! any listed fault is present, and step-down faults that lower the final
//! score by one. The calculator interprets these tables; editing the
//! protocol means editing this file only.
//!
//! Ceilings are listed from most lenient to most severe. A later rule can
//! only lower a score, never raise it.

use crate::profile::{MovementTest, Score};
use crate::{Error, Result};

/// Reference to one `category.fault` of a test's vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultRef {
    pub category: &'static str,
    pub fault: &'static str,
}

const fn f(category: &'static str, fault: &'static str) -> FaultRef {
    FaultRef { category, fault }
}

/// Base score granted when a positive marker is present
#[derive(Debug, Clone, Copy)]
pub struct TierRule {
    pub marker: FaultRef,
    pub score: Score,
}

/// Cap applied when any listed fault is present
#[derive(Debug, Clone, Copy)]
pub struct CeilingRule {
    pub label: &'static str,
    pub cap: Score,
    pub faults: &'static [FaultRef],
}

/// Decision tree for one test
#[derive(Debug)]
pub struct Cascade {
    /// First matching tier sets the base score. Empty means base 3.
    pub tiers: &'static [TierRule],
    /// Base score when tiers exist but none matched
    pub floor: Score,
    pub ceilings: &'static [CeilingRule],
    /// Any of these present lowers the result one step (saturating at 0)
    pub step_down: &'static [FaultRef],
}

impl Cascade {
    /// Every fault reference in this cascade
    pub fn fault_refs(&self) -> impl Iterator<Item = &FaultRef> {
        self.tiers
            .iter()
            .map(|t| &t.marker)
            .chain(self.ceilings.iter().flat_map(|c| c.faults.iter()))
            .chain(self.step_down.iter())
    }

    /// Whether `category.fault` can lower a score (ceiling or step-down)
    pub fn penalizes(&self, category: &str, fault: &str) -> bool {
        let matches = |r: &FaultRef| r.category == category && r.fault == fault;
        self.ceilings
            .iter()
            .any(|c| c.faults.iter().any(matches))
            || self.step_down.iter().any(matches)
    }
}

/// Label reported when a step-down fault fires
pub const STEP_DOWN_LABEL: &str = "asymmetry_or_compensation";

/// Label reported when no tier marker matched
pub const FLOOR_LABEL: &str = "below_tier_markers";

static OVERHEAD_SQUAT: Cascade = Cascade {
    tiers: &[],
    floor: Score::THREE,
    ceilings: &[
        CeilingRule {
            label: "trunk_alignment_or_knee_tracking",
            cap: Score::TWO,
            faults: &[
                f("trunk_torso", "excessive_forward_lean"),
                f("trunk_torso", "rib_flare"),
                f("trunk_torso", "lumbar_flexion"),
                f("trunk_torso", "lumbar_extension_sway_back"),
                f("lower_limb", "knee_valgus"),
                f("lower_limb", "knee_varus"),
                f("lower_limb", "uneven_depth"),
                f("feet", "excessive_pronation"),
                f("feet", "excessive_supination"),
                f("upper_body_bar_position", "bar_drifts_forward"),
                f("upper_body_bar_position", "arms_fall_forward"),
                f("upper_body_bar_position", "shoulder_mobility_restriction_suspected"),
            ],
        },
        CeilingRule {
            label: "heel_elevation",
            cap: Score::TWO,
            faults: &[f("feet", "heels_lift")],
        },
        CeilingRule {
            label: "loss_of_balance",
            cap: Score::ONE,
            faults: &[f("balance", "loss_of_balance")],
        },
    ],
    step_down: &[],
};

static HURDLE_STEP: Cascade = Cascade {
    tiers: &[],
    floor: Score::THREE,
    ceilings: &[
        CeilingRule {
            label: "stance_instability_or_pelvic_rotation",
            cap: Score::TWO,
            faults: &[
                f("stance_leg", "knee_valgus"),
                f("stance_leg", "knee_varus"),
                f("stance_leg", "ankle_instability"),
                f("pelvis_core_control", "excessive_rotation"),
                f("pelvis_core_control", "pelvic_drop_trendelenburg"),
                f("stepping_leg", "hip_flexion_restriction"),
                f("stepping_leg", "asymmetrical_movement"),
            ],
        },
        CeilingRule {
            label: "hurdle_contact_or_loss_of_balance",
            cap: Score::ONE,
            faults: &[
                f("stepping_leg", "toe_drag"),
                f("pelvis_core_control", "loss_of_balance"),
            ],
        },
    ],
    step_down: &[],
};

static INLINE_LUNGE: Cascade = Cascade {
    tiers: &[],
    floor: Score::THREE,
    ceilings: &[
        CeilingRule {
            label: "trunk_alignment_or_knee_tracking",
            cap: Score::TWO,
            faults: &[
                f("alignment", "forward_head"),
                f("alignment", "excessive_forward_lean"),
                f("alignment", "lateral_shift"),
                f("lower_body_control", "knee_valgus"),
                f("lower_body_control", "knee_instability"),
                f("balance_stability", "wobbling"),
                f("balance_stability", "unequal_weight_distribution"),
            ],
        },
        CeilingRule {
            label: "heel_elevation",
            cap: Score::TWO,
            faults: &[f("lower_body_control", "heel_lift")],
        },
        CeilingRule {
            label: "loss_of_balance_or_board_contact",
            cap: Score::ONE,
            faults: &[
                f("balance_stability", "loss_of_balance"),
                f("lower_body_control", "knee_misses_board"),
            ],
        },
    ],
    step_down: &[],
};

static SHOULDER_MOBILITY: Cascade = Cascade {
    tiers: &[
        TierRule {
            marker: f("reach_quality", "hands_within_fist_distance"),
            score: Score::THREE,
        },
        TierRule {
            marker: f("reach_quality", "hands_within_hand_length"),
            score: Score::TWO,
        },
    ],
    floor: Score::ONE,
    ceilings: &[],
    step_down: &[
        f("reach_quality", "asymmetry_present"),
        f("compensation", "spine_flexion"),
        f("compensation", "rib_flare"),
        f("compensation", "scapular_winging"),
    ],
};

static ACTIVE_STRAIGHT_LEG_RAISE: Cascade = Cascade {
    tiers: &[
        TierRule {
            marker: f("moving_leg", "gt_80_hip_flexion"),
            score: Score::THREE,
        },
        TierRule {
            marker: f("moving_leg", "between_60_80_hip_flexion"),
            score: Score::TWO,
        },
    ],
    floor: Score::ONE,
    ceilings: &[CeilingRule {
        label: "non_moving_leg_instability",
        cap: Score::ONE,
        faults: &[
            f("non_moving_leg", "knee_bends"),
            f("non_moving_leg", "hip_externally_rotates"),
            f("non_moving_leg", "foot_lifts_off_floor"),
        ],
    }],
    step_down: &[],
};

static TRUNK_STABILITY_PUSHUP: Cascade = Cascade {
    tiers: &[],
    floor: Score::THREE,
    ceilings: &[
        CeilingRule {
            label: "asymmetric_or_unstable_upper_body",
            cap: Score::TWO,
            faults: &[
                f("upper_body", "uneven_arm_push"),
                f("upper_body", "shoulder_instability"),
                f("core_control", "excessive_lumbar_extension"),
                f("body_alignment", "pike_position"),
            ],
        },
        CeilingRule {
            label: "hip_lag_or_sagging",
            cap: Score::ONE,
            faults: &[
                f("core_control", "hips_lag"),
                f("body_alignment", "sagging_hips"),
            ],
        },
    ],
    step_down: &[],
};

static ROTARY_STABILITY: Cascade = Cascade {
    tiers: &[],
    floor: Score::THREE,
    ceilings: &[
        CeilingRule {
            label: "imperfect_diagonal",
            cap: Score::TWO,
            faults: &[
                f("diagonal_pattern", "loss_of_balance"),
                f("spinal_control", "excessive_rotation"),
                f("spinal_control", "lumbar_shift"),
                f("symmetry", "left_side_deficit"),
                f("symmetry", "right_side_deficit"),
            ],
        },
        CeilingRule {
            label: "diagonal_incomplete",
            cap: Score::ONE,
            faults: &[f("diagonal_pattern", "unable_to_complete")],
        },
    ],
    step_down: &[],
};

/// Decision tree for `test`
pub fn cascade(test: MovementTest) -> &'static Cascade {
    match test {
        MovementTest::OverheadSquat => &OVERHEAD_SQUAT,
        MovementTest::HurdleStep => &HURDLE_STEP,
        MovementTest::InlineLunge => &INLINE_LUNGE,
        MovementTest::ShoulderMobility => &SHOULDER_MOBILITY,
        MovementTest::ActiveStraightLegRaise => &ACTIVE_STRAIGHT_LEG_RAISE,
        MovementTest::TrunkStabilityPushup => &TRUNK_STABILITY_PUSHUP,
        MovementTest::RotaryStability => &ROTARY_STABILITY,
    }
}

/// Check every cascade against the fault vocabulary and ordering rules
///
/// Called at service startup; a failure here means the tables and the
/// fault sheets have drifted apart.
pub fn validate() -> Result<()> {
    for test in MovementTest::ALL {
        let cascade = cascade(test);

        if let Some(r) = cascade
            .fault_refs()
            .find(|r| !test.knows_fault(r.category, r.fault))
        {
            return Err(Error::Configuration(format!(
                "{} cascade references unknown fault {}.{}",
                test, r.category, r.fault
            )));
        }

        if cascade.ceilings.windows(2).any(|w| w[1].cap > w[0].cap) {
            return Err(Error::Configuration(format!(
                "{} ceilings must be ordered from most lenient to most severe",
                test
            )));
        }

        if cascade.tiers.windows(2).any(|w| w[1].score > w[0].score) {
            return Err(Error::Configuration(format!(
                "{} tiers must be ordered from best to worst",
                test
            )));
        }

        if let Some(last) = cascade.tiers.last() {
            if cascade.floor > last.score {
                return Err(Error::Configuration(format!(
                    "{} floor {} exceeds lowest tier {}",
                    test, cascade.floor, last.score
                )));
            }
        }
    }
    Ok(())
}
