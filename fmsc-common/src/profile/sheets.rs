//! Per-test fault sheets
//!
//! One struct per anatomical category, one sheet per test. Field names are
//! the screening form's keys; severities default to 0 when omitted. A
//! category that is omitted entirely is `None` and reported as missing.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::{FaultReading, MovementTest, Severity, Vocabulary};

/// Test-specific fault sheet
pub trait FaultSheet {
    /// Test this sheet belongs to
    const TEST: MovementTest;

    /// Known categories and their faults, in form order
    const VOCABULARY: Vocabulary;

    /// Readings for every known field of every present category
    fn readings(&self) -> Vec<FaultReading<'static>>;

    /// Categories absent from the input
    fn missing_categories(&self) -> Vec<&'static str>;

    /// Input keys outside the vocabulary (`category` or `category.fault`)
    fn unknown_keys(&self) -> Vec<String>;
}

macro_rules! fault_category {
    ($(#[$meta:meta])* $name:ident { $($fault:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        pub struct $name {
            $(
                #[serde(default)]
                pub $fault: Severity,
            )+
            /// Keys outside the vocabulary; never scored
            #[serde(flatten, skip_serializing_if = "BTreeMap::is_empty")]
            pub unknown: BTreeMap<String, Value>,
        }

        impl $name {
            pub const FAULTS: &'static [&'static str] = &[$(stringify!($fault)),+];

            pub(crate) fn push_readings(
                &self,
                category: &'static str,
                out: &mut Vec<FaultReading<'static>>,
            ) {
                $(
                    out.push(FaultReading {
                        category,
                        fault: stringify!($fault),
                        severity: self.$fault,
                    });
                )+
            }
        }
    };
}

macro_rules! fault_sheet {
    ($(#[$meta:meta])* $name:ident for $test:ident { $($category:ident: $ty:ty),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        pub struct $name {
            $(
                #[serde(default, skip_serializing_if = "Option::is_none")]
                pub $category: Option<$ty>,
            )+
            /// Categories outside the vocabulary; never scored
            #[serde(flatten, skip_serializing_if = "BTreeMap::is_empty")]
            pub unknown: BTreeMap<String, Value>,
        }

        impl FaultSheet for $name {
            const TEST: MovementTest = MovementTest::$test;
            const VOCABULARY: Vocabulary = &[$((stringify!($category), <$ty>::FAULTS)),+];

            fn readings(&self) -> Vec<FaultReading<'static>> {
                let mut out = Vec::new();
                $(
                    if let Some(group) = &self.$category {
                        group.push_readings(stringify!($category), &mut out);
                    }
                )+
                out
            }

            fn missing_categories(&self) -> Vec<&'static str> {
                let mut missing = Vec::new();
                $(
                    if self.$category.is_none() {
                        missing.push(stringify!($category));
                    }
                )+
                missing
            }

            fn unknown_keys(&self) -> Vec<String> {
                let mut keys: Vec<String> = self.unknown.keys().cloned().collect();
                $(
                    if let Some(group) = &self.$category {
                        keys.extend(
                            group
                                .unknown
                                .keys()
                                .map(|k| format!("{}.{}", stringify!($category), k)),
                        );
                    }
                )+
                keys
            }
        }
    };
}

fault_category!(
    /// Pain during or after the test (any test may carry it)
    PainGroup { no_pain, pain_reported }
);

// Overhead squat

fault_category!(OsTrunkTorso {
    upright_torso,
    excessive_forward_lean,
    rib_flare,
    lumbar_flexion,
    lumbar_extension_sway_back,
});

fault_category!(OsLowerLimb {
    knees_track_over_toes,
    knee_valgus,
    knee_varus,
    uneven_depth,
});

fault_category!(OsFeet {
    heels_stay_down,
    heels_lift,
    excessive_pronation,
    excessive_supination,
});

fault_category!(OsUpperBodyBarPosition {
    bar_aligned_over_mid_foot,
    bar_drifts_forward,
    arms_fall_forward,
    shoulder_mobility_restriction_suspected,
});

fault_category!(OsBalance { loss_of_balance });

fault_sheet!(
    /// Overhead (deep) squat
    OverheadSquatFaults for OverheadSquat {
        trunk_torso: OsTrunkTorso,
        lower_limb: OsLowerLimb,
        feet: OsFeet,
        upper_body_bar_position: OsUpperBodyBarPosition,
        balance: OsBalance,
    }
);

// Hurdle step

fault_category!(HsPelvisCoreControl {
    pelvis_stable,
    pelvic_drop_trendelenburg,
    excessive_rotation,
    loss_of_balance,
});

fault_category!(HsStanceLeg {
    knee_stable,
    knee_valgus,
    knee_varus,
    ankle_instability,
});

fault_category!(HsSteppingLeg {
    clears_hurdle_smoothly,
    toe_drag,
    hip_flexion_restriction,
    asymmetrical_movement,
});

fault_sheet!(
    /// Hurdle step
    HurdleStepFaults for HurdleStep {
        pelvis_core_control: HsPelvisCoreControl,
        stance_leg: HsStanceLeg,
        stepping_leg: HsSteppingLeg,
    }
);

// Inline lunge

fault_category!(IlAlignment {
    head_neutral,
    forward_head,
    trunk_upright,
    excessive_forward_lean,
    lateral_shift,
});

fault_category!(IlLowerBodyControl {
    knee_tracks_over_foot,
    knee_valgus,
    knee_instability,
    heel_lift,
    knee_misses_board,
});

fault_category!(IlBalanceStability {
    stable_throughout,
    wobbling,
    loss_of_balance,
    unequal_weight_distribution,
});

fault_sheet!(
    /// Inline lunge
    InlineLungeFaults for InlineLunge {
        alignment: IlAlignment,
        lower_body_control: IlLowerBodyControl,
        balance_stability: IlBalanceStability,
    }
);

// Shoulder mobility

fault_category!(SmReachQuality {
    hands_within_fist_distance,
    hands_within_hand_length,
    excessive_gap,
    asymmetry_present,
});

fault_category!(SmCompensation {
    no_compensation,
    spine_flexion,
    rib_flare,
    scapular_winging,
});

fault_sheet!(
    /// Shoulder mobility reach
    ShoulderMobilityFaults for ShoulderMobility {
        reach_quality: SmReachQuality,
        compensation: SmCompensation,
    }
);

// Active straight-leg raise

fault_category!(AslrNonMovingLeg {
    remains_flat,
    knee_bends,
    hip_externally_rotates,
    foot_lifts_off_floor,
});

fault_category!(AslrMovingLeg {
    gt_80_hip_flexion,
    between_60_80_hip_flexion,
    lt_60_hip_flexion,
    hamstring_restriction,
});

fault_category!(AslrPelvicControl {
    pelvis_stable,
    anterior_tilt,
    posterior_tilt,
});

fault_sheet!(
    /// Active straight-leg raise
    ActiveStraightLegRaiseFaults for ActiveStraightLegRaise {
        non_moving_leg: AslrNonMovingLeg,
        moving_leg: AslrMovingLeg,
        pelvic_control: AslrPelvicControl,
    }
);

// Trunk-stability push-up

fault_category!(TspBodyAlignment {
    neutral_spine_maintained,
    sagging_hips,
    pike_position,
});

fault_category!(TspCoreControl {
    initiates_as_one_unit,
    hips_lag,
    excessive_lumbar_extension,
});

fault_category!(TspUpperBody {
    elbows_aligned,
    uneven_arm_push,
    shoulder_instability,
});

fault_sheet!(
    /// Trunk-stability push-up
    TrunkStabilityPushupFaults for TrunkStabilityPushup {
        body_alignment: TspBodyAlignment,
        core_control: TspCoreControl,
        upper_body: TspUpperBody,
    }
);

// Rotary stability

fault_category!(RsDiagonalPattern {
    smooth_controlled,
    loss_of_balance,
    unable_to_complete,
});

fault_category!(RsSpinalControl {
    neutral_maintained,
    excessive_rotation,
    lumbar_shift,
});

fault_category!(RsSymmetry {
    symmetrical,
    left_side_deficit,
    right_side_deficit,
});

fault_sheet!(
    /// Rotary stability (quadruped diagonal)
    RotaryStabilityFaults for RotaryStability {
        diagonal_pattern: RsDiagonalPattern,
        spinal_control: RsSpinalControl,
        symmetry: RsSymmetry,
    }
);
