//! # FMSC Common Library
//!
//! Movement-screen triage engine shared by the coach service:
//! - Fault-sheet data model for the seven screening tests
//! - Rule table and fault-to-score calculator
//! - Score resolution (automatic vs. manual)
//! - Triage classifier (training tier and target level)
//! - Exercise catalog and corrective candidate ranking
//! - Configuration loading
//!
//! Everything here is synchronous and side-effect free apart from the
//! explicit file loaders in `config` and `catalog`.

pub mod assessment;
pub mod calculator;
pub mod candidates;
pub mod catalog;
pub mod config;
pub mod error;
pub mod profile;
pub mod resolver;
pub mod rules;
pub mod triage;

pub use assessment::{assess, Assessment};
pub use catalog::{Catalog, CatalogEntry};
pub use config::CoachConfig;
pub use error::{Error, Result, Warning};
pub use profile::{MovementProfile, MovementTest, Score};
pub use triage::{TargetLevel, Tier, TriageResult};
