//! HTTP API handlers for fmsc-cs

pub mod assess;
pub mod assessments;
pub mod catalog;
pub mod health;
pub mod score;

pub use assess::{assess_routes, AssessResponse};
pub use assessments::assessment_routes;
pub use catalog::catalog_routes;
pub use health::health_routes;
pub use score::score_routes;
