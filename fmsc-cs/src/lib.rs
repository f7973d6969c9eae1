//! fmsc-cs library - corrective session service
//!
//! HTTP front end for the movement-screen triage engine: assesses profiles,
//! writes sessions, persists assessments and serves the exercise catalog.

use axum::Router;
use fmsc_common::CoachConfig;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod cache;
pub mod catalog_store;
pub mod db;
pub mod error;
pub mod plan;

use api::AssessResponse;
use cache::ResponseCache;
use catalog_store::CatalogStore;
use plan::PlanWriter;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Current exercise catalog snapshot
    pub catalog: CatalogStore,
    /// `/assess` responses keyed by profile and catalog generation
    pub cache: Arc<ResponseCache<AssessResponse>>,
    pub config: Arc<CoachConfig>,
    pub plan_writer: Arc<dyn PlanWriter>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        catalog: CatalogStore,
        config: CoachConfig,
        plan_writer: Arc<dyn PlanWriter>,
    ) -> Self {
        Self {
            db,
            catalog,
            cache: Arc::new(ResponseCache::new(&config.cache)),
            config: Arc::new(config),
            plan_writer,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::assess_routes())
        .merge(api::score_routes())
        .merge(api::assessment_routes())
        .merge(api::catalog_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
