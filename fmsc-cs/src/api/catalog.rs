//! Catalog summary and reload

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use fmsc_common::Catalog;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::ApiResult;
use crate::AppState;

/// GET /catalog response
#[derive(Debug, Serialize)]
pub struct CatalogSummary {
    pub vocabulary_version: u32,
    pub entries: usize,
    /// Entry count per difficulty level
    pub levels: BTreeMap<u8, usize>,
    pub generation: u64,
    pub path: String,
}

fn summarize(state: &AppState, catalog: &Catalog) -> CatalogSummary {
    CatalogSummary {
        vocabulary_version: catalog.vocabulary_version,
        entries: catalog.len(),
        levels: catalog.level_counts(),
        generation: state.catalog.generation(),
        path: state.catalog.path().display().to_string(),
    }
}

/// GET /catalog
pub async fn get_catalog(State(state): State<AppState>) -> Json<CatalogSummary> {
    let catalog = state.catalog.snapshot();
    Json(summarize(&state, &catalog))
}

/// POST /catalog/reload
///
/// The running snapshot is kept if the file fails to load or validate.
pub async fn reload_catalog(State(state): State<AppState>) -> ApiResult<Json<CatalogSummary>> {
    let catalog = state.catalog.reload_from_disk()?;
    state.cache.clear();
    Ok(Json(summarize(&state, &catalog)))
}

/// Build catalog routes
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/catalog", get(get_catalog))
        .route("/catalog/reload", post(reload_catalog))
}
