//! HTTP API integration tests
//!
//! Router driven with `oneshot` against an in-memory SQLite pool.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use fmsc_common::{Catalog, CatalogEntry, CoachConfig, MovementTest};
use fmsc_cs::catalog_store::CatalogStore;
use fmsc_cs::plan::TemplatePlanWriter;
use fmsc_cs::{build_router, AppState};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;

fn sample_catalog() -> Catalog {
    Catalog::new(vec![
        CatalogEntry::new("Dead Bug", 3, &["fix_rotary_instability", "level_3"]),
        CatalogEntry::new("Heel Elevated Goblet Squat", 7, &["fix_heels_lift"]),
        CatalogEntry::new("Front Squat", 7, &["pattern_squat", "level_7"]),
        CatalogEntry::new("Box Jump", 9, &["pattern_squat", "level_9"]),
    ])
    .unwrap()
}

async fn test_app_with(catalog: Catalog, catalog_path: &Path) -> Router {
    let db_pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
    fmsc_cs::db::init_tables(&db_pool).await.unwrap();

    let state = AppState::new(
        db_pool,
        CatalogStore::new(catalog, catalog_path),
        CoachConfig::default(),
        Arc::new(TemplatePlanWriter),
    );
    build_router(state)
}

async fn test_app() -> Router {
    test_app_with(sample_catalog(), Path::new("/nonexistent/catalog.json")).await
}

/// Screening form with every test at `score` and no faults
fn form(score: u8) -> Value {
    let mut value = json!({});
    for test in MovementTest::ALL {
        value[test.as_str()] = json!({ "score": score });
    }
    value
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_health() {
    let app = test_app().await;
    let (status, body) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "fmsc-cs");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_assess_perfect_profile() {
    let app = test_app().await;
    let (status, body) = send(&app, "POST", "/assess", Some(form(3))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cached"], false);
    assert_eq!(body["triage"]["tier"], "POWER");
    assert_eq!(body["triage"]["target_level"], 9);
    assert_eq!(body["shortlist"]["candidates"][0]["name"], "Box Jump");
    assert_eq!(body["plan"]["difficulty_color"], "Green");
    assert_eq!(body["plan"]["exercises"][0]["name"], "Box Jump");
}

#[tokio::test]
async fn test_assess_heel_lift_prioritises_corrective() {
    let app = test_app().await;
    let mut profile = form(3);
    profile["overhead_squat"]["feet"] = json!({ "heels_lift": 2 });

    let (status, body) = send(&app, "POST", "/assess", Some(profile)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["triage"]["tier"], "STRENGTH");
    assert_eq!(body["triage"]["effective_scores"]["overhead_squat"], 2);
    assert_eq!(
        body["shortlist"]["candidates"][0]["name"],
        "Heel Elevated Goblet Squat"
    );
    assert_eq!(body["flagged_faults"][0]["fault"], "heels_lift");
    assert_eq!(body["warnings"][0]["kind"], "partial_data");
}

#[tokio::test]
async fn test_assess_second_request_is_cached() {
    let app = test_app().await;

    let (_, first) = send(&app, "POST", "/assess", Some(form(2))).await;
    let (status, second) = send(&app, "POST", "/assess", Some(form(2))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["cached"], false);
    assert_eq!(second["cached"], true);
    assert_eq!(first["assessment_id"], second["assessment_id"]);
    assert_eq!(first["triage"], second["triage"]);
}

#[tokio::test]
async fn test_assess_pain_returns_referral() {
    let app = test_app().await;
    let mut profile = form(3);
    profile["hurdle_step"]["pain"] = json!({ "pain_reported": 1 });

    let (status, body) = send(&app, "POST", "/assess", Some(profile)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["triage"]["referral_required"], true);
    assert_eq!(body["triage"]["effective_scores"]["hurdle_step"], 0);
    assert_eq!(body["plan"]["session_title"], "Medical Referral Required");
    assert_eq!(body["plan"]["difficulty_color"], "Red");
    assert_eq!(body["plan"]["exercises"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_assess_unknown_test_is_422() {
    let app = test_app().await;
    let mut profile = form(3);
    profile["deep_squat"] = json!({ "score": 3 });

    let (status, body) = send(&app, "POST", "/assess", Some(profile)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "CONFIGURATION_ERROR");
}

#[tokio::test]
async fn test_assess_severity_out_of_range_is_400() {
    let app = test_app().await;
    let mut profile = form(3);
    profile["overhead_squat"]["feet"] = json!({ "heels_lift": 9 });

    let (status, body) = send(&app, "POST", "/assess", Some(profile)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_assess_malformed_body_is_400() {
    let app = test_app().await;
    let request = Request::builder()
        .method("POST")
        .uri("/assess")
        .header("content-type", "application/json")
        .body(Body::from("{ not json"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_score_single_test() {
    let app = test_app().await;
    let request = json!({
        "test": "overhead_squat",
        "faults": { "feet": { "heels_lift": 2 } },
        "pain_reported": false
    });

    let (status, body) = send(&app, "POST", "/score", Some(request)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["score"], 2);
    assert_eq!(body["fired_rule"], "heel_elevation");
    assert_eq!(body["partial_data"], true);
}

#[tokio::test]
async fn test_score_pain_is_zero() {
    let app = test_app().await;
    let request = json!({ "test": "rotary_stability", "pain_reported": true });

    let (status, body) = send(&app, "POST", "/score", Some(request)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["score"], 0);
    assert_eq!(body["fired_rule"], "pain_reported");
}

#[tokio::test]
async fn test_score_pain_group_dominates_faults() {
    let app = test_app().await;
    let request = json!({
        "test": "shoulder_mobility",
        "faults": {
            "pain": { "pain_reported": 2 },
            "reach_quality": { "hands_within_fist_distance": 1 }
        }
    });

    let (status, body) = send(&app, "POST", "/score", Some(request)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["score"], 0);
    assert_eq!(body["fired_rule"], "pain_reported");
}

#[tokio::test]
async fn test_score_unknown_test_is_422() {
    let app = test_app().await;
    let request = json!({ "test": "deep_squat", "faults": {} });

    let (status, body) = send(&app, "POST", "/score", Some(request)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "CONFIGURATION_ERROR");
}

#[tokio::test]
async fn test_get_assessment_round_trip() {
    let app = test_app().await;
    let (_, created) = send(&app, "POST", "/assess", Some(form(2))).await;
    let id = created["assessment_id"].as_str().unwrap().to_string();

    let (status, body) = send(&app, "GET", &format!("/assessments/{}", id), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["assessment_id"], id.as_str());
    assert_eq!(body["triage"], created["triage"]);
    assert_eq!(body["plan"], created["plan"]);
    assert_eq!(body["input_profile"]["overhead_squat"]["score"], 2);
}

#[tokio::test]
async fn test_get_missing_assessment_is_404() {
    let app = test_app().await;
    let uri = format!("/assessments/{}", uuid::Uuid::new_v4());

    let (status, body) = send(&app, "GET", &uri, None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_catalog_summary() {
    let app = test_app().await;
    let (status, body) = send(&app, "GET", "/catalog", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entries"], 4);
    assert_eq!(body["levels"]["7"], 2);
    assert_eq!(body["generation"], 0);
}

#[tokio::test]
async fn test_catalog_reload_swaps_and_clears_cache() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(
        br#"{"vocabulary_version": 2, "exercises": [
            {"name": "Kettlebell Swing", "difficulty_level": 9, "tags": ["pattern_hinge", "level_9"]}
        ]}"#,
    )
    .unwrap();

    let app = test_app_with(sample_catalog(), file.path()).await;
    let (_, before) = send(&app, "POST", "/assess", Some(form(3))).await;
    assert_eq!(before["shortlist"]["candidates"][0]["name"], "Box Jump");

    let (status, summary) = send(&app, "POST", "/catalog/reload", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["entries"], 1);
    assert_eq!(summary["generation"], 1);

    let (_, after) = send(&app, "POST", "/assess", Some(form(3))).await;
    assert_eq!(after["cached"], false);
    assert_eq!(after["shortlist"]["candidates"][0]["name"], "Kettlebell Swing");
}

#[tokio::test]
async fn test_catalog_reload_failure_keeps_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app_with(sample_catalog(), &dir.path().join("missing.json")).await;

    let (status, _) = send(&app, "POST", "/catalog/reload", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (_, summary) = send(&app, "GET", "/catalog", None).await;
    assert_eq!(summary["entries"], 4);
}
