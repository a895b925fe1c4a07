//! Integration tests for popreport-svc API endpoints
//!
//! Each test runs against its own in-memory database with password gating
//! disabled; see security_tests.rs for the gated router.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use popreport_common::db::init_memory_database;
use popreport_svc::store::SqliteRecordStore;
use popreport_svc::{build_router, AppState};
use serde_json::{json, Value};
use tower::util::ServiceExt; // for `oneshot` method

/// Test helper: router over an empty in-memory database
async fn setup_app() -> Router {
    let pool = init_memory_database()
        .await
        .expect("Should open in-memory database");
    build_router(AppState::new(SqliteRecordStore::new(pool), None))
}

/// Test helper: router preloaded with the sample catalog
async fn setup_loaded_app() -> Router {
    let app = setup_app().await;
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/import", &sample_records()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    app
}

fn sample_records() -> Value {
    json!([
        {"artistPopReport": "Prince", "albumPopReport": "1999", "Grade_PopReport": "7",
         "Type_PopReport": "Sealed", "ToySeries": "Vinyl"},
        {"artistPopReport": "Prince", "albumPopReport": "1999", "Grade_PopReport": "Authentic",
         "Type_PopReport": "Sealed", "ToySeries": "Vinyl"},
        {"artistPopReport": "Prince", "albumPopReport": "Purple Rain", "Grade_PopReport": "9",
         "Type_PopReport": "Open", "ToySeries": "CD", "Variation_PopReport": "Remaster"},
        {"artistPopReport": "The Beatles", "albumPopReport": "Abbey Road", "Grade_PopReport": 8,
         "Type_PopReport": "open"},
        {"albumPopReport": "Sign * Times", "Grade_PopReport": "6", "Type_PopReport": "Open"},
        {"Grade_PopReport": "5", "Type_PopReport": "Open"}
    ])
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = setup_app().await;

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "popreport-svc");
    assert!(body["version"].is_string());
    assert!(body["uptimeSeconds"].is_u64());
}

// =============================================================================
// Import
// =============================================================================

#[tokio::test]
async fn test_import_reports_breakdown() {
    let app = setup_app().await;

    let response = app
        .oneshot(json_request("POST", "/api/import", &sample_records()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["mode"], "replace");
    assert_eq!(body["data"]["inserted"], 5);
    assert_eq!(body["data"]["breakdown"]["total"], 6);
    assert_eq!(body["data"]["breakdown"]["rejected"], 1);
    assert_eq!(body["data"]["breakdown"]["missingIdentity"], 1);
    assert_eq!(body["data"]["breakdown"]["samples"][0]["index"], 5);
}

#[tokio::test]
async fn test_import_append_mode() {
    let app = setup_loaded_app().await;

    let extra = json!([{"artist": "Prince", "album": "Controversy", "grade": 4, "itemType": "Open"}]);
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/import?mode=append", &extra))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["data"]["mode"], "append");
    assert_eq!(body["data"]["removed"], 0);

    let response = app.oneshot(get("/api/stats")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["data"]["totalItems"], 6);
}

#[tokio::test]
async fn test_import_rejects_non_array_body() {
    let app = setup_app().await;

    let response = app
        .oneshot(json_request("POST", "/api/import", &json!({"artist": "Prince"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

// =============================================================================
// Pop report
// =============================================================================

#[tokio::test]
async fn test_pop_report_prince() {
    let app = setup_loaded_app().await;

    let response = app.oneshot(get("/api/pop-report?term=Prince")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["term"], "Prince");
    assert_eq!(body["count"], 3);
    assert_eq!(body["authentic"], 1);

    let albums = body["data"].as_array().unwrap();
    assert_eq!(albums.len(), 2);
    assert_eq!(albums[0]["album"], "1999");
    assert_eq!(albums[0]["totalItems"], 2);
    assert_eq!(albums[0]["grades"]["7"], 1);
    assert_eq!(albums[0]["grades"]["10"], 0);
    assert_eq!(albums[1]["album"], "Purple Rain");
    assert_eq!(albums[1]["series"][0]["series"], "CD");
    assert_eq!(albums[1]["series"][0]["variations"][0]["variation"], "Remaster");
}

#[tokio::test]
async fn test_pop_report_item_type_filter() {
    let app = setup_loaded_app().await;

    let response = app
        .oneshot(get("/api/pop-report?term=prince&itemType=sealed"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;

    assert_eq!(body["itemType"], "Sealed");
    assert_eq!(body["count"], 2);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_pop_report_legacy_artist_parameter() {
    let app = setup_loaded_app().await;

    let response = app.oneshot(get("/api/pop-report?artist=Beatles")).await.unwrap();
    let body = extract_json(response.into_body()).await;

    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["artist"], "The Beatles");
}

#[tokio::test]
async fn test_pop_report_literal_special_characters() {
    let app = setup_loaded_app().await;

    let response = app.oneshot(get("/api/pop-report?term=%2A")).await.unwrap();
    let body = extract_json(response.into_body()).await;

    assert_eq!(body["count"], 1);
    assert!(body["data"][0]["artist"].is_null());
    assert_eq!(body["data"][0]["album"], "Sign * Times");
}

#[tokio::test]
async fn test_pop_report_blank_term_is_bad_request() {
    let app = setup_loaded_app().await;

    for uri in ["/api/pop-report", "/api/pop-report?term=", "/api/pop-report?term=%20%20"] {
        let response = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);

        let body = extract_json(response.into_body()).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "INVALID_QUERY");
    }
}

#[tokio::test]
async fn test_pop_report_no_match_is_empty() {
    let app = setup_loaded_app().await;

    let response = app.oneshot(get("/api/pop-report?term=Nobody")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["count"], 0);
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn test_item_types_for_term() {
    let app = setup_loaded_app().await;

    let response = app.oneshot(get("/api/item-types?term=Prince")).await.unwrap();
    let body = extract_json(response.into_body()).await;

    assert_eq!(body["term"], "Prince");
    assert_eq!(body["data"], json!(["Open", "Sealed"]));
}

// =============================================================================
// Collection
// =============================================================================

#[tokio::test]
async fn test_artists_sorted() {
    let app = setup_loaded_app().await;

    let response = app.oneshot(get("/api/artists")).await.unwrap();
    let body = extract_json(response.into_body()).await;

    assert_eq!(body["success"], true);
    assert_eq!(body["data"], json!(["Prince", "The Beatles"]));
}

#[tokio::test]
async fn test_stats() {
    let app = setup_loaded_app().await;

    let response = app.oneshot(get("/api/stats")).await.unwrap();
    let body = extract_json(response.into_body()).await;

    assert_eq!(body["data"]["totalItems"], 5);
    assert_eq!(body["data"]["totalArtists"], 2);
    assert_eq!(body["data"]["totalAlbums"], 4);
    assert_eq!(body["data"]["gradeDistribution"][0]["count"], 1);
    assert_eq!(body["data"]["itemTypes"][0]["itemType"], "Open");
    assert_eq!(body["data"]["itemTypes"][0]["count"], 3);
}

// =============================================================================
// Static files
// =============================================================================

#[tokio::test]
async fn test_static_assets_fallback() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>Pop Report</h1>").unwrap();

    let pool = init_memory_database().await.unwrap();
    let state = AppState::new(SqliteRecordStore::new(pool), None)
        .with_static_assets(Some(dir.path().to_path_buf()));
    let app = build_router(state);

    let response = app.clone().oneshot(get("/index.html")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"<h1>Pop Report</h1>");

    // API routes still win over the fallback
    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
