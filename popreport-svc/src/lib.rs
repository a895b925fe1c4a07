//! popreport-svc library
//!
//! Grading population reports: raw record normalization, fuzzy artist/album
//! matching, hierarchical grade aggregation and the HTTP API around them.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub mod aggregator;
pub mod api;
pub mod error;
pub mod normalizer;
pub mod predicate;
pub mod report;
pub mod service;
pub mod store;

use service::PopReportService;
use store::SqliteRecordStore;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PopReportService<SqliteRecordStore>>,
    /// `None` disables password gating
    pub access_password: Option<String>,
    /// Folder served at `/`, if any
    pub static_assets: Option<PathBuf>,
    pub startup_time: Instant,
}

impl AppState {
    pub fn new(store: SqliteRecordStore, access_password: Option<String>) -> Self {
        Self {
            service: Arc::new(PopReportService::new(store)),
            access_password,
            static_assets: None,
            startup_time: Instant::now(),
        }
    }

    pub fn with_static_assets(mut self, dir: Option<PathBuf>) -> Self {
        self.static_assets = dir;
        self
    }
}

/// Build application router
///
/// `/health` and `/api/verify-password` are public; everything else under
/// `/api` goes through the password middleware.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};

    let protected = Router::new()
        .route("/api/pop-report", get(api::get_pop_report))
        .route("/api/item-types", get(api::get_item_types))
        .route("/api/artists", get(api::get_artists))
        .route("/api/stats", get(api::get_stats))
        .route(
            "/api/import",
            post(api::import_records).layer(DefaultBodyLimit::max(api::import::IMPORT_BODY_LIMIT)),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth_middleware,
        ));

    let public = Router::new()
        .route("/api/verify-password", post(api::verify_password))
        .merge(api::health_routes());

    let mut router = Router::new().merge(protected).merge(public);

    if let Some(dir) = state.static_assets.clone() {
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
