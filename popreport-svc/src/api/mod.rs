//! HTTP API handlers for popreport-svc

use axum::Json;
use serde::Serialize;

pub mod auth;
pub mod collection;
pub mod health;
pub mod import;
pub mod pop_report;

pub use auth::{auth_middleware, verify_password};
pub use collection::{get_artists, get_stats};
pub use health::health_routes;
pub use import::import_records;
pub use pop_report::{get_item_types, get_pop_report};

/// Successful response: `{"success": true, ...body}`
#[derive(Debug, Serialize)]
pub struct Success<T> {
    pub success: bool,
    #[serde(flatten)]
    pub body: T,
}

impl<T: Serialize> Success<T> {
    pub fn json(body: T) -> Json<Self> {
        Json(Self {
            success: true,
            body,
        })
    }
}

/// Body carrying a single `data` field
#[derive(Debug, Serialize)]
pub struct Data<T> {
    pub data: T,
}
