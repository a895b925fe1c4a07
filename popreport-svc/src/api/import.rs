//! Raw record import endpoint

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use crate::api::{Data, Success};
use crate::error::{ApiError, ApiResult};
use crate::service::{IngestMode, IngestSummary};
use crate::AppState;

/// Largest accepted import body
pub const IMPORT_BODY_LIMIT: usize = 64 * 1024 * 1024;

#[derive(Debug, Default, Deserialize)]
pub struct ImportQuery {
    #[serde(default)]
    pub mode: IngestMode,
}

/// POST /api/import?mode=replace|append
///
/// Body is a JSON array of raw records.
pub async fn import_records(
    State(state): State<AppState>,
    Query(query): Query<ImportQuery>,
    body: Result<Json<Vec<Value>>, JsonRejection>,
) -> ApiResult<Json<Success<Data<IngestSummary>>>> {
    let Json(raws) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let summary = state.service.ingest(&raws, query.mode).await?;
    Ok(Success::json(Data { data: summary }))
}
