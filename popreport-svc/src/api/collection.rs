//! Whole-collection listings

use axum::{extract::State, Json};

use crate::api::{Data, Success};
use crate::error::ApiResult;
use crate::service::CollectionStats;
use crate::AppState;

/// GET /api/artists
pub async fn get_artists(State(state): State<AppState>) -> ApiResult<Json<Success<Data<Vec<String>>>>> {
    let artists = state.service.artists().await?;
    Ok(Success::json(Data { data: artists }))
}

/// GET /api/stats
pub async fn get_stats(State(state): State<AppState>) -> ApiResult<Json<Success<Data<CollectionStats>>>> {
    let stats = state.service.stats().await?;
    Ok(Success::json(Data { data: stats }))
}
