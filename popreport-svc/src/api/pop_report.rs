//! Population report endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::Success;
use crate::error::ApiResult;
use crate::report::PopReport;
use crate::AppState;

/// `?term=` (or legacy `?artist=`) plus optional `?itemType=`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopReportQuery {
    #[serde(alias = "artist")]
    pub term: Option<String>,
    pub item_type: Option<String>,
}

/// GET /api/pop-report
pub async fn get_pop_report(
    State(state): State<AppState>,
    Query(query): Query<PopReportQuery>,
) -> ApiResult<Json<Success<PopReport>>> {
    let term = query.term.unwrap_or_default();
    let report = state
        .service
        .run_pop_report(&term, query.item_type.as_deref())
        .await?;

    Ok(Success::json(report))
}

#[derive(Debug, Serialize)]
pub struct ItemTypes {
    pub term: String,
    pub data: Vec<String>,
}

/// GET /api/item-types
pub async fn get_item_types(
    State(state): State<AppState>,
    Query(query): Query<PopReportQuery>,
) -> ApiResult<Json<Success<ItemTypes>>> {
    let term = query.term.unwrap_or_default();
    let types = state.service.available_item_types(&term).await?;

    Ok(Success::json(ItemTypes {
        term: term.trim().to_string(),
        data: types.into_iter().collect(),
    }))
}
