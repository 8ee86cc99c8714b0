//! Table operation handlers.
//!
//! Every handler answers with the operation's result object. The status code
//! follows the first fatal error in `errors`; warnings keep a 200.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use tablegate_core::entity::Record;
use tablegate_core::request::RequestOptions;
use tablegate_core::result::OperationError;
use tablegate_core::store::{errors_to_status_code, ContinuationToken, EntityQuery};

use crate::{handlers::AppError, state::AppState};

/// JSON body of a batch write.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    #[serde(default)]
    pub items: Vec<Record>,
    pub id_field: Option<String>,
}

/// Query parameters of a delimited-text batch.
#[derive(Debug, Default, Deserialize)]
pub struct DelimitedQuery {
    pub delimiter: Option<String>,
    pub headers: Option<String>,
}

/// Paging parameters of a query.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    #[serde(rename = "$filter")]
    pub filter: Option<String>,
    #[serde(rename = "$top")]
    pub top: Option<u32>,
    #[serde(rename = "$select")]
    pub select: Option<String>,
    pub nextpk: Option<String>,
    pub nextrk: Option<String>,
}

impl PageQuery {
    fn into_entity_query(self) -> EntityQuery {
        let mut query = EntityQuery {
            filter: self.filter.filter(|f| !f.trim().is_empty()),
            top: self.top,
            select: None,
            continuation: ContinuationToken::from_parts(
                self.nextpk.as_deref(),
                self.nextrk.as_deref(),
            ),
        };
        if let Some(select) = self.select.as_deref() {
            query = query.with_select(select);
        }
        query
    }
}

/// Table spec of the cross-table query endpoint.
#[derive(Debug, Deserialize)]
pub struct TableSpecQuery {
    pub table: String,
}

/// Serializes a result with the status derived from its errors.
fn respond<T: Serialize>(errors: &[OperationError], result: T) -> Response {
    let status =
        StatusCode::from_u16(errors_to_status_code(errors)).unwrap_or(StatusCode::BAD_GATEWAY);
    if !status.is_success() {
        tracing::warn!(status = %status, errors = errors.len(), "Operation failed");
    }
    (status, Json(result)).into_response()
}

// ============================================================================
// Batch writes
// ============================================================================

/// Write a batch of items (POST /api/tables/{table}/batch).
pub async fn batch_write(
    State(state): State<AppState>,
    Path(table): Path<String>,
    options: Result<Query<RequestOptions>, QueryRejection>,
    payload: Result<Json<BatchRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Query(options) = options?;
    let Json(payload) = payload?;

    let result = state
        .service
        .batch_write(
            &table,
            &options,
            &payload.items,
            payload.id_field.as_deref(),
        )
        .await;

    Ok(respond(&result.errors, &result))
}

/// Write a batch from delimited text (POST /api/tables/{table}/batch/csv).
pub async fn batch_write_csv(
    State(state): State<AppState>,
    Path(table): Path<String>,
    options: Result<Query<RequestOptions>, QueryRejection>,
    delimited: Result<Query<DelimitedQuery>, QueryRejection>,
    body: String,
) -> Result<Response, AppError> {
    let Query(options) = options?;
    let Query(delimited) = delimited?;

    let result = state
        .service
        .batch_write_from_delimited_text(
            &table,
            &options,
            &body,
            delimited.delimiter.as_deref(),
            delimited.headers.as_deref(),
        )
        .await;

    Ok(respond(&result.errors, &result))
}

// ============================================================================
// Queries
// ============================================================================

/// Query one table (GET /api/tables/{table}/items).
pub async fn query_items(
    State(state): State<AppState>,
    Path(table): Path<String>,
    options: Result<Query<RequestOptions>, QueryRejection>,
    page: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(options) = options?;
    let Query(page) = page?;

    let result = state
        .service
        .query(&table, &options, &page.into_entity_query())
        .await;

    Ok(respond(&result.errors, &result))
}

/// Query one or two tables named by `table=a,b` (GET /api/query).
pub async fn query_tables(
    State(state): State<AppState>,
    spec: Result<Query<TableSpecQuery>, QueryRejection>,
    options: Result<Query<RequestOptions>, QueryRejection>,
    page: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(spec) = spec?;
    let Query(options) = options?;
    let Query(page) = page?;

    let result = state
        .service
        .query(&spec.table, &options, &page.into_entity_query())
        .await;

    Ok(respond(&result.errors, &result))
}

// ============================================================================
// Single items
// ============================================================================

/// Insert or merge one item (PUT /api/tables/{table}/items/{id}).
pub async fn upsert_item(
    State(state): State<AppState>,
    Path((table, id)): Path<(String, String)>,
    options: Result<Query<RequestOptions>, QueryRejection>,
    record: Result<Json<Record>, JsonRejection>,
) -> Result<Response, AppError> {
    let Query(options) = options?;
    let Json(record) = record?;

    let result = state
        .service
        .upsert_item(&table, &options, Some(&id), &record)
        .await;

    Ok(respond(&result.errors, &result))
}

/// Delete one item (DELETE /api/tables/{table}/items/{id}).
pub async fn delete_item(
    State(state): State<AppState>,
    Path((table, id)): Path<(String, String)>,
    options: Result<Query<RequestOptions>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(options) = options?;

    let result = state.service.delete_item(&table, &options, &id).await;

    Ok(respond(&result.errors, &result))
}
