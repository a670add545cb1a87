//! Record routes behind the credential gate
//!
//! Thin pass-throughs to the operations API. The validated `Principal` is in
//! the request extensions; responses are the record store's JSON.

use axum::Json;
use axum::extract::{Extension, Path, State};
use credentials::Principal;
use serde_json::Value;
use tracing::debug;

use crate::AppState;
use crate::error::ApiError;

/// Attribute the record store attaches to results; never returned to callers.
const HDB_USER_ATTRIBUTE: &str = "hdb_user";

/// Hash attribute of tables created through this API.
const RECORD_KEY: &str = "id";

pub async fn create_schema(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(schema): Path<String>,
) -> Result<Json<Value>, ApiError> {
    debug!(subject_id = %principal.subject_id, schema, "create schema");
    Ok(Json(state.records.create_schema(&schema).await?))
}

pub async fn create_table(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((schema, table)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    debug!(subject_id = %principal.subject_id, schema, table, "create table");
    Ok(Json(
        state
            .records
            .create_table(&schema, &table, RECORD_KEY)
            .await?,
    ))
}

/// Body is one record or an array of records.
pub async fn insert_records(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((schema, table)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let records = match body {
        Value::Array(records) => records,
        record => vec![record],
    };
    debug!(subject_id = %principal.subject_id, schema, table, count = records.len(), "insert records");
    Ok(Json(state.records.insert(&schema, &table, records).await?))
}

pub async fn get_record(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((schema, table, id)): Path<(String, String, String)>,
) -> Result<Json<Vec<Value>>, ApiError> {
    debug!(subject_id = %principal.subject_id, schema, table, id, "get record");
    let mut results = state
        .records
        .search_by_hash(&schema, &table, &[id.as_str()], &["*"])
        .await?;
    for result in &mut results {
        if let Some(record) = result.as_object_mut() {
            record.remove(HDB_USER_ATTRIBUTE);
        }
    }
    Ok(Json(results))
}
