//! HarperDB operations API client
//!
//! Every operation is a JSON `POST` to the operations URL with HTTP Basic
//! auth. The body names the operation:
//!
//! ```json
//! {"operation": "search_by_hash", "schema": "hdb_auth", "table": "tokens",
//!  "hash_values": ["..."], "get_attributes": ["user", "token"]}
//! ```
//!
//! Non-2xx responses carry `{"error": "..."}`, which becomes the
//! `StoreError::Rejected` message. No call is retried.

use common::Secret;
use credentials::StoreError;
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

#[derive(Clone)]
pub struct RecordStore {
    http: reqwest::Client,
    url: String,
    username: String,
    password: Option<Secret<String>>,
}

impl RecordStore {
    pub fn new(
        http: reqwest::Client,
        url: String,
        username: String,
        password: Option<Secret<String>>,
    ) -> Self {
        Self {
            http,
            url,
            username,
            password,
        }
    }

    pub async fn create_schema(&self, schema: &str) -> Result<Value, StoreError> {
        self.operation(json!({
            "operation": "create_schema",
            "schema": schema,
        }))
        .await
    }

    pub async fn create_table(
        &self,
        schema: &str,
        table: &str,
        hash_attribute: &str,
    ) -> Result<Value, StoreError> {
        self.operation(json!({
            "operation": "create_table",
            "schema": schema,
            "table": table,
            "hash_attribute": hash_attribute,
        }))
        .await
    }

    pub async fn insert(
        &self,
        schema: &str,
        table: &str,
        records: Vec<Value>,
    ) -> Result<Value, StoreError> {
        self.operation(json!({
            "operation": "insert",
            "schema": schema,
            "table": table,
            "records": records,
        }))
        .await
    }

    /// Records whose hash attribute is one of `hash_values`.
    ///
    /// `get_attributes` of `["*"]` returns every attribute.
    pub async fn search_by_hash(
        &self,
        schema: &str,
        table: &str,
        hash_values: &[&str],
        get_attributes: &[&str],
    ) -> Result<Vec<Value>, StoreError> {
        let response = self
            .operation(json!({
                "operation": "search_by_hash",
                "schema": schema,
                "table": table,
                "hash_values": hash_values,
                "get_attributes": get_attributes,
            }))
            .await?;

        match response {
            Value::Array(records) => Ok(records),
            other => Err(StoreError::InvalidResponse(format!(
                "search_by_hash returned {other}, expected an array"
            ))),
        }
    }

    pub async fn delete(
        &self,
        schema: &str,
        table: &str,
        hash_values: &[&str],
    ) -> Result<Value, StoreError> {
        self.operation(json!({
            "operation": "delete",
            "schema": schema,
            "table": table,
            "hash_values": hash_values,
        }))
        .await
    }

    #[instrument(skip_all, fields(operation = %body["operation"].as_str().unwrap_or_default()))]
    async fn operation(&self, body: Value) -> Result<Value, StoreError> {
        let response = self
            .http
            .post(&self.url)
            .basic_auth(&self.username, self.password.as_ref().map(|p| p.expose()))
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v["error"].as_str().map(str::to_owned))
                .unwrap_or(text);
            warn!(status = status.as_u16(), error = %message, "record store rejected operation");
            return Err(StoreError::Rejected(format!("{status}: {message}")));
        }

        debug!(status = status.as_u16(), "record store operation succeeded");
        serde_json::from_str(&text).map_err(|e| StoreError::InvalidResponse(e.to_string()))
    }
}
