//! `CredentialStore` over the HarperDB operations API

use std::future::Future;
use std::pin::Pin;

use credentials::{CredentialRecord, CredentialStore, StoreError};

use crate::records::RecordStore;

/// Attributes fetched when looking a credential up.
const CREDENTIAL_ATTRIBUTES: &[&str] = &["user", "token"];

/// Hash attribute of the credential table.
pub const CREDENTIAL_KEY: &str = "user";

/// Credential records in one `schema.table`, keyed by `user`.
pub struct HarperCredentialStore {
    records: RecordStore,
    schema: String,
    table: String,
}

impl HarperCredentialStore {
    pub fn new(records: RecordStore, schema: String, table: String) -> Self {
        Self {
            records,
            schema,
            table,
        }
    }
}

impl CredentialStore for HarperCredentialStore {
    fn insert<'a>(
        &'a self,
        record: &'a CredentialRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>> {
        Box::pin(async move {
            let value = serde_json::to_value(record)
                .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;
            self.records
                .insert(&self.schema, &self.table, vec![value])
                .await?;
            Ok(())
        })
    }

    fn search_by_key<'a>(
        &'a self,
        subject_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<CredentialRecord>, StoreError>> + Send + 'a>> {
        Box::pin(async move {
            let found = self
                .records
                .search_by_hash(&self.schema, &self.table, &[subject_id], CREDENTIAL_ATTRIBUTES)
                .await?;
            found
                .into_iter()
                .map(|value| {
                    serde_json::from_value(value).map_err(|e| {
                        StoreError::InvalidResponse(format!("malformed credential record: {e}"))
                    })
                })
                .collect()
        })
    }

    fn delete<'a>(
        &'a self,
        subject_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>> {
        Box::pin(async move {
            self.records
                .delete(&self.schema, &self.table, &[subject_id])
                .await?;
            Ok(())
        })
    }
}
