//! Credential persistence seam
//!
//! The core reads and writes credential records only through
//! `CredentialStore`. The production implementation lives in the service and
//! translates these calls into record-store operations; `MemoryCredentialStore`
//! is the in-process implementation the core's tests run against.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::StoreError;

/// Persisted credential. Attribute names on the wire are `user` and `token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// Unique key: 24 hex characters
    #[serde(rename = "user")]
    pub subject_id: String,
    /// `H(secret)`, hex-encoded
    #[serde(rename = "token")]
    pub secret_hash: String,
}

/// Storage operations the credential core consumes.
///
/// Uniqueness of `subject_id` is the store's job; callers never check for a
/// collision before `insert`.
pub trait CredentialStore: Send + Sync {
    fn insert<'a>(
        &'a self,
        record: &'a CredentialRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>>;

    /// Zero or more records whose key equals `subject_id`.
    fn search_by_key<'a>(
        &'a self,
        subject_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<CredentialRecord>, StoreError>> + Send + 'a>>;

    fn delete<'a>(
        &'a self,
        subject_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>>;
}

/// In-process store keyed by subject id.
#[derive(Default)]
pub struct MemoryCredentialStore {
    records: Mutex<HashMap<String, CredentialRecord>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn get(&self, subject_id: &str) -> Option<CredentialRecord> {
        self.records.lock().await.get(subject_id).cloned()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn insert<'a>(
        &'a self,
        record: &'a CredentialRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>> {
        Box::pin(async move {
            let mut records = self.records.lock().await;
            records.insert(record.subject_id.clone(), record.clone());
            debug!(subject_id = %record.subject_id, "inserted credential record");
            Ok(())
        })
    }

    fn search_by_key<'a>(
        &'a self,
        subject_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<CredentialRecord>, StoreError>> + Send + 'a>> {
        Box::pin(async move {
            let records = self.records.lock().await;
            Ok(records.get(subject_id).cloned().into_iter().collect())
        })
    }

    fn delete<'a>(
        &'a self,
        subject_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>> {
        Box::pin(async move {
            let mut records = self.records.lock().await;
            if records.remove(subject_id).is_some() {
                debug!(subject_id, "deleted credential record");
            }
            Ok(())
        })
    }
}

/// Store wrappers shared by the issuer/validator/revocation tests.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

    /// Counts every operation and can be told to fail.
    #[derive(Default)]
    pub struct RecordingStore {
        pub inner: MemoryCredentialStore,
        pub inserts: AtomicU64,
        pub searches: AtomicU64,
        pub deletes: AtomicU64,
        pub fail_inserts: AtomicBool,
        pub fail_searches: AtomicBool,
    }

    impl RecordingStore {
        pub fn mutations(&self) -> u64 {
            self.inserts.load(Ordering::SeqCst) + self.deletes.load(Ordering::SeqCst)
        }
    }

    impl CredentialStore for RecordingStore {
        fn insert<'a>(
            &'a self,
            record: &'a CredentialRecord,
        ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>> {
            Box::pin(async move {
                if self.fail_inserts.load(Ordering::SeqCst) {
                    return Err(StoreError::Rejected("insert refused".into()));
                }
                self.inserts.fetch_add(1, Ordering::SeqCst);
                self.inner.insert(record).await
            })
        }

        fn search_by_key<'a>(
            &'a self,
            subject_id: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<CredentialRecord>, StoreError>> + Send + 'a>>
        {
            Box::pin(async move {
                if self.fail_searches.load(Ordering::SeqCst) {
                    return Err(StoreError::Http("connection refused".into()));
                }
                self.searches.fetch_add(1, Ordering::SeqCst);
                self.inner.search_by_key(subject_id).await
            })
        }

        fn delete<'a>(
            &'a self,
            subject_id: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>> {
            Box::pin(async move {
                self.deletes.fetch_add(1, Ordering::SeqCst);
                self.inner.delete(subject_id).await
            })
        }
    }
}
