//! Credential validation gate

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::error::AuthError;
use crate::hasher::{Hasher, digests_match};
use crate::principal::Principal;
use crate::store::CredentialStore;
use crate::token::PresentedCredential;

/// Checks presented credentials before any protected operation.
pub struct CredentialValidator {
    hasher: Hasher,
    store: Arc<dyn CredentialStore>,
}

impl CredentialValidator {
    pub fn new(hasher: Hasher, store: Arc<dyn CredentialStore>) -> Self {
        Self { hasher, store }
    }

    /// Validate a raw `Authorization` header value.
    ///
    /// Parse, look up the subject, recompute `H(secret)` and compare with the
    /// stored hash in constant time. Only the first record returned for the
    /// subject is considered.
    #[instrument(skip_all)]
    pub async fn validate(&self, header: Option<&str>) -> Result<Principal, AuthError> {
        let presented = PresentedCredential::parse(header)?;
        let records = self.store.search_by_key(presented.subject_id).await?;
        let expected = self.hasher.hash_blocking(presented.secret).await?;

        let Some(record) = records.first() else {
            debug!(subject_id = presented.subject_id, "credential rejected");
            return Err(AuthError::UnknownCredential);
        };

        if !digests_match(&expected, &record.secret_hash) {
            debug!(subject_id = presented.subject_id, "credential rejected");
            return Err(AuthError::CredentialMismatch);
        }

        debug!(subject_id = presented.subject_id, "credential accepted");
        Ok(Principal::super_user(presented.subject_id))
    }
}
