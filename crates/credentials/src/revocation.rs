//! Credential revocation (logout)

use std::sync::Arc;

use tracing::{info, instrument};

use crate::error::AuthError;
use crate::hasher::{Hasher, digests_match};
use crate::store::CredentialStore;
use crate::token::PresentedCredential;

/// Result of a revocation attempt. Both variants are successes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevocationOutcome {
    /// The presented secret matched and the record was deleted
    Revoked,
    /// Nothing matched; the store was not touched
    NothingToRevoke,
}

impl RevocationOutcome {
    /// Metric label
    pub fn label(&self) -> &'static str {
        match self {
            RevocationOutcome::Revoked => "revoked",
            RevocationOutcome::NothingToRevoke => "nothing_to_revoke",
        }
    }
}

/// Deletes a credential once the presenter proves they hold its secret.
pub struct RevocationHandler {
    hasher: Hasher,
    store: Arc<dyn CredentialStore>,
}

impl RevocationHandler {
    pub fn new(hasher: Hasher, store: Arc<dyn CredentialStore>) -> Self {
        Self { hasher, store }
    }

    /// Revoke the credential in a raw `Authorization` header value.
    ///
    /// Header errors are returned as-is. An unknown subject or a wrong secret
    /// is not an error: the call succeeds with `NothingToRevoke` and performs
    /// no store mutation, so logout looks idempotent.
    #[instrument(skip_all)]
    pub async fn revoke(&self, header: Option<&str>) -> Result<RevocationOutcome, AuthError> {
        let presented = PresentedCredential::parse(header)?;
        let records = self.store.search_by_key(presented.subject_id).await?;
        if records.is_empty() {
            return Ok(RevocationOutcome::NothingToRevoke);
        }

        let expected = self.hasher.hash_blocking(presented.secret).await?;
        let mut outcome = RevocationOutcome::NothingToRevoke;
        for record in &records {
            if digests_match(&expected, &record.secret_hash) {
                self.store.delete(&record.subject_id).await?;
                outcome = RevocationOutcome::Revoked;
            }
        }

        if outcome == RevocationOutcome::Revoked {
            info!(subject_id = presented.subject_id, "revoked credential");
        }
        Ok(outcome)
    }
}
