//! Credential issuance

use std::sync::Arc;

use common::Secret;
use tracing::{info, instrument};

use crate::error::IssueError;
use crate::hasher::Hasher;
use crate::store::{CredentialRecord, CredentialStore};
use crate::token::{CompositeToken, generate_subject_id};

/// Turns a provider access token into a stored credential.
pub struct CredentialIssuer {
    hasher: Hasher,
    store: Arc<dyn CredentialStore>,
}

impl CredentialIssuer {
    pub fn new(hasher: Hasher, store: Arc<dyn CredentialStore>) -> Self {
        Self { hasher, store }
    }

    /// Issue a credential for `access_token`.
    ///
    /// Order is fixed:
    /// 1. `secret = H(access_token)`
    /// 2. `subject_id = hex(12 random bytes)`
    /// 3. `secret_hash = H(secret)`
    /// 4. insert `{subject_id, secret_hash}`
    /// 5. return `subject_id.secret`
    ///
    /// Exactly one insert per success. If the insert fails no token is
    /// returned, so nothing is ever handed out that the store does not hold.
    #[instrument(skip_all)]
    pub async fn issue(&self, access_token: &Secret<String>) -> Result<CompositeToken, IssueError> {
        let secret = Secret::new(self.hasher.hash_blocking(access_token.expose()).await?);
        let subject_id = generate_subject_id();
        let secret_hash = self.hasher.hash_blocking(secret.expose()).await?;

        self.store
            .insert(&CredentialRecord {
                subject_id: subject_id.clone(),
                secret_hash,
            })
            .await?;

        info!(subject_id, "issued credential");
        Ok(CompositeToken::compose(&subject_id, secret.expose()))
    }
}
