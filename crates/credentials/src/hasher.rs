//! Credential hashing
//!
//! `H(x) = hex(PBKDF2-HMAC-SHA512(x, salt, iterations, 64 bytes))`.
//!
//! The salt is one value per deployment, not per record: the validator has to
//! recompute `H(secret)` from nothing but the presented secret, so the salt
//! must be fixed. Changing the salt or iteration count invalidates every
//! credential issued so far.

use std::sync::Arc;
use std::time::Instant;

use common::Secret;
use sha2::Sha512;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::error::HashError;

/// Default PBKDF2 iteration count.
pub const HASH_ITERATIONS: u32 = 100_000;

/// Derived key length in bytes (hex output is twice as long).
pub const DIGEST_LEN: usize = 64;

/// Shortest salt accepted, in bytes.
pub const MIN_SALT_LEN: usize = 16;

/// Deterministic keyed one-way hash. Cheap to clone.
#[derive(Clone)]
pub struct Hasher {
    salt: Arc<Secret<String>>,
    iterations: u32,
}

impl std::fmt::Debug for Hasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hasher")
            .field("salt", &"[REDACTED]")
            .field("iterations", &self.iterations)
            .finish()
    }
}

impl Hasher {
    /// Build a hasher, refusing to exist without a usable salt.
    ///
    /// `None`, an empty/whitespace salt, a salt shorter than `MIN_SALT_LEN`
    /// bytes, or zero iterations are all errors. There is no fallback salt.
    pub fn new(salt: Option<Secret<String>>, iterations: u32) -> Result<Self, HashError> {
        let salt = salt.ok_or(HashError::MissingSalt)?;
        let value = salt.expose();
        if value.trim().is_empty() {
            return Err(HashError::MissingSalt);
        }
        if value.len() < MIN_SALT_LEN {
            return Err(HashError::MalformedSalt(format!(
                "must be at least {MIN_SALT_LEN} bytes, got {}",
                value.len()
            )));
        }
        if iterations == 0 {
            return Err(HashError::InvalidIterations);
        }
        Ok(Self {
            salt: Arc::new(salt),
            iterations,
        })
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Hash on the current thread.
    pub fn hash(&self, input: &[u8]) -> String {
        let started = Instant::now();
        let mut derived = Zeroizing::new([0u8; DIGEST_LEN]);
        pbkdf2::pbkdf2_hmac::<Sha512>(
            input,
            self.salt.expose().as_bytes(),
            self.iterations,
            derived.as_mut_slice(),
        );
        metrics::histogram!("hdb_oauth_hash_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        hex::encode(derived.as_slice())
    }

    /// Hash on the blocking pool so request tasks are not stalled by the
    /// key derivation.
    pub async fn hash_blocking(&self, input: &str) -> Result<String, HashError> {
        let hasher = self.clone();
        let input = Zeroizing::new(input.as_bytes().to_vec());
        tokio::task::spawn_blocking(move || hasher.hash(&input))
            .await
            .map_err(|e| HashError::Worker(e.to_string()))
    }
}

/// Compare two hex digests in constant time.
///
/// Run time does not depend on the position of the first differing byte.
/// Digests of different lengths never match; lengths are not secret since
/// every digest this crate produces is `2 * DIGEST_LEN` characters.
pub fn digests_match(expected: &str, stored: &str) -> bool {
    expected.as_bytes().ct_eq(stored.as_bytes()).into()
}
