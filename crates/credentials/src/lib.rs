//! Opaque credential issuance and validation
//!
//! Turns a provider access token into a bearer credential the record-store
//! API accepts, and checks that credential on every protected request.
//!
//! Credential lifecycle:
//! 1. `CredentialIssuer::issue()` derives `secret = H(access_token)`, picks a
//!    random 24-hex `subject_id`, stores `{subject_id, H(secret)}` and hands
//!    `subject_id.secret` to the client exactly once
//! 2. `CredentialValidator::validate()` parses `harperdb subject_id.secret`,
//!    looks the record up, recomputes `H(secret)` and compares in constant time
//! 3. `RevocationHandler::revoke()` does the same check and deletes on match
//!
//! `H` is PBKDF2-HMAC-SHA512 with the deployment salt (see `hasher`). Neither
//! the access token nor the secret is ever persisted. Records never expire on
//! their own; revocation is the only way out.

pub mod error;
pub mod hasher;
pub mod issuer;
pub mod principal;
pub mod revocation;
pub mod store;
pub mod token;
pub mod validator;

pub use error::{AuthError, HashError, IssueError, StoreError};
pub use hasher::Hasher;
pub use issuer::CredentialIssuer;
pub use principal::Principal;
pub use revocation::{RevocationHandler, RevocationOutcome};
pub use store::{CredentialRecord, CredentialStore, MemoryCredentialStore};
pub use token::{CompositeToken, PresentedCredential, SCHEME};
pub use validator::CredentialValidator;
