//! Error types for credential operations

/// Errors from the credential hasher.
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("hashing salt is not configured")]
    MissingSalt,

    #[error("hashing salt is malformed: {0}")]
    MalformedSalt(String),

    #[error("hash iteration count must be greater than 0")]
    InvalidIterations,

    #[error("hashing task failed: {0}")]
    Worker(String),
}

/// Errors from the record store behind `CredentialStore`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record store request failed: {0}")]
    Http(String),

    #[error("record store rejected operation: {0}")]
    Rejected(String),

    #[error("invalid record store response: {0}")]
    InvalidResponse(String),
}

/// Errors from issuing a credential. No token exists when one of these occurs.
#[derive(Debug, thiserror::Error)]
pub enum IssueError {
    #[error(transparent)]
    Hash(#[from] HashError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors from validating or revoking a presented credential.
///
/// The first five variants are authorization rejections. `UnknownCredential`
/// and `CredentialMismatch` share one message so a caller cannot tell an
/// unknown subject from a wrong secret. `Store` and `Hash` are server faults
/// and must never be reported as rejections.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing Authorization header")]
    MissingHeader,

    #[error("Invalid Authorization Type")]
    InvalidScheme,

    #[error("malformed credential")]
    MalformedToken,

    #[error("HDB Token Error")]
    UnknownCredential,

    #[error("HDB Token Error")]
    CredentialMismatch,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Hash(#[from] HashError),
}

impl AuthError {
    /// Whether this is a rejection of the presented credential (401-class)
    /// rather than a server fault.
    pub fn is_unauthorized(&self) -> bool {
        !matches!(self, AuthError::Store(_) | AuthError::Hash(_))
    }

    /// Metric label. Unknown subject and wrong secret are deliberately
    /// reported under one label.
    pub fn outcome(&self) -> &'static str {
        match self {
            AuthError::MissingHeader => "missing_header",
            AuthError::InvalidScheme => "invalid_scheme",
            AuthError::MalformedToken => "malformed_token",
            AuthError::UnknownCredential | AuthError::CredentialMismatch => "rejected",
            AuthError::Store(_) | AuthError::Hash(_) => "error",
        }
    }
}
