//! Error types for OAuth provider operations

/// Errors from the authorization-code round trip.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("invalid token response: {0}")]
    InvalidResponse(String),

    #[error("authorization code missing from callback")]
    MissingCode,

    #[error("invalid or expired OAuth state")]
    InvalidState,

    #[error("authorization denied by provider: {0}")]
    AuthorizationDenied(String),

    #[error("invalid provider URL: {0}")]
    InvalidUrl(String),
}

/// Result alias for OAuth operations.
pub type Result<T> = std::result::Result<T, Error>;
