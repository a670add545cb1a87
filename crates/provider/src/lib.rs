//! Provider token exchange abstraction
//!
//! Defines the `TokenExchanger` trait that decouples credential issuance from
//! the way an OAuth provider is integrated. Two implementations exist:
//!
//! - `DelegatedFlow`: the OAuth client library runs the whole redirect and
//!   callback round trip; the exchanger just takes the resolved access token.
//! - `ExplicitCodeExchange`: the callback's `code` is redeemed by one manual
//!   `POST` to an Auth0-style `/oauth/token` endpoint.
//!
//! Which one runs is a configuration choice made at startup; the issuer only
//! ever sees `Arc<dyn TokenExchanger>`.

pub mod delegated;
pub mod explicit;

pub use delegated::DelegatedFlow;
pub use explicit::ExplicitCodeExchange;
pub use oauth_client::CallbackParams;

use common::Secret;
use std::future::Future;
use std::pin::Pin;

/// Errors from turning a callback into a provider access token.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    #[error("missing authorization code")]
    MissingCode,

    #[error("invalid or expired OAuth state")]
    InvalidState,

    #[error("authorization denied: {0}")]
    Denied(String),

    #[error("provider rejected authorization code: {0}")]
    Rejected(String),

    #[error("provider request failed: {0}")]
    Http(String),

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

impl ExchangeError {
    /// Whether the callback itself was at fault (bad request) rather than the
    /// provider or the network.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ExchangeError::MissingCode | ExchangeError::InvalidState | ExchangeError::Denied(_)
        )
    }

    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ExchangeError::MissingCode => "missing_code",
            ExchangeError::InvalidState => "invalid_state",
            ExchangeError::Denied(_) => "denied",
            ExchangeError::Rejected(_) => "rejected",
            ExchangeError::Http(_) => "http",
            ExchangeError::InvalidResponse(_) => "invalid_response",
        }
    }
}

impl From<oauth_client::Error> for ExchangeError {
    fn from(err: oauth_client::Error) -> Self {
        use oauth_client::Error;
        match err {
            Error::MissingCode => ExchangeError::MissingCode,
            Error::InvalidState => ExchangeError::InvalidState,
            Error::AuthorizationDenied(msg) => ExchangeError::Denied(msg),
            Error::TokenExchange(msg) => ExchangeError::Rejected(msg),
            Error::Http(msg) => ExchangeError::Http(msg),
            Error::InvalidResponse(msg) | Error::InvalidUrl(msg) => {
                ExchangeError::InvalidResponse(msg)
            }
        }
    }
}

/// Result alias for exchange operations.
pub type Result<T> = std::result::Result<T, ExchangeError>;

/// Abstraction over OAuth provider integration styles.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
/// (`Arc<dyn TokenExchanger>`).
pub trait TokenExchanger: Send + Sync {
    /// Identifier for logging and health reporting ("delegated", "explicit")
    fn id(&self) -> &str;

    /// Begin a redirect round trip and return the provider URL to send the
    /// user agent to, or `None` if this exchanger does not own the redirect
    /// (the login route is then not served).
    fn authorization_url(&self) -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + '_>>;

    /// Turn the callback's query parameters into a provider access token.
    fn exchange<'a>(
        &'a self,
        callback: &'a CallbackParams,
    ) -> Pin<Box<dyn Future<Output = Result<Secret<String>>> + Send + 'a>>;
}
