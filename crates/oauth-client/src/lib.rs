//! OAuth 2.0 authorization-code client
//!
//! The provider-integration layer used by the credential service. It owns
//! everything that talks to the identity provider:
//!
//! 1. `presets` names the authorize/token endpoints of well-known providers
//! 2. `state::StateStore` issues and checks the CSRF `state` parameter
//! 3. `token::exchange_code()` trades an authorization code for an access token
//! 4. `flow::AuthorizationCodeFlow` ties the three together into a full
//!    redirect/callback round trip
//!
//! Nothing here knows about the credentials derived from the access token.

pub mod error;
pub mod flow;
pub mod presets;
pub mod state;
pub mod token;

pub use error::{Error, Result};
pub use flow::{AuthorizationCodeFlow, CallbackParams};
pub use presets::Endpoints;
pub use state::StateStore;
pub use token::{CodeExchange, TokenResponse, exchange_code};
