//! Full authorization-code round trip
//!
//! `AuthorizationCodeFlow` is what a web framework's OAuth plugin would give
//! you: it builds the redirect to the provider, remembers the `state` it sent,
//! and on the callback checks that state and redeems the code. The caller
//! only ever sees the finished `TokenResponse`.

use common::Secret;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::presets::Endpoints;
use crate::state::StateStore;
use crate::token::{CodeExchange, TokenResponse, exchange_code};

/// Query parameters the provider appends to the callback URL.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set instead of `code` when the user refused consent
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Library-managed authorization-code flow against one provider.
pub struct AuthorizationCodeFlow {
    http: reqwest::Client,
    endpoints: Endpoints,
    client_id: String,
    client_secret: Secret<String>,
    redirect_uri: String,
    scopes: Vec<String>,
    states: StateStore,
}

impl AuthorizationCodeFlow {
    pub fn new(
        http: reqwest::Client,
        endpoints: Endpoints,
        client_id: String,
        client_secret: Secret<String>,
        redirect_uri: String,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            http,
            endpoints,
            client_id,
            client_secret,
            redirect_uri,
            scopes,
            states: StateStore::default(),
        }
    }

    /// Replace the default state store (tests use a short expiry).
    pub fn with_state_store(mut self, states: StateStore) -> Self {
        self.states = states;
        self
    }

    /// Start a round trip: issue a state and build the provider redirect URL.
    pub async fn authorization_url(&self) -> Result<String> {
        let mut url = url::Url::parse(&self.endpoints.authorize_url)
            .map_err(|e| Error::InvalidUrl(format!("{}: {e}", self.endpoints.authorize_url)))?;
        let state = self.states.issue().await;

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", &self.client_id)
                .append_pair("redirect_uri", &self.redirect_uri);
            if !self.scopes.is_empty() {
                query.append_pair("scope", &self.scopes.join(" "));
            }
            query.append_pair("state", &state);
        }

        Ok(url.into())
    }

    /// Finish a round trip from the callback's query parameters.
    ///
    /// Order: provider-reported error, then state, then code. The state is
    /// consumed before the code is redeemed so a replayed callback fails
    /// without reaching the provider.
    pub async fn complete(&self, params: &CallbackParams) -> Result<TokenResponse> {
        if let Some(error) = &params.error {
            let detail = match &params.error_description {
                Some(description) => format!("{error}: {description}"),
                None => error.clone(),
            };
            warn!(error = %detail, "provider reported authorization error");
            return Err(Error::AuthorizationDenied(detail));
        }

        let state = params.state.as_deref().ok_or(Error::InvalidState)?;
        if !self.states.consume(state).await {
            warn!("callback state unknown, reused or expired");
            return Err(Error::InvalidState);
        }

        let code = params.code.as_deref().ok_or(Error::MissingCode)?;
        let token = exchange_code(
            &self.http,
            &self.endpoints.token_url,
            &CodeExchange {
                client_id: &self.client_id,
                client_secret: &self.client_secret,
                code,
                redirect_uri: &self.redirect_uri,
            },
        )
        .await?;

        info!(client_id = %self.client_id, "authorization code flow completed");
        Ok(token)
    }
}
