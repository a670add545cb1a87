//! Explicit code exchange against an Auth0-style tenant.
//!
//! The client application handles the redirect itself; the callback arrives
//! here with a `code`, which is redeemed with one `POST` to
//! `<domain>/oauth/token`.

use std::future::Future;
use std::pin::Pin;

use common::Secret;
use oauth_client::{CallbackParams, CodeExchange, exchange_code};
use tracing::debug;

use crate::{ExchangeError, Result, TokenExchanger};

pub struct ExplicitCodeExchange {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: Secret<String>,
    redirect_uri: String,
}

impl ExplicitCodeExchange {
    /// `domain` is the tenant base URL, e.g. `https://example.eu.auth0.com`.
    pub fn new(
        http: reqwest::Client,
        domain: &str,
        client_id: String,
        client_secret: Secret<String>,
        redirect_uri: String,
    ) -> Self {
        Self {
            http,
            token_url: format!("{}/oauth/token", domain.trim_end_matches('/')),
            client_id,
            client_secret,
            redirect_uri,
        }
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }
}

impl TokenExchanger for ExplicitCodeExchange {
    fn id(&self) -> &str {
        "explicit"
    }

    fn authorization_url(&self) -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + '_>> {
        Box::pin(async { Ok(None) })
    }

    fn exchange<'a>(
        &'a self,
        callback: &'a CallbackParams,
    ) -> Pin<Box<dyn Future<Output = Result<Secret<String>>> + Send + 'a>> {
        Box::pin(async move {
            if let Some(error) = &callback.error {
                return Err(ExchangeError::Denied(error.clone()));
            }
            let code = callback
                .code
                .as_deref()
                .filter(|c| !c.is_empty())
                .ok_or(ExchangeError::MissingCode)?;

            let token = exchange_code(
                &self.http,
                &self.token_url,
                &CodeExchange {
                    client_id: &self.client_id,
                    client_secret: &self.client_secret,
                    code,
                    redirect_uri: &self.redirect_uri,
                },
            )
            .await?;

            debug!(token_url = %self.token_url, "authorization code redeemed");
            Ok(Secret::new(token.access_token))
        })
    }
}
