//! Authorization code exchange
//!
//! A single `POST` to the provider's token endpoint with the code as
//! URL-encoded form fields. There is no retry: providers treat authorization
//! codes as single-use, so a second attempt after an ambiguous failure could
//! only fail or, worse, redeem the code twice.

use std::fmt;

use common::Secret;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Successful token endpoint response.
///
/// Only `access_token` is required. The remaining fields are recorded when a
/// provider sends them but the credential service never uses them.
#[derive(Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    /// Seconds until the access token expires (delta, not absolute)
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}

/// Form fields of an `authorization_code` grant.
pub struct CodeExchange<'a> {
    pub client_id: &'a str,
    pub client_secret: &'a Secret<String>,
    pub code: &'a str,
    pub redirect_uri: &'a str,
}

/// Exchange an authorization code for an access token.
///
/// Sends `grant_type`, `client_id`, `client_secret`, `code` and
/// `redirect_uri` as a form body and asks for JSON back (GitHub answers
/// form-encoded otherwise). A non-2xx status is returned as
/// `Error::TokenExchange` carrying the status and the provider's body.
/// Some providers answer 200 with an `error` field instead of a token; that
/// is treated as a rejection too.
pub async fn exchange_code(
    client: &reqwest::Client,
    token_url: &str,
    exchange: &CodeExchange<'_>,
) -> Result<TokenResponse> {
    debug!(token_url, client_id = exchange.client_id, "exchanging authorization code");

    let response = client
        .post(token_url)
        .header(reqwest::header::ACCEPT, "application/json")
        .form(&[
            ("grant_type", "authorization_code"),
            ("client_id", exchange.client_id),
            ("client_secret", exchange.client_secret.expose().as_str()),
            ("code", exchange.code),
            ("redirect_uri", exchange.redirect_uri),
        ])
        .send()
        .await
        .map_err(|e| Error::Http(format!("token exchange request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));
        warn!(%status, "token endpoint rejected authorization code");
        return Err(Error::TokenExchange(format!(
            "token endpoint returned {status}: {body}"
        )));
    }

    let body: serde_json::Value = response
        .json()
        .await
        .map_err(|e| Error::InvalidResponse(format!("token response is not JSON: {e}")))?;

    parse_token_body(body)
}

fn parse_token_body(body: serde_json::Value) -> Result<TokenResponse> {
    if body.get("access_token").and_then(|v| v.as_str()).is_some() {
        return serde_json::from_value(body)
            .map_err(|e| Error::InvalidResponse(format!("malformed token response: {e}")));
    }

    if let Some(error) = body.get("error").and_then(|v| v.as_str()) {
        let description = body
            .get("error_description")
            .and_then(|v| v.as_str())
            .unwrap_or("");
        return Err(Error::TokenExchange(if description.is_empty() {
            error.to_string()
        } else {
            format!("{error}: {description}")
        }));
    }

    Err(Error::InvalidResponse(
        "token response missing access_token".into(),
    ))
}
