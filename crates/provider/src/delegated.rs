//! Delegated flow: the OAuth client library owns the round trip.
//!
//! The library issues the redirect (with its own `state`), validates the
//! callback and redeems the code against the provider preset's token
//! endpoint. This exchanger only extracts the resolved access token.

use std::future::Future;
use std::pin::Pin;

use common::Secret;
use oauth_client::{AuthorizationCodeFlow, CallbackParams};
use tracing::debug;

use crate::{Result, TokenExchanger};

pub struct DelegatedFlow {
    flow: AuthorizationCodeFlow,
}

impl DelegatedFlow {
    pub fn new(flow: AuthorizationCodeFlow) -> Self {
        Self { flow }
    }
}

impl TokenExchanger for DelegatedFlow {
    fn id(&self) -> &str {
        "delegated"
    }

    fn authorization_url(&self) -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + '_>> {
        Box::pin(async move { Ok(Some(self.flow.authorization_url().await?)) })
    }

    fn exchange<'a>(
        &'a self,
        callback: &'a CallbackParams,
    ) -> Pin<Box<dyn Future<Output = Result<Secret<String>>> + Send + 'a>> {
        Box::pin(async move {
            let resolved = self.flow.complete(callback).await?;
            debug!("delegated flow resolved access token");
            Ok(Secret::new(resolved.access_token))
        })
    }
}
