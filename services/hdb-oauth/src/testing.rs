//! Router fixtures: the full app wired to in-process provider and HarperDB mocks

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use common::Secret;
use credentials::Hasher;
use oauth_client::{AuthorizationCodeFlow, Endpoints};
use provider::{DelegatedFlow, ExplicitCodeExchange, TokenExchanger};
use tokio::net::TcpListener;
use tower::ServiceExt;

use crate::records::testing::{MockHarper, record_store, start_harper};
use crate::store::CREDENTIAL_KEY;
use crate::{AppState, RoutePaths, build_router};

pub const TEST_SALT: &str = "fixed-test-salt-0001";
/// The only code the mock provider accepts
pub const GOOD_CODE: &str = "good";
/// Access token the mock provider hands out for `GOOD_CODE`
pub const ACCESS_TOKEN: &str = "abc123";
pub const AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";

pub fn hasher() -> Hasher {
    Hasher::new(Some(Secret::new(TEST_SALT.to_string())), 1000).unwrap()
}

/// Provider token endpoint at `<domain>/oauth/token`. Counts every call.
pub async fn start_provider(calls: Arc<AtomicU64>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let app = axum::Router::new().route(
            "/oauth/token",
            axum::routing::post(
                move |axum::Form(form): axum::Form<HashMap<String, String>>| {
                    let calls = calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        if form.get("code").map(String::as_str) != Some(GOOD_CODE) {
                            return (
                                StatusCode::FORBIDDEN,
                                axum::Json(serde_json::json!({
                                    "error": "invalid_grant",
                                    "error_description": "Invalid authorization code"
                                })),
                            );
                        }
                        (
                            StatusCode::OK,
                            axum::Json(serde_json::json!({
                                "access_token": ACCESS_TOKEN,
                                "token_type": "Bearer"
                            })),
                        )
                    }
                },
            ),
        );
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

pub struct TestApp {
    pub router: Router,
    pub harper: Arc<MockHarper>,
    pub provider_calls: Arc<AtomicU64>,
}

impl TestApp {
    /// Explicit code exchange; callback at `/callback`, no login route.
    pub async fn explicit() -> Self {
        let provider_calls = Arc::new(AtomicU64::new(0));
        let domain = start_provider(provider_calls.clone()).await;
        let exchanger = ExplicitCodeExchange::new(
            reqwest::Client::new(),
            &domain,
            "auth0-client".into(),
            Secret::new("auth0-secret".to_string()),
            "http://localhost:9926/callback".into(),
        );
        Self::build(
            Arc::new(exchanger),
            RoutePaths {
                login: None,
                callback: "/callback".into(),
                logout: "/logout".into(),
            },
            provider_calls,
        )
        .await
    }

    /// Delegated flow; login at `/login`, callback at `/oauth/callback`.
    pub async fn delegated() -> Self {
        let provider_calls = Arc::new(AtomicU64::new(0));
        let domain = start_provider(provider_calls.clone()).await;
        let flow = AuthorizationCodeFlow::new(
            reqwest::Client::new(),
            Endpoints {
                authorize_url: AUTHORIZE_URL.into(),
                token_url: format!("{domain}/oauth/token"),
            },
            "gh-client".into(),
            Secret::new("gh-secret".to_string()),
            "http://localhost:9926/oauth/callback".into(),
            vec!["read:user".into()],
        );
        Self::build(
            Arc::new(DelegatedFlow::new(flow)),
            RoutePaths {
                login: Some("/login".into()),
                callback: "/oauth/callback".into(),
                logout: "/logout".into(),
            },
            provider_calls,
        )
        .await
    }

    async fn build(
        exchanger: Arc<dyn TokenExchanger>,
        paths: RoutePaths,
        provider_calls: Arc<AtomicU64>,
    ) -> Self {
        let (url, harper) = start_harper().await;
        let records = record_store(&url);
        records.create_schema("hdb_auth").await.unwrap();
        records
            .create_table("hdb_auth", "tokens", CREDENTIAL_KEY)
            .await
            .unwrap();

        let prometheus = metrics_exporter_prometheus::PrometheusBuilder::new()
            .build_recorder()
            .handle();
        let state = AppState::new(exchanger, hasher(), records, "hdb_auth", "tokens", prometheus);

        Self {
            router: build_router(state, &paths, 100),
            harper,
            provider_calls,
        }
    }

    /// Run the explicit callback with the good code; returns the composite token.
    pub async fn issue_token(&self) -> String {
        let (status, _, body) = send(&self.router, get(&format!("/callback?code={GOOD_CODE}"))).await;
        assert_eq!(status, StatusCode::OK, "callback failed: {body}");
        body
    }

    pub async fn stored_credentials(&self) -> Vec<serde_json::Value> {
        self.harper.records("hdb_auth", "tokens").await
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn get_with_auth(uri: &str, authorization: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("authorization", authorization)
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(uri: &str, authorization: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("authorization", authorization)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, String) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
}
