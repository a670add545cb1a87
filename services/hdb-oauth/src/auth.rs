//! OAuth and credential routes
//!
//! - `GET <login>`: 302 to the provider (delegated flow only)
//! - `GET <callback>`: exchange the code, issue a credential, return it as text
//! - `GET <logout>`: revoke the presented credential
//! - `GET /setup`: create the credential schema and table
//!
//! `require_credential` is the gate in front of every record route.

use axum::extract::{Query, Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use provider::CallbackParams;
use tracing::info;

use crate::AppState;
use crate::error::ApiError;
use crate::metrics;
use crate::store::CREDENTIAL_KEY;

/// Raw `Authorization` value. A header that is not visible ASCII is passed
/// on as empty so it fails the scheme check instead of looking absent.
fn authorization(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .map(|value| value.to_str().unwrap_or_default())
}

pub async fn login(State(state): State<AppState>) -> Result<Response, ApiError> {
    let url = state
        .exchanger
        .authorization_url()
        .await?
        .ok_or(ApiError::NotFound)?;
    info!(provider = state.exchanger.id(), "redirecting to provider");
    Ok((StatusCode::FOUND, [(header::LOCATION, url)]).into_response())
}

pub async fn callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<String, ApiError> {
    let access_token = state
        .exchanger
        .exchange(&params)
        .await
        .inspect_err(|e| metrics::record_exchange_error(e.kind()))?;

    let token = state.issuer.issue(&access_token).await?;
    metrics::record_issued();
    Ok(token.as_str().to_owned())
}

/// Always 200 unless the header is unusable or the store fails; a credential
/// that does not exist or does not match is silently left alone.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<&'static str, ApiError> {
    match state.revocation.revoke(authorization(&headers)).await {
        Ok(outcome) => {
            metrics::record_revocation(outcome.label());
            Ok("Logout Successful")
        }
        Err(e) => {
            metrics::record_revocation(e.outcome());
            Err(ApiError::Logout(e))
        }
    }
}

/// Idempotent: an operation that fails (usually because the schema or
/// table exists) is logged and skipped.
pub async fn setup(State(state): State<AppState>) -> &'static str {
    let schema = state.auth_schema.as_ref();
    let table = state.auth_table.as_ref();

    info!(schema, "creating credential schema");
    match state.records.create_schema(schema).await {
        Ok(_) => info!(schema, "credential schema created"),
        Err(e) => info!(schema, error = %e, "credential schema already exists"),
    }

    info!(schema, table, "creating credential table");
    match state
        .records
        .create_table(schema, table, CREDENTIAL_KEY)
        .await
    {
        Ok(_) => info!(schema, table, "credential table created"),
        Err(e) => info!(schema, table, error = %e, "credential table already exists"),
    }

    "HDB Auth has been setup"
}

/// Validate the presented credential and attach the `Principal` to the
/// request. Rejections return before the handler runs.
pub async fn require_credential(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let result = state
        .validator
        .validate(authorization(request.headers()))
        .await;

    match result {
        Ok(principal) => {
            metrics::record_validation("accepted");
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(e) => {
            metrics::record_validation(e.outcome());
            ApiError::from(e).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        ACCESS_TOKEN, AUTHORIZE_URL, GOOD_CODE, TestApp, get, get_with_auth, hasher, send,
    };
    use std::sync::atomic::Ordering;

    fn query_param(url: &str, name: &str) -> Option<String> {
        url::Url::parse(url)
            .unwrap()
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    #[tokio::test]
    async fn callback_issues_composite_token() {
        let app = TestApp::explicit().await;
        let token = app.issue_token().await;

        let (subject_id, secret) = token.split_once('.').unwrap();
        assert_eq!(subject_id.len(), 24);
        assert!(subject_id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(secret, hasher().hash(ACCESS_TOKEN.as_bytes()));

        let stored = app.stored_credentials().await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0]["user"], subject_id);
        assert_eq!(stored[0]["token"], hasher().hash(secret.as_bytes()));
        assert_eq!(app.provider_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn callback_response_is_plain_text() {
        let app = TestApp::explicit().await;
        let (status, headers, _) =
            send(&app.router, get(&format!("/callback?code={GOOD_CODE}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(
            headers[header::CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("text/plain")
        );
    }

    #[tokio::test]
    async fn callback_without_code_is_bad_request() {
        let app = TestApp::explicit().await;
        let (status, _, body) = send(&app.router, get("/callback")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "missing authorization code");
        assert_eq!(app.provider_calls.load(Ordering::SeqCst), 0);
        assert!(app.stored_credentials().await.is_empty());
    }

    #[tokio::test]
    async fn rejected_code_is_bad_gateway_and_stores_nothing() {
        let app = TestApp::explicit().await;
        let (status, _, body) = send(&app.router, get("/callback?code=stale")).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body.contains("Invalid authorization code"), "got: {body}");
        assert!(app.stored_credentials().await.is_empty());
    }

    #[tokio::test]
    async fn insert_failure_returns_no_token() {
        let app = TestApp::explicit().await;
        app.harper.fail_all.store(true, Ordering::SeqCst);

        let (status, _, body) =
            send(&app.router, get(&format!("/callback?code={GOOD_CODE}"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.contains('.'), "no token may leak, got: {body}");
    }

    #[tokio::test]
    async fn each_callback_issues_a_new_subject() {
        let app = TestApp::explicit().await;
        let first = app.issue_token().await;
        let second = app.issue_token().await;

        assert_ne!(first, second);
        assert_eq!(
            first.split_once('.').unwrap().1,
            second.split_once('.').unwrap().1,
            "same access token derives the same secret"
        );
        assert_eq!(app.stored_credentials().await.len(), 2);
    }

    #[tokio::test]
    async fn login_redirects_to_provider_with_state() {
        let app = TestApp::delegated().await;
        let (status, headers, _) = send(&app.router, get("/login")).await;

        assert_eq!(status, StatusCode::FOUND);
        let location = headers[header::LOCATION].to_str().unwrap();
        assert!(location.starts_with(AUTHORIZE_URL), "got: {location}");
        assert_eq!(query_param(location, "client_id").unwrap(), "gh-client");
        assert_eq!(
            query_param(location, "redirect_uri").unwrap(),
            "http://localhost:9926/oauth/callback"
        );
        assert_eq!(query_param(location, "scope").unwrap(), "read:user");
        assert!(query_param(location, "state").is_some());
    }

    #[tokio::test]
    async fn delegated_round_trip_issues_token() {
        let app = TestApp::delegated().await;
        let (_, headers, _) = send(&app.router, get("/login")).await;
        let state = query_param(headers[header::LOCATION].to_str().unwrap(), "state").unwrap();

        let (status, _, token) = send(
            &app.router,
            get(&format!("/oauth/callback?code={GOOD_CODE}&state={state}")),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "got: {token}");
        assert_eq!(
            token.split_once('.').unwrap().1,
            hasher().hash(ACCESS_TOKEN.as_bytes())
        );

        let (replay, _, _) = send(
            &app.router,
            get(&format!("/oauth/callback?code={GOOD_CODE}&state={state}")),
        )
        .await;
        assert_eq!(replay, StatusCode::BAD_REQUEST, "state is single-use");
        assert_eq!(app.provider_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn delegated_callback_with_forged_state_is_bad_request() {
        let app = TestApp::delegated().await;
        let (status, _, body) = send(
            &app.router,
            get(&format!("/oauth/callback?code={GOOD_CODE}&state=forged")),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "invalid or expired OAuth state");
        assert_eq!(app.provider_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn delegated_consent_denied_is_bad_request() {
        let app = TestApp::delegated().await;
        let (status, _, body) =
            send(&app.router, get("/oauth/callback?error=access_denied")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("access_denied"), "got: {body}");
    }

    #[tokio::test]
    async fn logout_revokes_credential() {
        let app = TestApp::explicit().await;
        let token = app.issue_token().await;
        let header = format!("harperdb {token}");

        let (status, _, body) = send(&app.router, get_with_auth("/logout", &header)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Logout Successful");
        assert!(app.stored_credentials().await.is_empty());

        let (status, _, body) =
            send(&app.router, get_with_auth("/create/schema/dev", &header)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, "HDB Token Error");
    }

    #[tokio::test]
    async fn logout_of_unknown_token_succeeds_without_mutation() {
        let app = TestApp::explicit().await;
        let calls_before = app.harper.operations().await.len();

        let (status, _, body) = send(
            &app.router,
            get_with_auth("/logout", "harperdb 0123456789abcdef01234567.cafebabe"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Logout Successful");

        let ops = app.harper.operations().await;
        assert_eq!(ops.len(), calls_before + 1);
        assert_eq!(ops.last().unwrap()["operation"], "search_by_hash");
    }

    #[tokio::test]
    async fn logout_with_wrong_secret_keeps_credential() {
        let app = TestApp::explicit().await;
        let token = app.issue_token().await;
        let subject_id = token.split_once('.').unwrap().0;

        let (status, _, _) = send(
            &app.router,
            get_with_auth("/logout", &format!("harperdb {subject_id}.wrong")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(app.stored_credentials().await.len(), 1);
    }

    #[tokio::test]
    async fn logout_with_bad_header_is_server_error() {
        let app = TestApp::explicit().await;

        let (status, _, body) =
            send(&app.router, get_with_auth("/logout", "Bearer abc.def")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "Invalid Authorization Type");

        let (status, _, _) = send(&app.router, get("/logout")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn setup_is_idempotent() {
        let app = TestApp::explicit().await;

        // Fixture already created both; setup must still succeed
        let (status, _, body) = send(&app.router, get("/setup")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "HDB Auth has been setup");

        let (status, _, _) = send(&app.router, get("/setup")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn setup_creates_credential_table_keyed_by_user() {
        let app = TestApp::explicit().await;
        send(&app.router, get("/setup")).await;

        let ops = app.harper.operations().await;
        let create_table = ops
            .iter()
            .rev()
            .find(|op| op["operation"] == "create_table")
            .unwrap();
        assert_eq!(create_table["schema"], "hdb_auth");
        assert_eq!(create_table["table"], "tokens");
        assert_eq!(create_table["hash_attribute"], "user");
    }

    #[tokio::test]
    async fn setup_succeeds_even_when_store_is_down() {
        let app = TestApp::explicit().await;
        app.harper.fail_all.store(true, Ordering::SeqCst);

        let (status, _, body) = send(&app.router, get("/setup")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "HDB Auth has been setup");
    }
}
