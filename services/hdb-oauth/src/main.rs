//! HarperDB OAuth bridge
//!
//! Single-binary Rust service that:
//! 1. Completes an OAuth authorization-code flow with a third-party provider
//! 2. Turns the provider access token into an opaque `harperdb` credential
//! 3. Gates record-store routes on that credential
//! 4. Revokes it on logout

mod api;
mod auth;
mod config;
mod error;
mod metrics;
mod records;
mod store;
#[cfg(test)]
mod testing;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use credentials::{
    CredentialIssuer, CredentialStore, CredentialValidator, Hasher, RevocationHandler,
};
use metrics_exporter_prometheus::PrometheusHandle;
use oauth_client::AuthorizationCodeFlow;
use provider::{DelegatedFlow, ExplicitCodeExchange, TokenExchanger};
use tokio::net::TcpListener;
use tracing::{Instrument, error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, FlowConfig, ProviderConfig};
use crate::records::RecordStore;
use crate::store::HarperCredentialStore;

/// How long in-flight requests get to finish after a shutdown signal
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared application state accessible from all handlers
#[derive(Clone)]
pub struct AppState {
    pub exchanger: Arc<dyn TokenExchanger>,
    pub issuer: Arc<CredentialIssuer>,
    pub validator: Arc<CredentialValidator>,
    pub revocation: Arc<RevocationHandler>,
    pub records: RecordStore,
    pub auth_schema: Arc<str>,
    pub auth_table: Arc<str>,
    pub started_at: Instant,
    pub prometheus: PrometheusHandle,
}

impl AppState {
    /// Wire the credential core to the record store's `schema.table`.
    pub fn new(
        exchanger: Arc<dyn TokenExchanger>,
        hasher: Hasher,
        records: RecordStore,
        auth_schema: &str,
        auth_table: &str,
        prometheus: PrometheusHandle,
    ) -> Self {
        let store: Arc<dyn CredentialStore> = Arc::new(HarperCredentialStore::new(
            records.clone(),
            auth_schema.to_string(),
            auth_table.to_string(),
        ));

        Self {
            exchanger,
            issuer: Arc::new(CredentialIssuer::new(hasher.clone(), store.clone())),
            validator: Arc::new(CredentialValidator::new(hasher.clone(), store.clone())),
            revocation: Arc::new(RevocationHandler::new(hasher, store)),
            records,
            auth_schema: auth_schema.into(),
            auth_table: auth_table.into(),
            started_at: Instant::now(),
            prometheus,
        }
    }
}

/// Configurable route paths
#[derive(Debug, Clone)]
pub struct RoutePaths {
    /// Only the delegated flow has a login redirect
    pub login: Option<String>,
    pub callback: String,
    pub logout: String,
}

impl RoutePaths {
    pub fn from_config(config: &Config) -> common::Result<Self> {
        let login = match config.provider.flow {
            FlowConfig::Delegated { .. } => Some(config.auth.login_path.clone()),
            FlowConfig::Explicit { .. } => None,
        };
        Ok(Self {
            login,
            callback: config.provider.callback_path()?,
            logout: config.auth.logout_path.clone(),
        })
    }
}

/// Build the axum router with all routes and shared state.
///
/// Record routes sit behind the credential gate. Applies a concurrency limit
/// layer based on `max_connections`.
pub fn build_router(state: AppState, paths: &RoutePaths, max_connections: usize) -> Router {
    let protected = Router::new()
        .route("/create/schema/{schema}", get(api::create_schema))
        .route("/create/table/{schema}/{table}", get(api::create_table))
        .route("/{schema}/{table}", post(api::insert_records))
        .route("/{schema}/{table}/{id}", get(api::get_record))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_credential,
        ));

    let mut router = Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/setup", get(auth::setup))
        .route(&paths.callback, get(auth::callback))
        .route(&paths.logout, get(auth::logout));
    if let Some(login) = &paths.login {
        router = router.route(login, get(auth::login));
    }

    router
        .merge(protected)
        .layer(middleware::from_fn(request_id))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

/// Build the configured token exchanger. Consumes the client secret.
fn build_exchanger(
    provider: &mut ProviderConfig,
    http: reqwest::Client,
) -> Result<Arc<dyn TokenExchanger>> {
    let client_secret = provider
        .client_secret
        .take()
        .context("OAuth client secret was not resolved")?;

    match &provider.flow {
        FlowConfig::Delegated { preset, scopes, .. } => {
            let endpoints = provider
                .endpoints()
                .with_context(|| format!("no endpoints for provider preset {preset:?}"))?;
            info!(preset = %preset, authorize_url = %endpoints.authorize_url, "using delegated flow");
            Ok(Arc::new(DelegatedFlow::new(AuthorizationCodeFlow::new(
                http,
                endpoints,
                provider.client_id.clone(),
                client_secret,
                provider.callback.clone(),
                scopes.clone(),
            ))))
        }
        FlowConfig::Explicit { domain } => {
            info!(domain = %domain, "using explicit code exchange");
            Ok(Arc::new(ExplicitCodeExchange::new(
                http,
                domain,
                provider.client_id.clone(),
                client_secret,
                provider.callback.clone(),
            )))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting hdb-oauth");

    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus_handle =
        metrics::install_recorder().context("failed to install Prometheus recorder")?;

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let mut config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        listen_addr = %config.server.listen_addr,
        records_url = %config.records.url,
        schema = %config.auth.schema,
        table = %config.auth.table,
        "configuration loaded"
    );

    let hasher = Hasher::new(config.auth.salt.take(), config.auth.hash_iterations)
        .context("cannot hash credentials (set HDB_AUTH_SALT or auth.salt_file)")?;
    info!(iterations = hasher.iterations(), "credential hasher ready");

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.server.timeout_secs))
        .build()
        .context("failed to build HTTP client")?;

    let records = RecordStore::new(
        http.clone(),
        config.records.url.clone(),
        config.records.username.clone(),
        config.records.password.take(),
    );
    let exchanger = build_exchanger(&mut config.provider, http)?;
    let paths = RoutePaths::from_config(&config)?;

    let state = AppState::new(
        exchanger,
        hasher,
        records,
        &config.auth.schema,
        &config.auth.table,
        prometheus_handle,
    );
    let app = build_router(state, &paths, config.server.max_connections);

    let listen_addr = config.server.listen_addr;
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind to {listen_addr}"))?;

    info!(
        addr = %listen_addr,
        callback = %paths.callback,
        logout = %paths.logout,
        login = paths.login.as_deref().unwrap_or("-"),
        "accepting requests"
    );

    // Graceful shutdown: the drain timer starts when the signal fires, not
    // when the server starts.
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    shutdown_signal().await;
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(DRAIN_TIMEOUT, server_handle).await {
        Ok(Ok(Ok(()))) => {
            info!("all in-flight requests drained");
        }
        Ok(Ok(Err(e))) => {
            error!(error = %e, "server error during shutdown");
        }
        Ok(Err(e)) => {
            error!(error = %e, "server task panicked");
        }
        Err(_) => {
            warn!(
                drain_timeout_secs = DRAIN_TIMEOUT.as_secs(),
                "drain timeout exceeded, forcing shutdown"
            );
        }
    }

    info!("shutdown complete");
    Ok(())
}

/// Health endpoint: status, active token exchanger and uptime.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let body = serde_json::json!({
        "status": "healthy",
        "provider": state.exchanger.id(),
        "uptime_seconds": state.started_at.elapsed().as_secs(),
    });

    (
        axum::http::StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
}

/// Prometheus metrics endpoint in text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        axum::http::StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}

/// Tag every request with an id: on the tracing span and in `x-request-id`.
async fn request_id(request: Request, next: Next) -> Response {
    let request_id = format!("req_{}", uuid::Uuid::new_v4().as_simple());
    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
    );

    let mut response = next.run(request).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
