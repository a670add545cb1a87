//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! Secrets (hashing salt, OAuth client secret, record-store password) are
//! loaded from env vars or `*_file` paths, never stored in the TOML directly.

use common::Secret;
use oauth_client::Endpoints;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Paths the service registers itself; configurable paths must not collide.
const RESERVED_PATHS: &[&str] = &["/health", "/metrics", "/setup"];

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    pub provider: ProviderConfig,
    pub records: RecordsConfig,
}

/// HTTP listener settings
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    /// Applied to every outbound call (token exchange and record store)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

/// Credential storage and route settings
#[derive(Debug, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default = "default_table")]
    pub table: String,
    /// Starts the delegated redirect; ignored by the explicit flow
    #[serde(default = "default_login_path")]
    pub login_path: String,
    #[serde(default = "default_logout_path")]
    pub logout_path: String,
    #[serde(default = "default_hash_iterations")]
    pub hash_iterations: u32,
    #[serde(skip)]
    pub salt: Option<Secret<String>>,
    /// Path to a file containing the salt (alternative to HDB_AUTH_SALT)
    #[serde(default)]
    pub salt_file: Option<PathBuf>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            schema: default_schema(),
            table: default_table(),
            login_path: default_login_path(),
            logout_path: default_logout_path(),
            hash_iterations: default_hash_iterations(),
            salt: None,
            salt_file: None,
        }
    }
}

/// OAuth client registration plus the flow that uses it
#[derive(Debug, Deserialize)]
pub struct ProviderConfig {
    pub client_id: String,
    /// Absolute redirect URI registered with the provider. Its path is
    /// where this service serves the callback.
    pub callback: String,
    #[serde(skip)]
    pub client_secret: Option<Secret<String>>,
    /// Path to a file containing the client secret (alternative to CLIENT_SECRET)
    #[serde(default)]
    pub client_secret_file: Option<PathBuf>,
    #[serde(flatten)]
    pub flow: FlowConfig,
}

/// Which token exchanger to run, selected by `kind`
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FlowConfig {
    /// Library-managed redirect and callback against a named provider
    Delegated {
        preset: String,
        #[serde(default)]
        scopes: Vec<String>,
        /// Only for `preset = "custom"`
        #[serde(default)]
        authorize_url: Option<String>,
        /// Only for `preset = "custom"`
        #[serde(default)]
        token_url: Option<String>,
    },
    /// Code posted straight to `<domain>/oauth/token`
    Explicit { domain: String },
}

/// HarperDB operations API
#[derive(Debug, Deserialize)]
pub struct RecordsConfig {
    pub url: String,
    pub username: String,
    #[serde(skip)]
    pub password: Option<Secret<String>>,
    /// Path to a file containing the password (alternative to HDB_PASSWORD)
    #[serde(default)]
    pub password_file: Option<PathBuf>,
}

fn default_timeout() -> u64 {
    30
}

fn default_max_connections() -> usize {
    1000
}

fn default_schema() -> String {
    "hdb_auth".into()
}

fn default_table() -> String {
    "tokens".into()
}

fn default_login_path() -> String {
    "/login".into()
}

fn default_logout_path() -> String {
    "/logout".into()
}

fn default_hash_iterations() -> u32 {
    credentials::hasher::HASH_ITERATIONS
}

impl ProviderConfig {
    /// Path component of the callback URL.
    pub fn callback_path(&self) -> common::Result<String> {
        let url = url::Url::parse(&self.callback).map_err(|e| {
            common::Error::Config(format!(
                "provider.callback must be an absolute URL, got {}: {e}",
                self.callback
            ))
        })?;
        Ok(url.path().to_string())
    }

    /// Authorize/token endpoints for the delegated flow.
    ///
    /// `None` for the explicit flow, for unknown presets, and for `custom`
    /// without both URLs.
    pub fn endpoints(&self) -> Option<Endpoints> {
        match &self.flow {
            FlowConfig::Delegated {
                preset,
                authorize_url,
                token_url,
                ..
            } if preset.eq_ignore_ascii_case("custom") => match (authorize_url, token_url) {
                (Some(authorize_url), Some(token_url)) => Some(Endpoints {
                    authorize_url: authorize_url.clone(),
                    token_url: token_url.clone(),
                }),
                _ => None,
            },
            FlowConfig::Delegated { preset, .. } => Endpoints::preset(preset),
            FlowConfig::Explicit { .. } => None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, validate it, then overlay secrets
    /// from environment variables.
    ///
    /// Secret resolution order for each of salt, client secret and
    /// record-store password:
    /// 1. env var (`HDB_AUTH_SALT`, `CLIENT_SECRET`, `HDB_PASSWORD`)
    /// 2. `*_file` path from config
    ///
    /// The client secret is required. A missing salt is left for the hasher
    /// to refuse, and a missing password means the record store is called
    /// with a username only.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;
        config.validate()?;

        config.auth.salt = resolve_secret("HDB_AUTH_SALT", config.auth.salt_file.as_deref())?;
        config.provider.client_secret = resolve_secret(
            "CLIENT_SECRET",
            config.provider.client_secret_file.as_deref(),
        )?;
        config.records.password =
            resolve_secret("HDB_PASSWORD", config.records.password_file.as_deref())?;

        if config.provider.client_secret.is_none() {
            return Err(common::Error::MissingSecret("CLIENT_SECRET"));
        }

        Ok(config)
    }

    fn validate(&self) -> common::Result<()> {
        if !is_http_url(&self.records.url) {
            return Err(common::Error::Config(format!(
                "records.url must start with http:// or https://, got: {}",
                self.records.url
            )));
        }

        if self.server.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if self.server.max_connections == 0 {
            return Err(common::Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }

        if self.auth.hash_iterations == 0 {
            return Err(common::Error::Config(
                "hash_iterations must be greater than 0".into(),
            ));
        }

        let callback_path = self.provider.callback_path()?;
        let mut routes = vec![
            ("logout_path", self.auth.logout_path.as_str()),
            ("callback", callback_path.as_str()),
        ];

        match &self.provider.flow {
            FlowConfig::Delegated { preset, .. } => {
                routes.push(("login_path", self.auth.login_path.as_str()));
                if self.provider.endpoints().is_none() {
                    return Err(common::Error::Config(format!(
                        "unknown provider preset {preset:?}; expected one of {} or \"custom\" with authorize_url and token_url",
                        Endpoints::preset_names().join(", ")
                    )));
                }
            }
            FlowConfig::Explicit { domain } => {
                if !is_http_url(domain) {
                    return Err(common::Error::Config(format!(
                        "provider.domain must start with http:// or https://, got: {domain}"
                    )));
                }
            }
        }

        for (i, (name, path)) in routes.iter().enumerate() {
            if !path.starts_with('/') {
                return Err(common::Error::Config(format!(
                    "{name} must start with '/', got: {path}"
                )));
            }
            if RESERVED_PATHS.contains(path) {
                return Err(common::Error::Config(format!(
                    "{name} collides with the built-in route {path}"
                )));
            }
            if routes[..i].iter().any(|(_, other)| other == path) {
                return Err(common::Error::Config(format!(
                    "{name} collides with another configured route: {path}"
                )));
            }
        }

        Ok(())
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("hdb-oauth.toml")
    }
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Env var wins over file. Blank values count as unset.
///
/// Env values are used verbatim: the salt feeds every digest, so surrounding
/// whitespace is part of it. Only the file form is trimmed (trailing newline).
fn resolve_secret(env_key: &str, file: Option<&Path>) -> common::Result<Option<Secret<String>>> {
    if let Ok(value) = std::env::var(env_key) {
        if !value.trim().is_empty() {
            return Ok(Some(Secret::new(value)));
        }
    }
    match file {
        Some(path) => Secret::from_file(path).map_err(|e| {
            common::Error::Config(format!("failed to read {}: {e}", path.display()))
        }),
        None => Ok(None),
    }
}
