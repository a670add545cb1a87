//! Provider endpoint presets
//!
//! Authorize and token endpoints for the providers the delegated flow knows
//! by name. These are public URLs, not secrets; the client id and secret for
//! each deployment come from configuration.

/// Authorize/token endpoint pair for one provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Where the user agent is redirected to grant consent
    pub authorize_url: String,
    /// Where the authorization code is exchanged for an access token
    pub token_url: String,
}

/// (name, authorize URL, token URL)
const PRESETS: &[(&str, &str, &str)] = &[
    (
        "github",
        "https://github.com/login/oauth/authorize",
        "https://github.com/login/oauth/access_token",
    ),
    (
        "google",
        "https://accounts.google.com/o/oauth2/v2/auth",
        "https://www.googleapis.com/oauth2/v4/token",
    ),
    (
        "facebook",
        "https://facebook.com/v6.0/dialog/oauth",
        "https://graph.facebook.com/v6.0/oauth/access_token",
    ),
    (
        "microsoft",
        "https://login.microsoftonline.com/common/oauth2/v2.0/authorize",
        "https://login.microsoftonline.com/common/oauth2/v2.0/token",
    ),
    (
        "linkedin",
        "https://www.linkedin.com/oauth/v2/authorization",
        "https://www.linkedin.com/oauth/v2/accessToken",
    ),
    (
        "discord",
        "https://discord.com/api/oauth2/authorize",
        "https://discord.com/api/oauth2/token",
    ),
    (
        "spotify",
        "https://accounts.spotify.com/authorize",
        "https://accounts.spotify.com/api/token",
    ),
    (
        "twitch",
        "https://id.twitch.tv/oauth2/authorize",
        "https://id.twitch.tv/oauth2/token",
    ),
];

impl Endpoints {
    /// Look up a named provider preset (case-insensitive).
    pub fn preset(name: &str) -> Option<Self> {
        PRESETS
            .iter()
            .find(|(preset, _, _)| preset.eq_ignore_ascii_case(name))
            .map(|(_, authorize, token)| Self {
                authorize_url: (*authorize).to_string(),
                token_url: (*token).to_string(),
            })
    }

    /// Names of every built-in preset, for configuration error messages.
    pub fn preset_names() -> Vec<&'static str> {
        PRESETS.iter().map(|(name, _, _)| *name).collect()
    }
}
