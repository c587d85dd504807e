//! Authorization server configuration.
//!
//! The provider preset, base URL, client credentials and header scheme are
//! resolved once at startup. Paths are built as
//! `{base_url}/{api_version}/{endpoint}/`.

use std::str::FromStr;

use crate::{ConfigError, Lookup, env_lookup, parse_or};

/// Named authorization server deployments.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderKind {
    Admaren,
    Hoppe,
    Generic,
}

impl ProviderKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::Admaren => "Admaren-Auth-Backend",
            ProviderKind::Hoppe => "Hoppe-Auth-Backend",
            ProviderKind::Generic => "Auth-Base-Backend",
        }
    }

    /// Base URL used when `AUTH_SERVER_URL` is not set.
    pub fn default_base_url(&self) -> Option<&'static str> {
        match self {
            ProviderKind::Admaren => Some("https://auth.admaren.org/api"),
            ProviderKind::Hoppe | ProviderKind::Generic => None,
        }
    }
}

impl FromStr for ProviderKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admaren" => Ok(ProviderKind::Admaren),
            "hoppe" => Ok(ProviderKind::Hoppe),
            "generic" => Ok(ProviderKind::Generic),
            _ => Err(()),
        }
    }
}

/// What to do when a valid token names a user with no local mirror row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnknownUserPolicy {
    /// Create the local row from the upstream profile.
    Provision,
    /// Fail authentication.
    Reject,
}

impl FromStr for UnknownUserPolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "provision" => Ok(UnknownUserPolicy::Provision),
            "reject" => Ok(UnknownUserPolicy::Reject),
            _ => Err(()),
        }
    }
}

#[derive(Clone)]
pub struct UpstreamConfig {
    pub provider: ProviderKind,
    pub base_url: String,
    pub api_version: String,
    pub client_id: String,
    pub client_secret: String,
    pub grant_type: String,
    pub scope: String,
    /// Scheme word in `Authorization: <scheme> <token>`.
    pub header_type: String,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Extra attempts for idempotent reads.
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub unknown_user_policy: UnknownUserPolicy,
}

impl std::fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("header_type", &self.header_type)
            .field("unknown_user_policy", &self.unknown_user_policy)
            .finish_non_exhaustive()
    }
}

impl UpstreamConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&env_lookup)
    }

    pub fn from_lookup<L: Lookup + ?Sized>(lookup: &L) -> Result<Self, ConfigError> {
        let provider = match lookup.get("AUTH_PROVIDER") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "AUTH_PROVIDER",
                value: raw,
            })?,
            None => ProviderKind::Admaren,
        };

        let base_url = lookup
            .get("AUTH_SERVER_URL")
            .or_else(|| provider.default_base_url().map(str::to_string))
            .ok_or(ConfigError::Missing("AUTH_SERVER_URL"))?;
        let base_url = validate_base_url(base_url)?;

        let unknown_user_policy = match lookup.get("AUTH_UNKNOWN_USER_POLICY") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "AUTH_UNKNOWN_USER_POLICY",
                value: raw,
            })?,
            None => UnknownUserPolicy::Provision,
        };

        Ok(Self {
            provider,
            base_url,
            api_version: lookup
                .get("AUTH_API_VERSION")
                .unwrap_or_else(|| "v1".to_string()),
            client_id: lookup
                .get("OAUTH2_CLIENT_ID")
                .unwrap_or_else(|| "base_client".to_string()),
            client_secret: lookup.get("OAUTH2_CLIENT_SECRET_KEY").unwrap_or_default(),
            grant_type: lookup
                .get("OAUTH2_GRANT_TYPE")
                .unwrap_or_else(|| "password".to_string()),
            scope: lookup
                .get("OAUTH2_SCOPE")
                .unwrap_or_else(|| "identity:users,identity:roles".to_string()),
            header_type: lookup
                .get("AUTH_HEADER_TYPE")
                .unwrap_or_else(|| "JWT".to_string()),
            timeout_secs: parse_or(lookup, "AUTH_TIMEOUT_SECS", 10)?,
            connect_timeout_secs: parse_or(lookup, "AUTH_CONNECT_TIMEOUT_SECS", 5)?,
            max_retries: parse_or(lookup, "AUTH_MAX_RETRIES", 2)?,
            retry_backoff_ms: parse_or(lookup, "AUTH_RETRY_BACKOFF_MS", 100)?,
            unknown_user_policy,
        })
    }

    /// Absolute URL for an endpoint path such as `login` or `token/refresh`.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}/{}/",
            self.base_url,
            self.api_version.trim_matches('/'),
            path.trim_matches('/')
        )
    }
}

fn validate_base_url(raw: String) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let host = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"));

    match host {
        Some(rest) if !rest.is_empty() && !rest.starts_with('/') => Ok(trimmed.to_string()),
        _ => Err(ConfigError::Invalid {
            key: "AUTH_SERVER_URL",
            value: raw,
        }),
    }
}
