//! # SecureLoad Config
//!
//! Process-wide configuration, resolved once at startup from environment
//! variables and treated as immutable afterwards:
//!
//! - [`jwt`]: signing key and algorithm for local token validation
//! - [`upstream`]: authorization server location, client credentials and
//!   HTTP behavior
//! - [`cors`]: allowed browser origins
//! - [`server`]: bind address and database URL
//!
//! Every `from_env` constructor has a `from_lookup` twin that reads from an
//! arbitrary key lookup, which keeps parsing testable without touching the
//! process environment.
//!
//! # Example
//!
//! ```ignore
//! use secureload_config::AppConfig;
//!
//! let config = AppConfig::from_env()?;
//! println!("Authorization server: {}", config.upstream.base_url);
//! ```

pub mod cors;
pub mod error;
pub mod jwt;
pub mod server;
pub mod upstream;

pub use cors::CorsConfig;
pub use error::ConfigError;
pub use jwt::JwtConfig;
pub use server::ServerConfig;
pub use upstream::{ProviderKind, UnknownUserPolicy, UpstreamConfig};

/// Key lookup used by the `from_lookup` constructors.
pub trait Lookup {
    fn get(&self, key: &str) -> Option<String>;
}

impl<F> Lookup for F
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        self(key)
    }
}

/// Reads from the process environment, treating empty values as unset.
pub fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

pub(crate) fn parse_or<L, T>(lookup: &L, key: &'static str, default: T) -> Result<T, ConfigError>
where
    L: Lookup + ?Sized,
    T: std::str::FromStr,
{
    match lookup.get(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            key,
            value: raw,
        }),
        None => Ok(default),
    }
}

/// All configuration sections, loaded together at process start.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub jwt: JwtConfig,
    pub upstream: UpstreamConfig,
    pub cors: CorsConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&env_lookup)
    }

    pub fn from_lookup<L: Lookup + ?Sized>(lookup: &L) -> Result<Self, ConfigError> {
        Ok(Self {
            jwt: JwtConfig::from_lookup(lookup)?,
            upstream: UpstreamConfig::from_lookup(lookup)?,
            cors: CorsConfig::from_lookup(lookup),
            server: ServerConfig::from_lookup(lookup),
        })
    }
}
