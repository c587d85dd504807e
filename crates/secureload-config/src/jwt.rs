use crate::{ConfigError, Lookup, env_lookup, parse_or};

/// Signing material shared with the authorization server.
///
/// Access tokens are issued upstream but signed with a key this process also
/// holds, so their signature and expiry can be checked without a network
/// round trip.
#[derive(Clone)]
pub struct JwtConfig {
    pub secret: String,
    /// JOSE algorithm name, e.g. `HS256`.
    pub algorithm: String,
    /// Clock skew tolerance in seconds applied to `exp`.
    pub leeway: u64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[REDACTED]")
            .field("algorithm", &self.algorithm)
            .field("leeway", &self.leeway)
            .finish()
    }
}

impl JwtConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&env_lookup)
    }

    pub fn from_lookup<L: Lookup + ?Sized>(lookup: &L) -> Result<Self, ConfigError> {
        let secret = lookup
            .get("JWT_SECRET")
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let algorithm = lookup
            .get("JWT_ALGORITHM")
            .map(|a| a.trim().to_ascii_uppercase())
            .unwrap_or_else(|| "HS256".to_string());

        Ok(Self {
            secret,
            algorithm,
            leeway: parse_or(lookup, "JWT_LEEWAY", 0)?,
        })
    }
}
