use crate::{Lookup, env_lookup};

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    /// PostgreSQL URL for the identity store. Unset selects the in-memory store.
    pub database_url: Option<String>,
    /// Directory for rolling log files.
    pub log_dir: String,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(&env_lookup)
    }

    pub fn from_lookup<L: Lookup + ?Sized>(lookup: &L) -> Self {
        Self {
            bind_address: lookup
                .get("BIND_ADDRESS")
                .unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            database_url: lookup.get("DATABASE_URL"),
            log_dir: lookup
                .get("LOG_DIR")
                .unwrap_or_else(|| "storage/logs".to_string()),
        }
    }
}
