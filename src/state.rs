use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use secureload_auth::{TokenError, TokenValidator};
use secureload_config::{AppConfig, CorsConfig};
use secureload_db::{IdentityStore, MemoryIdentityStore, PgIdentityStore, init_db_pool};
use secureload_upstream::{AuthProvider, build_provider};
use tracing::warn;

use crate::middleware::auth::AuthBackend;
use crate::modules::auth::handler::AuthHandler;

/// Process-wide services, built once at startup and shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn IdentityStore>,
    pub auth_backend: Arc<AuthBackend>,
    pub auth_handler: Arc<AuthHandler>,
    pub cors_config: CorsConfig,
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    /// Wires the backend and handler around one shared provider and store.
    pub fn new(
        config: &AppConfig,
        store: Arc<dyn IdentityStore>,
        provider: Arc<dyn AuthProvider>,
    ) -> Result<Self, TokenError> {
        let validator = TokenValidator::new(&config.jwt)?;

        let auth_backend = AuthBackend::new(
            validator.clone(),
            provider.clone(),
            store.clone(),
            &config.upstream,
        );
        let auth_handler = AuthHandler::new(provider, validator, store.clone());

        Ok(Self {
            store,
            auth_backend: Arc::new(auth_backend),
            auth_handler: Arc::new(auth_handler),
            cors_config: config.cors.clone(),
            metrics_handle: None,
        })
    }

    pub fn with_metrics(mut self, handle: Option<PrometheusHandle>) -> Self {
        self.metrics_handle = handle;
        self
    }
}

pub async fn init_app_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let store: Arc<dyn IdentityStore> = match &config.server.database_url {
        Some(url) => Arc::new(PgIdentityStore::new(init_db_pool(url).await?)),
        None => {
            warn!("DATABASE_URL is not set, using the in-memory identity store");
            Arc::new(MemoryIdentityStore::new())
        }
    };
    let provider = build_provider(&config.upstream)?;

    Ok(AppState::new(config, store, provider)?)
}
