use std::sync::Arc;

use async_trait::async_trait;
use secureload_config::UpstreamConfig;
use secureload_models::{Credentials, NewRemoteUser, TokenPair, UserProfile};

use crate::error::UpstreamAuthError;
use crate::http::HttpAuthProvider;

/// Operations the service needs from the authorization server.
///
/// Implementations hold no per-request state and are shared behind an
/// `Arc` for the life of the process.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Display name of the configured deployment.
    fn name(&self) -> &str;

    fn base_url(&self) -> &str;

    /// Exchanges credentials for an access/refresh pair.
    async fn issue_token(&self, credentials: &Credentials) -> Result<TokenPair, UpstreamAuthError>;

    async fn refresh_token(&self, refresh: &str) -> Result<TokenPair, UpstreamAuthError>;

    /// Fetches the profile of the user the access token belongs to.
    async fn fetch_user_profile(&self, access_token: &str)
    -> Result<UserProfile, UpstreamAuthError>;

    /// Creates a user upstream, acting as the holder of `access_token`.
    async fn create_remote_user(
        &self,
        access_token: &str,
        user: &NewRemoteUser,
    ) -> Result<UserProfile, UpstreamAuthError>;

    async fn update_remote_password(
        &self,
        access_token: &str,
        username: &str,
        password: &str,
    ) -> Result<(), UpstreamAuthError>;
}

/// Builds the HTTP provider for the configured server. `config.provider`
/// is a preset that only picks the display name and default base URL.
pub fn build_provider(config: &UpstreamConfig) -> Result<Arc<dyn AuthProvider>, UpstreamAuthError> {
    let provider = HttpAuthProvider::new(config.clone())?;
    tracing::info!(
        target: "secureload.upstream",
        provider = provider.name(),
        base_url = provider.base_url(),
        "Authorization server client ready"
    );
    Ok(Arc::new(provider))
}
