use std::sync::Arc;

use secureload_auth::TokenValidator;
use secureload_core::{UNUSABLE_PASSWORD_PREFIX, hash_password};
use secureload_db::IdentityStore;
use secureload_models::{
    Credentials, LocalUser, NewLocalUser, NewRemoteUser, TokenPair, UserChanges, UserProfile,
};
use secureload_upstream::{AuthProvider, UpstreamAuthError};
use tracing::{info, instrument, warn};

use crate::metrics::{track_local_user_provisioned, track_user_login_failure, track_user_login_success};
use crate::middleware::context::RequestContext;

use super::error::AuthError;

/// Login, refresh and remote user operations against the authorization
/// server.
pub struct AuthHandler {
    provider: Arc<dyn AuthProvider>,
    validator: TokenValidator,
    store: Arc<dyn IdentityStore>,
}

impl AuthHandler {
    pub fn new(
        provider: Arc<dyn AuthProvider>,
        validator: TokenValidator,
        store: Arc<dyn IdentityStore>,
    ) -> Self {
        Self {
            provider,
            validator,
            store,
        }
    }

    /// Exchanges credentials for a token pair and makes sure the user has a
    /// local mirror row.
    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    pub async fn login(&self, credentials: &Credentials) -> Result<TokenPair, AuthError> {
        let pair = self.provider.issue_token(credentials).await.map_err(|e| {
            let reason = match e {
                UpstreamAuthError::Rejected { .. } => "rejected",
                _ => "upstream_error",
            };
            track_user_login_failure(reason);
            AuthError::Login(e.detail().to_string())
        })?;

        let claims = self.validator.validate(&pair.access)?;
        let username = match claims.identity() {
            Some(identity) if identity != credentials.username => {
                warn!(token_username = %identity, "Token identity differs from login username");
                identity
            }
            Some(identity) => identity,
            None => credentials.username.as_str(),
        };

        match self.store.find_user_by_username(username).await? {
            None => {
                self.create_new_local_user(&pair.access, username, &credentials.password)
                    .await?;
            }
            Some(user) if user.password_hash.starts_with(UNUSABLE_PASSWORD_PREFIX) => {
                let password_hash = hash_off_thread(&credentials.password).await?;
                let changes = UserChanges {
                    password_hash: Some(password_hash),
                    ..Default::default()
                };
                self.store.update_user(user.id, changes).await?;
                info!(user_id = %user.id, "Stored password for just-in-time user");
            }
            Some(_) => {}
        }

        track_user_login_success();
        Ok(pair)
    }

    /// Creates the local mirror row for `username` from the profile the
    /// authorization server returns for `access_token`.
    ///
    /// Safe to race: concurrent calls for one username yield one row.
    #[instrument(skip(self, access_token, password))]
    pub async fn create_new_local_user(
        &self,
        access_token: &str,
        username: &str,
        password: &str,
    ) -> Result<LocalUser, AuthError> {
        let profile = self.provider.fetch_user_profile(access_token).await?;
        let password_hash = hash_off_thread(password).await?;

        let new_user = NewLocalUser::from_profile(username, password_hash, &profile);
        let (user, created) = self.store.insert_user_if_absent(new_user).await?;
        if created {
            track_local_user_provisioned("login");
            info!(user_id = %user.id, "Created local user");
        }
        Ok(user)
    }

    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh: &str) -> Result<TokenPair, AuthError> {
        self.provider
            .refresh_token(refresh)
            .await
            .map_err(|e| AuthError::Refresh(e.detail().to_string()))
    }

    /// Creates a user upstream, acting with the caller's token.
    #[instrument(skip(self, context, user), fields(username = %user.username))]
    pub async fn create_remote_user(
        &self,
        context: &RequestContext,
        user: &NewRemoteUser,
    ) -> Result<UserProfile, AuthError> {
        let token = context.access_token().ok_or(AuthError::NoActiveToken)?;
        Ok(self.provider.create_remote_user(token, user).await?)
    }

    #[instrument(skip(self, context, password))]
    pub async fn change_remote_password(
        &self,
        context: &RequestContext,
        username: &str,
        password: &str,
    ) -> Result<(), AuthError> {
        let token = context.access_token().ok_or(AuthError::NoActiveToken)?;
        Ok(self
            .provider
            .update_remote_password(token, username, password)
            .await?)
    }
}

/// bcrypt is CPU-bound; keep it off the async workers.
pub(crate) async fn hash_off_thread(password: &str) -> Result<String, AuthError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))?
        .map_err(|e| AuthError::Hashing(e.error.to_string()))
}
