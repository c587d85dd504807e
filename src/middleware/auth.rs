//! Token authentication against the authorization server.
//!
//! Every `/api` request passes through [`authenticate_request`]:
//!
//! 1. No `Authorization: <scheme> <token>` header: the request continues
//!    anonymously
//! 2. The token is validated locally; failure ends the request with 401
//!    before the authorization server is contacted
//! 3. The authorization server confirms the token by returning the caller's
//!    profile
//! 4. The local user is resolved (and provisioned when allowed), and the
//!    token is stored in the [`RequestContext`] for later upstream calls

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use secureload_auth::{Claims, TokenValidator};
use secureload_config::{UnknownUserPolicy, UpstreamConfig};
use secureload_core::{AppError, unusable_password};
use secureload_db::IdentityStore;
use secureload_models::{LocalUser, NewLocalUser, UserProfile};
use secureload_upstream::AuthProvider;
use tracing::{debug, info, instrument, warn};

use crate::metrics::track_local_user_provisioned;
use crate::middleware::context::RequestContext;
use crate::modules::auth::error::AuthError;
use crate::state::AppState;

/// The authenticated caller, available to handlers as an extractor.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: LocalUser,
    pub claims: Claims,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| AppError::unauthorized("Authentication credentials were not provided."))
    }
}

/// Result of a successful authentication.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub user: LocalUser,
    pub claims: Claims,
    pub context: RequestContext,
}

/// Extracts the token from `Authorization: <scheme> <token>`.
///
/// Returns `None` unless the header has exactly two whitespace-separated
/// parts and the first is `scheme`.
pub fn parse_authorization<'a>(headers: &'a HeaderMap, scheme: &str) -> Option<&'a str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let mut parts = value.split_whitespace();
    let (found_scheme, token) = (parts.next()?, parts.next()?);

    if parts.next().is_some() || found_scheme != scheme {
        return None;
    }
    Some(token)
}

pub struct AuthBackend {
    validator: TokenValidator,
    provider: Arc<dyn AuthProvider>,
    store: Arc<dyn IdentityStore>,
    header_type: String,
    unknown_user_policy: UnknownUserPolicy,
}

impl AuthBackend {
    pub fn new(
        validator: TokenValidator,
        provider: Arc<dyn AuthProvider>,
        store: Arc<dyn IdentityStore>,
        config: &UpstreamConfig,
    ) -> Self {
        Self {
            validator,
            provider,
            store,
            header_type: config.header_type.clone(),
            unknown_user_policy: config.unknown_user_policy,
        }
    }

    pub fn name(&self) -> &str {
        self.provider.name()
    }

    /// Authenticates a request from its headers.
    ///
    /// `Ok(None)` means the request carries no credentials for this backend.
    #[instrument(skip_all, fields(backend = self.name()))]
    pub async fn authenticate(
        &self,
        headers: &HeaderMap,
    ) -> Result<Option<Authenticated>, AuthError> {
        let Some(token) = parse_authorization(headers, &self.header_type) else {
            return Ok(None);
        };

        let claims = self.validator.validate(token)?;
        let profile = self.authorize(token).await?;
        let context = RequestContext::with_token(token);
        let user = self.resolve_user(&claims, &profile).await?;

        Ok(Some(Authenticated {
            user,
            claims,
            context,
        }))
    }

    /// Confirms the token with the authorization server.
    pub async fn authorize(&self, access_token: &str) -> Result<UserProfile, AuthError> {
        self.provider
            .fetch_user_profile(access_token)
            .await
            .map_err(|e| {
                warn!(error = %e, "Authorization server did not confirm token");
                AuthError::Authentication(e)
            })
    }

    async fn resolve_user(
        &self,
        claims: &Claims,
        profile: &UserProfile,
    ) -> Result<LocalUser, AuthError> {
        let username = claims.identity().ok_or_else(|| {
            AuthError::UserResolution(
                "Token contained no recognizable user identification".to_string(),
            )
        })?;

        let user = match self.store.find_user_by_username(username).await? {
            Some(user) => user,
            None if self.unknown_user_policy == UnknownUserPolicy::Reject => {
                return Err(AuthError::UserResolution("User not found".to_string()));
            }
            None => {
                let new_user = NewLocalUser::from_profile(username, unusable_password(), profile);
                let (user, created) = self.store.insert_user_if_absent(new_user).await?;
                if created {
                    track_local_user_provisioned("authenticate");
                    info!(username = %user.username, "Provisioned local user from token");
                }
                user
            }
        };

        if !user.is_active {
            return Err(AuthError::UserResolution("User is inactive".to_string()));
        }
        Ok(user)
    }
}

/// Middleware running [`AuthBackend::authenticate`] for every request.
pub async fn authenticate_request(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    match state.auth_backend.authenticate(req.headers()).await {
        Ok(Some(authenticated)) => {
            let extensions = req.extensions_mut();
            extensions.insert(AuthUser {
                user: authenticated.user,
                claims: authenticated.claims,
            });
            extensions.insert(authenticated.context);
        }
        Ok(None) => {}
        Err(err) => {
            debug!(error = %err, "Authentication failed");
            return Err(err.into());
        }
    }

    Ok(next.run(req).await)
}
