use secureload_auth::TokenError;
use secureload_core::AppError;
use secureload_db::StoreError;
use secureload_upstream::UpstreamAuthError;
use thiserror::Error;

/// Failures of token-mediated authentication and the upstream operations
/// that run on behalf of a request.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The bearer token failed local validation.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// The authorization server refused or could not confirm the token.
    #[error("{}", .0.detail())]
    Authentication(UpstreamAuthError),

    /// The token is valid but names no usable local user.
    #[error("{0}")]
    UserResolution(String),

    #[error("No active access token for this request")]
    NoActiveToken,

    #[error("{0}")]
    Login(String),

    #[error("{0}")]
    Refresh(String),

    #[error(transparent)]
    Upstream(#[from] UpstreamAuthError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to hash password: {0}")]
    Hashing(String),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Token(_)
            | AuthError::Authentication(_)
            | AuthError::UserResolution(_)
            | AuthError::NoActiveToken => AppError::unauthorized(err.to_string()),
            AuthError::Login(_) | AuthError::Refresh(_) => AppError::bad_request(err),
            AuthError::Upstream(UpstreamAuthError::Rejected { .. }) => AppError::bad_request(err),
            AuthError::Upstream(
                UpstreamAuthError::Unavailable | UpstreamAuthError::InvalidResponse,
            ) => AppError::bad_gateway(err),
            AuthError::Upstream(UpstreamAuthError::Client(_)) => AppError::internal(err),
            AuthError::Store(store) => store.into(),
            AuthError::Hashing(_) => AppError::internal(err),
        }
    }
}
