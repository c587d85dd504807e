use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};

/// Per-request state established by authentication.
///
/// Holds the validated access token so later stages can act upstream on
/// behalf of the caller. Lives in the request extensions and is dropped with
/// the request; anonymous requests see an empty context.
#[derive(Clone, Default)]
pub struct RequestContext {
    access_token: Option<String>,
}

impl RequestContext {
    pub fn with_token(access_token: impl Into<String>) -> Self {
        Self {
            access_token: Some(access_token.into()),
        }
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("has_access_token", &self.access_token.is_some())
            .finish()
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .unwrap_or_default())
    }
}
