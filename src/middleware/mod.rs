//! Request authentication and per-request context.
//!
//! # Modules
//!
//! - [`auth`]: token authentication middleware, [`auth::AuthBackend`] and
//!   the [`auth::AuthUser`] extractor
//! - [`context`]: [`context::RequestContext`], the typed carrier of the
//!   validated access token
//!
//! # Example
//!
//! ```ignore
//! use crate::middleware::auth::AuthUser;
//! use crate::middleware::context::RequestContext;
//!
//! // Requires an authenticated caller (401 otherwise)
//! async fn profile(auth_user: AuthUser) -> impl IntoResponse {
//!     Json(auth_user.user.username)
//! }
//!
//! // Acts upstream with the caller's token
//! async fn invite(context: RequestContext) -> impl IntoResponse {
//!     context.access_token().is_some().to_string()
//! }
//! ```

pub mod auth;
pub mod context;
