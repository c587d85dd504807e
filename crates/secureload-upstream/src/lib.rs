//! # SecureLoad Upstream
//!
//! Client for the remote authorization server that owns user identities.
//!
//! - [`AuthProvider`]: the operations the service needs (token issue and
//!   refresh, profile lookup, remote user creation, password change)
//! - [`HttpAuthProvider`]: reqwest implementation with timeouts and retry
//!   of idempotent reads
//! - [`build_provider`]: picks the configured deployment once at startup

pub mod error;
pub mod http;
pub mod provider;

pub use error::{GENERIC_DETAIL, UpstreamAuthError};
pub use http::HttpAuthProvider;
pub use provider::{AuthProvider, build_provider};
