//! Feature modules. Each has a `controller` (HTTP handlers), a `router`,
//! and a `service` or `handler` holding the logic.
//!
//! - [`auth`]: login and token refresh
//! - [`users`]: profile, user management and username lookup
//! - [`roles`]: groups (roles) and permissions

pub mod auth;
pub mod roles;
pub mod users;
