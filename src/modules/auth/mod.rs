//! Login and token refresh against the authorization server.

pub mod controller;
pub mod error;
pub mod handler;
pub mod router;
