//! # SecureLoad Core
//!
//! Foundational types shared by every SecureLoad crate:
//!
//! - [`errors`]: the HTTP-facing [`AppError`] and its JSON rendering
//! - [`password`]: bcrypt hashing for the local user mirror
//!
//! # Example
//!
//! ```ignore
//! use secureload_core::{AppError, hash_password, verify_password};
//!
//! let hash = hash_password("p@ss1")?;
//! assert!(verify_password("p@ss1", &hash)?);
//!
//! let error = AppError::not_found(anyhow::anyhow!("User not found"));
//! ```

pub mod errors;
pub mod password;

pub use errors::AppError;
pub use password::{UNUSABLE_PASSWORD_PREFIX, hash_password, unusable_password, verify_password};
