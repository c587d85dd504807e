//! # SecureLoad Auth
//!
//! Local, network-free validation of access tokens issued by the
//! authorization server.
//!
//! - [`claims`]: the decoded token payload
//! - [`validator`]: signature/expiry verification with the process-wide key
//!
//! # Example
//!
//! ```ignore
//! use secureload_auth::TokenValidator;
//! use secureload_config::JwtConfig;
//!
//! let validator = TokenValidator::new(&JwtConfig::from_env()?)?;
//! let claims = validator.validate(raw_token)?;
//! println!("Username: {:?}", claims.identity());
//! ```

pub mod claims;
pub mod validator;

pub use claims::Claims;
pub use validator::{TokenError, TokenValidator, encode_claims};
