//! Local verification of access tokens.
//!
//! [`TokenValidator`] checks the signature and expiry of a bearer token with
//! the key shared with the authorization server. It never performs I/O, so
//! the outcome depends only on the token, the key and the clock.
//!
//! # Failure classes
//!
//! - [`TokenError::Malformed`]: not a decodable JWT (segments, base64, JSON,
//!   missing `exp`)
//! - [`TokenError::Invalid`]: decodable but untrusted (signature, algorithm,
//!   non-access token type)
//! - [`TokenError::Expired`]: trusted but past `exp`
//!
//! All three mean the client must log in or refresh again.

use std::str::FromStr;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secureload_config::JwtConfig;
use thiserror::Error;

use crate::claims::Claims;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token is malformed")]
    Malformed,

    #[error("Token is invalid")]
    Invalid,

    #[error("Token is expired")]
    Expired,

    #[error("Unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Signing key is empty")]
    MissingKey,

    #[error("Failed to sign token: {0}")]
    Encoding(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidToken
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_)
            | ErrorKind::MissingRequiredClaim(_) => TokenError::Malformed,
            _ => TokenError::Invalid,
        }
    }
}

fn hmac_algorithm(name: &str) -> Result<Algorithm, TokenError> {
    match Algorithm::from_str(name) {
        Ok(alg @ (Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)) => Ok(alg),
        _ => Err(TokenError::UnsupportedAlgorithm(name.to_string())),
    }
}

#[derive(Clone)]
pub struct TokenValidator {
    key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenValidator")
            .field("algorithms", &self.validation.algorithms)
            .field("leeway", &self.validation.leeway)
            .finish_non_exhaustive()
    }
}

impl TokenValidator {
    /// Builds the validator from startup configuration.
    ///
    /// # Errors
    ///
    /// [`TokenError::MissingKey`] for an empty secret and
    /// [`TokenError::UnsupportedAlgorithm`] for anything outside the HMAC
    /// family. Both are startup failures.
    pub fn new(config: &JwtConfig) -> Result<Self, TokenError> {
        if config.secret.is_empty() {
            return Err(TokenError::MissingKey);
        }
        let algorithm = hmac_algorithm(&config.algorithm)?;

        let mut validation = Validation::new(algorithm);
        validation.leeway = config.leeway;
        validation.validate_aud = false;

        Ok(Self {
            key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
        })
    }

    /// Verifies `raw_token` and returns its claims.
    pub fn validate(&self, raw_token: &str) -> Result<Claims, TokenError> {
        let claims = decode::<Claims>(raw_token, &self.key, &self.validation)?.claims;

        if !claims.is_access_token() {
            return Err(TokenError::Invalid);
        }

        Ok(claims)
    }
}

/// Signs `claims` with the configured key and algorithm.
pub fn encode_claims(claims: &Claims, config: &JwtConfig) -> Result<String, TokenError> {
    let algorithm = hmac_algorithm(&config.algorithm)?;

    encode(
        &Header::new(algorithm),
        claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| TokenError::Encoding(e.to_string()))
}
