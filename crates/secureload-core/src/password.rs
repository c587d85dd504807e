//! Password hashing for the local user mirror.
//!
//! The authorization server owns the canonical credentials; the local hash
//! only backs old-password checks on profile updates. Users provisioned
//! without a known password receive an unusable marker that never verifies.

use bcrypt::{DEFAULT_COST, hash, verify};

use crate::errors::AppError;

/// Prefix marking a stored hash that must never match any password.
pub const UNUSABLE_PASSWORD_PREFIX: &str = "!";

pub fn hash_password(password: &str) -> Result<String, AppError> {
    hash(password, DEFAULT_COST)
        .map_err(|e| AppError::internal(anyhow::anyhow!("Failed to hash password: {}", e)))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    if hash.starts_with(UNUSABLE_PASSWORD_PREFIX) {
        return Ok(false);
    }

    verify(password, hash)
        .map_err(|e| AppError::internal(anyhow::anyhow!("Failed to verify password: {}", e)))
}

pub fn unusable_password() -> String {
    UNUSABLE_PASSWORD_PREFIX.to_string()
}
