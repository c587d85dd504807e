//! Access token claims.
//!
//! The authorization server owns the token layout. Only `exp` is required;
//! the identity of the caller is carried in `username`, with `sub` as a
//! fallback for servers that use the standard subject claim.

use serde::{Deserialize, Serialize};

/// Token type marker the authorization server puts on access tokens.
pub const ACCESS_TOKEN_TYPE: &str = "access";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// `access` or `refresh` when the server labels its tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Expiration timestamp (Unix seconds)
    pub exp: u64,
    /// Issued-at timestamp (Unix seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
    /// Unique token identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Upstream user primary key, numeric or string depending on the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl Claims {
    /// Access token claims for `username` expiring at `exp`.
    pub fn for_user(username: &str, exp: u64) -> Self {
        Self {
            token_type: Some(ACCESS_TOKEN_TYPE.to_string()),
            exp,
            iat: None,
            jti: None,
            sub: None,
            user_id: None,
            username: Some(username.to_string()),
        }
    }

    /// Username used to resolve the local user.
    pub fn identity(&self) -> Option<&str> {
        self.username
            .as_deref()
            .or(self.sub.as_deref())
            .filter(|s| !s.is_empty())
    }

    pub fn is_access_token(&self) -> bool {
        self.token_type
            .as_deref()
            .is_none_or(|t| t == ACCESS_TOKEN_TYPE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_deserialize_upstream_payload() {
        let json = r#"{"token_type":"access","exp":9999999999,"jti":"4f1c","user_id":7,"username":"alice"}"#;
        let claims: Claims = serde_json::from_str(json).unwrap();
        assert_eq!(claims.identity(), Some("alice"));
        assert_eq!(claims.user_id, Some(serde_json::json!(7)));
        assert!(claims.is_access_token());
    }

    #[test]
    fn test_identity_falls_back_to_sub() {
        let json = r#"{"exp":9999999999,"sub":"bob"}"#;
        let claims: Claims = serde_json::from_str(json).unwrap();
        assert_eq!(claims.identity(), Some("bob"));
        assert!(claims.is_access_token());
    }

    #[test]
    fn test_empty_identity_is_none() {
        let mut claims = Claims::for_user("", 9999999999);
        assert_eq!(claims.identity(), None);
        claims.sub = Some("carol".to_string());
        assert_eq!(claims.identity(), Some("carol"));
    }

    #[test]
    fn test_refresh_token_is_not_access() {
        let mut claims = Claims::for_user("alice", 9999999999);
        claims.token_type = Some("refresh".to_string());
        assert!(!claims.is_access_token());
    }

    #[test]
    fn test_claims_serialize_skips_absent_fields() {
        let serialized = serde_json::to_string(&Claims::for_user("alice", 10)).unwrap();
        assert!(serialized.contains(r#""username":"alice""#));
        assert!(!serialized.contains("jti"));
    }
}
