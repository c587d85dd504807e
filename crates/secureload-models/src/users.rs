//! User models and DTOs.
//!
//! [`LocalUser`] is the persisted mirror of an identity owned by the
//! authorization server. [`UserProfile`] is the server's view of the same
//! person; only a fixed allow-list of its fields is copied locally.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::roles::GroupWithPermissions;

/// A user in the local identity mirror.
#[derive(Serialize, Deserialize, FromRow, Debug, Clone, PartialEq, Eq)]
pub struct LocalUser {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Row to insert into the identity mirror. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewLocalUser {
    pub username: String,
    pub password_hash: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
}

impl NewLocalUser {
    /// Copies the allow-listed profile fields: first name, last name, email
    /// and active flag.
    pub fn from_profile(username: &str, password_hash: String, profile: &UserProfile) -> Self {
        Self {
            username: username.to_string(),
            password_hash,
            email: profile.email.clone().unwrap_or_default(),
            first_name: profile.first_name.clone().unwrap_or_default(),
            last_name: profile.last_name.clone().unwrap_or_default(),
            is_active: profile.is_active,
        }
    }
}

/// Partial update of a local user. `None` leaves the column unchanged.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_active: Option<bool>,
    pub password_hash: Option<String>,
}

/// User detail as returned by the authorization server's profile endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UserProfile {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Fields this service does not interpret.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_active() -> bool {
    true
}

/// Payload for creating a user on the authorization server.
#[derive(Serialize, Clone)]
pub struct NewRemoteUser {
    pub username: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl std::fmt::Debug for NewRemoteUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewRemoteUser")
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// A local user with the groups (roles) it belongs to.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserDetail {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub roles: Vec<GroupWithPermissions>,
}

impl UserDetail {
    pub fn new(user: LocalUser, roles: Vec<GroupWithPermissions>) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            is_active: user.is_active,
            roles,
        }
    }
}

/// DTO for creating a user both upstream and locally.
#[derive(Deserialize, Clone, Validate)]
pub struct CreateUserDto {
    #[validate(length(min = 1, max = 150, message = "username must be between 1 and 150 characters"))]
    pub username: String,
    #[validate(length(min = 1, message = "password may not be blank"))]
    pub password: String,
    #[validate(email(message = "email must be a valid address"))]
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Group IDs to assign. Accepts `groups` as an alias.
    #[serde(default, alias = "groups")]
    pub roles: Vec<Uuid>,
}

impl std::fmt::Debug for CreateUserDto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateUserDto")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("roles", &self.roles)
            .finish_non_exhaustive()
    }
}

impl CreateUserDto {
    pub fn remote_payload(&self) -> NewRemoteUser {
        NewRemoteUser {
            username: self.username.clone(),
            password: self.password.clone(),
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
        }
    }
}

/// DTO for the authenticated user's own profile.
///
/// A password change needs both `password` and `old_password`.
#[derive(Deserialize, Clone, Default, Validate)]
pub struct UpdateProfileDto {
    #[validate(email(message = "email must be a valid address"))]
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[validate(length(min = 1, message = "password may not be blank"))]
    pub password: Option<String>,
    pub old_password: Option<String>,
}

impl std::fmt::Debug for UpdateProfileDto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateProfileDto")
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("password_change", &self.password.is_some())
            .finish()
    }
}

/// DTO for an administrative user update.
#[derive(Deserialize, Debug, Clone, Default, Validate)]
pub struct UpdateUserDto {
    /// Usernames are owned by the authorization server; a value here is
    /// refused rather than applied to the local row only.
    pub username: Option<String>,
    #[validate(email(message = "email must be a valid address"))]
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_active: Option<bool>,
    #[serde(default, alias = "groups")]
    pub roles: Option<Vec<Uuid>>,
}

impl UpdateUserDto {
    pub fn changes(&self) -> UserChanges {
        UserChanges {
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            is_active: self.is_active,
            password_hash: None,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Validate)]
pub struct UserExistsRequest {
    #[validate(length(min = 1, message = "username may not be blank"))]
    pub username: String,
}
