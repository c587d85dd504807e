//! Group (role) and permission models.
//!
//! The hierarchy is flat: a group owns a set of permissions and a user
//! belongs to a set of groups.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Permission {
    pub id: Uuid,
    pub name: String,
    pub codename: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupWithPermissions {
    pub id: Uuid,
    pub name: String,
    pub permissions: Vec<Permission>,
}

impl GroupWithPermissions {
    pub fn new(group: Group, permissions: Vec<Permission>) -> Self {
        Self {
            id: group.id,
            name: group.name,
            permissions,
        }
    }
}

// DTOs

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateGroupDto {
    #[validate(length(
        min = 1,
        max = 150,
        message = "Name must be between 1 and 150 characters"
    ))]
    pub name: String,
    /// Permission IDs to attach
    #[serde(default)]
    pub permissions: Vec<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateGroupDto {
    #[validate(length(
        min = 1,
        max = 150,
        message = "Name must be between 1 and 150 characters"
    ))]
    pub name: Option<String>,
    /// Replaces the permission set when present
    pub permissions: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePermissionDto {
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 100, message = "Codename must be between 1 and 100 characters"))]
    pub codename: String,
    #[validate(length(min = 1, max = 100, message = "Category must be between 1 and 100 characters"))]
    pub category: String,
}
