use async_trait::async_trait;
use secureload_core::AppError;
use secureload_models::{
    CreatePermissionDto, GroupWithPermissions, LocalUser, NewLocalUser, Permission, UserChanges,
};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => AppError::not_found(err),
            StoreError::Conflict(_) => AppError::conflict(err),
            StoreError::Database(_) => AppError::internal(err),
        }
    }
}

/// Persistence for the local identity mirror.
///
/// Usernames, group names and permission codenames are unique; violating
/// that yields [`StoreError::Conflict`]. Lists are ordered by username,
/// group name, and permission category then name respectively.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_user_by_username(&self, username: &str)
    -> Result<Option<LocalUser>, StoreError>;

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<LocalUser>, StoreError>;

    async fn list_users(&self) -> Result<Vec<LocalUser>, StoreError>;

    /// Inserts the user together with its group memberships. Nothing is
    /// stored when the username is taken or a group is missing.
    async fn create_user(
        &self,
        user: NewLocalUser,
        group_ids: &[Uuid],
    ) -> Result<LocalUser, StoreError>;

    /// Inserts the user unless the username is taken. Returns the stored row
    /// and whether this call created it. Concurrent callers for the same
    /// username all get the same row back.
    async fn insert_user_if_absent(
        &self,
        user: NewLocalUser,
    ) -> Result<(LocalUser, bool), StoreError>;

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<LocalUser, StoreError>;

    /// Replaces the user's group memberships.
    async fn set_user_groups(&self, user_id: Uuid, group_ids: &[Uuid]) -> Result<(), StoreError>;

    async fn user_groups(&self, user_id: Uuid) -> Result<Vec<GroupWithPermissions>, StoreError>;

    async fn list_groups(&self) -> Result<Vec<GroupWithPermissions>, StoreError>;

    async fn find_group(&self, id: Uuid) -> Result<Option<GroupWithPermissions>, StoreError>;

    async fn create_group(
        &self,
        name: &str,
        permission_ids: &[Uuid],
    ) -> Result<GroupWithPermissions, StoreError>;

    /// `None` leaves the field unchanged; `Some` permissions replace the set.
    async fn update_group(
        &self,
        id: Uuid,
        name: Option<&str>,
        permission_ids: Option<&[Uuid]>,
    ) -> Result<GroupWithPermissions, StoreError>;

    async fn delete_group(&self, id: Uuid) -> Result<(), StoreError>;

    async fn list_permissions(&self) -> Result<Vec<Permission>, StoreError>;

    async fn create_permission(&self, dto: &CreatePermissionDto) -> Result<Permission, StoreError>;
}
