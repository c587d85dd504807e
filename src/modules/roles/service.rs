use anyhow::anyhow;
use secureload_core::AppError;
use secureload_db::IdentityStore;
use secureload_models::{
    CreateGroupDto, CreatePermissionDto, GroupWithPermissions, Permission, UpdateGroupDto,
};
use tracing::{info, instrument};
use uuid::Uuid;

pub struct RoleService;

impl RoleService {
    // ============ Permissions ============

    #[instrument(skip(store))]
    pub async fn get_permissions(store: &dyn IdentityStore) -> Result<Vec<Permission>, AppError> {
        Ok(store.list_permissions().await?)
    }

    #[instrument(skip(store))]
    pub async fn create_permission(
        store: &dyn IdentityStore,
        dto: CreatePermissionDto,
    ) -> Result<Permission, AppError> {
        let permission = store.create_permission(&dto).await?;
        info!(permission_id = %permission.id, codename = %permission.codename, "Permission created");
        Ok(permission)
    }

    // ============ Roles ============

    #[instrument(skip(store))]
    pub async fn get_roles(
        store: &dyn IdentityStore,
    ) -> Result<Vec<GroupWithPermissions>, AppError> {
        Ok(store.list_groups().await?)
    }

    #[instrument(skip(store))]
    pub async fn get_role(
        store: &dyn IdentityStore,
        id: Uuid,
    ) -> Result<GroupWithPermissions, AppError> {
        store
            .find_group(id)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Role not found")))
    }

    #[instrument(skip(store))]
    pub async fn create_role(
        store: &dyn IdentityStore,
        dto: CreateGroupDto,
    ) -> Result<GroupWithPermissions, AppError> {
        let role = store.create_group(&dto.name, &dto.permissions).await?;
        info!(role_id = %role.id, name = %role.name, "Role created");
        Ok(role)
    }

    #[instrument(skip(store))]
    pub async fn update_role(
        store: &dyn IdentityStore,
        id: Uuid,
        dto: UpdateGroupDto,
    ) -> Result<GroupWithPermissions, AppError> {
        Ok(store
            .update_group(id, dto.name.as_deref(), dto.permissions.as_deref())
            .await?)
    }

    #[instrument(skip(store))]
    pub async fn delete_role(store: &dyn IdentityStore, id: Uuid) -> Result<(), AppError> {
        store.delete_group(id).await?;
        info!(role_id = %id, "Role deleted");
        Ok(())
    }
}
