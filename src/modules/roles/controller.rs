use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use secureload_core::AppError;
use secureload_models::{
    CreateGroupDto, CreatePermissionDto, GroupWithPermissions, Permission, UpdateGroupDto,
};
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::auth::AuthUser;
use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::service::RoleService;

// ============ Permissions ============

#[instrument(skip_all)]
pub async fn get_permissions(
    State(state): State<AppState>,
    _auth_user: AuthUser,
) -> Result<Json<Vec<Permission>>, AppError> {
    let permissions = RoleService::get_permissions(state.store.as_ref()).await?;
    Ok(Json(permissions))
}

#[instrument(skip(state, _auth_user))]
pub async fn create_permission(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<CreatePermissionDto>,
) -> Result<(StatusCode, Json<Permission>), AppError> {
    let permission = RoleService::create_permission(state.store.as_ref(), dto).await?;
    Ok((StatusCode::CREATED, Json(permission)))
}

// ============ Roles ============

#[instrument(skip_all)]
pub async fn get_roles(
    State(state): State<AppState>,
    _auth_user: AuthUser,
) -> Result<Json<Vec<GroupWithPermissions>>, AppError> {
    let roles = RoleService::get_roles(state.store.as_ref()).await?;
    Ok(Json(roles))
}

#[instrument(skip(state, _auth_user))]
pub async fn create_role(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<CreateGroupDto>,
) -> Result<(StatusCode, Json<GroupWithPermissions>), AppError> {
    let role = RoleService::create_role(state.store.as_ref(), dto).await?;
    Ok((StatusCode::CREATED, Json(role)))
}

#[instrument(skip(state, _auth_user))]
pub async fn get_role(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<GroupWithPermissions>, AppError> {
    let role = RoleService::get_role(state.store.as_ref(), id).await?;
    Ok(Json(role))
}

#[instrument(skip(state, _auth_user))]
pub async fn update_role(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateGroupDto>,
) -> Result<Json<GroupWithPermissions>, AppError> {
    let role = RoleService::update_role(state.store.as_ref(), id, dto).await?;
    Ok(Json(role))
}

#[instrument(skip(state, _auth_user))]
pub async fn delete_role(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    RoleService::delete_role(state.store.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
