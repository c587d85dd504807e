use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Json, response::IntoResponse};
use secureload_core::AppError;
use secureload_models::{
    CreateUserDto, DetailResponse, UpdateProfileDto, UpdateUserDto, UserDetail, UserExistsRequest,
};
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::auth::AuthUser;
use crate::middleware::context::RequestContext;
use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::service::UserService;

#[instrument(skip_all, fields(user_id = %auth_user.user.id))]
pub async fn get_profile(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<UserDetail>, AppError> {
    let user = UserService::get_user(state.store.as_ref(), auth_user.user.id).await?;
    Ok(Json(user))
}

#[instrument(skip_all, fields(user_id = %auth_user.user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    auth_user: AuthUser,
    context: RequestContext,
    ValidatedJson(dto): ValidatedJson<UpdateProfileDto>,
) -> Result<Json<UserDetail>, AppError> {
    let user = UserService::update_profile(
        state.store.as_ref(),
        &state.auth_handler,
        &context,
        &auth_user.user,
        dto,
    )
    .await?;
    Ok(Json(user))
}

#[instrument(skip(state))]
pub async fn get_users(State(state): State<AppState>) -> Result<Json<Vec<UserDetail>>, AppError> {
    let users = UserService::get_users(state.store.as_ref()).await?;
    Ok(Json(users))
}

/// Create a user upstream, acting as the caller, and mirror it locally.
#[instrument(skip_all, fields(username = %dto.username))]
pub async fn create_user(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    context: RequestContext,
    ValidatedJson(dto): ValidatedJson<CreateUserDto>,
) -> Result<(StatusCode, Json<UserDetail>), AppError> {
    let user =
        UserService::create_user(state.store.as_ref(), &state.auth_handler, &context, dto).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserDetail>, AppError> {
    let user = UserService::get_user(state.store.as_ref(), id).await?;
    Ok(Json(user))
}

#[instrument(skip(state, _auth_user, dto))]
pub async fn update_user(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateUserDto>,
) -> Result<Json<UserDetail>, AppError> {
    let user = UserService::update_user(state.store.as_ref(), id, dto).await?;
    Ok(Json(user))
}

/// 200 `Exists` when a local user has the username, 404 `Not Exists` otherwise.
#[instrument(skip_all, fields(username = %dto.username))]
pub async fn user_exists(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<UserExistsRequest>,
) -> Result<impl IntoResponse, AppError> {
    if UserService::user_exists(state.store.as_ref(), &dto.username).await? {
        Ok((StatusCode::OK, Json(DetailResponse::new("Exists"))))
    } else {
        Ok((StatusCode::NOT_FOUND, Json(DetailResponse::new("Not Exists"))))
    }
}
