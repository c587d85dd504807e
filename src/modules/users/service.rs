use anyhow::anyhow;
use secureload_core::{AppError, verify_password};
use secureload_db::IdentityStore;
use secureload_models::{
    CreateUserDto, LocalUser, NewLocalUser, UpdateProfileDto, UpdateUserDto, UserChanges,
    UserDetail,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::metrics::track_user_created;
use crate::middleware::context::RequestContext;
use crate::modules::auth::error::AuthError;
use crate::modules::auth::handler::{AuthHandler, hash_off_thread};

pub struct UserService;

impl UserService {
    async fn detail(store: &dyn IdentityStore, user: LocalUser) -> Result<UserDetail, AppError> {
        let roles = store.user_groups(user.id).await?;
        Ok(UserDetail::new(user, roles))
    }

    #[instrument(skip(store))]
    pub async fn get_users(store: &dyn IdentityStore) -> Result<Vec<UserDetail>, AppError> {
        let users = store.list_users().await?;
        let mut details = Vec::with_capacity(users.len());
        for user in users {
            details.push(Self::detail(store, user).await?);
        }
        Ok(details)
    }

    #[instrument(skip(store))]
    pub async fn get_user(store: &dyn IdentityStore, id: Uuid) -> Result<UserDetail, AppError> {
        let user = store
            .find_user_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("User not found")))?;
        Self::detail(store, user).await
    }

    #[instrument(skip(store))]
    pub async fn user_exists(store: &dyn IdentityStore, username: &str) -> Result<bool, AppError> {
        Ok(store.find_user_by_username(username).await?.is_some())
    }

    /// Creates the user on the authorization server with the caller's token,
    /// then mirrors it locally.
    #[instrument(skip(store, handler, context, dto), fields(username = %dto.username))]
    pub async fn create_user(
        store: &dyn IdentityStore,
        handler: &AuthHandler,
        context: &RequestContext,
        dto: CreateUserDto,
    ) -> Result<UserDetail, AppError> {
        if store.find_user_by_username(&dto.username).await?.is_some() {
            return Err(AppError::conflict(anyhow!("Username already exists")));
        }
        for role in &dto.roles {
            if store.find_group(*role).await?.is_none() {
                return Err(AppError::not_found(anyhow!("Group not found")));
            }
        }

        let profile = handler
            .create_remote_user(context, &dto.remote_payload())
            .await?;

        let password_hash = hash_off_thread(&dto.password).await?;
        let new_user = NewLocalUser {
            username: dto.username.clone(),
            password_hash,
            email: dto.email.or(profile.email).unwrap_or_default(),
            first_name: dto.first_name.or(profile.first_name).unwrap_or_default(),
            last_name: dto.last_name.or(profile.last_name).unwrap_or_default(),
            is_active: profile.is_active,
        };
        let user = store.create_user(new_user, &dto.roles).await?;

        track_user_created();
        info!(user_id = %user.id, "User created");
        Self::detail(store, user).await
    }

    #[instrument(skip(store, dto))]
    pub async fn update_user(
        store: &dyn IdentityStore,
        id: Uuid,
        dto: UpdateUserDto,
    ) -> Result<UserDetail, AppError> {
        if dto.username.is_some() {
            return Err(AppError::bad_request(anyhow!("Username cannot be changed")));
        }

        let user = store.update_user(id, dto.changes()).await?;
        if let Some(ref roles) = dto.roles {
            store.set_user_groups(user.id, roles).await?;
        }
        Self::detail(store, user).await
    }

    /// Updates the caller's own profile. A password change is checked
    /// against the current local password and pushed upstream before the
    /// local hash is replaced.
    #[instrument(skip_all, fields(user_id = %user.id))]
    pub async fn update_profile(
        store: &dyn IdentityStore,
        handler: &AuthHandler,
        context: &RequestContext,
        user: &LocalUser,
        dto: UpdateProfileDto,
    ) -> Result<UserDetail, AppError> {
        let mut changes = UserChanges {
            email: dto.email,
            first_name: dto.first_name,
            last_name: dto.last_name,
            ..Default::default()
        };

        if let Some(password) = dto.password {
            let old_password = dto.old_password.ok_or_else(|| {
                AppError::bad_request(anyhow!("old_password is required to change the password"))
            })?;
            if !verify_password(&old_password, &user.password_hash)? {
                return Err(AppError::bad_request(anyhow!("Old password is incorrect")));
            }

            match handler
                .change_remote_password(context, &user.username, &password)
                .await
            {
                Ok(()) => {}
                Err(AuthError::NoActiveToken) => return Err(AuthError::NoActiveToken.into()),
                Err(e) => {
                    warn!(error = %e, "Upstream password change failed");
                    return Err(AppError::bad_request(anyhow!("Can't change password now")));
                }
            }
            changes.password_hash = Some(hash_off_thread(&password).await?);
        }

        let updated = store.update_user(user.id, changes).await?;
        Self::detail(store, updated).await
    }
}
