//! In-process [`IdentityStore`].
//!
//! Backs the service when `DATABASE_URL` is unset and drives the
//! integration tests. All state sits behind one `RwLock`, so every
//! operation is atomic with respect to the others.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use secureload_models::{
    CreatePermissionDto, Group, GroupWithPermissions, LocalUser, NewLocalUser, Permission,
    UserChanges,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::store::{IdentityStore, StoreError};

#[derive(Default)]
struct State {
    users: HashMap<Uuid, LocalUser>,
    groups: HashMap<Uuid, Group>,
    permissions: HashMap<Uuid, Permission>,
    group_permissions: HashMap<Uuid, BTreeSet<Uuid>>,
    user_groups: HashMap<Uuid, BTreeSet<Uuid>>,
}

impl State {
    fn user_by_username(&self, username: &str) -> Option<&LocalUser> {
        self.users.values().find(|u| u.username == username)
    }

    fn insert_user(&mut self, user: NewLocalUser) -> LocalUser {
        let now = Utc::now();
        let user = LocalUser {
            id: Uuid::new_v4(),
            username: user.username,
            password_hash: user.password_hash,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            is_active: user.is_active,
            created_at: now,
            updated_at: now,
        };
        self.users.insert(user.id, user.clone());
        user
    }

    fn group_with_permissions(&self, group: &Group) -> GroupWithPermissions {
        let mut permissions: Vec<Permission> = self
            .group_permissions
            .get(&group.id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.permissions.get(id).cloned())
            .collect();
        sort_permissions(&mut permissions);
        GroupWithPermissions::new(group.clone(), permissions)
    }

    fn check_permissions(&self, ids: &[Uuid]) -> Result<BTreeSet<Uuid>, StoreError> {
        if ids.iter().any(|id| !self.permissions.contains_key(id)) {
            return Err(StoreError::NotFound("Permission"));
        }
        Ok(ids.iter().copied().collect())
    }

    fn group_name_taken(&self, name: &str, except: Option<Uuid>) -> bool {
        self.groups
            .values()
            .any(|g| g.name == name && Some(g.id) != except)
    }
}

fn sort_permissions(permissions: &mut [Permission]) {
    permissions.sort_by(|a, b| (&a.category, &a.name).cmp(&(&b.category, &b.name)));
}

#[derive(Default)]
pub struct MemoryIdentityStore {
    state: RwLock<State>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<LocalUser>, StoreError> {
        Ok(self.state.read().await.user_by_username(username).cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<LocalUser>, StoreError> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn list_users(&self) -> Result<Vec<LocalUser>, StoreError> {
        let state = self.state.read().await;
        let mut users: Vec<LocalUser> = state.users.values().cloned().collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn create_user(
        &self,
        user: NewLocalUser,
        group_ids: &[Uuid],
    ) -> Result<LocalUser, StoreError> {
        let mut state = self.state.write().await;
        if state.user_by_username(&user.username).is_some() {
            return Err(StoreError::Conflict("Username already exists".to_string()));
        }
        if group_ids.iter().any(|id| !state.groups.contains_key(id)) {
            return Err(StoreError::NotFound("Group"));
        }
        let user = state.insert_user(user);
        if !group_ids.is_empty() {
            state
                .user_groups
                .insert(user.id, group_ids.iter().copied().collect());
        }
        Ok(user)
    }

    async fn insert_user_if_absent(
        &self,
        user: NewLocalUser,
    ) -> Result<(LocalUser, bool), StoreError> {
        let mut state = self.state.write().await;
        if let Some(existing) = state.user_by_username(&user.username) {
            return Ok((existing.clone(), false));
        }
        Ok((state.insert_user(user), true))
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<LocalUser, StoreError> {
        let mut state = self.state.write().await;
        let user = state.users.get_mut(&id).ok_or(StoreError::NotFound("User"))?;
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(first_name) = changes.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = changes.last_name {
            user.last_name = last_name;
        }
        if let Some(is_active) = changes.is_active {
            user.is_active = is_active;
        }
        if let Some(password_hash) = changes.password_hash {
            user.password_hash = password_hash;
        }
        user.updated_at = Utc::now();

        Ok(user.clone())
    }

    async fn set_user_groups(&self, user_id: Uuid, group_ids: &[Uuid]) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&user_id) {
            return Err(StoreError::NotFound("User"));
        }
        if group_ids.iter().any(|id| !state.groups.contains_key(id)) {
            return Err(StoreError::NotFound("Group"));
        }
        state
            .user_groups
            .insert(user_id, group_ids.iter().copied().collect());
        Ok(())
    }

    async fn user_groups(&self, user_id: Uuid) -> Result<Vec<GroupWithPermissions>, StoreError> {
        let state = self.state.read().await;
        let mut groups: Vec<GroupWithPermissions> = state
            .user_groups
            .get(&user_id)
            .into_iter()
            .flatten()
            .filter_map(|id| state.groups.get(id))
            .map(|g| state.group_with_permissions(g))
            .collect();
        groups.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(groups)
    }

    async fn list_groups(&self) -> Result<Vec<GroupWithPermissions>, StoreError> {
        let state = self.state.read().await;
        let mut groups: Vec<GroupWithPermissions> = state
            .groups
            .values()
            .map(|g| state.group_with_permissions(g))
            .collect();
        groups.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(groups)
    }

    async fn find_group(&self, id: Uuid) -> Result<Option<GroupWithPermissions>, StoreError> {
        let state = self.state.read().await;
        Ok(state.groups.get(&id).map(|g| state.group_with_permissions(g)))
    }

    async fn create_group(
        &self,
        name: &str,
        permission_ids: &[Uuid],
    ) -> Result<GroupWithPermissions, StoreError> {
        let mut state = self.state.write().await;
        if state.group_name_taken(name, None) {
            return Err(StoreError::Conflict(
                "Group with this name already exists".to_string(),
            ));
        }
        let permissions = state.check_permissions(permission_ids)?;

        let group = Group {
            id: Uuid::new_v4(),
            name: name.to_string(),
        };
        state.groups.insert(group.id, group.clone());
        state.group_permissions.insert(group.id, permissions);

        Ok(state.group_with_permissions(&group))
    }

    async fn update_group(
        &self,
        id: Uuid,
        name: Option<&str>,
        permission_ids: Option<&[Uuid]>,
    ) -> Result<GroupWithPermissions, StoreError> {
        let mut state = self.state.write().await;
        if !state.groups.contains_key(&id) {
            return Err(StoreError::NotFound("Group"));
        }
        if let Some(name) = name
            && state.group_name_taken(name, Some(id))
        {
            return Err(StoreError::Conflict(
                "Group with this name already exists".to_string(),
            ));
        }
        let permissions = permission_ids
            .map(|ids| state.check_permissions(ids))
            .transpose()?;

        let group = state.groups.get_mut(&id).ok_or(StoreError::NotFound("Group"))?;
        if let Some(name) = name {
            group.name = name.to_string();
        }
        let group = group.clone();

        if let Some(permissions) = permissions {
            state.group_permissions.insert(id, permissions);
        }

        Ok(state.group_with_permissions(&group))
    }

    async fn delete_group(&self, id: Uuid) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.groups.remove(&id).is_none() {
            return Err(StoreError::NotFound("Group"));
        }
        state.group_permissions.remove(&id);
        for groups in state.user_groups.values_mut() {
            groups.remove(&id);
        }
        Ok(())
    }

    async fn list_permissions(&self) -> Result<Vec<Permission>, StoreError> {
        let state = self.state.read().await;
        let mut permissions: Vec<Permission> = state.permissions.values().cloned().collect();
        sort_permissions(&mut permissions);
        Ok(permissions)
    }

    async fn create_permission(&self, dto: &CreatePermissionDto) -> Result<Permission, StoreError> {
        let mut state = self.state.write().await;
        if state.permissions.values().any(|p| p.codename == dto.codename) {
            return Err(StoreError::Conflict(
                "Permission with this codename already exists".to_string(),
            ));
        }
        let permission = Permission {
            id: Uuid::new_v4(),
            name: dto.name.clone(),
            codename: dto.codename.clone(),
            category: dto.category.clone(),
        };
        state.permissions.insert(permission.id, permission.clone());
        Ok(permission)
    }
}
