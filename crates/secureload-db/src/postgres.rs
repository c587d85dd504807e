use std::collections::HashMap;

use async_trait::async_trait;
use secureload_models::{
    CreatePermissionDto, Group, GroupWithPermissions, LocalUser, NewLocalUser, Permission,
    UserChanges,
};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::instrument;
use uuid::Uuid;

use crate::store::{IdentityStore, StoreError};

const USER_COLUMNS: &str = "id, username, password_hash, email, first_name, last_name, is_active, created_at, updated_at";

#[derive(FromRow)]
struct GroupPermissionRow {
    group_id: Uuid,
    id: Uuid,
    name: String,
    codename: String,
    category: String,
}

/// Maps a unique-constraint violation to [`StoreError::Conflict`].
fn conflict_on_unique(err: sqlx::Error, message: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            StoreError::Conflict(message.to_string())
        }
        _ => StoreError::Database(err),
    }
}

#[derive(Clone)]
pub struct PgIdentityStore {
    db: PgPool,
}

impl PgIdentityStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn permissions_by_group(
        &self,
        group_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<Permission>>, StoreError> {
        let rows: Vec<GroupPermissionRow> = sqlx::query_as(
            r#"SELECT gp.group_id, p.id, p.name, p.codename, p.category
            FROM group_permissions gp
            JOIN permissions p ON p.id = gp.permission_id
            WHERE gp.group_id = ANY($1)
            ORDER BY p.category, p.name"#,
        )
        .bind(group_ids)
        .fetch_all(&self.db)
        .await?;

        let mut map: HashMap<Uuid, Vec<Permission>> = HashMap::new();
        for row in rows {
            map.entry(row.group_id).or_default().push(Permission {
                id: row.id,
                name: row.name,
                codename: row.codename,
                category: row.category,
            });
        }
        Ok(map)
    }

    async fn with_permissions(
        &self,
        groups: Vec<Group>,
    ) -> Result<Vec<GroupWithPermissions>, StoreError> {
        let ids: Vec<Uuid> = groups.iter().map(|g| g.id).collect();
        let mut permissions = self.permissions_by_group(&ids).await?;

        Ok(groups
            .into_iter()
            .map(|group| {
                let perms = permissions.remove(&group.id).unwrap_or_default();
                GroupWithPermissions::new(group, perms)
            })
            .collect())
    }

    async fn replace_group_permissions(
        tx: &mut Transaction<'_, Postgres>,
        group_id: Uuid,
        permission_ids: &[Uuid],
    ) -> Result<(), StoreError> {
        let found: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM permissions WHERE id = ANY($1)")
                .bind(permission_ids)
                .fetch_one(&mut **tx)
                .await?;
        if found.0 != distinct_len(permission_ids) {
            return Err(StoreError::NotFound("Permission"));
        }

        sqlx::query("DELETE FROM group_permissions WHERE group_id = $1")
            .bind(group_id)
            .execute(&mut **tx)
            .await?;

        sqlx::query(
            r#"INSERT INTO group_permissions (group_id, permission_id)
            SELECT $1, UNNEST($2::uuid[])
            ON CONFLICT DO NOTHING"#,
        )
        .bind(group_id)
        .bind(permission_ids)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}

fn distinct_len(ids: &[Uuid]) -> i64 {
    let mut ids = ids.to_vec();
    ids.sort();
    ids.dedup();
    ids.len() as i64
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    #[instrument(skip(self))]
    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<LocalUser>, StoreError> {
        let user = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<LocalUser>, StoreError> {
        let user = sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn list_users(&self) -> Result<Vec<LocalUser>, StoreError> {
        let users = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY username"
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(users)
    }

    #[instrument(skip(self, user), fields(username = %user.username))]
    async fn create_user(
        &self,
        user: NewLocalUser,
        group_ids: &[Uuid],
    ) -> Result<LocalUser, StoreError> {
        let mut tx = self.db.begin().await?;

        let found: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM groups WHERE id = ANY($1)")
            .bind(group_ids)
            .fetch_one(&mut *tx)
            .await?;
        if found.0 != distinct_len(group_ids) {
            return Err(StoreError::NotFound("Group"));
        }

        let created: LocalUser = sqlx::query_as(&format!(
            r#"INSERT INTO users (username, password_hash, email, first_name, last_name, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}"#
        ))
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.is_active)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "Username already exists"))?;

        sqlx::query(
            r#"INSERT INTO user_groups (user_id, group_id)
            SELECT $1, UNNEST($2::uuid[])
            ON CONFLICT DO NOTHING"#,
        )
        .bind(created.id)
        .bind(group_ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(created)
    }

    #[instrument(skip(self, user), fields(username = %user.username))]
    async fn insert_user_if_absent(
        &self,
        user: NewLocalUser,
    ) -> Result<(LocalUser, bool), StoreError> {
        let inserted: Option<LocalUser> = sqlx::query_as(&format!(
            r#"INSERT INTO users (username, password_hash, email, first_name, last_name, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (username) DO NOTHING
            RETURNING {USER_COLUMNS}"#
        ))
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.is_active)
        .fetch_optional(&self.db)
        .await?;

        if let Some(created) = inserted {
            return Ok((created, true));
        }

        let existing = self
            .find_user_by_username(&user.username)
            .await?
            .ok_or(StoreError::NotFound("User"))?;
        Ok((existing, false))
    }

    #[instrument(skip(self, changes))]
    async fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<LocalUser, StoreError> {
        sqlx::query_as(&format!(
            r#"UPDATE users SET
                email = COALESCE($2, email),
                first_name = COALESCE($3, first_name),
                last_name = COALESCE($4, last_name),
                is_active = COALESCE($5, is_active),
                password_hash = COALESCE($6, password_hash),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}"#
        ))
        .bind(id)
        .bind(changes.email)
        .bind(changes.first_name)
        .bind(changes.last_name)
        .bind(changes.is_active)
        .bind(changes.password_hash)
        .fetch_optional(&self.db)
        .await?
        .ok_or(StoreError::NotFound("User"))
    }

    #[instrument(skip(self))]
    async fn set_user_groups(&self, user_id: Uuid, group_ids: &[Uuid]) -> Result<(), StoreError> {
        let mut tx = self.db.begin().await?;

        let user_exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;
        if user_exists.is_none() {
            return Err(StoreError::NotFound("User"));
        }

        let found: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM groups WHERE id = ANY($1)")
            .bind(group_ids)
            .fetch_one(&mut *tx)
            .await?;
        if found.0 != distinct_len(group_ids) {
            return Err(StoreError::NotFound("Group"));
        }

        sqlx::query("DELETE FROM user_groups WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"INSERT INTO user_groups (user_id, group_id)
            SELECT $1, UNNEST($2::uuid[])
            ON CONFLICT DO NOTHING"#,
        )
        .bind(user_id)
        .bind(group_ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn user_groups(&self, user_id: Uuid) -> Result<Vec<GroupWithPermissions>, StoreError> {
        let groups: Vec<Group> = sqlx::query_as(
            r#"SELECT g.id, g.name
            FROM groups g
            JOIN user_groups ug ON ug.group_id = g.id
            WHERE ug.user_id = $1
            ORDER BY g.name"#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        self.with_permissions(groups).await
    }

    #[instrument(skip(self))]
    async fn list_groups(&self) -> Result<Vec<GroupWithPermissions>, StoreError> {
        let groups: Vec<Group> = sqlx::query_as("SELECT id, name FROM groups ORDER BY name")
            .fetch_all(&self.db)
            .await?;

        self.with_permissions(groups).await
    }

    #[instrument(skip(self))]
    async fn find_group(&self, id: Uuid) -> Result<Option<GroupWithPermissions>, StoreError> {
        let group: Option<Group> = sqlx::query_as("SELECT id, name FROM groups WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        match group {
            Some(group) => Ok(self.with_permissions(vec![group]).await?.pop()),
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    async fn create_group(
        &self,
        name: &str,
        permission_ids: &[Uuid],
    ) -> Result<GroupWithPermissions, StoreError> {
        let mut tx = self.db.begin().await?;

        let group: Group = sqlx::query_as("INSERT INTO groups (name) VALUES ($1) RETURNING id, name")
            .bind(name)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| conflict_on_unique(e, "Group with this name already exists"))?;

        Self::replace_group_permissions(&mut tx, group.id, permission_ids).await?;
        tx.commit().await?;

        self.find_group(group.id)
            .await?
            .ok_or(StoreError::NotFound("Group"))
    }

    #[instrument(skip(self))]
    async fn update_group(
        &self,
        id: Uuid,
        name: Option<&str>,
        permission_ids: Option<&[Uuid]>,
    ) -> Result<GroupWithPermissions, StoreError> {
        let mut tx = self.db.begin().await?;

        let updated: Option<Group> = sqlx::query_as(
            "UPDATE groups SET name = COALESCE($2, name) WHERE id = $1 RETURNING id, name",
        )
        .bind(id)
        .bind(name)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "Group with this name already exists"))?;

        if updated.is_none() {
            return Err(StoreError::NotFound("Group"));
        }

        if let Some(permission_ids) = permission_ids {
            Self::replace_group_permissions(&mut tx, id, permission_ids).await?;
        }
        tx.commit().await?;

        self.find_group(id).await?.ok_or(StoreError::NotFound("Group"))
    }

    #[instrument(skip(self))]
    async fn delete_group(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM groups WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Group"));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_permissions(&self) -> Result<Vec<Permission>, StoreError> {
        let permissions = sqlx::query_as(
            "SELECT id, name, codename, category FROM permissions ORDER BY category, name",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(permissions)
    }

    #[instrument(skip(self))]
    async fn create_permission(&self, dto: &CreatePermissionDto) -> Result<Permission, StoreError> {
        sqlx::query_as(
            r#"INSERT INTO permissions (name, codename, category)
            VALUES ($1, $2, $3)
            RETURNING id, name, codename, category"#,
        )
        .bind(&dto.name)
        .bind(&dto.codename)
        .bind(&dto.category)
        .fetch_one(&self.db)
        .await
        .map_err(|e| conflict_on_unique(e, "Permission with this codename already exists"))
    }
}
