//! Admin directory over the root set and the SQLite registry

use crate::error::DirectoryError;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use taskbot_core::{PermissionLevel, UserId};

/// One admin as seen by callers (root or registered)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admin {
    pub user_id: UserId,
    pub level: PermissionLevel,
    /// Root admins come from configuration and have no registration time
    pub added_at: Option<DateTime<Utc>>,
    pub is_root: bool,
}

/// Admin directory service
pub struct AdminDirectory {
    pool: SqlitePool,
    roots: Vec<UserId>,
}

impl AdminDirectory {
    /// Create a directory on an existing pool with the configured root set
    pub async fn new(pool: SqlitePool, roots: Vec<UserId>) -> Result<Self, DirectoryError> {
        let directory = Self { pool, roots };
        directory.init().await?;
        Ok(directory)
    }

    /// Create an in-memory directory (for testing)
    pub async fn in_memory(roots: Vec<UserId>) -> Result<Self, DirectoryError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::new(pool, roots).await
    }

    async fn init(&self) -> Result<(), DirectoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS admins (
                user_id INTEGER PRIMARY KEY,
                level TEXT NOT NULL,
                added_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Check whether a user belongs to the immutable root set
    pub fn is_root(&self, user: UserId) -> bool {
        self.roots.contains(&user)
    }

    /// Effective permission level of a user.
    ///
    /// Root admins are always Full regardless of registry contents;
    /// unknown users are None.
    pub async fn permission_of(&self, user: UserId) -> Result<PermissionLevel, DirectoryError> {
        if self.is_root(user) {
            return Ok(PermissionLevel::Full);
        }

        let row = sqlx::query("SELECT level FROM admins WHERE user_id = ?")
            .bind(user.value())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row
            .and_then(|r| PermissionLevel::from_str(&r.get::<String, _>("level")).ok())
            .unwrap_or(PermissionLevel::None))
    }

    /// Check whether a user is any kind of admin
    pub async fn is_admin(&self, user: UserId) -> Result<bool, DirectoryError> {
        Ok(self.permission_of(user).await?.grants(PermissionLevel::Limited))
    }

    /// Register a new admin. Requires the acting admin to be Full.
    pub async fn add_admin(
        &self,
        acting: UserId,
        new_admin: UserId,
        level: PermissionLevel,
    ) -> Result<(), DirectoryError> {
        self.require_full(acting).await?;

        if level == PermissionLevel::None {
            return Err(DirectoryError::InvalidLevel(level));
        }
        if self.is_root(new_admin) {
            return Err(DirectoryError::RootAdminImmutable(new_admin));
        }
        if self.permission_of(new_admin).await? != PermissionLevel::None {
            return Err(DirectoryError::AlreadyAdmin(new_admin));
        }

        sqlx::query("INSERT INTO admins (user_id, level, added_at) VALUES (?, ?, ?)")
            .bind(new_admin.value())
            .bind(level.as_str())
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;

        tracing::info!(admin = %new_admin, level = %level, by = %acting, "admin added");
        Ok(())
    }

    /// Remove an admin. Root admins always fail with `RootAdminImmutable`.
    pub async fn remove_admin(&self, acting: UserId, target: UserId) -> Result<(), DirectoryError> {
        self.require_full(acting).await?;

        if self.is_root(target) {
            return Err(DirectoryError::RootAdminImmutable(target));
        }

        let result = sqlx::query("DELETE FROM admins WHERE user_id = ?")
            .bind(target.value())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DirectoryError::NotFound(target));
        }

        tracing::info!(admin = %target, by = %acting, "admin removed");
        Ok(())
    }

    /// Change an admin's level. Root admins always fail with
    /// `RootAdminImmutable`; downgrading to None is rejected (use
    /// `remove_admin`).
    pub async fn set_permission(
        &self,
        acting: UserId,
        target: UserId,
        level: PermissionLevel,
    ) -> Result<(), DirectoryError> {
        self.require_full(acting).await?;

        if self.is_root(target) {
            return Err(DirectoryError::RootAdminImmutable(target));
        }
        if level == PermissionLevel::None {
            return Err(DirectoryError::InvalidLevel(level));
        }

        let result = sqlx::query("UPDATE admins SET level = ? WHERE user_id = ?")
            .bind(level.as_str())
            .bind(target.value())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DirectoryError::NotFound(target));
        }

        tracing::info!(admin = %target, level = %level, by = %acting, "admin level changed");
        Ok(())
    }

    /// Every current admin: the root set plus the registry.
    ///
    /// Used for the permission-independent notification fan-out.
    pub async fn admins(&self) -> Result<Vec<Admin>, DirectoryError> {
        let mut admins: Vec<Admin> = self
            .roots
            .iter()
            .map(|&user_id| Admin {
                user_id,
                level: PermissionLevel::Full,
                added_at: None,
                is_root: true,
            })
            .collect();

        let rows = sqlx::query("SELECT user_id, level, added_at FROM admins ORDER BY user_id")
            .fetch_all(&self.pool)
            .await?;

        for row in rows {
            let user_id = UserId(row.get::<i64, _>("user_id"));
            if self.is_root(user_id) {
                continue;
            }
            let level = PermissionLevel::from_str(&row.get::<String, _>("level"))
                .unwrap_or(PermissionLevel::Limited);
            let added_at = DateTime::parse_from_rfc3339(&row.get::<String, _>("added_at"))
                .ok()
                .map(|dt| dt.with_timezone(&Utc));
            admins.push(Admin {
                user_id,
                level,
                added_at,
                is_root: false,
            });
        }

        Ok(admins)
    }

    async fn require_full(&self, acting: UserId) -> Result<(), DirectoryError> {
        if self.permission_of(acting).await? == PermissionLevel::Full {
            Ok(())
        } else {
            Err(DirectoryError::PermissionDenied { actor: acting })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: UserId = UserId(1);

    async fn directory() -> AdminDirectory {
        AdminDirectory::in_memory(vec![ROOT]).await.unwrap()
    }

    #[tokio::test]
    async fn test_root_is_always_full() {
        let dir = directory().await;
        assert_eq!(dir.permission_of(ROOT).await.unwrap(), PermissionLevel::Full);
        assert!(dir.is_admin(ROOT).await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_user_has_none() {
        let dir = directory().await;
        assert_eq!(dir.permission_of(UserId(99)).await.unwrap(), PermissionLevel::None);
    }

    #[tokio::test]
    async fn test_add_and_query_admin() {
        let dir = directory().await;
        dir.add_admin(ROOT, UserId(2), PermissionLevel::Limited).await.unwrap();
        assert_eq!(dir.permission_of(UserId(2)).await.unwrap(), PermissionLevel::Limited);
    }

    #[tokio::test]
    async fn test_add_requires_full() {
        let dir = directory().await;
        dir.add_admin(ROOT, UserId(2), PermissionLevel::Limited).await.unwrap();

        // A limited admin cannot add admins
        let result = dir.add_admin(UserId(2), UserId(3), PermissionLevel::Limited).await;
        assert!(matches!(result, Err(DirectoryError::PermissionDenied { .. })));
    }

    #[tokio::test]
    async fn test_duplicate_add_rejected() {
        let dir = directory().await;
        dir.add_admin(ROOT, UserId(2), PermissionLevel::Limited).await.unwrap();
        let result = dir.add_admin(ROOT, UserId(2), PermissionLevel::Full).await;
        assert!(matches!(result, Err(DirectoryError::AlreadyAdmin(UserId(2)))));
    }

    #[tokio::test]
    async fn test_root_admin_is_immutable() {
        let dir = directory().await;

        let removed = dir.remove_admin(ROOT, ROOT).await;
        assert!(matches!(removed, Err(DirectoryError::RootAdminImmutable(_))));

        let downgraded = dir.set_permission(ROOT, ROOT, PermissionLevel::Limited).await;
        assert!(matches!(downgraded, Err(DirectoryError::RootAdminImmutable(_))));

        let re_added = dir.add_admin(ROOT, ROOT, PermissionLevel::Limited).await;
        assert!(matches!(re_added, Err(DirectoryError::RootAdminImmutable(_))));
    }

    #[tokio::test]
    async fn test_remove_and_set_permission() {
        let dir = directory().await;
        dir.add_admin(ROOT, UserId(2), PermissionLevel::Limited).await.unwrap();

        dir.set_permission(ROOT, UserId(2), PermissionLevel::Full).await.unwrap();
        assert_eq!(dir.permission_of(UserId(2)).await.unwrap(), PermissionLevel::Full);

        dir.remove_admin(ROOT, UserId(2)).await.unwrap();
        assert_eq!(dir.permission_of(UserId(2)).await.unwrap(), PermissionLevel::None);

        let again = dir.remove_admin(ROOT, UserId(2)).await;
        assert!(matches!(again, Err(DirectoryError::NotFound(UserId(2)))));
    }

    #[tokio::test]
    async fn test_admins_lists_roots_and_registered() {
        let dir = directory().await;
        dir.add_admin(ROOT, UserId(2), PermissionLevel::Limited).await.unwrap();

        let admins = dir.admins().await.unwrap();
        assert_eq!(admins.len(), 2);
        assert!(admins.iter().any(|a| a.user_id == ROOT && a.is_root));
        assert!(admins.iter().any(|a| a.user_id == UserId(2) && !a.is_root));
    }
}
