//! SQLite UserRepository implementation.

use sqlx::{Row, SqlitePool, sqlite::SqliteRow};

use crate::db::utils::{current_timestamp, generate_entity_id};
use crate::db::{DbError, DbResult, User, UserRepository};

/// SQLx-backed user repository.
pub struct SqliteUserRepository<'a> {
    pub(crate) pool: &'a SqlitePool,
}

impl<'a> UserRepository for SqliteUserRepository<'a> {
    async fn create(&self, user: &User) -> DbResult<User> {
        let id = if user.id.is_empty() {
            generate_entity_id()
        } else {
            user.id.clone()
        };
        let created_at = current_timestamp();

        sqlx::query(
            "INSERT INTO user (id, username, email, is_active, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(user.is_active)
        .bind(&created_at)
        .execute(self.pool)
        .await?;

        Ok(User {
            id,
            username: user.username.clone(),
            email: user.email.clone(),
            is_active: user.is_active,
            created_at,
        })
    }

    async fn get(&self, id: &str) -> DbResult<User> {
        let row = sqlx::query(
            "SELECT id, username, email, is_active, created_at FROM user WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        let row = row.ok_or_else(|| DbError::NotFound {
            entity_type: "User".to_string(),
            id: id.to_string(),
        })?;
        row_to_user(&row)
    }

    async fn get_by_username(&self, username: &str) -> DbResult<User> {
        let row = sqlx::query(
            "SELECT id, username, email, is_active, created_at FROM user WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        let row = row.ok_or_else(|| DbError::NotFound {
            entity_type: "User".to_string(),
            id: username.to_string(),
        })?;
        row_to_user(&row)
    }

    async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE user SET is_active = ? WHERE id = ?")
            .bind(active)
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound {
                entity_type: "User".to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

fn row_to_user(row: &SqliteRow) -> DbResult<User> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
    })
}
