//! SQLite TokenRepository implementation.

use sqlx::{Row, SqlitePool, sqlite::SqliteRow};

use crate::db::utils::{current_timestamp, generate_entity_id};
use crate::db::{ApiToken, DbError, DbResult, TokenPermissions, TokenRepository};

const TOKEN_COLUMNS: &str = "id, user_id, name, token_hash, token_prefix, \
     can_read_tasks, can_create_tasks, can_update_tasks, can_delete_tasks, \
     can_read_categories, can_create_categories, \
     is_active, expires_at, last_used_at, last_used_ip, created_at";

/// SQLx-backed API token repository.
pub struct SqliteTokenRepository<'a> {
    pub(crate) pool: &'a SqlitePool,
}

impl<'a> TokenRepository for SqliteTokenRepository<'a> {
    async fn create(&self, token: &ApiToken) -> DbResult<ApiToken> {
        let id = if token.id.is_empty() {
            generate_entity_id()
        } else {
            token.id.clone()
        };
        let created_at = current_timestamp();
        let perms = &token.permissions;

        sqlx::query(&format!(
            "INSERT INTO api_token ({TOKEN_COLUMNS}) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL, NULL, ?)"
        ))
        .bind(&id)
        .bind(&token.user_id)
        .bind(&token.name)
        .bind(&token.token_hash)
        .bind(&token.token_prefix)
        .bind(perms.can_read_tasks)
        .bind(perms.can_create_tasks)
        .bind(perms.can_update_tasks)
        .bind(perms.can_delete_tasks)
        .bind(perms.can_read_categories)
        .bind(perms.can_create_categories)
        .bind(token.is_active)
        .bind(&token.expires_at)
        .bind(&created_at)
        .execute(self.pool)
        .await?;

        Ok(ApiToken {
            id,
            created_at,
            last_used_at: None,
            last_used_ip: None,
            ..token.clone()
        })
    }

    async fn find_by_hash(&self, token_hash: &str) -> DbResult<Option<ApiToken>> {
        let row = sqlx::query(&format!(
            "SELECT {TOKEN_COLUMNS} FROM api_token WHERE token_hash = ?"
        ))
        .bind(token_hash)
        .fetch_optional(self.pool)
        .await?;

        row.as_ref().map(row_to_token).transpose()
    }

    async fn list_by_user(&self, user_id: &str) -> DbResult<Vec<ApiToken>> {
        let rows = sqlx::query(&format!(
            "SELECT {TOKEN_COLUMNS} FROM api_token WHERE user_id = ? ORDER BY created_at DESC, id"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        rows.iter().map(row_to_token).collect()
    }

    async fn count_by_user(&self, user_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM api_token WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    async fn revoke(&self, user_id: &str, id: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE api_token SET is_active = 0 WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound {
                entity_type: "ApiToken".to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn touch(&self, id: &str, used_at: &str, ip: Option<&str>) -> DbResult<()> {
        sqlx::query(
            "UPDATE api_token SET last_used_at = ?, last_used_ip = COALESCE(?, last_used_ip) WHERE id = ?",
        )
        .bind(used_at)
        .bind(ip)
        .bind(id)
        .execute(self.pool)
        .await?;
        Ok(())
    }
}

fn row_to_token(row: &SqliteRow) -> DbResult<ApiToken> {
    Ok(ApiToken {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        name: row.try_get("name")?,
        token_hash: row.try_get("token_hash")?,
        token_prefix: row.try_get("token_prefix")?,
        permissions: TokenPermissions {
            can_read_tasks: row.try_get("can_read_tasks")?,
            can_create_tasks: row.try_get("can_create_tasks")?,
            can_update_tasks: row.try_get("can_update_tasks")?,
            can_delete_tasks: row.try_get("can_delete_tasks")?,
            can_read_categories: row.try_get("can_read_categories")?,
            can_create_categories: row.try_get("can_create_categories")?,
        },
        is_active: row.try_get("is_active")?,
        expires_at: row.try_get("expires_at")?,
        last_used_at: row.try_get("last_used_at")?,
        last_used_ip: row.try_get("last_used_ip")?,
        created_at: row.try_get("created_at")?,
    })
}
