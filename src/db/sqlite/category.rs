//! SQLite CategoryRepository implementation.

use sqlx::{Row, SqlitePool, sqlite::SqliteRow};

use crate::db::utils::{current_timestamp, generate_entity_id};
use crate::db::{Category, CategoryRepository, DbError, DbResult};

/// SQLx-backed category repository.
pub struct SqliteCategoryRepository<'a> {
    pub(crate) pool: &'a SqlitePool,
}

impl<'a> CategoryRepository for SqliteCategoryRepository<'a> {
    async fn list(&self, user_id: &str) -> DbResult<Vec<Category>> {
        let rows = sqlx::query(
            "SELECT c.id, c.user_id, c.name, c.color, c.created_at, \
             (SELECT COUNT(*) FROM task t WHERE t.category_id = c.id AND t.user_id = c.user_id) AS task_count \
             FROM category c WHERE c.user_id = ? ORDER BY c.name COLLATE NOCASE, c.id",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        rows.iter().map(row_to_category).collect()
    }

    async fn get(&self, user_id: &str, id: &str) -> DbResult<Category> {
        let row = sqlx::query(
            "SELECT id, user_id, name, color, created_at, 0 AS task_count \
             FROM category WHERE id = ? AND user_id = ?",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        let row = row.ok_or_else(|| DbError::NotFound {
            entity_type: "Category".to_string(),
            id: id.to_string(),
        })?;
        row_to_category(&row)
    }

    async fn find_by_name(&self, user_id: &str, name: &str) -> DbResult<Option<Category>> {
        let row = sqlx::query(
            "SELECT id, user_id, name, color, created_at, 0 AS task_count \
             FROM category WHERE user_id = ? AND name = ? COLLATE NOCASE",
        )
        .bind(user_id)
        .bind(name)
        .fetch_optional(self.pool)
        .await?;

        row.as_ref().map(row_to_category).transpose()
    }

    async fn create(&self, category: &Category) -> DbResult<Category> {
        let id = if category.id.is_empty() {
            generate_entity_id()
        } else {
            category.id.clone()
        };
        let created_at = current_timestamp();

        sqlx::query(
            "INSERT INTO category (id, user_id, name, color, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&category.user_id)
        .bind(&category.name)
        .bind(&category.color)
        .bind(&created_at)
        .execute(self.pool)
        .await?;

        Ok(Category {
            id,
            task_count: 0,
            created_at,
            ..category.clone()
        })
    }
}

fn row_to_category(row: &SqliteRow) -> DbResult<Category> {
    Ok(Category {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        name: row.try_get("name")?,
        color: row.try_get("color")?,
        task_count: row.try_get("task_count")?,
        created_at: row.try_get("created_at")?,
    })
}
