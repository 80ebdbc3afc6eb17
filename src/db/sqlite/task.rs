//! SQLite TaskRepository implementation.

use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool, sqlite::SqliteRow};

use crate::db::utils::{current_timestamp, generate_entity_id};
use crate::db::{DbError, DbResult, StatusFilter, Task, TaskQuery, TaskRepository};

pub(crate) const DEFAULT_LIST_LIMIT: usize = 50;
pub(crate) const MAX_LIST_LIMIT: usize = 100;

const TASK_COLUMNS: &str = "id, user_id, title, description, status, priority, due_date, \
     due_time, category_id, completed_at, created_at, updated_at";

/// SQLx-backed task repository.
pub struct SqliteTaskRepository<'a> {
    pub(crate) pool: &'a SqlitePool,
}

impl<'a> TaskRepository for SqliteTaskRepository<'a> {
    async fn list(&self, user_id: &str, query: &TaskQuery) -> DbResult<Vec<Task>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {TASK_COLUMNS} FROM task WHERE user_id = "));
        qb.push_bind(user_id);

        match query.status {
            StatusFilter::All => {}
            StatusFilter::Active => {
                qb.push(" AND status = 'active'");
            }
            StatusFilter::Completed => {
                qb.push(" AND status = 'completed'");
            }
        }

        if let Some(priority) = query.priority {
            qb.push(" AND priority = ");
            qb.push_bind(priority.to_string());
        }

        if let Some(category_id) = &query.category_id {
            qb.push(" AND category_id = ");
            qb.push_bind(category_id.clone());
        }

        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            // LIKE is case-insensitive for ASCII in SQLite.
            let pattern = format!("%{}%", escape_like(search));
            qb.push(" AND (title LIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" ESCAPE '\\' OR description LIKE ");
            qb.push_bind(pattern);
            qb.push(" ESCAPE '\\')");
        }

        let limit = query
            .limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT);
        qb.push(" ORDER BY due_date IS NULL, due_date ASC, created_at DESC, id LIMIT ");
        qb.push_bind(limit as i64);

        let rows = qb.build().fetch_all(self.pool).await?;
        rows.iter().map(row_to_task).collect()
    }

    async fn get(&self, user_id: &str, id: &str) -> DbResult<Task> {
        let row = sqlx::query(&format!(
            "SELECT {TASK_COLUMNS} FROM task WHERE id = ? AND user_id = ?"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        let row = row.ok_or_else(|| DbError::NotFound {
            entity_type: "Task".to_string(),
            id: id.to_string(),
        })?;
        row_to_task(&row)
    }

    async fn create(&self, task: &Task) -> DbResult<Task> {
        let id = if task.id.is_empty() {
            generate_entity_id()
        } else {
            task.id.clone()
        };
        let now = current_timestamp();

        sqlx::query(&format!(
            "INSERT INTO task ({TASK_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(&id)
        .bind(&task.user_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.to_string())
        .bind(task.priority.to_string())
        .bind(&task.due_date)
        .bind(&task.due_time)
        .bind(&task.category_id)
        .bind(&task.completed_at)
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await?;

        Ok(Task {
            id,
            created_at: now.clone(),
            updated_at: now,
            ..task.clone()
        })
    }

    async fn update(&self, task: &Task) -> DbResult<Task> {
        let updated_at = current_timestamp();

        let result = sqlx::query(
            "UPDATE task SET title = ?, description = ?, status = ?, priority = ?, \
             due_date = ?, due_time = ?, category_id = ?, completed_at = ?, updated_at = ? \
             WHERE id = ? AND user_id = ?",
        )
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.to_string())
        .bind(task.priority.to_string())
        .bind(&task.due_date)
        .bind(&task.due_time)
        .bind(&task.category_id)
        .bind(&task.completed_at)
        .bind(&updated_at)
        .bind(&task.id)
        .bind(&task.user_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound {
                entity_type: "Task".to_string(),
                id: task.id.clone(),
            });
        }

        Ok(Task {
            updated_at,
            ..task.clone()
        })
    }

    async fn delete(&self, user_id: &str, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM task WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound {
                entity_type: "Task".to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

fn row_to_task(row: &SqliteRow) -> DbResult<Task> {
    let status: String = row.try_get("status")?;
    let priority: String = row.try_get("priority")?;

    Ok(Task {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        status: status
            .parse()
            .map_err(|message| DbError::InvalidData { message })?,
        priority: priority
            .parse()
            .map_err(|message| DbError::InvalidData { message })?,
        due_date: row.try_get("due_date")?,
        due_time: row.try_get("due_time")?,
        category_id: row.try_get("category_id")?,
        completed_at: row.try_get("completed_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Escape LIKE wildcards so user input matches literally (with `ESCAPE '\'`).
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
