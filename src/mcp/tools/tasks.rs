//! MCP tools for task management.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveTime};
use futures_util::future::BoxFuture;
use rmcp::schemars::{self, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::auth::Capability;
use crate::db::utils::current_timestamp;
use crate::db::{
    Category, CategoryRepository, Database, DbError, Priority, StatusFilter, Task, TaskQuery,
    TaskRepository, TaskStatus,
};
use crate::serde_utils::{double_option, non_blank};

use super::{
    ToolContext, ToolEntry, ToolError, ToolResult, descriptor, json_result, map_db_error,
    parse_args,
};

// =============================================================================
// Parameter Structs
// =============================================================================

/// Status filter accepted by `tasks_list`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ListStatus {
    #[default]
    All,
    Active,
    Completed,
}

impl From<ListStatus> for StatusFilter {
    fn from(status: ListStatus) -> Self {
        match status {
            ListStatus::All => StatusFilter::All,
            ListStatus::Active => StatusFilter::Active,
            ListStatus::Completed => StatusFilter::Completed,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListTasksParams {
    #[schemars(description = "Filter by status: 'all' (default), 'active' or 'completed'")]
    pub status: Option<ListStatus>,
    #[schemars(description = "Filter by priority: 'low', 'normal' or 'high'")]
    pub priority: Option<Priority>,
    #[schemars(description = "Only tasks in this category")]
    pub category_id: Option<String>,
    #[schemars(description = "Case-insensitive search in title and description")]
    pub search: Option<String>,
    #[schemars(description = "Maximum number of tasks to return (default: 50, max: 100)")]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetTaskParams {
    #[schemars(description = "Task ID")]
    pub task_id: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskParams {
    #[schemars(description = "Task title (required)")]
    pub title: String,
    #[schemars(description = "Detailed description")]
    pub description: Option<String>,
    #[schemars(description = "Priority: 'low', 'normal' (default) or 'high'")]
    pub priority: Option<Priority>,
    #[schemars(description = "Due date as YYYY-MM-DD")]
    pub due_date: Option<String>,
    #[schemars(description = "Due time as HH:MM")]
    pub due_time: Option<String>,
    #[schemars(description = "Category ID. Use categories_list to find existing categories.")]
    pub category_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskParams {
    #[schemars(description = "Task ID to update")]
    pub task_id: String,
    #[schemars(description = "New title (cannot be blank)")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schemars(with = "Option<String>", description = "New description (null to clear)")]
    pub description: Option<Option<String>>,
    #[schemars(description = "New priority: 'low', 'normal' or 'high'")]
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "double_option")]
    #[schemars(
        with = "Option<String>",
        description = "New due date as YYYY-MM-DD (null to clear)"
    )]
    pub due_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schemars(with = "Option<String>", description = "New due time as HH:MM (null to clear)")]
    pub due_time: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schemars(
        with = "Option<String>",
        description = "New category ID (null to remove the category)"
    )]
    pub category_id: Option<Option<String>>,
}

/// Arguments of `tasks_complete` and `tasks_reopen`.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskIdParams {
    #[schemars(description = "Task ID")]
    pub task_id: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteTaskParams {
    #[schemars(description = "Task ID to delete")]
    pub task_id: String,
}

// =============================================================================
// Views
// =============================================================================

#[derive(Debug, Serialize)]
struct CategoryRef {
    id: String,
    name: String,
    color: String,
}

impl From<&Category> for CategoryRef {
    fn from(c: &Category) -> Self {
        Self {
            id: c.id.clone(),
            name: c.name.clone(),
            color: c.color.clone(),
        }
    }
}

/// A task as returned to clients, with its category resolved.
#[derive(Debug, Serialize)]
struct TaskView {
    #[serde(flatten)]
    task: Task,
    category: Option<CategoryRef>,
}

async fn task_view<D: Database>(db: &D, task: Task) -> Result<TaskView, ToolError> {
    let category = match &task.category_id {
        Some(id) => match db.categories().get(&task.user_id, id).await {
            Ok(c) => Some(CategoryRef::from(&c)),
            Err(DbError::NotFound { .. }) => None,
            Err(e) => return Err(map_db_error(e)),
        },
        None => None,
    };
    Ok(TaskView { task, category })
}

// =============================================================================
// Registration
// =============================================================================

pub(super) fn entries<D: Database + 'static>() -> Vec<ToolEntry<D>> {
    vec![
        ToolEntry {
            descriptor: descriptor::<ListTasksParams>(
                "tasks_list",
                "List your tasks with optional filters on status, priority, category and text. \
                 Ordered by due date (undated last), then newest first.",
            ),
            capability: Capability::ReadTasks,
            handler: list::<D>,
        },
        ToolEntry {
            descriptor: descriptor::<GetTaskParams>(
                "tasks_get",
                "Get the full details of one task by ID.",
            ),
            capability: Capability::ReadTasks,
            handler: get::<D>,
        },
        ToolEntry {
            descriptor: descriptor::<CreateTaskParams>(
                "tasks_create",
                "Create a new task. Only the title is required; priority defaults to 'normal'.",
            ),
            capability: Capability::CreateTasks,
            handler: create::<D>,
        },
        ToolEntry {
            descriptor: descriptor::<UpdateTaskParams>(
                "tasks_update",
                "Update fields of an existing task. Omitted fields are left unchanged; \
                 set categoryId to null to remove the category.",
            ),
            capability: Capability::UpdateTasks,
            handler: update::<D>,
        },
        ToolEntry {
            descriptor: descriptor::<TaskIdParams>(
                "tasks_complete",
                "Mark a task as completed.",
            ),
            capability: Capability::UpdateTasks,
            handler: complete::<D>,
        },
        ToolEntry {
            descriptor: descriptor::<TaskIdParams>(
                "tasks_reopen",
                "Reopen a completed task.",
            ),
            capability: Capability::UpdateTasks,
            handler: reopen::<D>,
        },
        ToolEntry {
            descriptor: descriptor::<DeleteTaskParams>(
                "tasks_delete",
                "Permanently delete a task.",
            ),
            capability: Capability::DeleteTasks,
            handler: delete::<D>,
        },
    ]
}

// =============================================================================
// Task Tools
// =============================================================================

fn list<D: Database + 'static>(
    ctx: ToolContext<'_, D>,
    args: Value,
) -> BoxFuture<'_, ToolResult> {
    Box::pin(async move {
        let params: ListTasksParams = parse_args(args)?;
        let user_id = ctx.user_id();

        let query = TaskQuery {
            status: params.status.unwrap_or_default().into(),
            priority: params.priority,
            category_id: non_blank(params.category_id),
            search: non_blank(params.search),
            limit: params.limit,
        };

        let tasks = ctx
            .db
            .tasks()
            .list(user_id, &query)
            .await
            .map_err(map_db_error)?;

        let categories: HashMap<String, Category> = ctx
            .db
            .categories()
            .list(user_id)
            .await
            .map_err(map_db_error)?
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect();

        let views: Vec<TaskView> = tasks
            .into_iter()
            .map(|task| {
                let category = task
                    .category_id
                    .as_ref()
                    .and_then(|id| categories.get(id))
                    .map(CategoryRef::from);
                TaskView { task, category }
            })
            .collect();

        json_result(&json!({
            "count": views.len(),
            "tasks": views,
        }))
    })
}

fn get<D: Database + 'static>(
    ctx: ToolContext<'_, D>,
    args: Value,
) -> BoxFuture<'_, ToolResult> {
    Box::pin(async move {
        let params: GetTaskParams = parse_args(args)?;
        let task = ctx
            .db
            .tasks()
            .get(ctx.user_id(), &params.task_id)
            .await
            .map_err(map_db_error)?;

        json_result(&task_view(ctx.db, task).await?)
    })
}

fn create<D: Database + 'static>(
    ctx: ToolContext<'_, D>,
    args: Value,
) -> BoxFuture<'_, ToolResult> {
    Box::pin(async move {
        let params: CreateTaskParams = parse_args(args)?;
        let user_id = ctx.user_id();

        let title = params.title.trim();
        if title.is_empty() {
            return Err(ToolError::Validation("Title is required".to_string()));
        }

        let due_date = validate_due_date(non_blank(params.due_date))?;
        let due_time = validate_due_time(non_blank(params.due_time))?;
        let category_id = non_blank(params.category_id);
        if let Some(id) = &category_id {
            ensure_category(ctx.db, user_id, id).await?;
        }

        let task = ctx
            .db
            .tasks()
            .create(&Task {
                id: String::new(),
                user_id: user_id.to_string(),
                title: title.to_string(),
                description: non_blank(params.description),
                status: TaskStatus::Active,
                priority: params.priority.unwrap_or_default(),
                due_date,
                due_time,
                category_id,
                completed_at: None,
                created_at: String::new(),
                updated_at: String::new(),
            })
            .await
            .map_err(map_db_error)?;

        json_result(&json!({
            "message": "Task created",
            "task": task_view(ctx.db, task).await?,
        }))
    })
}

fn update<D: Database + 'static>(
    ctx: ToolContext<'_, D>,
    args: Value,
) -> BoxFuture<'_, ToolResult> {
    Box::pin(async move {
        let params: UpdateTaskParams = parse_args(args)?;
        let user_id = ctx.user_id();
        let tasks = ctx.db.tasks();

        let mut task = tasks
            .get(user_id, &params.task_id)
            .await
            .map_err(map_db_error)?;

        if let Some(title) = params.title {
            let title = title.trim();
            if title.is_empty() {
                return Err(ToolError::Validation("Title cannot be blank".to_string()));
            }
            task.title = title.to_string();
        }
        if let Some(description) = params.description {
            task.description = non_blank(description);
        }
        if let Some(priority) = params.priority {
            task.priority = priority;
        }
        if let Some(due_date) = params.due_date {
            task.due_date = validate_due_date(non_blank(due_date))?;
        }
        if let Some(due_time) = params.due_time {
            task.due_time = validate_due_time(non_blank(due_time))?;
        }
        if let Some(category_id) = params.category_id {
            let category_id = non_blank(category_id);
            if let Some(id) = &category_id {
                ensure_category(ctx.db, user_id, id).await?;
            }
            task.category_id = category_id;
        }

        let task = tasks.update(&task).await.map_err(map_db_error)?;

        json_result(&json!({
            "message": "Task updated",
            "task": task_view(ctx.db, task).await?,
        }))
    })
}

fn complete<D: Database + 'static>(
    ctx: ToolContext<'_, D>,
    args: Value,
) -> BoxFuture<'_, ToolResult> {
    Box::pin(async move {
        let params: TaskIdParams = parse_args(args)?;
        let tasks = ctx.db.tasks();
        let mut task = tasks
            .get(ctx.user_id(), &params.task_id)
            .await
            .map_err(map_db_error)?;

        if task.status == TaskStatus::Completed {
            return json_result(&json!({
                "message": "Task is already completed",
                "taskId": task.id,
            }));
        }

        task.status = TaskStatus::Completed;
        task.completed_at = Some(current_timestamp());
        let task = tasks.update(&task).await.map_err(map_db_error)?;

        json_result(&json!({
            "message": "Task marked as completed",
            "taskId": task.id,
            "title": task.title,
            "completedAt": task.completed_at,
        }))
    })
}

fn reopen<D: Database + 'static>(
    ctx: ToolContext<'_, D>,
    args: Value,
) -> BoxFuture<'_, ToolResult> {
    Box::pin(async move {
        let params: TaskIdParams = parse_args(args)?;
        let tasks = ctx.db.tasks();
        let mut task = tasks
            .get(ctx.user_id(), &params.task_id)
            .await
            .map_err(map_db_error)?;

        if task.status == TaskStatus::Active {
            return json_result(&json!({
                "message": "Task is already active",
                "taskId": task.id,
            }));
        }

        task.status = TaskStatus::Active;
        task.completed_at = None;
        let task = tasks.update(&task).await.map_err(map_db_error)?;

        json_result(&json!({
            "message": "Task reopened",
            "taskId": task.id,
            "title": task.title,
            "status": task.status,
        }))
    })
}

fn delete<D: Database + 'static>(
    ctx: ToolContext<'_, D>,
    args: Value,
) -> BoxFuture<'_, ToolResult> {
    Box::pin(async move {
        let params: DeleteTaskParams = parse_args(args)?;
        let tasks = ctx.db.tasks();
        let task = tasks
            .get(ctx.user_id(), &params.task_id)
            .await
            .map_err(map_db_error)?;

        tasks
            .delete(ctx.user_id(), &task.id)
            .await
            .map_err(map_db_error)?;

        json_result(&json!({
            "message": "Task deleted",
            "taskId": task.id,
            "title": task.title,
        }))
    })
}

// =============================================================================
// Validation helpers
// =============================================================================

fn validate_due_date(value: Option<String>) -> Result<Option<String>, ToolError> {
    match value {
        Some(date) => NaiveDate::parse_from_str(&date, "%Y-%m-%d")
            .map(|d| Some(d.format("%Y-%m-%d").to_string()))
            .map_err(|_| {
                ToolError::Validation(format!("Invalid due date '{date}', expected YYYY-MM-DD"))
            }),
        None => Ok(None),
    }
}

fn validate_due_time(value: Option<String>) -> Result<Option<String>, ToolError> {
    match value {
        Some(time) => NaiveTime::parse_from_str(&time, "%H:%M")
            .map(|t| Some(t.format("%H:%M").to_string()))
            .map_err(|_| {
                ToolError::Validation(format!("Invalid due time '{time}', expected HH:MM"))
            }),
        None => Ok(None),
    }
}

async fn ensure_category<D: Database>(db: &D, user_id: &str, id: &str) -> Result<(), ToolError> {
    match db.categories().get(user_id, id).await {
        Ok(_) => Ok(()),
        Err(DbError::NotFound { .. }) => {
            Err(ToolError::NotFound(format!("Category not found: {id}")))
        }
        Err(e) => Err(map_db_error(e)),
    }
}
