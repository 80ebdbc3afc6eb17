//! Domain models for the taskhub database.
//!
//! These models are storage-agnostic and represent the entities the MCP
//! tools and the authenticator work with.

use rmcp::schemars::{self, JsonSchema};
use serde::{Deserialize, Serialize};

/// 8-character hex ID type used for tasks, categories and tokens.
pub type Id = String;

// =============================================================================
// Users and API tokens
// =============================================================================

/// An account owning tasks, categories and API tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Id,
    pub username: String,
    pub email: Option<String>,
    pub is_active: bool,
    pub created_at: String,
}

/// Permission flags carried by a scoped API token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPermissions {
    pub can_read_tasks: bool,
    pub can_create_tasks: bool,
    pub can_update_tasks: bool,
    pub can_delete_tasks: bool,
    pub can_read_categories: bool,
    pub can_create_categories: bool,
}

impl Default for TokenPermissions {
    /// Read access to tasks and categories, nothing else.
    fn default() -> Self {
        Self {
            can_read_tasks: true,
            can_create_tasks: false,
            can_update_tasks: false,
            can_delete_tasks: false,
            can_read_categories: true,
            can_create_categories: false,
        }
    }
}

impl TokenPermissions {
    /// Every flag set.
    pub fn all() -> Self {
        Self {
            can_read_tasks: true,
            can_create_tasks: true,
            can_update_tasks: true,
            can_delete_tasks: true,
            can_read_categories: true,
            can_create_categories: true,
        }
    }

    /// Every flag cleared.
    pub fn none() -> Self {
        Self {
            can_read_tasks: false,
            can_create_tasks: false,
            can_update_tasks: false,
            can_delete_tasks: false,
            can_read_categories: false,
            can_create_categories: false,
        }
    }
}

/// A scoped personal access token. Only the hash of the raw token is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiToken {
    pub id: Id,
    pub user_id: Id,
    pub name: String,
    pub token_hash: String,
    /// First characters of the raw token followed by `...`, for display.
    pub token_prefix: String,
    pub permissions: TokenPermissions,
    pub is_active: bool,
    pub expires_at: Option<String>,
    pub last_used_at: Option<String>,
    pub last_used_ip: Option<String>,
    pub created_at: String,
}

// =============================================================================
// Tasks and categories
// =============================================================================

/// Completion state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Active,
    Completed,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Active => write!(f, "active"),
            TaskStatus::Completed => write!(f, "completed"),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(TaskStatus::Active),
            "completed" => Ok(TaskStatus::Completed),
            _ => Err(format!("Invalid TaskStatus: {}", s)),
        }
    }
}

/// Importance of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Normal => write!(f, "normal"),
            Priority::High => write!(f, "high"),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "normal" => Ok(Priority::Normal),
            "high" => Ok(Priority::High),
            _ => Err(format!("Invalid Priority: {}", s)),
        }
    }
}

/// A task owned by a single user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Id,
    #[serde(skip)]
    pub user_id: Id,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    /// Due date as `YYYY-MM-DD`.
    pub due_date: Option<String>,
    /// Due time as `HH:MM`.
    pub due_time: Option<String>,
    pub category_id: Option<Id>,
    pub completed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A user-defined task category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Id,
    #[serde(skip)]
    pub user_id: Id,
    pub name: String,
    pub color: String,
    /// Number of tasks in this category. Only filled in by list queries.
    pub task_count: i64,
    pub created_at: String,
}

// =============================================================================
// Query types
// =============================================================================

/// Status filter for task listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Completed,
}

/// Query for a user's tasks.
#[derive(Debug, Clone, Default)]
pub struct TaskQuery {
    pub status: StatusFilter,
    pub priority: Option<Priority>,
    pub category_id: Option<Id>,
    /// Case-insensitive substring match on title or description.
    pub search: Option<String>,
    pub limit: Option<usize>,
}
