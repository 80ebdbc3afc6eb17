//! MCP tools for category management.

use futures_util::future::BoxFuture;
use rmcp::schemars::{self, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::auth::Capability;
use crate::db::{Category, CategoryRepository, Database};

use super::{
    ToolContext, ToolEntry, ToolError, ToolResult, descriptor, json_result, map_db_error,
    parse_args,
};

pub const DEFAULT_COLOR: &str = "#6366f1";

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct ListCategoriesParams {}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CreateCategoryParams {
    #[schemars(description = "Category name (required, unique per user ignoring case)")]
    pub name: String,
    #[schemars(description = "Hex color as #RRGGBB or #RGB (default: #6366f1)")]
    pub color: Option<String>,
}

pub(super) fn entries<D: Database + 'static>() -> Vec<ToolEntry<D>> {
    vec![
        ToolEntry {
            descriptor: descriptor::<ListCategoriesParams>(
                "categories_list",
                "List your categories ordered by name, with the number of tasks in each.",
            ),
            capability: Capability::ReadCategories,
            handler: list::<D>,
        },
        ToolEntry {
            descriptor: descriptor::<CreateCategoryParams>(
                "categories_create",
                "Create a new category. Names must be unique (ignoring case).",
            ),
            capability: Capability::CreateCategories,
            handler: create::<D>,
        },
    ]
}

fn list<D: Database + 'static>(
    ctx: ToolContext<'_, D>,
    args: Value,
) -> BoxFuture<'_, ToolResult> {
    Box::pin(async move {
        let _: ListCategoriesParams = parse_args(args)?;
        let categories = ctx
            .db
            .categories()
            .list(ctx.user_id())
            .await
            .map_err(map_db_error)?;

        json_result(&json!({
            "count": categories.len(),
            "categories": categories,
        }))
    })
}

fn create<D: Database + 'static>(
    ctx: ToolContext<'_, D>,
    args: Value,
) -> BoxFuture<'_, ToolResult> {
    Box::pin(async move {
        let params: CreateCategoryParams = parse_args(args)?;
        let user_id = ctx.user_id();
        let categories = ctx.db.categories();

        let name = params.name.trim();
        if name.is_empty() {
            return Err(ToolError::Validation("Category name is required".to_string()));
        }

        let color = params
            .color
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_COLOR.to_string());
        if !is_hex_color(&color) {
            return Err(ToolError::Validation(
                "Invalid color format, use hexadecimal #RRGGBB or #RGB".to_string(),
            ));
        }

        let existing = categories
            .find_by_name(user_id, name)
            .await
            .map_err(map_db_error)?;
        if existing.is_some() {
            return Err(ToolError::Validation(format!(
                "A category named \"{name}\" already exists"
            )));
        }

        let category = categories
            .create(&Category {
                id: String::new(),
                user_id: user_id.to_string(),
                name: name.to_string(),
                color,
                task_count: 0,
                created_at: String::new(),
            })
            .await
            .map_err(map_db_error)?;

        json_result(&json!({
            "message": "Category created",
            "category": category,
        }))
    })
}

/// `#RGB` or `#RRGGBB`.
pub(crate) fn is_hex_color(value: &str) -> bool {
    match value.strip_prefix('#') {
        Some(hex) => matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}
