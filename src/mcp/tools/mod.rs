//! MCP tool dispatch table.
//!
//! Tools are registered once in a static table keyed by their full name.
//! Each entry carries its descriptor, the capability it requires and a plain
//! function pointer, generic over `D: Database` (no dynamic dispatch on the
//! storage side).

mod categories;
mod tasks;

#[cfg(test)]
mod tasks_test;

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use miette::Diagnostic;
use rmcp::model::{CallToolResult, Content, JsonObject, Tool};
use rmcp::schemars::{self, JsonSchema};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::auth::{Capability, Principal};
use crate::db::{Database, DbError};

pub use categories::{CreateCategoryParams, ListCategoriesParams};
pub use tasks::{
    CreateTaskParams, DeleteTaskParams, GetTaskParams, ListTasksParams, TaskIdParams,
    UpdateTaskParams,
};

/// A failure inside a tool. Reported to the client as an `isError` result.
#[derive(Error, Diagnostic, Debug)]
pub enum ToolError {
    #[error("Invalid arguments: {0}")]
    #[diagnostic(code(taskhub::tool::invalid_arguments))]
    InvalidArguments(String),

    #[error("{0}")]
    #[diagnostic(code(taskhub::tool::validation))]
    Validation(String),

    #[error("{0}")]
    #[diagnostic(code(taskhub::tool::not_found))]
    NotFound(String),

    #[error("Database error: {0}")]
    #[diagnostic(code(taskhub::tool::storage))]
    Storage(String),
}

pub type ToolResult = Result<CallToolResult, ToolError>;

/// What a tool handler gets to work with.
pub struct ToolContext<'a, D> {
    pub db: &'a D,
    pub principal: &'a Principal,
}

impl<'a, D> ToolContext<'a, D> {
    pub fn user_id(&self) -> &'a str {
        &self.principal.user_id
    }
}

/// Handler signature shared by every tool.
pub type ToolHandler<D> = for<'a> fn(ToolContext<'a, D>, Value) -> BoxFuture<'a, ToolResult>;

/// One row of the dispatch table.
pub struct ToolEntry<D> {
    pub descriptor: Tool,
    pub capability: Capability,
    pub handler: ToolHandler<D>,
}

/// Static name → tool table.
pub struct ToolRegistry<D> {
    entries: Vec<ToolEntry<D>>,
    by_name: HashMap<String, usize>,
}

impl<D: Database + 'static> Default for ToolRegistry<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Database + 'static> ToolRegistry<D> {
    /// Build the full tool table.
    pub fn new() -> Self {
        let mut registry = Self {
            entries: Vec::new(),
            by_name: HashMap::new(),
        };
        for entry in tasks::entries::<D>()
            .into_iter()
            .chain(categories::entries::<D>())
        {
            registry.register(entry);
        }
        registry
    }

    fn register(&mut self, entry: ToolEntry<D>) {
        let name = entry.descriptor.name.to_string();
        self.by_name.insert(name, self.entries.len());
        self.entries.push(entry);
    }

    /// Descriptors of every tool, in registration order.
    pub fn descriptors(&self) -> Vec<Tool> {
        self.entries.iter().map(|e| e.descriptor.clone()).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| e.descriptor.name.to_string())
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&ToolEntry<D>> {
        self.by_name.get(name).map(|&i| &self.entries[i])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run a tool on behalf of `principal`.
    ///
    /// Never fails at the protocol level: unknown tools, denied capabilities,
    /// bad arguments, handler errors and panics all become error results.
    pub async fn call(
        &self,
        db: &D,
        principal: &Principal,
        name: &str,
        arguments: Option<Value>,
    ) -> CallToolResult {
        let Some(entry) = self.get(name) else {
            debug!(tool = %name, "Unknown tool requested");
            return error_result(format!("Unknown tool: {name}"));
        };

        if !principal.can(entry.capability) {
            warn!(
                tool = %name,
                user = %principal.username,
                capability = %entry.capability,
                "Tool call denied"
            );
            return error_result(format!(
                "Permission denied: {} required",
                entry.capability
            ));
        }

        let args = arguments.unwrap_or_else(|| Value::Object(JsonObject::new()));
        let ctx = ToolContext { db, principal };
        let outcome = AssertUnwindSafe((entry.handler)(ctx, args))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                debug!(tool = %name, error = %e, "Tool returned an error");
                error_result(e.to_string())
            }
            Err(_) => {
                error!(tool = %name, "Tool panicked");
                error_result(format!("Tool '{name}' failed unexpectedly"))
            }
        }
    }
}

// =============================================================================
// Helpers shared by tool modules
// =============================================================================

/// Build a descriptor whose input schema is generated from `T`.
pub(crate) fn descriptor<T: JsonSchema>(name: &'static str, description: &'static str) -> Tool {
    let schema = match serde_json::to_value(schemars::schema_for!(T)) {
        Ok(Value::Object(map)) => map,
        _ => JsonObject::new(),
    };
    Tool::new(name, description, Arc::new(schema))
}

/// Deserialize tool arguments into their typed form.
pub(crate) fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

/// A single pretty-printed JSON text item.
pub(crate) fn json_result<T: Serialize>(value: &T) -> ToolResult {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| ToolError::Storage(format!("failed to encode result: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

pub(crate) fn error_result(message: impl Into<String>) -> CallToolResult {
    CallToolResult::error(vec![Content::text(message.into())])
}

/// Map storage errors, turning missing rows into a readable message.
pub(crate) fn map_db_error(e: DbError) -> ToolError {
    match e {
        DbError::NotFound { entity_type, id } => {
            ToolError::NotFound(format!("{entity_type} not found: {id}"))
        }
        DbError::Constraint { message } => ToolError::Validation(message),
        other => ToolError::Storage(other.to_string()),
    }
}
