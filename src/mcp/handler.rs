//! Per-session JSON-RPC handler.
//!
//! Both transports feed decoded messages into an [`McpHandler`]; the handler
//! knows nothing about HTTP.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rmcp::model::{ErrorData, ListToolsResult};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::auth::Principal;
use crate::db::Database;

use super::protocol::{
    Incoming, JsonRpcResponse, initialize_result, internal_error, invalid_params, method_not_found,
};
use super::tools::ToolRegistry;

#[derive(Debug, Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

/// Protocol core bound to one session's principal.
pub struct McpHandler<D: Database> {
    db: Arc<D>,
    tools: Arc<ToolRegistry<D>>,
    principal: Principal,
    initialized: AtomicBool,
}

impl<D: Database + 'static> McpHandler<D> {
    pub fn new(db: Arc<D>, tools: Arc<ToolRegistry<D>>, principal: Principal) -> Self {
        Self {
            db,
            tools,
            principal,
            initialized: AtomicBool::new(false),
        }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Whether the client has sent `notifications/initialized`.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Handle one message. Notifications and client responses yield `None`.
    pub async fn handle(&self, message: Incoming) -> Option<JsonRpcResponse> {
        match message {
            Incoming::Request { id, method, params } => {
                debug!(method = %method, user = %self.principal.username, "Handling request");
                Some(match self.dispatch(&method, params).await {
                    Ok(result) => JsonRpcResponse::success(id, result),
                    Err(error) => JsonRpcResponse::error(id, error),
                })
            }
            Incoming::Notification { method, .. } => {
                if method == "notifications/initialized" {
                    self.initialized.store(true, Ordering::Release);
                    info!(user = %self.principal.username, "Client initialized");
                } else {
                    debug!(method = %method, "Ignoring notification");
                }
                None
            }
            Incoming::Response => None,
        }
    }

    async fn dispatch(&self, method: &str, params: Option<Value>) -> Result<Value, ErrorData> {
        match method {
            "initialize" => {
                if let Some(client) = params
                    .as_ref()
                    .and_then(|p| p.get("clientInfo"))
                    .and_then(|c| c.get("name"))
                    .and_then(Value::as_str)
                {
                    info!(client = %client, user = %self.principal.username, "Initialize");
                }
                to_result(&initialize_result())
            }
            "ping" => Ok(json!({})),
            "tools/list" => to_result(&ListToolsResult::with_all_items(self.tools.descriptors())),
            "tools/call" => {
                let params: CallToolParams = params
                    .ok_or_else(|| invalid_params("Missing params"))
                    .and_then(|p| {
                        serde_json::from_value(p)
                            .map_err(|e| invalid_params(format!("Invalid params: {e}")))
                    })?;

                let result = self
                    .tools
                    .call(&self.db, &self.principal, &params.name, params.arguments)
                    .await;
                to_result(&result)
            }
            other => Err(method_not_found(other)),
        }
    }
}

fn to_result<T: Serialize>(value: &T) -> Result<Value, ErrorData> {
    serde_json::to_value(value).map_err(|e| internal_error(e.to_string()))
}
