//! JSON-RPC 2.0 message types as used by MCP.
//!
//! The envelope and decoder are local so both transports can report decode
//! failures themselves; payloads and error data are rmcp model types.

use rmcp::model::{ErrorCode, ErrorData, ProtocolVersion, ServerCapabilities, ServerInfo};
use serde::Serialize;
use serde_json::{Map, Value};

/// The only protocol revision this server speaks.
pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "taskhub-mcp";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const JSONRPC_VERSION: &str = "2.0";

/// Server at capacity.
pub const SERVER_BUSY: ErrorCode = ErrorCode(-32000);
/// Authentication failure or unknown session.
pub const SESSION_ERROR: ErrorCode = ErrorCode(-32001);

pub fn parse_error(detail: impl std::fmt::Display) -> ErrorData {
    ErrorData::parse_error(format!("Parse error: {detail}"), None)
}

pub fn invalid_request(message: impl Into<String>) -> ErrorData {
    ErrorData::invalid_request(message.into(), None)
}

pub fn method_not_found(method: &str) -> ErrorData {
    ErrorData::new(
        ErrorCode::METHOD_NOT_FOUND,
        format!("Method not found: {method}"),
        None,
    )
}

pub fn invalid_params(message: impl Into<String>) -> ErrorData {
    ErrorData::invalid_params(message.into(), None)
}

pub fn internal_error(message: impl Into<String>) -> ErrorData {
    ErrorData::internal_error(message.into(), None)
}

/// A JSON-RPC response carrying either a result or an error.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorData>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: Some(result),
            error: None,
        }
    }

    /// An error response. Use `Value::Null` when the request id is unknown.
    pub fn error(id: Value, error: ErrorData) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: None,
            error: Some(error),
        }
    }

    pub fn to_json(&self) -> Value {
        // Serializing these plain structs cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// A decoded client message.
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    /// Expects a response.
    Request {
        id: Value,
        method: String,
        params: Option<Value>,
    },
    /// Fire and forget.
    Notification {
        method: String,
        params: Option<Value>,
    },
    /// A response to a server-initiated request. Accepted and ignored.
    Response,
}

impl Incoming {
    pub fn method(&self) -> Option<&str> {
        match self {
            Incoming::Request { method, .. } | Incoming::Notification { method, .. } => {
                Some(method)
            }
            Incoming::Response => None,
        }
    }

    pub fn is_request(&self) -> bool {
        matches!(self, Incoming::Request { .. })
    }

    pub fn is_initialize(&self) -> bool {
        matches!(self, Incoming::Request { method, .. } if method == "initialize")
    }
}

/// Why a body could not be turned into an [`Incoming`] message.
#[derive(Debug, Clone)]
pub struct DecodeError {
    /// Request id, when one could be recovered.
    pub id: Value,
    pub error: ErrorData,
}

impl DecodeError {
    fn new(id: Value, error: ErrorData) -> Self {
        Self { id, error }
    }

    pub fn is_parse_error(&self) -> bool {
        self.error.code == ErrorCode::PARSE_ERROR
    }

    pub fn into_response(self) -> JsonRpcResponse {
        JsonRpcResponse::error(self.id, self.error)
    }
}

/// Decode a single JSON-RPC message from a request body.
///
/// Batches are rejected.
pub fn decode(body: &[u8]) -> Result<Incoming, DecodeError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| DecodeError::new(Value::Null, parse_error(e)))?;

    match value {
        Value::Object(obj) => decode_object(obj),
        Value::Array(_) => Err(DecodeError::new(
            Value::Null,
            invalid_request("Batch requests are not supported"),
        )),
        _ => Err(DecodeError::new(
            Value::Null,
            invalid_request("Expected a JSON-RPC object"),
        )),
    }
}

fn decode_object(mut obj: Map<String, Value>) -> Result<Incoming, DecodeError> {
    let id = obj.remove("id");
    let id_or_null = id.clone().unwrap_or(Value::Null);

    if obj.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return Err(DecodeError::new(
            id_or_null,
            invalid_request("jsonrpc must be \"2.0\""),
        ));
    }

    if id
        .as_ref()
        .is_some_and(|id| !(id.is_string() || id.is_number()))
    {
        return Err(DecodeError::new(
            Value::Null,
            invalid_request("id must be a string or a number"),
        ));
    }

    let params = obj.remove("params");
    match obj.remove("method") {
        Some(Value::String(method)) => Ok(match id {
            Some(id) => Incoming::Request { id, method, params },
            None => Incoming::Notification { method, params },
        }),
        Some(_) => Err(DecodeError::new(
            id_or_null,
            invalid_request("method must be a string"),
        )),
        None if obj.contains_key("result") || obj.contains_key("error") => Ok(Incoming::Response),
        None => Err(DecodeError::new(
            id_or_null,
            invalid_request("Missing method"),
        )),
    }
}

/// The `initialize` result advertised to every client.
pub fn initialize_result() -> ServerInfo {
    let mut info = ServerInfo::new(ServerCapabilities::builder().enable_tools().build())
        .with_protocol_version(ProtocolVersion::V_2024_11_05)
        .with_instructions(
            "Taskhub MCP server. Manage your tasks and categories. \
             Available tools depend on the permissions of your API token.",
        );
    info.server_info.name = SERVER_NAME.to_string();
    info.server_info.version = SERVER_VERSION.to_string();
    info
}
