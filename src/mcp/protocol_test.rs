//! Tests for JSON-RPC decoding.

use serde_json::{Value, json};

use rmcp::model::ErrorCode;

use crate::mcp::protocol::{
    Incoming, JsonRpcResponse, PROTOCOL_VERSION, decode, initialize_result, method_not_found,
};

fn decode_value(value: Value) -> Result<Incoming, crate::mcp::protocol::DecodeError> {
    decode(value.to_string().as_bytes())
}

#[test]
fn test_decode_request() {
    let msg = decode_value(json!({
        "jsonrpc": "2.0",
        "id": 7,
        "method": "tools/list",
        "params": {}
    }))
    .unwrap();

    assert_eq!(
        msg,
        Incoming::Request {
            id: json!(7),
            method: "tools/list".to_string(),
            params: Some(json!({})),
        }
    );
    assert!(msg.is_request());
    assert!(!msg.is_initialize());
    assert_eq!(msg.method(), Some("tools/list"));
}

#[test]
fn test_decode_notification_and_response() {
    let note = decode_value(json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }))
        .unwrap();
    assert!(matches!(note, Incoming::Notification { .. }));
    assert!(!note.is_request());

    let response = decode_value(json!({ "jsonrpc": "2.0", "id": "s-1", "result": {} })).unwrap();
    assert_eq!(response, Incoming::Response);
    assert_eq!(response.method(), None);
}

#[test]
fn test_initialize_detection() {
    let msg = decode_value(json!({ "jsonrpc": "2.0", "id": "a", "method": "initialize" })).unwrap();
    assert!(msg.is_initialize());

    // A notification named initialize does not open a session.
    let msg = decode_value(json!({ "jsonrpc": "2.0", "method": "initialize" })).unwrap();
    assert!(!msg.is_initialize());
}

#[test]
fn test_decode_malformed_json() {
    let err = decode(b"{not json").unwrap_err();
    assert!(err.is_parse_error());
    assert_eq!(err.id, Value::Null);
    assert_eq!(err.error.code, ErrorCode::PARSE_ERROR);
}

#[test]
fn test_decode_rejects_batches() {
    let err = decode_value(json!([{ "jsonrpc": "2.0", "id": 1, "method": "ping" }])).unwrap_err();
    assert!(!err.is_parse_error());
    assert_eq!(err.error.code, ErrorCode::INVALID_REQUEST);
    assert!(err.error.message.contains("Batch"));
}

#[test]
fn test_decode_wrong_version_keeps_id() {
    let err = decode_value(json!({ "jsonrpc": "1.0", "id": 3, "method": "ping" })).unwrap_err();
    assert_eq!(err.error.code, ErrorCode::INVALID_REQUEST);
    assert_eq!(err.id, json!(3));

    let err = decode_value(json!({ "id": 4, "method": "ping" })).unwrap_err();
    assert_eq!(err.error.code, ErrorCode::INVALID_REQUEST);
}

#[test]
fn test_decode_invalid_shapes() {
    let bad_id = decode_value(json!({ "jsonrpc": "2.0", "id": {}, "method": "ping" }));
    assert_eq!(bad_id.unwrap_err().error.code, ErrorCode::INVALID_REQUEST);

    let bad_method = decode_value(json!({ "jsonrpc": "2.0", "id": 1, "method": 5 }));
    assert_eq!(bad_method.unwrap_err().error.code, ErrorCode::INVALID_REQUEST);

    let no_method = decode_value(json!({ "jsonrpc": "2.0", "id": 1 }));
    assert_eq!(no_method.unwrap_err().error.code, ErrorCode::INVALID_REQUEST);

    let scalar = decode(b"42").unwrap_err();
    assert_eq!(scalar.error.code, ErrorCode::INVALID_REQUEST);
}

#[test]
fn test_response_serialization() {
    let ok = JsonRpcResponse::success(json!(1), json!({ "a": 1 })).to_json();
    assert_eq!(ok, json!({ "jsonrpc": "2.0", "id": 1, "result": { "a": 1 } }));

    let err = JsonRpcResponse::error(Value::Null, method_not_found("nope")).to_json();
    assert_eq!(err["error"]["code"], ErrorCode::METHOD_NOT_FOUND.0);
    assert_eq!(err["error"]["message"], "Method not found: nope");
    assert!(err.get("result").is_none());
    assert_eq!(err["id"], Value::Null);
}

#[test]
fn test_initialize_result_shape() {
    let result = serde_json::to_value(initialize_result()).unwrap();
    assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
    assert!(result["capabilities"]["tools"].is_object());
    assert!(result["capabilities"].get("resources").is_none());
    assert_eq!(result["serverInfo"]["name"], "taskhub-mcp");
    assert!(result["serverInfo"]["version"].is_string());
    assert!(result["instructions"].is_string());
}
