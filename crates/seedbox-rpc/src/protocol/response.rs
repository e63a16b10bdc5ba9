//! Response envelopes for both dialects.

use super::error::ErrorCode;
use super::request::{Dialect, Rejected};
use seedbox_core::RpcConfig;
use serde::Serialize;
use serde_json::{Map, Value};

/// How a call finished.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub code: ErrorCode,
    pub message: String,
    pub output: Map<String, Value>,
}

impl Outcome {
    pub fn success(output: Map<String, Value>) -> Self {
        Self {
            code: ErrorCode::Success,
            message: String::new(),
            output,
        }
    }

    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            output: Map::new(),
        }
    }
}

/// Who a response goes back to.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub id: Option<Value>,
    pub notification: bool,
}

/// JSON-RPC 2.0 response structure.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Value,
}

/// JSON-RPC 2.0 error structure.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ErrorData>,
}

#[derive(Debug, Serialize)]
pub struct ErrorData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_string: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Map<String, Value>>,
}

/// Legacy response structure.
#[derive(Debug, Serialize)]
pub struct LegacyResponse {
    pub arguments: Map<String, Value>,
    pub result: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<Value>,
}

/// Completion adapter: turns an outcome into the wire response, or
/// nothing when the caller expects none.
pub type Adapter = fn(&Envelope, Outcome) -> Option<Value>;

impl Dialect {
    pub fn adapter(self) -> Adapter {
        match self {
            Dialect::Versioned => versioned,
            Dialect::Legacy => legacy,
        }
    }
}

/// Versioned envelope. Notifications get no response.
pub fn versioned(envelope: &Envelope, outcome: Outcome) -> Option<Value> {
    if envelope.notification {
        return None;
    }

    let id = envelope.id.clone().unwrap_or(Value::Null);
    let response = if outcome.code.is_success() {
        JsonRpcResponse {
            jsonrpc: RpcConfig::JSONRPC_VERSION,
            result: Some(outcome.output),
            error: None,
            id,
        }
    } else {
        let default = outcome.code.default_message();
        let error_string =
            Some(outcome.message).filter(|m| !m.is_empty() && m.as_str() != default);
        let result = Some(outcome.output).filter(|o| !o.is_empty());
        let data = (error_string.is_some() || result.is_some()).then_some(ErrorData {
            error_string,
            result,
        });
        JsonRpcResponse {
            jsonrpc: RpcConfig::JSONRPC_VERSION,
            result: None,
            error: Some(JsonRpcError {
                code: outcome.code.code(),
                message: default,
                data,
            }),
            id,
        }
    };
    serde_json::to_value(response).ok()
}

/// Legacy envelope. Always produced; the tag is echoed when present.
pub fn legacy(envelope: &Envelope, outcome: Outcome) -> Option<Value> {
    let result = match outcome.code {
        ErrorCode::Success => "success".to_string(),
        _ if !outcome.message.is_empty() => outcome.message,
        ErrorCode::MethodNotFound => "no method name".to_string(),
        code => code.default_message().to_string(),
    };
    let response = LegacyResponse {
        arguments: outcome.output,
        result,
        tag: envelope.id.clone(),
    };
    serde_json::to_value(response).ok()
}

/// Answer a request rejected by the parser.
pub fn rejection(rejected: Rejected) -> Option<Value> {
    let envelope = Envelope {
        id: rejected.id,
        notification: rejected.notification,
    };
    (rejected.dialect.adapter())(&envelope, Outcome::error(rejected.code, rejected.message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(id: Value) -> Envelope {
        Envelope {
            id: Some(id),
            notification: false,
        }
    }

    #[test]
    fn test_versioned_success() {
        let mut output = Map::new();
        output.insert("a".into(), json!(1));
        let response = versioned(&envelope(json!(5)), Outcome::success(output)).unwrap();
        assert_eq!(response, json!({"jsonrpc": "2.0", "result": {"a": 1}, "id": 5}));
    }

    #[test]
    fn test_versioned_error_data() {
        let bare = versioned(&envelope(json!(1)), Outcome::error(ErrorCode::MethodNotFound, "")).unwrap();
        assert_eq!(
            bare,
            json!({"jsonrpc": "2.0", "error": {"code": -32601, "message": "Method not found"}, "id": 1})
        );

        let detailed = versioned(
            &envelope(json!(39693)),
            Outcome::error(ErrorCode::PathNotAbsolute, "directory path is not absolute"),
        )
        .unwrap();
        assert_eq!(
            detailed,
            json!({
                "jsonrpc": "2.0",
                "error": {
                    "code": 3,
                    "message": "path is not absolute",
                    "data": {"error_string": "directory path is not absolute"}
                },
                "id": 39693
            })
        );

        let mut partial = Outcome::error(ErrorCode::HttpError, "Couldn't test port: No Response (0)");
        partial.output.insert("ip_protocol".into(), json!("ipv6"));
        let with_result = versioned(&envelope(json!("x")), partial).unwrap();
        assert_eq!(with_result["error"]["data"]["result"], json!({"ip_protocol": "ipv6"}));
    }

    #[test]
    fn test_versioned_notification_is_silent() {
        let note = Envelope {
            id: None,
            notification: true,
        };
        assert!(versioned(&note, Outcome::success(Map::new())).is_none());
        assert!(versioned(&note, Outcome::error(ErrorCode::MethodNotFound, "")).is_none());
    }

    #[test]
    fn test_legacy_envelopes() {
        let ok = legacy(&envelope(json!(4)), Outcome::success(Map::new())).unwrap();
        assert_eq!(ok, json!({"arguments": {}, "result": "success", "tag": 4}));

        let untagged = Envelope {
            id: None,
            notification: false,
        };
        let missing = legacy(&untagged, Outcome::error(ErrorCode::MethodNotFound, "")).unwrap();
        assert_eq!(missing, json!({"arguments": {}, "result": "no method name"}));

        let failed = legacy(
            &envelope(json!(39693)),
            Outcome::error(ErrorCode::PathNotAbsolute, "directory path is not absolute"),
        )
        .unwrap();
        assert_eq!(
            failed,
            json!({"arguments": {}, "result": "directory path is not absolute", "tag": 39693})
        );

        let defaulted = legacy(&envelope(json!(1)), Outcome::error(ErrorCode::SystemError, "")).unwrap();
        assert_eq!(defaulted["result"], "system error");
    }
}
