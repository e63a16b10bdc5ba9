//! Request parsing and dialect detection.
//!
//! A body is either a single request object or a batch (JSON array). Each
//! element is normalized into a [`Request`] or a [`Rejected`] that already
//! knows how it must be answered.

use super::error::ErrorCode;
use seedbox_core::fields::Style;
use serde_json::{Map, Value};

/// Which wire shape a request arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// `{"jsonrpc":"2.0","method":..,"params":..,"id":..}`
    Versioned,
    /// `{"method":..,"arguments":..,"tag":..}`
    Legacy,
}

impl Dialect {
    pub fn style(self) -> Style {
        match self {
            Dialect::Versioned => Style::Current,
            Dialect::Legacy => Style::Legacy,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Dialect::Versioned => "jsonrpc",
            Dialect::Legacy => "legacy",
        }
    }
}

/// A well-formed call.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: String,
    pub params: Map<String, Value>,
    /// Versioned `id` or legacy `tag`.
    pub id: Option<Value>,
    pub dialect: Dialect,
}

impl Request {
    /// Only a versioned request without an `id` is a notification.
    pub fn is_notification(&self) -> bool {
        self.dialect == Dialect::Versioned && self.id.is_none()
    }
}

/// A call that failed validation before reaching any handler.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejected {
    pub id: Option<Value>,
    pub dialect: Dialect,
    pub notification: bool,
    pub code: ErrorCode,
    pub message: String,
}

impl Rejected {
    fn invalid(dialect: Dialect, id: Option<Value>) -> Self {
        Self {
            // An invalid versioned request is always answered, with a null id
            // when none could be read.
            id: match dialect {
                Dialect::Versioned => Some(id.unwrap_or(Value::Null)),
                Dialect::Legacy => id,
            },
            dialect,
            notification: false,
            code: ErrorCode::InvalidRequest,
            message: String::new(),
        }
    }

    /// Response for a body that is not valid JSON at all.
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self {
            id: Some(Value::Null),
            dialect: Dialect::Versioned,
            notification: false,
            code: ErrorCode::ParseError,
            message: message.into(),
        }
    }
}

/// One parsed element.
pub type Parsed = Result<Request, Rejected>;

/// The top-level shape of a body.
#[derive(Debug)]
pub enum Payload {
    Single(Parsed),
    Batch(Vec<Parsed>),
}

const VERSION_KEY: &str = "jsonrpc";
const LEGACY_ONLY_KEYS: [&str; 2] = ["arguments", "tag"];
const VERSIONED_ONLY_KEYS: [&str; 2] = ["params", "id"];

/// Parse a serialized body.
pub fn parse_body(body: &str) -> Payload {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => parse_value(value),
        Err(e) => Payload::Single(Err(Rejected::parse_error(e.to_string()))),
    }
}

/// Parse an already-decoded body. Batch detection precedes item parsing.
pub fn parse_value(value: Value) -> Payload {
    match value {
        Value::Array(items) if items.is_empty() => {
            Payload::Single(Err(Rejected::invalid(Dialect::Versioned, None)))
        }
        Value::Array(items) => Payload::Batch(items.into_iter().map(parse_request).collect()),
        other => Payload::Single(parse_request(other)),
    }
}

/// Parse a single request object.
pub fn parse_request(value: Value) -> Parsed {
    let Value::Object(mut obj) = value else {
        return Err(Rejected::invalid(Dialect::Versioned, None));
    };

    if obj.contains_key(VERSION_KEY) {
        parse_versioned(obj)
    } else {
        let tag = obj.remove("tag");
        if VERSIONED_ONLY_KEYS.iter().any(|k| obj.contains_key(*k)) {
            return Err(Rejected::invalid(Dialect::Legacy, tag));
        }
        parse_legacy(obj, tag)
    }
}

fn parse_versioned(mut obj: Map<String, Value>) -> Parsed {
    let id = match obj.remove("id") {
        None => None,
        Some(id @ (Value::String(_) | Value::Number(_) | Value::Null)) => Some(id),
        Some(_) => return Err(Rejected::invalid(Dialect::Versioned, None)),
    };

    let version_ok = obj.get(VERSION_KEY).and_then(Value::as_str) == Some("2.0");
    let mixed = LEGACY_ONLY_KEYS.iter().any(|k| obj.contains_key(*k));
    let method = match obj.remove("method") {
        Some(Value::String(method)) if version_ok && !mixed => method,
        _ => return Err(Rejected::invalid(Dialect::Versioned, id)),
    };

    let params = match obj.remove("params") {
        None => Map::new(),
        Some(Value::Object(params)) => params,
        Some(_) => {
            return Err(Rejected {
                notification: id.is_none(),
                id,
                dialect: Dialect::Versioned,
                code: ErrorCode::InvalidParams,
                message: String::new(),
            })
        }
    };

    Ok(Request {
        method,
        params,
        id,
        dialect: Dialect::Versioned,
    })
}

fn parse_legacy(mut obj: Map<String, Value>, tag: Option<Value>) -> Parsed {
    let method = match obj.remove("method") {
        Some(Value::String(method)) => method,
        _ => {
            return Err(Rejected {
                id: tag,
                dialect: Dialect::Legacy,
                notification: false,
                code: ErrorCode::MethodNotFound,
                message: "no method name".to_string(),
            })
        }
    };

    let params = match obj.remove("arguments") {
        None => Map::new(),
        Some(Value::Object(args)) => args,
        Some(_) => {
            return Err(Rejected {
                id: tag,
                dialect: Dialect::Legacy,
                notification: false,
                code: ErrorCode::InvalidParams,
                message: "arguments must be an object".to_string(),
            })
        }
    };

    Ok(Request {
        method,
        params,
        id: tag,
        dialect: Dialect::Legacy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn single(value: Value) -> Parsed {
        match parse_value(value) {
            Payload::Single(parsed) => parsed,
            Payload::Batch(_) => panic!("expected a single request"),
        }
    }

    #[test]
    fn test_versioned_request() {
        let req = single(json!({"jsonrpc": "2.0", "method": "session_get", "id": 7})).unwrap();
        assert_eq!(req.dialect, Dialect::Versioned);
        assert_eq!(req.id, Some(json!(7)));
        assert!(req.params.is_empty());
        assert!(!req.is_notification());
    }

    #[test]
    fn test_notification_and_null_id() {
        let note = single(json!({"jsonrpc": "2.0", "method": "x"})).unwrap();
        assert!(note.is_notification());

        let null_id = single(json!({"jsonrpc": "2.0", "method": "x", "id": null})).unwrap();
        assert_eq!(null_id.id, Some(Value::Null));
        assert!(!null_id.is_notification());
    }

    #[test]
    fn test_bad_id_type_is_nulled() {
        let rejected = single(json!({"jsonrpc": "2.0", "method": "x", "id": [1]})).unwrap_err();
        assert_eq!(rejected.code, ErrorCode::InvalidRequest);
        assert_eq!(rejected.id, Some(Value::Null));
    }

    #[test]
    fn test_wrong_version_and_missing_method() {
        let rejected = single(json!({"jsonrpc": "1.0", "method": "x", "id": "a"})).unwrap_err();
        assert_eq!(rejected.code, ErrorCode::InvalidRequest);
        assert_eq!(rejected.id, Some(json!("a")));

        let rejected = single(json!({"jsonrpc": "2.0", "id": 1})).unwrap_err();
        assert_eq!(rejected.code, ErrorCode::InvalidRequest);
    }

    #[test]
    fn test_mixed_dialect_keys() {
        let rejected =
            single(json!({"jsonrpc": "2.0", "method": "x", "arguments": {}, "id": 1})).unwrap_err();
        assert_eq!(rejected.code, ErrorCode::InvalidRequest);

        let rejected = single(json!({"method": "x", "params": {}, "tag": 4})).unwrap_err();
        assert_eq!(rejected.dialect, Dialect::Legacy);
        assert_eq!(rejected.id, Some(json!(4)));
    }

    #[test]
    fn test_non_map_params() {
        let rejected = single(json!({"jsonrpc": "2.0", "method": "x", "params": [1], "id": 2})).unwrap_err();
        assert_eq!(rejected.code, ErrorCode::InvalidParams);
        assert!(!rejected.notification);

        let rejected = single(json!({"jsonrpc": "2.0", "method": "x", "params": 3})).unwrap_err();
        assert!(rejected.notification);
    }

    #[test]
    fn test_legacy_request() {
        let req = single(json!({"method": "torrent-get", "arguments": {"fields": ["id"]}, "tag": 9})).unwrap();
        assert_eq!(req.dialect, Dialect::Legacy);
        assert_eq!(req.id, Some(json!(9)));
        assert!(!req.is_notification());

        let untagged = single(json!({"method": "session-get"})).unwrap();
        assert_eq!(untagged.id, None);
        assert!(!untagged.is_notification());

        let rejected = single(json!({"arguments": {}})).unwrap_err();
        assert_eq!(rejected.code, ErrorCode::MethodNotFound);
        assert_eq!(rejected.message, "no method name");
    }

    #[test]
    fn test_batches() {
        match parse_value(json!([{"jsonrpc": "2.0", "method": "a", "id": 1}, 5])) {
            Payload::Batch(items) => {
                assert!(items[0].is_ok());
                assert_eq!(items[1].as_ref().unwrap_err().code, ErrorCode::InvalidRequest);
            }
            Payload::Single(_) => panic!("expected a batch"),
        }

        let rejected = single(json!([])).unwrap_err();
        assert_eq!(rejected.code, ErrorCode::InvalidRequest);
    }

    #[test]
    fn test_parse_error() {
        match parse_body("{not json") {
            Payload::Single(Err(rejected)) => {
                assert_eq!(rejected.code, ErrorCode::ParseError);
                assert_eq!(rejected.id, Some(Value::Null));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
