//! Owned, move-only completion handles.
//!
//! Every dispatched call is turned into a [`Continuation`] before its handler
//! runs. The handle carries the caller's id, the output accumulated so far,
//! the dialect's completion adapter and a weak reference to the session.
//! Completing consumes the handle, so a call can be answered at most once;
//! dropping it unanswered answers with `INTERNAL_ERROR`, so a call is
//! answered at least once.

use crate::protocol::{Adapter, Dialect, Envelope, ErrorCode, HandlerError, Outcome, Request};
use seedbox_core::fields::Style;
use seedbox_core::Session;
use serde_json::{Map, Value};
use std::sync::{Arc, Weak};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Receives the finished response, or `None` when nothing is to be sent.
pub type Responder = Box<dyn FnOnce(Option<Value>) + Send + 'static>;

/// In-flight state of one call.
pub struct Continuation {
    method: String,
    dialect: Dialect,
    envelope: Envelope,
    adapter: Adapter,
    output: Map<String, Value>,
    session: Weak<Mutex<Session>>,
    responder: Option<Responder>,
}

impl Continuation {
    pub fn new(request: &Request, session: Weak<Mutex<Session>>, responder: Responder) -> Self {
        Self {
            method: request.method.clone(),
            dialect: request.dialect,
            envelope: Envelope {
                id: request.id.clone(),
                notification: request.is_notification(),
            },
            adapter: request.dialect.adapter(),
            output: Map::new(),
            session,
            responder: Some(responder),
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Key style for reading params and writing output.
    pub fn style(&self) -> Style {
        self.dialect.style()
    }

    pub fn is_notification(&self) -> bool {
        self.envelope.notification
    }

    pub fn output(&self) -> &Map<String, Value> {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.output
    }

    /// Insert one output field, choosing the key for the caller's dialect.
    pub fn insert(&mut self, current: &str, legacy: &str, value: impl Into<Value>) {
        let key = match self.style() {
            Style::Current => current,
            Style::Legacy => legacy,
        };
        self.output.insert(key.to_string(), value.into());
    }

    /// The session, unless it has been torn down.
    pub fn session(&self) -> Option<Arc<Mutex<Session>>> {
        self.session.upgrade()
    }

    pub fn succeed(self) {
        self.complete(ErrorCode::Success, String::new());
    }

    /// Answer with an error. Output carried by the error is merged over
    /// what was accumulated on the handle.
    pub fn fail(mut self, error: HandlerError) {
        self.output.extend(error.output);
        self.complete(error.code, error.message);
    }

    /// Answer the call. Output gathered so far is attached either way.
    pub fn complete(mut self, code: ErrorCode, message: impl Into<String>) {
        let message = message.into();
        if !code.is_success() {
            warn!("{} failed: {} ({})", self.method, message, code.code());
        }
        self.finish(code, message);
    }

    fn finish(&mut self, code: ErrorCode, message: String) {
        let Some(responder) = self.responder.take() else {
            return;
        };
        let outcome = Outcome {
            code,
            message,
            output: std::mem::take(&mut self.output),
        };
        debug!("{} completed with {}", self.method, code.code());
        responder((self.adapter)(&self.envelope, outcome));
    }
}

impl Drop for Continuation {
    fn drop(&mut self) {
        if self.responder.is_some() {
            warn!("{} abandoned before completion", self.method);
            self.finish(ErrorCode::InternalError, "request abandoned".to_string());
        }
    }
}

impl std::fmt::Debug for Continuation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Continuation")
            .field("method", &self.method)
            .field("dialect", &self.dialect)
            .field("id", &self.envelope.id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::parse_request;
    use serde_json::json;
    use std::sync::Mutex as StdMutex;

    fn capture() -> (Arc<StdMutex<Vec<Option<Value>>>>, Responder) {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let responder: Responder = Box::new(move |response| sink.lock().unwrap().push(response));
        (seen, responder)
    }

    fn continuation(value: Value, responder: Responder) -> Continuation {
        let request = parse_request(value).unwrap();
        Continuation::new(&request, Weak::new(), responder)
    }

    #[test]
    fn test_complete_once_with_output() {
        let (seen, responder) = capture();
        let mut cont = continuation(json!({"jsonrpc": "2.0", "method": "m", "id": 3}), responder);
        cont.insert("port_is_open", "port-is-open", true);
        cont.succeed();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0],
            Some(json!({"jsonrpc": "2.0", "result": {"port_is_open": true}, "id": 3}))
        );
    }

    #[test]
    fn test_legacy_keys_and_partial_output() {
        let (seen, responder) = capture();
        let mut cont = continuation(json!({"method": "m", "tag": 8}), responder);
        cont.insert("ip_protocol", "ipProtocol", "ipv4");
        cont.fail(HandlerError::new(ErrorCode::HttpError, "Couldn't test port: Not Found (404)"));

        assert_eq!(
            seen.lock().unwrap()[0],
            Some(json!({
                "arguments": {"ipProtocol": "ipv4"},
                "result": "Couldn't test port: Not Found (404)",
                "tag": 8
            }))
        );
    }

    #[test]
    fn test_drop_answers_internal_error() {
        let (seen, responder) = capture();
        let cont = continuation(json!({"jsonrpc": "2.0", "method": "m", "id": "z"}), responder);
        drop(cont);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let response = seen[0].as_ref().unwrap();
        assert_eq!(response["error"]["code"], json!(-32603));
        assert_eq!(response["id"], json!("z"));
    }

    #[test]
    fn test_notification_yields_none() {
        let (seen, responder) = capture();
        continuation(json!({"jsonrpc": "2.0", "method": "m"}), responder).succeed();
        assert_eq!(*seen.lock().unwrap(), vec![None]);
    }

    #[test]
    fn test_torn_down_session() {
        let (_seen, responder) = capture();
        let cont = continuation(json!({"jsonrpc": "2.0", "method": "m", "id": 1}), responder);
        assert!(cont.session().is_none());
        cont.succeed();
    }
}
