//! Request dispatch.
//!
//! The [`Dispatcher`] owns the registry and the session. One call takes the
//! session lock once, parses the body, and runs every synchronous handler
//! (or the start of every asynchronous one) before releasing it. Async
//! handlers finish on their own tasks and re-acquire the lock themselves.

use crate::batch::BatchContext;
use crate::continuation::{Continuation, Responder};
use crate::protocol::{self, response, ErrorCode, Parsed, Payload, Request};
use crate::registry::{Handler, Registry};
use seedbox_core::Session;
use serde_json::Value;
use std::sync::{Arc, Weak};
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, warn};

#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
    session: Arc<Mutex<Session>>,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>, session: Arc<Mutex<Session>>) -> Self {
        Self { registry, session }
    }

    pub fn session(&self) -> &Arc<Mutex<Session>> {
        &self.session
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Handle a serialized body and report through `done`, possibly later.
    pub async fn handle(&self, body: &str, done: Responder) {
        let payload = protocol::parse_body(body);
        self.handle_payload(payload, done).await;
    }

    /// Handle an already-decoded body.
    pub async fn handle_value(&self, value: Value, done: Responder) {
        self.handle_payload(protocol::parse_value(value), done).await;
    }

    async fn handle_payload(&self, payload: Payload, done: Responder) {
        let mut session = self.session.lock().await;
        let weak = Arc::downgrade(&self.session);
        match payload {
            Payload::Single(parsed) => self.dispatch(&mut session, &weak, parsed, done),
            Payload::Batch(items) => {
                debug!("batch of {} requests", items.len());
                let ctx = BatchContext::new(items.len(), done);
                for (index, parsed) in items.into_iter().enumerate() {
                    self.dispatch(&mut session, &weak, parsed, ctx.responder(index));
                }
            }
        }
    }

    /// Handle a body and wait for the response.
    pub async fn call(&self, body: &str) -> Option<Value> {
        let (tx, rx) = oneshot::channel();
        self.handle(body, Box::new(move |response| {
            let _ = tx.send(response);
        }))
        .await;
        rx.await.ok().flatten()
    }

    /// Handle a decoded body and wait for the response.
    pub async fn call_value(&self, value: Value) -> Option<Value> {
        let (tx, rx) = oneshot::channel();
        self.handle_value(value, Box::new(move |response| {
            let _ = tx.send(response);
        }))
        .await;
        rx.await.ok().flatten()
    }

    fn dispatch(
        &self,
        session: &mut Session,
        weak: &Weak<Mutex<Session>>,
        parsed: Parsed,
        responder: Responder,
    ) {
        match parsed {
            Ok(request) => self.invoke(session, weak, request, responder),
            Err(rejected) => {
                debug!("rejected request: {:?} {}", rejected.code, rejected.message);
                responder(response::rejection(rejected));
            }
        }
    }

    fn invoke(
        &self,
        session: &mut Session,
        weak: &Weak<Mutex<Session>>,
        request: Request,
        responder: Responder,
    ) {
        debug!("RPC call: {} ({})", request.method, request.dialect.as_str());
        let cont = Continuation::new(&request, Weak::clone(weak), responder);

        let method = match self.registry.lookup(&request.method) {
            Some(method) => method,
            None => {
                warn!("Method not found: {}", request.method);
                cont.complete(ErrorCode::MethodNotFound, String::new());
                return;
            }
        };

        if request.is_notification() && !method.has_side_effects {
            debug!("skipping {} for notification", method.name);
            cont.succeed();
            return;
        }

        match method.handler {
            Handler::Sync(handler) => match handler(session, &request.params, cont.style()) {
                Ok(output) => {
                    let mut cont = cont;
                    *cont.output_mut() = output;
                    cont.succeed();
                }
                Err(e) => cont.fail(e),
            },
            Handler::Async(handler) => handler(session, &request.params, cont),
        }
    }
}
