//! RPC control plane for the seedbox daemon.
//!
//! Requests arrive in one of two dialects: JSON-RPC 2.0
//! (`{jsonrpc, method, params, id}`) or the legacy
//! `{method, arguments, tag}` form. Both go through the same path:
//!
//! - [`protocol`] parses bodies into [`protocol::Request`]s or rejections
//! - [`registry`] maps method names to synchronous or asynchronous handlers
//! - [`dispatch`] invokes handlers under the session lock
//! - [`continuation`] carries each call until it is answered exactly once
//! - [`batch`] gathers the answers of a batch back into request order
//! - [`server`] exposes the dispatcher over HTTP
//!
//! # Example
//!
//! ```rust,ignore
//! use seedbox_rpc::{Dispatcher, Registry};
//!
//! let dispatcher = Dispatcher::new(Arc::new(Registry::standard()), session);
//! let response = dispatcher
//!     .call(r#"{"jsonrpc":"2.0","method":"session_get","id":1}"#)
//!     .await;
//! ```

pub mod batch;
pub mod continuation;
pub mod dispatch;
pub mod handlers;
pub mod protocol;
pub mod registry;
pub mod server;

pub use continuation::{Continuation, Responder};
pub use dispatch::Dispatcher;
pub use protocol::{Dialect, ErrorCode, HandlerError};
pub use registry::{Handler, MethodDescriptor, Registry};
pub use server::{start_server, ServerOptions};
