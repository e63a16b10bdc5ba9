//! Wire protocol: request parsing, response envelopes, and the error taxonomy.

pub mod error;
pub mod request;
pub mod response;
pub mod uri;

pub use error::{ErrorCode, HandlerError};
pub use request::{parse_body, parse_request, parse_value, Dialect, Parsed, Payload, Rejected, Request};
pub use response::{Adapter, Envelope, Outcome};
