//! The closed error taxonomy shared by both dialects.

use seedbox_core::SeedboxError;
use serde_json::{Map, Value};
use thiserror::Error;

/// Result codes a call can complete with.
///
/// Protocol codes follow JSON-RPC 2.0. Domain codes are small positive
/// integers specific to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Success,
    // Protocol
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    // Domain
    SetAnnounceList,
    InvalidTrackerList,
    PathNotAbsolute,
    UnrecognizedInfo,
    SystemError,
    FileIndexOutOfRange,
    PieceIndexOutOfRange,
    HttpError,
    CorruptTorrent,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 15] = [
        ErrorCode::Success,
        ErrorCode::ParseError,
        ErrorCode::InvalidRequest,
        ErrorCode::MethodNotFound,
        ErrorCode::InvalidParams,
        ErrorCode::InternalError,
        ErrorCode::SetAnnounceList,
        ErrorCode::InvalidTrackerList,
        ErrorCode::PathNotAbsolute,
        ErrorCode::UnrecognizedInfo,
        ErrorCode::SystemError,
        ErrorCode::FileIndexOutOfRange,
        ErrorCode::PieceIndexOutOfRange,
        ErrorCode::HttpError,
        ErrorCode::CorruptTorrent,
    ];

    /// Numeric wire code.
    pub fn code(self) -> i64 {
        match self {
            ErrorCode::Success => 0,
            ErrorCode::ParseError => -32700,
            ErrorCode::InvalidRequest => -32600,
            ErrorCode::MethodNotFound => -32601,
            ErrorCode::InvalidParams => -32602,
            ErrorCode::InternalError => -32603,
            ErrorCode::SetAnnounceList => 1,
            ErrorCode::InvalidTrackerList => 2,
            ErrorCode::PathNotAbsolute => 3,
            ErrorCode::UnrecognizedInfo => 4,
            ErrorCode::SystemError => 5,
            ErrorCode::FileIndexOutOfRange => 6,
            ErrorCode::PieceIndexOutOfRange => 7,
            ErrorCode::HttpError => 8,
            ErrorCode::CorruptTorrent => 9,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }

    /// Message used when a handler supplies none.
    pub fn default_message(self) -> &'static str {
        match self {
            ErrorCode::Success => "success",
            ErrorCode::ParseError => "Parse error",
            ErrorCode::InvalidRequest => "Invalid Request",
            ErrorCode::MethodNotFound => "Method not found",
            ErrorCode::InvalidParams => "Invalid params",
            ErrorCode::InternalError => "Internal error",
            ErrorCode::SetAnnounceList => "error setting announce list",
            ErrorCode::InvalidTrackerList => "Invalid tracker list",
            ErrorCode::PathNotAbsolute => "path is not absolute",
            ErrorCode::UnrecognizedInfo => "unrecognized info",
            ErrorCode::SystemError => "system error",
            ErrorCode::FileIndexOutOfRange => "file index out of range",
            ErrorCode::PieceIndexOutOfRange => "piece index out of range",
            ErrorCode::HttpError => "HTTP error from backend service",
            ErrorCode::CorruptTorrent => "invalid or corrupt torrent file",
        }
    }

    pub fn is_success(self) -> bool {
        self == ErrorCode::Success
    }
}

impl From<&SeedboxError> for ErrorCode {
    fn from(err: &SeedboxError) -> Self {
        ErrorCode::from_code(err.to_rpc_error_code()).unwrap_or(ErrorCode::InternalError)
    }
}

/// A failed handler call: a code, a caller-facing message, and any output
/// the handler produced before failing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HandlerError {
    pub code: ErrorCode,
    pub message: String,
    pub output: Map<String, Value>,
}

impl HandlerError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            output: Map::new(),
        }
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidParams, message)
    }

    /// Attach partial output; it is answered alongside the error.
    pub fn with_output(mut self, output: Map<String, Value>) -> Self {
        self.output = output;
        self
    }
}

impl From<SeedboxError> for HandlerError {
    fn from(err: SeedboxError) -> Self {
        let code = ErrorCode::from(&err);
        let message = match err {
            SeedboxError::Io { message, .. } => message,
            SeedboxError::Validation { message, .. } => message,
            other => other.to_string(),
        };
        HandlerError::new(code, message)
    }
}
