//! Error types for the seedbox engine.
//!
//! Engine operations report failures through [`SeedboxError`]; the RPC layer
//! maps them onto its own wire taxonomy with [`SeedboxError::to_rpc_error_code`].

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the seedbox engine.
#[derive(Debug, Error)]
pub enum SeedboxError {
    // Network errors
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("path is not absolute: {0}")]
    PathNotAbsolute(PathBuf),

    // Torrent errors
    #[error("invalid or corrupt torrent file")]
    CorruptTorrent,

    #[error("torrent not found: {0}")]
    TorrentNotFound(i64),

    #[error("file index out of range")]
    FileIndexOutOfRange(i64),

    #[error("invalid tracker list")]
    InvalidTrackerList,

    #[error("error setting announce list")]
    AnnounceList,

    // Blocklist errors
    #[error("Error uncompressing blocklist: {0}")]
    Decompress(String),

    // Validation errors
    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, SeedboxError>;

impl From<std::io::Error> for SeedboxError {
    fn from(err: std::io::Error) -> Self {
        SeedboxError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<reqwest::Error> for SeedboxError {
    fn from(err: reqwest::Error) -> Self {
        SeedboxError::Network {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl SeedboxError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        SeedboxError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Convert to the daemon's RPC error code.
    ///
    /// Codes 1..=9 are the engine's domain codes:
    /// - 1: Announce list could not be set
    /// - 2: Invalid tracker list
    /// - 3: Path is not absolute
    /// - 4: Unrecognized info
    /// - 5: System error
    /// - 6: File index out of range
    /// - 7: Piece index out of range
    /// - 8: HTTP error from a backend service
    /// - 9: Invalid or corrupt torrent
    ///
    /// Validation failures and unknown torrents map to JSON-RPC `-32602`
    /// (invalid params).
    pub fn to_rpc_error_code(&self) -> i64 {
        match self {
            SeedboxError::AnnounceList => 1,
            SeedboxError::InvalidTrackerList => 2,
            SeedboxError::PathNotAbsolute(_) => 3,
            SeedboxError::Io { .. } | SeedboxError::Decompress(_) => 5,
            SeedboxError::FileIndexOutOfRange(_) => 6,
            SeedboxError::Network { .. } => 8,
            SeedboxError::CorruptTorrent => 9,
            SeedboxError::Validation { .. } | SeedboxError::TorrentNotFound(_) => -32602,
        }
    }
}
