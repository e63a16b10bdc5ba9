//! Seedbox Core - Headless engine model for the seedbox download daemon.
//!
//! This crate provides the collaborators the RPC layer drives: the in-memory
//! [`Session`] with its torrents and queue, the field schema tables used to
//! read and write attributes by name, the [`Fetcher`] primitive for outbound
//! HTTP, blocklist ingestion, and metainfo loading. It has no transport of
//! its own; see the `seedbox-rpc` crate for the JSON-RPC server.
//!
//! # Example
//!
//! ```rust,ignore
//! use seedbox_core::{HttpFetcher, Session, SessionSettings};
//! use std::sync::Arc;
//!
//! let settings = SessionSettings::new(config_dir, download_dir);
//! let session = Session::new(settings, Arc::new(HttpFetcher::new()?));
//! println!("{} torrents", session.torrent_count());
//! ```

pub mod blocklist;
pub mod config;
pub mod error;
pub mod fields;
pub mod metainfo;
pub mod network;
pub mod session;
pub mod space;

// Re-export commonly used types
pub use config::{NetworkConfig, RpcConfig, SessionConfig};
pub use error::{Result, SeedboxError};
pub use fields::{FieldDescriptor, Style, SESSION_FIELDS, TORRENT_FIELDS};
pub use metainfo::{Metainfo, MetainfoSource};
pub use network::{FetchRequest, FetchResponse, Fetcher, HttpFetcher, IpProtocol};
pub use session::{
    AddOptions, AddOutcome, RenamePlan, Session, SessionEvent, SessionSettings, SessionStats,
    Torrent, TorrentRef, TorrentSelector,
};
pub use space::{disk_space, DiskSpace};
