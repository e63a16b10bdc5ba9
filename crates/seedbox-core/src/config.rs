//! Centralized configuration for the seedbox daemon.
//!
//! Constants for the RPC transport, outbound network calls, and session
//! defaults. Runtime overrides come from the daemon's command line.

use std::path::PathBuf;
use std::time::Duration;

/// RPC transport configuration.
pub struct RpcConfig;

impl RpcConfig {
    pub const DEFAULT_HOST: &'static str = "127.0.0.1";
    pub const DEFAULT_PORT: u16 = 9091;
    pub const DEFAULT_URL_BASE: &'static str = "/transmission/";
    pub const RPC_PATH: &'static str = "rpc";
    /// Upper bound on a single request body.
    pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;
    pub const MAX_CONCURRENT_REQUESTS: usize = 64;
    pub const JSONRPC_VERSION: &'static str = "2.0";
    pub const RPC_VERSION: i64 = 18;
    pub const RPC_VERSION_MINIMUM: i64 = 14;
    pub const RPC_VERSION_SEMVER: &'static str = "6.0.0";
}

/// Network-related configuration.
pub struct NetworkConfig;

impl NetworkConfig {
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
    pub const USER_AGENT: &'static str = "seedbox/0.1";
    pub const PORT_CHECK_URL: &'static str = "https://portcheck.transmissionbt.com";
}

/// Session defaults.
pub struct SessionConfig;

impl SessionConfig {
    pub const CONFIG_DIR_NAME: &'static str = "seedbox";
    pub const BLOCKLIST_FILENAME: &'static str = "blocklist.bin";
    pub const DEFAULT_PEER_PORT: u16 = 51413;
    pub const DEFAULT_PEER_LIMIT_GLOBAL: i64 = 200;
    pub const DEFAULT_PEER_LIMIT_PER_TORRENT: i64 = 50;
    pub const DEFAULT_DOWNLOAD_QUEUE_SIZE: i64 = 5;
    pub const DEFAULT_SEED_QUEUE_SIZE: i64 = 10;
    pub const DEFAULT_BLOCKLIST_URL: &'static str = "http://www.example.com/blocklist";
    /// Torrents with activity inside this window count as "recently active".
    pub const RECENTLY_ACTIVE_SECONDS: i64 = 60;
}

/// Default directory for daemon state, e.g. `~/.config/seedbox`.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(SessionConfig::CONFIG_DIR_NAME)
}

/// Default download directory, e.g. `~/Downloads`.
pub fn default_download_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(std::env::temp_dir)
}
