//! Session-wide handlers: settings, statistics, shutdown and free space.

use super::{empty, get_param, get_str_param, key};
use crate::protocol::{ErrorCode, HandlerError};
use crate::registry::{HandlerResult, Params};
use seedbox_core::fields::{legacy_keys, lookup, Style, SESSION_FIELDS};
use seedbox_core::{disk_space, SeedboxError, Session, SessionStats};
use serde_json::{json, Map, Value};
use std::path::Path;
use tracing::{debug, info};

pub fn session_get(session: &mut Session, params: &Params, style: Style) -> HandlerResult {
    let wanted: Option<Vec<&str>> = match get_param(params, "fields", "fields") {
        Some(Value::Array(items)) => Some(items.iter().filter_map(Value::as_str).collect()),
        Some(Value::String(s)) => Some(s.split(',').map(str::trim).collect()),
        _ => None,
    };

    let mut out = Map::new();
    for field in SESSION_FIELDS {
        let included = wanted
            .as_ref()
            .map_or(true, |names| names.iter().any(|n| *n == field.name || *n == field.legacy_name));
        if included {
            out.insert(field.key(style).to_string(), field.read(session, style));
        }
    }
    Ok(out)
}

/// Apply every recognized setting. Unknown keys are ignored.
pub fn session_set(session: &mut Session, params: &Params, _style: Style) -> HandlerResult {
    for (name, value) in params {
        match lookup(SESSION_FIELDS, name) {
            Some(field) => match field.set {
                Some(set) => set(session, value)?,
                None => debug!("session_set: {} is read-only", name),
            },
            None => debug!("session_set: ignoring unknown key {}", name),
        }
    }
    Ok(empty())
}

fn stats_value(stats: SessionStats, style: Style) -> Value {
    let value = json!({
        "uploaded_bytes": stats.uploaded_bytes,
        "downloaded_bytes": stats.downloaded_bytes,
        "files_added": stats.files_added,
        "session_count": stats.session_count,
        "seconds_active": stats.seconds_active,
    });
    match style {
        Style::Current => value,
        Style::Legacy => legacy_keys(value),
    }
}

pub fn session_stats(session: &mut Session, _params: &Params, style: Style) -> HandlerResult {
    let mut out = Map::new();
    out.insert(
        key(style, "active_torrent_count", "activeTorrentCount"),
        json!(session.active_count()),
    );
    out.insert(
        key(style, "paused_torrent_count", "pausedTorrentCount"),
        json!(session.paused_count()),
    );
    out.insert(key(style, "torrent_count", "torrentCount"), json!(session.torrent_count()));
    out.insert(key(style, "download_speed", "downloadSpeed"), json!(0));
    out.insert(key(style, "upload_speed", "uploadSpeed"), json!(0));
    out.insert(
        key(style, "cumulative_stats", "cumulative-stats"),
        stats_value(session.cumulative_stats(), style),
    );
    out.insert(
        key(style, "current_stats", "current-stats"),
        stats_value(session.current_stats(), style),
    );
    Ok(out)
}

pub fn session_close(session: &mut Session, _params: &Params, _style: Style) -> HandlerResult {
    info!("session close requested over RPC");
    session.close();
    Ok(empty())
}

pub fn free_space(_session: &mut Session, params: &Params, style: Style) -> HandlerResult {
    let path = get_str_param(params, "path", "path")
        .ok_or_else(|| HandlerError::invalid_params("directory path argument is missing"))?;
    if !Path::new(path).is_absolute() {
        return Err(HandlerError::new(
            ErrorCode::PathNotAbsolute,
            "directory path is not absolute",
        ));
    }

    let mut out = Map::new();
    out.insert("path".into(), json!(path));
    let size_key = key(style, "size_bytes", "size-bytes");
    let total_key = key(style, "total_size", "total_size");

    match disk_space(Path::new(path)) {
        Ok(space) => {
            out.insert(size_key, json!(space.free));
            out.insert(total_key, json!(space.total));
            Ok(out)
        }
        Err(e) => {
            // Sizes read -1 when the directory cannot be queried.
            out.insert(size_key, json!(-1));
            out.insert(total_key, json!(-1));
            let error = match e {
                SeedboxError::Io { message, .. } => HandlerError::new(ErrorCode::SystemError, message),
                other => HandlerError::from(other),
            };
            Err(error.with_output(out))
        }
    }
}
