//! RPC method handlers, split by domain.

mod add;
mod network;
mod queue;
mod rename;
mod session;
mod torrents;

use crate::protocol::HandlerError;
use crate::registry::{MethodDescriptor, Params};
use seedbox_core::fields::{self, Style};
use seedbox_core::{TorrentRef, TorrentSelector};
use serde_json::{Map, Value};

/// The method table. Names are the versioned spelling; legacy callers use
/// the same names with `-` in place of `_`.
pub static METHODS: &[MethodDescriptor] = &[
    MethodDescriptor::asynchronous("blocklist_update", network::blocklist_update, true),
    MethodDescriptor::sync("free_space", session::free_space, false),
    MethodDescriptor::asynchronous("port_test", network::port_test, false),
    MethodDescriptor::sync("queue_move_bottom", queue::queue_move_bottom, true),
    MethodDescriptor::sync("queue_move_down", queue::queue_move_down, true),
    MethodDescriptor::sync("queue_move_top", queue::queue_move_top, true),
    MethodDescriptor::sync("queue_move_up", queue::queue_move_up, true),
    MethodDescriptor::sync("session_close", session::session_close, true),
    MethodDescriptor::sync("session_get", session::session_get, false),
    MethodDescriptor::sync("session_set", session::session_set, true),
    MethodDescriptor::sync("session_stats", session::session_stats, false),
    MethodDescriptor::asynchronous("torrent_add", add::torrent_add, true),
    MethodDescriptor::sync("torrent_get", torrents::torrent_get, false),
    MethodDescriptor::sync("torrent_reannounce", torrents::torrent_reannounce, true),
    MethodDescriptor::sync("torrent_remove", torrents::torrent_remove, true),
    MethodDescriptor::asynchronous("torrent_rename_path", rename::torrent_rename_path, true),
    MethodDescriptor::sync("torrent_set", torrents::torrent_set, true),
    MethodDescriptor::sync("torrent_set_location", torrents::torrent_set_location, true),
    MethodDescriptor::sync("torrent_start", torrents::torrent_start, true),
    MethodDescriptor::sync("torrent_start_now", torrents::torrent_start_now, true),
    MethodDescriptor::sync("torrent_stop", torrents::torrent_stop, true),
    MethodDescriptor::sync("torrent_verify", torrents::torrent_verify, true),
];

// ============================================================================
// Parameter helpers
// ============================================================================

/// Look up a parameter by its versioned or legacy name.
pub(crate) fn get_param<'a>(params: &'a Params, snake: &str, legacy: &str) -> Option<&'a Value> {
    params.get(snake).or_else(|| params.get(legacy))
}

/// Extract an optional string parameter, supporting both spellings.
pub(crate) fn get_str_param<'a>(params: &'a Params, snake: &str, legacy: &str) -> Option<&'a str> {
    get_param(params, snake, legacy).and_then(Value::as_str)
}

/// Extract an optional bool parameter. Integers 0/1 are accepted.
pub(crate) fn get_bool_param(params: &Params, snake: &str, legacy: &str) -> Option<bool> {
    get_param(params, snake, legacy).and_then(|v| fields::value_bool(snake, v).ok())
}

/// Extract an optional i64 parameter, supporting both spellings.
pub(crate) fn get_i64_param(params: &Params, snake: &str, legacy: &str) -> Option<i64> {
    get_param(params, snake, legacy).and_then(Value::as_i64)
}

/// Extract a list of integers. A missing parameter is an empty list.
pub(crate) fn get_i64_list(
    params: &Params,
    snake: &str,
    legacy: &str,
) -> Result<Vec<i64>, HandlerError> {
    match get_param(params, snake, legacy) {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| {
                v.as_i64().ok_or_else(|| {
                    HandlerError::invalid_params(format!("{} must be a list of integers", snake))
                })
            })
            .collect(),
        Some(_) => Err(HandlerError::invalid_params(format!(
            "{} must be a list of integers",
            snake
        ))),
    }
}

/// Extract a list of strings. A missing parameter is `None`.
pub(crate) fn get_str_list(
    params: &Params,
    snake: &str,
    legacy: &str,
) -> Result<Option<Vec<String>>, HandlerError> {
    let invalid = || HandlerError::invalid_params(format!("{} must be a list of strings", snake));
    match get_param(params, snake, legacy) {
        None => Ok(None),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| v.as_str().map(str::to_string).ok_or_else(invalid))
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        Some(_) => Err(invalid()),
    }
}

/// Read the `ids` argument. Absent means every torrent.
pub(crate) fn torrent_selector(params: &Params) -> TorrentSelector {
    fn entry(value: &Value) -> Option<TorrentRef> {
        match value {
            Value::Number(n) => n.as_i64().map(TorrentRef::Id),
            Value::String(s) => Some(TorrentRef::Hash(s.clone())),
            _ => None,
        }
    }

    match params.get("ids") {
        None => TorrentSelector::All,
        Some(Value::String(s)) if s == "recently-active" || s == "recently_active" => {
            TorrentSelector::RecentlyActive
        }
        Some(Value::Array(items)) => TorrentSelector::List(items.iter().filter_map(entry).collect()),
        Some(other) => TorrentSelector::List(entry(other).into_iter().collect()),
    }
}

/// Pick the output key for the caller's dialect.
pub(crate) fn key(style: Style, snake: &'static str, legacy: &'static str) -> String {
    match style {
        Style::Current => snake.to_string(),
        Style::Legacy => legacy.to_string(),
    }
}

pub(crate) fn empty() -> Map<String, Value> {
    Map::new()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use seedbox_core::metainfo::parse_torrent;
    use seedbox_core::{AddOptions, FetchRequest, FetchResponse, Fetcher, Session, SessionSettings};
    use serde_json::json;
    use std::path::Path;
    use std::sync::Arc;

    pub(crate) struct Offline;

    #[async_trait::async_trait]
    impl Fetcher for Offline {
        async fn fetch(&self, _request: FetchRequest) -> FetchResponse {
            FetchResponse::unreachable()
        }
    }

    pub(crate) fn params(value: Value) -> Params {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    pub(crate) fn test_session(dir: &Path) -> Session {
        let settings = SessionSettings::new(dir.join("config"), dir.join("downloads"));
        Session::new(settings, Arc::new(Offline))
    }

    /// A single-file torrent named `name`.
    pub(crate) fn torrent_bytes(name: &str, length: u64) -> Vec<u8> {
        format!(
            "d8:announce18:http://tracker/ann4:infod6:lengthi{}e4:name{}:{}12:piece lengthi16384eee",
            length,
            name.len(),
            name
        )
        .into_bytes()
    }

    pub(crate) fn add_paused(session: &mut Session, name: &str) -> i64 {
        let meta = parse_torrent(&torrent_bytes(name, 2048)).unwrap();
        let options = AddOptions {
            paused: Some(true),
            ..AddOptions::default()
        };
        session.add_torrent(meta, options).unwrap().id()
    }

    #[test]
    fn test_torrent_selector() {
        assert_eq!(torrent_selector(&params(json!({}))), TorrentSelector::All);
        assert_eq!(
            torrent_selector(&params(json!({"ids": "recently-active"}))),
            TorrentSelector::RecentlyActive
        );
        assert_eq!(
            torrent_selector(&params(json!({"ids": 3}))),
            TorrentSelector::List(vec![TorrentRef::Id(3)])
        );
        assert_eq!(
            torrent_selector(&params(json!({"ids": [1, "abcd", null]}))),
            TorrentSelector::List(vec![TorrentRef::Id(1), TorrentRef::Hash("abcd".into())])
        );
    }

    #[test]
    fn test_list_params() {
        let p = params(json!({"files-wanted": [0, 2], "labels": ["a"], "bad": "x"}));
        assert_eq!(get_i64_list(&p, "files_wanted", "files-wanted").unwrap(), vec![0, 2]);
        assert!(get_i64_list(&p, "bad", "bad").is_err());
        assert_eq!(
            get_str_list(&p, "labels", "labels").unwrap(),
            Some(vec!["a".to_string()])
        );
        assert_eq!(get_str_list(&p, "missing", "missing").unwrap(), None);
    }

    #[test]
    fn test_method_names_are_snake_case() {
        for method in METHODS {
            assert!(!method.name.contains('-'), "{}", method.name);
        }
    }
}
