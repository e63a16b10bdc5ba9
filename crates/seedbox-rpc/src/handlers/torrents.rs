//! Torrent query and mutation handlers.

use super::{
    empty, get_bool_param, get_i64_list, get_i64_param, get_param, get_str_list, get_str_param,
    torrent_selector,
};
use crate::protocol::{ErrorCode, HandlerError};
use crate::registry::{HandlerResult, Params};
use seedbox_core::fields::{lookup, FieldDescriptor, Style, TORRENT_FIELDS};
use seedbox_core::session::{PRIORITY_HIGH, PRIORITY_LOW, PRIORITY_NORMAL};
use seedbox_core::{Session, Torrent, TorrentSelector};
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use tracing::debug;

/// Requested field names, from a list or a comma-separated string.
fn requested_fields(params: &Params) -> Result<Vec<&'static FieldDescriptor<Torrent>>, HandlerError> {
    let names: Vec<&str> = match get_param(params, "fields", "fields") {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        Some(Value::String(s)) => s.split(',').map(str::trim).collect(),
        _ => Vec::new(),
    };
    if names.is_empty() {
        return Err(HandlerError::invalid_params("no fields specified"));
    }

    let mut fields = Vec::with_capacity(names.len());
    for name in names {
        match lookup(TORRENT_FIELDS, name) {
            Some(field) => fields.push(field),
            None => debug!("torrent_get: ignoring unknown field {}", name),
        }
    }
    Ok(fields)
}

pub fn torrent_get(session: &mut Session, params: &Params, style: Style) -> HandlerResult {
    let fields = requested_fields(params)?;
    let as_table = get_str_param(params, "format", "format") == Some("table");
    let selector = torrent_selector(params);
    let torrents: Vec<&Torrent> = session
        .select(&selector)
        .into_iter()
        .filter_map(|id| session.torrent(id))
        .collect();

    let list: Vec<Value> = if as_table {
        let header = Value::Array(fields.iter().map(|f| Value::from(f.key(style))).collect());
        std::iter::once(header)
            .chain(torrents.iter().map(|tor| {
                Value::Array(fields.iter().map(|f| f.read(tor, style)).collect())
            }))
            .collect()
    } else {
        torrents
            .iter()
            .map(|tor| {
                Value::Object(
                    fields
                        .iter()
                        .map(|f| (f.key(style).to_string(), f.read(tor, style)))
                        .collect(),
                )
            })
            .collect()
    };

    let mut out = Map::new();
    out.insert("torrents".into(), Value::Array(list));
    if selector == TorrentSelector::RecentlyActive {
        out.insert("removed".into(), json!(session.recently_removed()));
    }
    Ok(out)
}

/// A file index list, where present-but-empty means every file.
fn index_list(params: &Params, snake: &str, legacy: &str) -> Result<Option<Vec<i64>>, HandlerError> {
    if get_param(params, snake, legacy).is_none() {
        return Ok(None);
    }
    get_i64_list(params, snake, legacy).map(Some)
}

/// `tracker_replace` as `(tracker id, url)` pairs, from a flat
/// `[id, url, id, url]` list.
fn tracker_pairs(params: &Params) -> Result<Vec<(i64, String)>, HandlerError> {
    let invalid = || HandlerError::new(ErrorCode::InvalidTrackerList, "invalid tracker list");
    let Some(value) = get_param(params, "tracker_replace", "trackerReplace") else {
        return Ok(Vec::new());
    };
    let items = value.as_array().ok_or_else(invalid)?;
    items
        .chunks(2)
        .map(|pair| match pair {
            [id, url] => match (id.as_i64(), url.as_str()) {
                (Some(id), Some(url)) => Ok((id, url.to_string())),
                _ => Err(invalid()),
            },
            _ => Err(invalid()),
        })
        .collect()
}

pub fn torrent_set(session: &mut Session, params: &Params, _style: Style) -> HandlerResult {
    let ids = session.select(&torrent_selector(params));

    let labels = get_str_list(params, "labels", "labels")?;
    let files_wanted = index_list(params, "files_wanted", "files-wanted")?;
    let files_unwanted = index_list(params, "files_unwanted", "files-unwanted")?;
    let priorities = [
        (index_list(params, "priority_low", "priority-low")?, PRIORITY_LOW),
        (index_list(params, "priority_normal", "priority-normal")?, PRIORITY_NORMAL),
        (index_list(params, "priority_high", "priority-high")?, PRIORITY_HIGH),
    ];
    let tracker_add = get_str_list(params, "tracker_add", "trackerAdd")?;
    let tracker_remove = get_i64_list(params, "tracker_remove", "trackerRemove")?;
    let tracker_replace = tracker_pairs(params)?;
    let tracker_list = get_str_param(params, "tracker_list", "trackerList");
    let queue_position = get_i64_param(params, "queue_position", "queuePosition");

    let setters: Vec<_> = params
        .iter()
        .filter_map(|(key, value)| {
            let field = lookup(TORRENT_FIELDS, key)?;
            field.set.map(|set| (set, value))
        })
        .collect();

    for id in ids {
        let Some(tor) = session.torrent_mut(id) else {
            continue;
        };
        if let Some(labels) = &labels {
            tor.set_labels(labels).map_err(HandlerError::invalid_params)?;
        }
        if let Some(indices) = &files_unwanted {
            tor.set_files_wanted(indices, false)?;
        }
        if let Some(indices) = &files_wanted {
            tor.set_files_wanted(indices, true)?;
        }
        for (indices, priority) in &priorities {
            if let Some(indices) = indices {
                tor.set_file_priorities(indices, *priority)?;
            }
        }
        for (set, value) in &setters {
            set(tor, value)?;
        }
        if let Some(urls) = &tracker_add {
            tor.add_trackers(urls)?;
        }
        if !tracker_remove.is_empty() {
            tor.remove_trackers(&tracker_remove)?;
        }
        if !tracker_replace.is_empty() {
            tor.replace_trackers(&tracker_replace)?;
        }
        if let Some(text) = tracker_list {
            tor.set_tracker_list(text)?;
        }

        session.mark_changed(id);
        if let Some(position) = queue_position {
            session.set_queue_position(id, position);
        }
    }
    Ok(empty())
}

pub fn torrent_set_location(session: &mut Session, params: &Params, _style: Style) -> HandlerResult {
    let location = get_str_param(params, "location", "location")
        .ok_or_else(|| HandlerError::invalid_params("no location"))?;
    let location = PathBuf::from(location);
    if !location.is_absolute() {
        return Err(HandlerError::new(
            ErrorCode::PathNotAbsolute,
            "new location path is not absolute",
        ));
    }
    let move_data = get_bool_param(params, "move", "move").unwrap_or(false);

    let ids = session.select(&torrent_selector(params));
    session.set_location(&ids, &location, move_data)?;
    Ok(empty())
}

pub fn torrent_remove(session: &mut Session, params: &Params, _style: Style) -> HandlerResult {
    let delete = get_bool_param(params, "delete_local_data", "delete-local-data").unwrap_or(false);
    let ids = session.select(&torrent_selector(params));
    session.remove(&ids, delete);
    Ok(empty())
}

pub fn torrent_start(session: &mut Session, params: &Params, _style: Style) -> HandlerResult {
    let ids = session.select(&torrent_selector(params));
    session.start(&ids, false);
    Ok(empty())
}

pub fn torrent_start_now(session: &mut Session, params: &Params, _style: Style) -> HandlerResult {
    let ids = session.select(&torrent_selector(params));
    session.start(&ids, true);
    Ok(empty())
}

pub fn torrent_stop(session: &mut Session, params: &Params, _style: Style) -> HandlerResult {
    let ids = session.select(&torrent_selector(params));
    session.stop(&ids);
    Ok(empty())
}

pub fn torrent_verify(session: &mut Session, params: &Params, _style: Style) -> HandlerResult {
    let ids = session.select(&torrent_selector(params));
    session.verify(&ids);
    Ok(empty())
}

pub fn torrent_reannounce(session: &mut Session, params: &Params, _style: Style) -> HandlerResult {
    let ids = session.select(&torrent_selector(params));
    session.reannounce(&ids);
    Ok(empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::tests::{add_paused, params, test_session};
    use seedbox_core::session::Activity;

    #[test]
    fn test_get_requires_fields() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut session = test_session(dir.path());
        let err = torrent_get(&mut session, &params(json!({})), Style::Current).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidParams);
        assert_eq!(err.message, "no fields specified");
    }

    #[test]
    fn test_get_object_and_table() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut session = test_session(dir.path());
        let a = add_paused(&mut session, "alpha");
        add_paused(&mut session, "beta");

        let out = torrent_get(
            &mut session,
            &params(json!({"ids": [a], "fields": ["id", "name", "hash_string", "bogus"]})),
            Style::Current,
        )
        .unwrap();
        let torrents = out["torrents"].as_array().unwrap();
        assert_eq!(torrents.len(), 1);
        assert_eq!(torrents[0]["name"], "alpha");
        assert!(torrents[0].get("hash_string").is_some());
        assert!(torrents[0].get("bogus").is_none());

        let table = torrent_get(
            &mut session,
            &params(json!({"fields": ["id", "totalSize"], "format": "table"})),
            Style::Legacy,
        )
        .unwrap();
        assert_eq!(table["torrents"][0], json!(["id", "totalSize"]));
        assert_eq!(table["torrents"][1], json!([a, 2048]));
        assert_eq!(table["torrents"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_get_legacy_nested_keys() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut session = test_session(dir.path());
        add_paused(&mut session, "alpha");
        let out = torrent_get(&mut session, &params(json!({"fields": "fileStats"})), Style::Legacy)
            .unwrap();
        let stats = &out["torrents"][0]["fileStats"][0];
        assert_eq!(stats["bytesCompleted"], 0);
        assert_eq!(stats["wanted"], true);
    }

    #[test]
    fn test_recently_active_lists_removed() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut session = test_session(dir.path());
        let a = add_paused(&mut session, "alpha");
        let b = add_paused(&mut session, "beta");
        torrent_remove(&mut session, &params(json!({"ids": [a]})), Style::Current).unwrap();

        let out = torrent_get(
            &mut session,
            &params(json!({"ids": "recently-active", "fields": ["id"]})),
            Style::Current,
        )
        .unwrap();
        assert_eq!(out["removed"], json!([a]));
        assert_eq!(out["torrents"], json!([{"id": b}]));
    }

    #[test]
    fn test_set_fields_and_lists() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut session = test_session(dir.path());
        let a = add_paused(&mut session, "alpha");
        add_paused(&mut session, "beta");

        torrent_set(
            &mut session,
            &params(json!({
                "ids": [a],
                "labels": ["linux", "iso"],
                "files-unwanted": [],
                "peer-limit": 12,
                "trackerAdd": ["udp://tracker.example:6969"],
                "queuePosition": 1
            })),
            Style::Legacy,
        )
        .unwrap();

        let tor = session.torrent(a).unwrap();
        assert_eq!(tor.labels, vec!["linux".to_string(), "iso".to_string()]);
        assert!(tor.files.iter().all(|f| !f.wanted));
        assert_eq!(tor.peer_limit, 12);
        assert_eq!(tor.trackers.len(), 2);
        assert_eq!(tor.queue_position, 1);
    }

    #[test]
    fn test_set_errors() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut session = test_session(dir.path());
        add_paused(&mut session, "alpha");

        let err = torrent_set(&mut session, &params(json!({"labels": ["a,b"]})), Style::Current)
            .unwrap_err();
        assert_eq!(err.message, "labels cannot contain comma (,) character");

        let err = torrent_set(&mut session, &params(json!({"files_wanted": [9]})), Style::Current)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::FileIndexOutOfRange);

        let err = torrent_set(&mut session, &params(json!({"tracker_remove": [77]})), Style::Current)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidTrackerList);

        let err = torrent_set(&mut session, &params(json!({"tracker_replace": [0]})), Style::Current)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidTrackerList);

        let err = torrent_set(&mut session, &params(json!({"tracker_list": "nope"})), Style::Current)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::SetAnnounceList);

        let err = torrent_set(&mut session, &params(json!({"bandwidth_priority": 5})), Style::Current)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidParams);
    }

    #[test]
    fn test_set_location_errors() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut session = test_session(dir.path());

        let err = torrent_set_location(&mut session, &params(json!({})), Style::Current).unwrap_err();
        assert_eq!(err.message, "no location");

        let err = torrent_set_location(&mut session, &params(json!({"location": "rel"})), Style::Current)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PathNotAbsolute);
        assert_eq!(err.message, "new location path is not absolute");
    }

    #[test]
    fn test_start_stop() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut session = test_session(dir.path());
        let a = add_paused(&mut session, "alpha");

        torrent_start_now(&mut session, &params(json!({"ids": a})), Style::Current).unwrap();
        assert_eq!(session.torrent(a).unwrap().status, Activity::Download);
        torrent_stop(&mut session, &params(json!({})), Style::Current).unwrap();
        assert_eq!(session.torrent(a).unwrap().status, Activity::Stopped);
        torrent_reannounce(&mut session, &params(json!({"ids": [a]})), Style::Current).unwrap();
        assert!(session.torrent(a).unwrap().manual_announce_time > 0);
    }
}
