//! Field schema for torrents and the session.
//!
//! Each [`FieldDescriptor`] maps one attribute name to a getter and an
//! optional setter. The current RPC dialect addresses fields by their
//! snake_case `name`; the legacy dialect uses `legacy_name`.

use crate::config::RpcConfig;
use crate::session::{is_priority, Session, Torrent};
use crate::{Result, SeedboxError};
use serde_json::{json, Map, Value};
use std::path::PathBuf;

/// Key style of the requesting dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Current,
    Legacy,
}

/// Getter/setter pair for one attribute of `T`.
pub struct FieldDescriptor<T> {
    pub name: &'static str,
    pub legacy_name: &'static str,
    pub get: fn(&T) -> Value,
    pub set: Option<fn(&mut T, &Value) -> Result<()>>,
}

impl<T> FieldDescriptor<T> {
    pub fn key(&self, style: Style) -> &'static str {
        match style {
            Style::Current => self.name,
            Style::Legacy => self.legacy_name,
        }
    }

    /// Read the field, renaming nested keys for the legacy dialect.
    pub fn read(&self, obj: &T, style: Style) -> Value {
        let value = (self.get)(obj);
        match style {
            Style::Current => value,
            Style::Legacy => legacy_keys(value),
        }
    }
}

/// Find a field by either of its names.
pub fn lookup<T>(table: &'static [FieldDescriptor<T>], key: &str) -> Option<&'static FieldDescriptor<T>> {
    table.iter().find(|f| f.name == key || f.legacy_name == key)
}

/// Nested object keys that differ between the dialects.
const NESTED_LEGACY_KEYS: &[(&str, &str)] = &[
    ("bytes_completed", "bytesCompleted"),
    ("uploaded_bytes", "uploadedBytes"),
    ("downloaded_bytes", "downloadedBytes"),
    ("files_added", "filesAdded"),
    ("session_count", "sessionCount"),
    ("seconds_active", "secondsActive"),
];

/// Rename snake_case keys of nested objects to their legacy spelling.
pub fn legacy_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| {
                    let key = NESTED_LEGACY_KEYS
                        .iter()
                        .find(|(current, _)| *current == k)
                        .map_or(k, |(_, legacy)| (*legacy).to_string());
                    (key, legacy_keys(v))
                })
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(legacy_keys).collect()),
        other => other,
    }
}

fn invalid(field: &str, expected: &str) -> SeedboxError {
    SeedboxError::Validation {
        field: field.to_string(),
        message: format!("expected {}", expected),
    }
}

/// Accepts JSON booleans and the integers 0/1 some clients send.
pub fn value_bool(field: &str, value: &Value) -> Result<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => Ok(n.as_i64().unwrap_or(0) != 0),
        _ => Err(invalid(field, "a boolean")),
    }
}

pub fn value_i64(field: &str, value: &Value) -> Result<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))
        .ok_or_else(|| invalid(field, "an integer"))
}

pub fn value_f64(field: &str, value: &Value) -> Result<f64> {
    value.as_f64().ok_or_else(|| invalid(field, "a number"))
}

pub fn value_str<'a>(field: &str, value: &'a Value) -> Result<&'a str> {
    value.as_str().ok_or_else(|| invalid(field, "a string"))
}

fn absolute_dir(field: &str, value: &Value) -> Result<PathBuf> {
    let path = PathBuf::from(value_str(field, value)?);
    if path.is_absolute() {
        Ok(path)
    } else {
        Err(SeedboxError::PathNotAbsolute(path))
    }
}

macro_rules! get_only {
    ($name:literal, $legacy:literal, $get:expr) => {
        FieldDescriptor {
            name: $name,
            legacy_name: $legacy,
            get: $get,
            set: None,
        }
    };
}

macro_rules! get_set {
    ($name:literal, $legacy:literal, $get:expr, $set:expr) => {
        FieldDescriptor {
            name: $name,
            legacy_name: $legacy,
            get: $get,
            set: Some($set),
        }
    };
}

/// Torrent attributes readable with `torrent_get`. Fields with a setter
/// are writable with `torrent_set`.
pub static TORRENT_FIELDS: &[FieldDescriptor<Torrent>] = &[
    get_only!("id", "id", |t| json!(t.id)),
    get_only!("hash_string", "hashString", |t| json!(t.hash_string)),
    get_only!("name", "name", |t| json!(t.name)),
    get_only!("download_dir", "downloadDir", |t| json!(t.download_dir.to_string_lossy())),
    get_only!("status", "status", |t| json!(t.status.as_i64())),
    get_only!("total_size", "totalSize", |t| json!(t.total_size())),
    get_only!("size_when_done", "sizeWhenDone", |t| json!(t.size_when_done())),
    get_only!("left_until_done", "leftUntilDone", |t| json!(t.left_until_done())),
    get_only!("percent_done", "percentDone", |t| json!(t.percent_done())),
    get_only!("is_finished", "isFinished", |t| json!(t.is_finished())),
    get_only!("metadata_percent_complete", "metadataPercentComplete", |t| {
        json!(if t.has_metadata { 1.0 } else { 0.0 })
    }),
    get_only!("added_date", "addedDate", |t| json!(t.added_date)),
    get_only!("activity_date", "activityDate", |t| json!(t.activity_date)),
    get_only!("done_date", "doneDate", |t| json!(t.done_date)),
    get_only!("manual_announce_time", "manualAnnounceTime", |t| json!(t.manual_announce_time)),
    get_only!("queue_position", "queuePosition", |t| json!(t.queue_position)),
    get_only!("labels", "labels", |t| json!(t.labels)),
    get_only!("files", "files", |t| {
        t.files
            .iter()
            .map(|f| json!({"name": f.name, "length": f.length, "bytes_completed": f.bytes_completed}))
            .collect()
    }),
    get_only!("file_stats", "fileStats", |t| {
        t.files
            .iter()
            .map(|f| json!({"bytes_completed": f.bytes_completed, "wanted": f.wanted, "priority": f.priority}))
            .collect()
    }),
    get_only!("wanted", "wanted", |t| json!(t.files.iter().map(|f| f.wanted).collect::<Vec<_>>())),
    get_only!("priorities", "priorities", |t| {
        json!(t.files.iter().map(|f| f.priority).collect::<Vec<_>>())
    }),
    get_only!("trackers", "trackers", |t| json!(t.trackers)),
    get_only!("tracker_list", "trackerList", |t| json!(t.tracker_list())),
    get_only!("uploaded_ever", "uploadedEver", |t| json!(t.uploaded_ever)),
    get_only!("downloaded_ever", "downloadedEver", |t| json!(t.downloaded_ever)),
    get_only!("rate_download", "rateDownload", |_| json!(0)),
    get_only!("rate_upload", "rateUpload", |_| json!(0)),
    get_only!("error", "error", |t| json!(t.error)),
    get_only!("error_string", "errorString", |t| json!(t.error_string)),
    get_set!(
        "bandwidth_priority",
        "bandwidthPriority",
        |t| json!(t.bandwidth_priority),
        |t, v| {
            let priority = value_i64("bandwidth_priority", v)?;
            if !is_priority(priority) {
                return Err(invalid("bandwidth_priority", "-1, 0 or 1"));
            }
            t.bandwidth_priority = priority;
            Ok(())
        }
    ),
    get_set!("peer_limit", "peer-limit", |t| json!(t.peer_limit), |t, v| {
        t.peer_limit = value_i64("peer_limit", v)?;
        Ok(())
    }),
    get_set!("download_limit", "downloadLimit", |t| json!(t.download_limit), |t, v| {
        t.download_limit = value_i64("download_limit", v)?;
        Ok(())
    }),
    get_set!("download_limited", "downloadLimited", |t| json!(t.download_limited), |t, v| {
        t.download_limited = value_bool("download_limited", v)?;
        Ok(())
    }),
    get_set!("upload_limit", "uploadLimit", |t| json!(t.upload_limit), |t, v| {
        t.upload_limit = value_i64("upload_limit", v)?;
        Ok(())
    }),
    get_set!("upload_limited", "uploadLimited", |t| json!(t.upload_limited), |t, v| {
        t.upload_limited = value_bool("upload_limited", v)?;
        Ok(())
    }),
    get_set!(
        "honors_session_limits",
        "honorsSessionLimits",
        |t| json!(t.honors_session_limits),
        |t, v| {
            t.honors_session_limits = value_bool("honors_session_limits", v)?;
            Ok(())
        }
    ),
    get_set!("seed_ratio_limit", "seedRatioLimit", |t| json!(t.seed_ratio_limit), |t, v| {
        t.seed_ratio_limit = value_f64("seed_ratio_limit", v)?;
        Ok(())
    }),
    get_set!("seed_ratio_mode", "seedRatioMode", |t| json!(t.seed_ratio_mode), |t, v| {
        t.seed_ratio_mode = value_i64("seed_ratio_mode", v)?;
        Ok(())
    }),
    get_set!("seed_idle_limit", "seedIdleLimit", |t| json!(t.seed_idle_limit), |t, v| {
        t.seed_idle_limit = value_i64("seed_idle_limit", v)?;
        Ok(())
    }),
    get_set!("seed_idle_mode", "seedIdleMode", |t| json!(t.seed_idle_mode), |t, v| {
        t.seed_idle_mode = value_i64("seed_idle_mode", v)?;
        Ok(())
    }),
];

/// Session attributes readable with `session_get` and writable with
/// `session_set` when a setter is present.
pub static SESSION_FIELDS: &[FieldDescriptor<Session>] = &[
    get_set!(
        "download_dir",
        "download-dir",
        |s| json!(s.settings().download_dir.to_string_lossy()),
        |s, v| {
            s.settings_mut().download_dir = absolute_dir("download_dir", v)?;
            Ok(())
        }
    ),
    get_set!(
        "incomplete_dir",
        "incomplete-dir",
        |s| json!(s.settings().incomplete_dir.to_string_lossy()),
        |s, v| {
            s.settings_mut().incomplete_dir = absolute_dir("incomplete_dir", v)?;
            Ok(())
        }
    ),
    get_set!(
        "incomplete_dir_enabled",
        "incomplete-dir-enabled",
        |s| json!(s.settings().incomplete_dir_enabled),
        |s, v| {
            s.settings_mut().incomplete_dir_enabled = value_bool("incomplete_dir_enabled", v)?;
            Ok(())
        }
    ),
    get_only!("config_dir", "config-dir", |s| json!(s.settings().config_dir.to_string_lossy())),
    get_set!("peer_port", "peer-port", |s| json!(s.settings().peer_port), |s, v| {
        let port = value_i64("peer_port", v)?;
        s.settings_mut().peer_port =
            u16::try_from(port).map_err(|_| invalid("peer_port", "a port number"))?;
        Ok(())
    }),
    get_set!(
        "peer_limit_global",
        "peer-limit-global",
        |s| json!(s.settings().peer_limit_global),
        |s, v| {
            s.settings_mut().peer_limit_global = value_i64("peer_limit_global", v)?;
            Ok(())
        }
    ),
    get_set!(
        "peer_limit_per_torrent",
        "peer-limit-per-torrent",
        |s| json!(s.settings().peer_limit_per_torrent),
        |s, v| {
            s.settings_mut().peer_limit_per_torrent = value_i64("peer_limit_per_torrent", v)?;
            Ok(())
        }
    ),
    get_set!(
        "download_queue_enabled",
        "download-queue-enabled",
        |s| json!(s.settings().download_queue_enabled),
        |s, v| {
            s.settings_mut().download_queue_enabled = value_bool("download_queue_enabled", v)?;
            Ok(())
        }
    ),
    get_set!(
        "download_queue_size",
        "download-queue-size",
        |s| json!(s.settings().download_queue_size),
        |s, v| {
            s.settings_mut().download_queue_size = value_i64("download_queue_size", v)?;
            Ok(())
        }
    ),
    get_set!(
        "seed_queue_enabled",
        "seed-queue-enabled",
        |s| json!(s.settings().seed_queue_enabled),
        |s, v| {
            s.settings_mut().seed_queue_enabled = value_bool("seed_queue_enabled", v)?;
            Ok(())
        }
    ),
    get_set!(
        "seed_queue_size",
        "seed-queue-size",
        |s| json!(s.settings().seed_queue_size),
        |s, v| {
            s.settings_mut().seed_queue_size = value_i64("seed_queue_size", v)?;
            Ok(())
        }
    ),
    get_set!(
        "speed_limit_down",
        "speed-limit-down",
        |s| json!(s.settings().speed_limit_down),
        |s, v| {
            s.settings_mut().speed_limit_down = value_i64("speed_limit_down", v)?;
            Ok(())
        }
    ),
    get_set!(
        "speed_limit_down_enabled",
        "speed-limit-down-enabled",
        |s| json!(s.settings().speed_limit_down_enabled),
        |s, v| {
            s.settings_mut().speed_limit_down_enabled = value_bool("speed_limit_down_enabled", v)?;
            Ok(())
        }
    ),
    get_set!(
        "speed_limit_up",
        "speed-limit-up",
        |s| json!(s.settings().speed_limit_up),
        |s, v| {
            s.settings_mut().speed_limit_up = value_i64("speed_limit_up", v)?;
            Ok(())
        }
    ),
    get_set!(
        "speed_limit_up_enabled",
        "speed-limit-up-enabled",
        |s| json!(s.settings().speed_limit_up_enabled),
        |s, v| {
            s.settings_mut().speed_limit_up_enabled = value_bool("speed_limit_up_enabled", v)?;
            Ok(())
        }
    ),
    get_set!(
        "alt_speed_enabled",
        "alt-speed-enabled",
        |s| json!(s.settings().alt_speed_enabled),
        |s, v| {
            s.settings_mut().alt_speed_enabled = value_bool("alt_speed_enabled", v)?;
            Ok(())
        }
    ),
    get_set!(
        "blocklist_enabled",
        "blocklist-enabled",
        |s| json!(s.settings().blocklist_enabled),
        |s, v| {
            s.settings_mut().blocklist_enabled = value_bool("blocklist_enabled", v)?;
            Ok(())
        }
    ),
    get_set!(
        "blocklist_url",
        "blocklist-url",
        |s| json!(s.settings().blocklist_url),
        |s, v| {
            s.settings_mut().blocklist_url = value_str("blocklist_url", v)?.to_string();
            Ok(())
        }
    ),
    get_only!("blocklist_size", "blocklist-size", |s| json!(s.blocklist_size())),
    get_set!(
        "start_added_torrents",
        "start-added-torrents",
        |s| json!(s.settings().start_added_torrents),
        |s, v| {
            s.settings_mut().start_added_torrents = value_bool("start_added_torrents", v)?;
            Ok(())
        }
    ),
    get_set!(
        "rename_partial_files",
        "rename-partial-files",
        |s| json!(s.settings().rename_partial_files),
        |s, v| {
            s.settings_mut().rename_partial_files = value_bool("rename_partial_files", v)?;
            Ok(())
        }
    ),
    get_set!(
        "idle_seeding_limit",
        "idle-seeding-limit",
        |s| json!(s.settings().idle_seeding_limit),
        |s, v| {
            s.settings_mut().idle_seeding_limit = value_i64("idle_seeding_limit", v)?;
            Ok(())
        }
    ),
    get_set!(
        "idle_seeding_limit_enabled",
        "idle-seeding-limit-enabled",
        |s| json!(s.settings().idle_seeding_limit_enabled),
        |s, v| {
            s.settings_mut().idle_seeding_limit_enabled =
                value_bool("idle_seeding_limit_enabled", v)?;
            Ok(())
        }
    ),
    get_set!(
        "seed_ratio_limit",
        "seedRatioLimit",
        |s| json!(s.settings().seed_ratio_limit),
        |s, v| {
            s.settings_mut().seed_ratio_limit = value_f64("seed_ratio_limit", v)?;
            Ok(())
        }
    ),
    get_set!(
        "seed_ratio_limited",
        "seedRatioLimited",
        |s| json!(s.settings().seed_ratio_limited),
        |s, v| {
            s.settings_mut().seed_ratio_limited = value_bool("seed_ratio_limited", v)?;
            Ok(())
        }
    ),
    get_set!("dht_enabled", "dht-enabled", |s| json!(s.settings().dht_enabled), |s, v| {
        s.settings_mut().dht_enabled = value_bool("dht_enabled", v)?;
        Ok(())
    }),
    get_set!("pex_enabled", "pex-enabled", |s| json!(s.settings().pex_enabled), |s, v| {
        s.settings_mut().pex_enabled = value_bool("pex_enabled", v)?;
        Ok(())
    }),
    get_set!("encryption", "encryption", |s| json!(s.settings().encryption), |s, v| {
        let mode = value_str("encryption", v)?;
        if !matches!(mode, "required" | "preferred" | "tolerated") {
            return Err(invalid("encryption", "required, preferred or tolerated"));
        }
        s.settings_mut().encryption = mode.to_string();
        Ok(())
    }),
    get_only!("rpc_version", "rpc-version", |_| json!(RpcConfig::RPC_VERSION)),
    get_only!("rpc_version_minimum", "rpc-version-minimum", |_| {
        json!(RpcConfig::RPC_VERSION_MINIMUM)
    }),
    get_only!("rpc_version_semver", "rpc-version-semver", |_| {
        json!(RpcConfig::RPC_VERSION_SEMVER)
    }),
    get_only!("version", "version", |_| json!(env!("CARGO_PKG_VERSION"))),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::test_session;

    #[test]
    fn test_names_are_unique() {
        for table_names in [
            TORRENT_FIELDS.iter().map(|f| (f.name, f.legacy_name)).collect::<Vec<_>>(),
            SESSION_FIELDS.iter().map(|f| (f.name, f.legacy_name)).collect::<Vec<_>>(),
        ] {
            for (i, (name, legacy)) in table_names.iter().enumerate() {
                assert!(
                    table_names[i + 1..].iter().all(|(n, l)| n != name && l != legacy),
                    "duplicate field {}",
                    name
                );
            }
        }
    }

    #[test]
    fn test_lookup_either_name() {
        assert_eq!(lookup(TORRENT_FIELDS, "hashString").unwrap().name, "hash_string");
        assert_eq!(lookup(TORRENT_FIELDS, "hash_string").unwrap().legacy_name, "hashString");
        assert!(lookup(TORRENT_FIELDS, "nope").is_none());
    }

    #[test]
    fn test_legacy_nested_keys() {
        let value = json!([{"name": "a", "bytes_completed": 3}]);
        assert_eq!(legacy_keys(value), json!([{"name": "a", "bytesCompleted": 3}]));
    }

    #[test]
    fn test_session_setters() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut session = test_session(dir.path());

        let port = lookup(SESSION_FIELDS, "peer-port").unwrap();
        (port.set.unwrap())(&mut session, &json!(6881)).unwrap();
        assert_eq!(port.read(&session, Style::Legacy), json!(6881));
        assert!((port.set.unwrap())(&mut session, &json!(70000)).is_err());

        let dir_field = lookup(SESSION_FIELDS, "download_dir").unwrap();
        let err = (dir_field.set.unwrap())(&mut session, &json!("relative")).unwrap_err();
        assert_eq!(err.to_rpc_error_code(), 3);

        assert!(lookup(SESSION_FIELDS, "rpc_version").unwrap().set.is_none());
    }

    #[test]
    fn test_value_coercions() {
        assert!(value_bool("x", &json!(1)).unwrap());
        assert!(!value_bool("x", &json!(false)).unwrap());
        assert!(value_bool("x", &json!("yes")).is_err());
        assert_eq!(value_i64("x", &json!(2.0)).unwrap(), 2);
    }
}
