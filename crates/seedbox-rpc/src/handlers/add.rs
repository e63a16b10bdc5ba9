//! `torrent_add`: resolve metainfo from inline bytes, a URL, a magnet link
//! or a local file, then register it with the session.

use super::{get_bool_param, get_i64_list, get_i64_param, get_str_list, get_str_param};
use crate::continuation::Continuation;
use crate::protocol::{ErrorCode, HandlerError};
use crate::registry::Params;
use base64::Engine;
use seedbox_core::metainfo;
use seedbox_core::{AddOptions, AddOutcome, FetchRequest, MetainfoSource, Session, Style};
use serde_json::json;
use std::path::PathBuf;
use tracing::{debug, info};

/// Metainfo that is either ready to parse or still has to be downloaded.
enum Pending {
    Ready(MetainfoSource),
    Download { url: String, cookies: Option<String> },
}

fn is_remote(filename: &str) -> bool {
    ["http://", "https://", "ftp://"]
        .iter()
        .any(|scheme| filename.starts_with(scheme))
}

fn add_options(params: &Params) -> Result<AddOptions, HandlerError> {
    let download_dir = match get_str_param(params, "download_dir", "download-dir") {
        Some(dir) => {
            let dir = PathBuf::from(dir);
            if !dir.is_absolute() {
                return Err(HandlerError::new(
                    ErrorCode::PathNotAbsolute,
                    "download directory path is not absolute",
                ));
            }
            Some(dir)
        }
        None => None,
    };

    Ok(AddOptions {
        download_dir,
        paused: get_bool_param(params, "paused", "paused"),
        peer_limit: get_i64_param(params, "peer_limit", "peer-limit"),
        bandwidth_priority: get_i64_param(params, "bandwidth_priority", "bandwidthPriority"),
        files_wanted: get_i64_list(params, "files_wanted", "files-wanted")?,
        files_unwanted: get_i64_list(params, "files_unwanted", "files-unwanted")?,
        priority_high: get_i64_list(params, "priority_high", "priority-high")?,
        priority_low: get_i64_list(params, "priority_low", "priority-low")?,
        priority_normal: get_i64_list(params, "priority_normal", "priority-normal")?,
        labels: get_str_list(params, "labels", "labels")?.unwrap_or_default(),
    })
}

fn pending_source(params: &Params) -> Result<Pending, HandlerError> {
    if let Some(encoded) = get_str_param(params, "metainfo", "metainfo") {
        let compact: String = encoded.split_whitespace().collect();
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(compact)
            .map_err(|e| {
                debug!("torrent_add: bad base64 metainfo: {}", e);
                HandlerError::new(ErrorCode::CorruptTorrent, "invalid or corrupt torrent file")
            })?;
        return Ok(Pending::Ready(MetainfoSource::Bytes(bytes)));
    }

    let filename = get_str_param(params, "filename", "filename")
        .ok_or_else(|| HandlerError::invalid_params("no filename or metainfo specified"))?;
    if is_remote(filename) {
        return Ok(Pending::Download {
            url: filename.to_string(),
            cookies: get_str_param(params, "cookies", "cookies").map(str::to_string),
        });
    }
    if filename.starts_with("magnet:") {
        return Ok(Pending::Ready(MetainfoSource::Magnet(filename.to_string())));
    }
    Ok(Pending::Ready(MetainfoSource::File(PathBuf::from(filename))))
}

pub fn torrent_add(session: &mut Session, params: &Params, mut cont: Continuation) {
    let prepared = add_options(params).and_then(|options| Ok((options, pending_source(params)?)));
    let (options, pending) = match prepared {
        Ok(prepared) => prepared,
        Err(e) => return cont.fail(e),
    };
    let fetcher = session.fetcher();

    tokio::spawn(async move {
        let source = match pending {
            Pending::Ready(source) => source,
            Pending::Download { url, cookies } => {
                debug!("torrent_add: fetching {}", url);
                let response = fetcher.fetch(FetchRequest::new(url).with_cookies(cookies)).await;
                if !response.is_success() {
                    let message = format!(
                        "gotMetadataFromURL: http error {}: {}",
                        response.status,
                        response.status_text()
                    );
                    return cont.fail(HandlerError::new(ErrorCode::HttpError, message));
                }
                MetainfoSource::Bytes(response.body.to_vec())
            }
        };

        let meta = match tokio::task::spawn_blocking(move || metainfo::load(&source)).await {
            Ok(Ok(meta)) => meta,
            Ok(Err(e)) => return cont.fail(e.into()),
            Err(e) => return cont.fail(HandlerError::new(ErrorCode::InternalError, e.to_string())),
        };

        let Some(shared) = cont.session() else {
            return cont.fail(HandlerError::new(ErrorCode::InternalError, "session closed"));
        };
        let mut session = shared.lock().await;
        let outcome = match session.add_torrent(meta, options) {
            Ok(outcome) => outcome,
            Err(e) => return cont.fail(e.into()),
        };

        let (current, legacy) = match outcome {
            AddOutcome::Added(_) => ("torrent_added", "torrent-added"),
            AddOutcome::Duplicate(_) => ("torrent_duplicate", "torrent-duplicate"),
        };
        if let Some(tor) = session.torrent(outcome.id()) {
            info!("torrent_add: {} {} ({})", current, tor.id, tor.name);
            let hash_key = match cont.style() {
                Style::Current => "hash_string",
                Style::Legacy => "hashString",
            };
            let summary = json!({"id": tor.id, "name": tor.name, hash_key: tor.hash_string});
            cont.insert(current, legacy, summary);
        }
        drop(session);
        cont.succeed();
    });
}
