//! `torrent_rename_path`: rename a file or directory inside one torrent.
//!
//! Validation happens under the session lock; the rename on disk runs on a
//! blocking thread and the new names are folded back in afterwards.

use super::{get_str_param, torrent_selector};
use crate::continuation::Continuation;
use crate::protocol::{ErrorCode, HandlerError};
use crate::registry::Params;
use seedbox_core::Session;
use tracing::debug;

pub fn torrent_rename_path(session: &mut Session, params: &Params, mut cont: Continuation) {
    let ids = session.select(&torrent_selector(params));
    let &[id] = ids.as_slice() else {
        return cont.fail(HandlerError::invalid_params(
            "torrent_rename_path requires 1 torrent",
        ));
    };
    let old_path = get_str_param(params, "path", "path").unwrap_or_default();
    let new_name = get_str_param(params, "name", "name").unwrap_or_default();

    cont.insert("id", "id", id);
    cont.insert("path", "path", old_path);
    cont.insert("name", "name", new_name);

    let plan = match session.rename_plan(id, old_path, new_name) {
        Ok(plan) => plan,
        Err(e) => return cont.fail(e.into()),
    };

    tokio::spawn(async move {
        let on_disk = plan.clone();
        match tokio::task::spawn_blocking(move || on_disk.execute()).await {
            Ok(Ok(())) => debug!("renamed {} -> {}", plan.source.display(), plan.target.display()),
            Ok(Err(e)) => return cont.fail(e.into()),
            Err(e) => return cont.fail(HandlerError::new(ErrorCode::InternalError, e.to_string())),
        }

        let Some(shared) = cont.session() else {
            return cont.fail(HandlerError::new(ErrorCode::InternalError, "session closed"));
        };
        let applied = shared.lock().await.apply_rename(&plan);
        match applied {
            Ok(()) => cont.succeed(),
            Err(e) => cont.fail(e.into()),
        }
    });
}

#[cfg(test)]
mod tests {
    use crate::dispatch::Dispatcher;
    use crate::handlers::tests::{add_paused, test_session};
    use crate::registry::Registry;
    use serde_json::json;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    fn rename(params: serde_json::Value) -> serde_json::Value {
        json!({"jsonrpc": "2.0", "method": "torrent_rename_path", "params": params, "id": 7})
    }

    #[tokio::test]
    async fn test_rename_moves_file_and_updates_torrent() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut session = test_session(dir.path());
        let id = add_paused(&mut session, "alpha");
        let downloads = dir.path().join("downloads");
        std::fs::create_dir_all(&downloads).unwrap();
        std::fs::write(downloads.join("alpha"), b"data").unwrap();

        let d = Dispatcher::new(Arc::new(Registry::standard()), Arc::new(Mutex::new(session)));
        let response = d
            .call_value(rename(json!({"ids": [id], "path": "alpha", "name": "beta"})))
            .await
            .unwrap();
        assert_eq!(response["result"], json!({"id": id, "path": "alpha", "name": "beta"}));
        assert!(downloads.join("beta").exists());
        assert!(!downloads.join("alpha").exists());

        let session = d.session().lock().await;
        let tor = session.torrent(id).unwrap();
        assert_eq!(tor.name, "beta");
        assert_eq!(tor.files[0].name, "beta");
    }

    #[tokio::test]
    async fn test_rename_requires_single_torrent() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut session = test_session(dir.path());
        add_paused(&mut session, "alpha");
        add_paused(&mut session, "beta");

        let d = Dispatcher::new(Arc::new(Registry::standard()), Arc::new(Mutex::new(session)));
        let response = d
            .call_value(rename(json!({"path": "alpha", "name": "gamma"})))
            .await
            .unwrap();
        assert_eq!(response["error"]["code"], -32602);
        assert_eq!(
            response["error"]["data"]["error_string"],
            "torrent_rename_path requires 1 torrent"
        );
    }

    #[tokio::test]
    async fn test_invalid_name_keeps_partial_output() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut session = test_session(dir.path());
        let id = add_paused(&mut session, "alpha");

        let d = Dispatcher::new(Arc::new(Registry::standard()), Arc::new(Mutex::new(session)));
        let response = d
            .call_value(rename(json!({"ids": [id], "path": "alpha", "name": "a/b"})))
            .await
            .unwrap();
        assert_eq!(response["error"]["code"], 5);
        assert_eq!(response["error"]["data"]["result"]["name"], "a/b");
    }
}
