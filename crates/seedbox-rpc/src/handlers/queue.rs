//! Queue position handlers.

use super::{empty, torrent_selector};
use crate::registry::{HandlerResult, Params};
use seedbox_core::fields::Style;
use seedbox_core::Session;

pub fn queue_move_top(session: &mut Session, params: &Params, _style: Style) -> HandlerResult {
    let ids = session.select(&torrent_selector(params));
    session.queue_move_top(&ids);
    Ok(empty())
}

pub fn queue_move_up(session: &mut Session, params: &Params, _style: Style) -> HandlerResult {
    let ids = session.select(&torrent_selector(params));
    session.queue_move_up(&ids);
    Ok(empty())
}

pub fn queue_move_down(session: &mut Session, params: &Params, _style: Style) -> HandlerResult {
    let ids = session.select(&torrent_selector(params));
    session.queue_move_down(&ids);
    Ok(empty())
}

pub fn queue_move_bottom(session: &mut Session, params: &Params, _style: Style) -> HandlerResult {
    let ids = session.select(&torrent_selector(params));
    session.queue_move_bottom(&ids);
    Ok(empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::tests::{add_paused, params, test_session};
    use serde_json::json;

    #[test]
    fn test_queue_moves_by_id() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut session = test_session(dir.path());
        let a = add_paused(&mut session, "a");
        let b = add_paused(&mut session, "b");

        queue_move_top(&mut session, &params(json!({"ids": [b]})), Style::Current).unwrap();
        assert_eq!(session.torrent(b).unwrap().queue_position, 0);
        assert_eq!(session.torrent(a).unwrap().queue_position, 1);

        queue_move_down(&mut session, &params(json!({"ids": b})), Style::Legacy).unwrap();
        assert_eq!(session.torrent(b).unwrap().queue_position, 1);

        queue_move_up(&mut session, &params(json!({"ids": [b]})), Style::Current).unwrap();
        queue_move_bottom(&mut session, &params(json!({"ids": [b]})), Style::Current).unwrap();
        assert_eq!(session.torrent(b).unwrap().queue_position, 1);
    }
}
