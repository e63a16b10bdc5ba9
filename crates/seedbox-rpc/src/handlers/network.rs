//! Handlers that reach out to remote services: port reachability checks
//! and blocklist downloads.

use super::get_str_param;
use crate::continuation::Continuation;
use crate::protocol::{ErrorCode, HandlerError};
use crate::registry::Params;
use seedbox_core::{blocklist, FetchRequest, IpProtocol, NetworkConfig, SeedboxError, Session};
use tracing::{debug, info};

pub fn port_test(session: &mut Session, params: &Params, mut cont: Continuation) {
    let ip_protocol = match get_str_param(params, "ip_protocol", "ipProtocol") {
        None => None,
        Some(text) => match IpProtocol::parse(text) {
            Some(protocol) => Some(protocol),
            None => {
                return cont.fail(HandlerError::invalid_params(format!(
                    "invalid ip protocol: {}",
                    text
                )))
            }
        },
    };

    let url = format!(
        "{}/{}",
        NetworkConfig::PORT_CHECK_URL,
        session.settings().peer_port
    );
    let fetcher = session.fetcher();

    tokio::spawn(async move {
        debug!("port_test: fetching {}", url);
        let response = fetcher
            .fetch(FetchRequest::new(url).with_ip_protocol(ip_protocol))
            .await;

        if let Some(protocol) = ip_protocol {
            cont.insert("ip_protocol", "ipProtocol", protocol.as_str());
        }
        if !response.is_success() {
            let message = format!(
                "Couldn't test port: {} ({})",
                response.status_text(),
                response.status
            );
            return cont.fail(HandlerError::new(ErrorCode::HttpError, message));
        }

        let open = response.body.first() == Some(&b'1');
        cont.insert("port_is_open", "port-is-open", open);
        cont.succeed();
    });
}

pub fn blocklist_update(session: &mut Session, _params: &Params, mut cont: Continuation) {
    let url = session.settings().blocklist_url.clone();
    let config_dir = session.settings().config_dir.clone();
    let fetcher = session.fetcher();

    tokio::spawn(async move {
        debug!("blocklist_update: fetching {}", url);
        let response = fetcher.fetch(FetchRequest::new(url)).await;
        if !response.is_success() {
            let message = format!(
                "Couldn't fetch blocklist: {} ({})",
                response.status_text(),
                response.status
            );
            return cont.fail(HandlerError::new(ErrorCode::HttpError, message));
        }

        let body = response.body;
        let installed =
            tokio::task::spawn_blocking(move || blocklist::install(&config_dir, &body)).await;
        let rules = match installed {
            Ok(Ok(rules)) => rules,
            Ok(Err(e)) => return cont.fail(install_error(e)),
            Err(e) => return cont.fail(HandlerError::new(ErrorCode::InternalError, e.to_string())),
        };

        let Some(shared) = cont.session() else {
            return cont.fail(HandlerError::new(ErrorCode::InternalError, "session closed"));
        };
        let size = {
            let mut session = shared.lock().await;
            session.set_blocklist(rules);
            session.blocklist_size()
        };
        info!("blocklist_update: {} rules installed", size);
        cont.insert("blocklist_size", "blocklist-size", size);
        cont.succeed();
    });
}

fn install_error(err: SeedboxError) -> HandlerError {
    match err {
        SeedboxError::Decompress(reason) => HandlerError::new(
            ErrorCode::SystemError,
            format!("Error uncompressing blocklist: {}", reason),
        ),
        SeedboxError::Io {
            message,
            path: Some(path),
            ..
        } => HandlerError::new(
            ErrorCode::SystemError,
            format!("Couldn't save file \"{}\": {}", path.display(), message),
        ),
        other => other.into(),
    }
}
