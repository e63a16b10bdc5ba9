//! HTTP server implementation using Axum.

use crate::dispatch::Dispatcher;
use crate::protocol::uri;
use axum::{
    extract::{DefaultBodyLimit, RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use seedbox_core::{RpcConfig, SessionEvent};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Application state shared across handlers.
pub struct AppState {
    pub dispatcher: Dispatcher,
}

/// Where the server listens.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub host: String,
    pub port: u16,
    /// Path prefix of the RPC endpoint, e.g. `/transmission/`.
    pub url_base: String,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: RpcConfig::DEFAULT_HOST.to_string(),
            port: RpcConfig::DEFAULT_PORT,
            url_base: RpcConfig::DEFAULT_URL_BASE.to_string(),
        }
    }
}

/// Full path of the RPC endpoint for a URL base, tolerating missing slashes.
pub fn rpc_path(url_base: &str) -> String {
    let trimmed = url_base.trim_matches('/');
    if trimmed.is_empty() {
        format!("/{}", RpcConfig::RPC_PATH)
    } else {
        format!("/{}/{}", trimmed, RpcConfig::RPC_PATH)
    }
}

/// Health check endpoint.
async fn handle_health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

fn respond(response: Option<Value>) -> Response {
    match response {
        Some(body) => (StatusCode::OK, Json(body)).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

/// POST: the body is a single request or a batch, in either dialect.
async fn handle_rpc(State(state): State<Arc<AppState>>, body: String) -> Response {
    respond(state.dispatcher.call(&body).await)
}

/// GET: a legacy request encoded in the query string.
async fn handle_rpc_query(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> Response {
    let request = uri::query_to_request(query.as_deref().unwrap_or_default());
    respond(state.dispatcher.call_value(request).await)
}

/// Start the RPC HTTP server.
///
/// Returns the actual address the server is bound to (useful when port=0)
/// and the server task, which ends after the session publishes
/// [`SessionEvent::SessionClose`].
pub async fn start_server(
    dispatcher: Dispatcher,
    options: &ServerOptions,
) -> anyhow::Result<(SocketAddr, JoinHandle<()>)> {
    let mut events = dispatcher.session().lock().await.subscribe();
    let state = Arc::new(AppState { dispatcher });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let path = rpc_path(&options.url_base);
    let app = Router::new()
        .route("/health", get(handle_health))
        .route(&path, get(handle_rpc_query).post(handle_rpc))
        .layer(DefaultBodyLimit::max(RpcConfig::MAX_BODY_BYTES))
        .layer(ConcurrencyLimitLayer::new(RpcConfig::MAX_CONCURRENT_REQUESTS))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", options.host, options.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("Server listening on {}{}", actual_addr, path);

    let shutdown = async move {
        loop {
            match events.recv().await {
                Ok(SessionEvent::SessionClose) | Err(RecvError::Closed) => break,
                Ok(_) | Err(RecvError::Lagged(_)) => {}
            }
        }
        info!("session closed, stopping server");
    };

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
        {
            error!("Server error: {}", e);
        }
    });

    Ok((actual_addr, handle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use seedbox_core::{FetchRequest, FetchResponse, Fetcher, Session, SessionSettings};
    use tempfile::TempDir;
    use tokio::sync::Mutex;

    struct Offline;

    #[async_trait::async_trait]
    impl Fetcher for Offline {
        async fn fetch(&self, _request: FetchRequest) -> FetchResponse {
            FetchResponse::unreachable()
        }
    }

    #[test]
    fn test_rpc_path() {
        assert_eq!(rpc_path("/transmission/"), "/transmission/rpc");
        assert_eq!(rpc_path("transmission"), "/transmission/rpc");
        assert_eq!(rpc_path("/"), "/rpc");
        assert_eq!(rpc_path(""), "/rpc");
    }

    #[tokio::test]
    async fn test_server_starts_and_stops_on_session_close() {
        let temp_dir = TempDir::new().unwrap();
        let settings = SessionSettings::new(
            temp_dir.path().join("config"),
            temp_dir.path().join("downloads"),
        );
        let session = Arc::new(Mutex::new(Session::new(settings, Arc::new(Offline))));
        let dispatcher = Dispatcher::new(Arc::new(Registry::standard()), Arc::clone(&session));

        let options = ServerOptions {
            host: "127.0.0.1".into(),
            port: 0,
            ..ServerOptions::default()
        };
        let (addr, handle) = start_server(dispatcher, &options).await.unwrap();
        assert!(addr.port() > 0);

        session.lock().await.close();
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
