// src/server/mod.rs

//! Development server: static files from the build root plus live reload.
//!
//! Routes:
//! - `GET /__assetdag/client.js`: the live-reload client script.
//! - `GET /__assetdag/reload`: WebSocket pushing one JSON message per
//!   [`ReloadEvent`](crate::reload::ReloadEvent).
//! - everything else: files under the build root. HTML gets the client
//!   `<script>` injected.
//!
//! The server only reads the build tree; starting it never builds anything.

use std::io::ErrorKind;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{StatusCode, Uri, header},
    response::{IntoResponse, Response},
    routing::get,
};
use regex::Regex;
use tokio::net::TcpListener;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::reload::{ReloadEvent, ReloadHub};

pub const CLIENT_PATH: &str = "/__assetdag/client.js";
pub const RELOAD_PATH: &str = "/__assetdag/reload";

const CLIENT_JS: &str = include_str!("client.js");

static BODY_CLOSE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)</body\s*>").ok());

#[derive(Debug, Clone)]
struct ServerState {
    root: Arc<PathBuf>,
    hub: ReloadHub,
}

/// A bound, not yet running, development server.
#[derive(Debug)]
pub struct DevServer {
    listener: TcpListener,
    root: PathBuf,
    hub: ReloadHub,
}

impl DevServer {
    /// Bind the listener. Port `0` picks a free port (see [`local_addr`]).
    ///
    /// [`local_addr`]: DevServer::local_addr
    pub async fn bind(addr: SocketAddr, root: impl Into<PathBuf>, hub: ReloadHub) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            root: root.into(),
            hub,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn router(root: impl Into<PathBuf>, hub: ReloadHub) -> Router {
        let state = ServerState {
            root: Arc::new(root.into()),
            hub,
        };
        Router::new()
            .route(CLIENT_PATH, get(client_script))
            .route(RELOAD_PATH, get(reload_socket))
            .fallback(static_file)
            .with_state(state)
    }

    /// Serve until the process ends.
    pub async fn run(self) -> Result<()> {
        let addr = self.local_addr()?;
        info!(%addr, root = ?self.root, "dev server listening on http://{addr}");
        let router = Self::router(self.root, self.hub);
        axum::serve(self.listener, router).await?;
        Ok(())
    }
}

async fn client_script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        CLIENT_JS,
    )
}

async fn reload_socket(ws: WebSocketUpgrade, State(state): State<ServerState>) -> Response {
    // Subscribe before the handshake completes so nothing sent in between is lost.
    let events = state.hub.subscribe();
    ws.on_upgrade(move |socket| forward_events(socket, events))
}

async fn forward_events(mut socket: WebSocket, mut events: broadcast::Receiver<ReloadEvent>) {
    debug!("live-reload client connected");
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    if socket.send(Message::Text(event.to_json())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    debug!(missed, "live-reload client lagging, skipped events");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
    debug!("live-reload client disconnected");
}

async fn static_file(State(state): State<ServerState>, uri: Uri) -> Response {
    let Some(mut path) = resolve_request_path(&state.root, uri.path()) else {
        return (StatusCode::BAD_REQUEST, "Bad Request").into_response();
    };

    if path.is_dir() {
        path.push("index.html");
    }

    let contents = match tokio::fs::read(&path).await {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!(path = %uri.path(), "not found");
            return (StatusCode::NOT_FOUND, "Not Found").into_response();
        }
        Err(err) => {
            warn!(path = ?path, error = %err, "failed to read file");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response();
        }
    };

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    let body = if is_html(&path) {
        inject_client(&String::from_utf8_lossy(&contents)).into_bytes()
    } else {
        contents
    };

    ([(header::CONTENT_TYPE, mime.as_ref().to_string())], body).into_response()
}

/// Map a request path onto the build root. `None` when it tries to leave it
/// or a segment does not decode to UTF-8.
///
/// Segments are percent-decoded before the checks, so `%2e%2e` and `%2F`
/// cannot smuggle a traversal past them.
fn resolve_request_path(root: &Path, request_path: &str) -> Option<PathBuf> {
    let mut path = root.to_path_buf();
    for raw in request_path.split('/') {
        let segment = urlencoding::decode(raw).ok()?;
        match &*segment {
            "" | "." => continue,
            ".." => return None,
            s if s.contains(['\\', '/', '\0']) => return None,
            s => path.push(s),
        }
    }
    Some(path)
}

fn is_html(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("html") || e.eq_ignore_ascii_case("htm"))
}

/// Insert the client `<script>` before the last `</body>`, or append it.
fn inject_client(html: &str) -> String {
    let tag = format!(r#"<script src="{CLIENT_PATH}"></script>"#);
    let position = BODY_CLOSE
        .as_ref()
        .and_then(|re| re.find_iter(html).last())
        .map(|m| m.start());

    match position {
        Some(at) => {
            let mut out = String::with_capacity(html.len() + tag.len());
            out.push_str(&html[..at]);
            out.push_str(&tag);
            out.push_str(&html[at..]);
            out
        }
        None => format!("{html}{tag}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_goes_before_closing_body() {
        let out = inject_client("<html><BODY><p>x</p></Body >\n</html>");
        assert_eq!(
            out,
            "<html><BODY><p>x</p><script src=\"/__assetdag/client.js\"></script></Body >\n</html>"
        );
    }

    #[test]
    fn script_is_appended_without_body() {
        assert!(inject_client("<p>x</p>").ends_with("<script src=\"/__assetdag/client.js\"></script>"));
    }

    #[test]
    fn traversal_is_rejected() {
        let root = Path::new("/srv/build");
        assert_eq!(resolve_request_path(root, "/../etc/passwd"), None);
        assert_eq!(resolve_request_path(root, "/assets/../../x"), None);
        assert_eq!(
            resolve_request_path(root, "/assets/css/main.css"),
            Some(PathBuf::from("/srv/build/assets/css/main.css"))
        );
        assert_eq!(resolve_request_path(root, "/"), Some(PathBuf::from("/srv/build")));
    }

    #[test]
    fn segments_are_percent_decoded_before_checks() {
        let root = Path::new("/srv/build");
        assert_eq!(
            resolve_request_path(root, "/assets/images/hero%20image.svg"),
            Some(PathBuf::from("/srv/build/assets/images/hero image.svg"))
        );
        assert_eq!(
            resolve_request_path(root, "/caf%C3%A9.html"),
            Some(PathBuf::from("/srv/build/café.html"))
        );
        assert_eq!(resolve_request_path(root, "/%2e%2e/etc/passwd"), None);
        assert_eq!(resolve_request_path(root, "/assets%2F..%2F..%2Fx"), None);
        assert_eq!(resolve_request_path(root, "/a%5C..%5Cb"), None);
        assert_eq!(resolve_request_path(root, "/bad%FF.css"), None);
    }
}
