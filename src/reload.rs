//! Live reload over WebSocket.
//!
//! Browsers load a small client script injected into every served HTML page.
//! It connects back to the dev server, which upgrades the request and keeps
//! the socket. After a successful rebuild the watcher broadcasts one of:
//!
//! ```json
//! {"type":"reload"}   // full page reload (scripts, markup, config)
//! {"type":"css"}      // swap stylesheets without reloading
//! ```

use crate::{log, pipeline::Reload, serve::header};
use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::Serialize;
use std::{
    io::{Read, Write},
    sync::LazyLock,
};
use tiny_http::{ReadWrite, Request, Response, StatusCode};
use tungstenite::{
    Message, WebSocket,
    handshake::derive_accept_key,
    protocol::Role,
};

/// Path of the injected client script.
pub const SCRIPT_PATH: &str = "/__sitepipe/reload.js";

/// Path the client script connects to.
pub const SOCKET_PATH: &str = "/__sitepipe/ws";

/// Client script served at [`SCRIPT_PATH`].
pub const CLIENT_SCRIPT: &str = include_str!("embed/serve/reload.js");

type Socket = Box<dyn ReadWrite + Send>;

static HUB: LazyLock<LiveReload> = LazyLock::new(LiveReload::new);

/// Global hub shared by the server and watcher threads.
pub fn hub() -> &'static LiveReload {
    &HUB
}

/// Wire message sent to browsers.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ReloadMessage {
    Reload,
    Css,
}

impl ReloadMessage {
    const fn from_reload(reload: Reload) -> Option<Self> {
        match reload {
            Reload::Page => Some(Self::Reload),
            Reload::Css => Some(Self::Css),
            Reload::None => None,
        }
    }
}

/// Connected browser clients.
pub struct LiveReload<S = Socket> {
    clients: Mutex<Vec<WebSocket<S>>>,
}

impl<S: Read + Write> LiveReload<S> {
    pub fn new() -> Self {
        Self {
            clients: Mutex::new(Vec::new()),
        }
    }

    pub fn client_count(&self) -> usize {
        self.clients.lock().len()
    }

    /// Register an already-upgraded stream.
    pub fn add(&self, stream: S) {
        let socket = WebSocket::from_raw_socket(stream, Role::Server, None);
        self.clients.lock().push(socket);
    }

    /// Tell every client what to reload. Returns how many were reached.
    ///
    /// Clients whose socket errors are dropped.
    pub fn broadcast(&self, reload: Reload) -> usize {
        let Some(message) = ReloadMessage::from_reload(reload) else {
            return 0;
        };
        let Ok(payload) = serde_json::to_string(&message) else {
            return 0;
        };

        let mut clients = self.clients.lock();
        clients.retain_mut(|socket| socket.send(Message::text(payload.clone())).is_ok());
        clients.len()
    }
}

impl LiveReload<Socket> {
    /// Complete the WebSocket handshake for `request` and keep the socket.
    pub fn accept(&self, request: Request) -> Result<()> {
        let key = header_value(&request, "Sec-WebSocket-Key")
            .context("WebSocket request without Sec-WebSocket-Key")?;
        let accept = derive_accept_key(key.as_bytes());

        let response = Response::new_empty(StatusCode(101))
            .with_header(header("Upgrade", "websocket")?)
            .with_header(header("Connection", "Upgrade")?)
            .with_header(header("Sec-WebSocket-Accept", &accept)?);

        let stream = request.upgrade("websocket", response);
        self.add(stream);
        log!("reload"; "client connected ({} open)", self.client_count());
        Ok(())
    }
}

/// Whether `request` asks for a WebSocket upgrade.
pub fn is_upgrade(request: &Request) -> bool {
    header_value(request, "Upgrade").is_some_and(|v| v.eq_ignore_ascii_case("websocket"))
}

fn header_value(request: &Request, name: &'static str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|h| h.field.equiv(name))
        .map(|h| h.value.as_str().to_string())
}

/// Insert the client script tag before `</body>`, or append it.
pub fn inject_script(html: &str) -> String {
    let tag = format!(r#"<script src="{SCRIPT_PATH}"></script>"#);
    match html.rfind("</body>") {
        Some(pos) => {
            let mut out = String::with_capacity(html.len() + tag.len());
            out.push_str(&html[..pos]);
            out.push_str(&tag);
            out.push_str(&html[pos..]);
            out
        }
        None => format!("{html}{tag}"),
    }
}
