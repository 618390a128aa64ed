//! Development server with live reload support.
//!
//! A lightweight HTTP server for local development, built on `tiny_http`:
//!
//! - Static file serving from the build output directory
//! - Automatic `index.html` resolution for directories
//! - Directory listing with a clean HTML interface
//! - Live reload client injected into HTML responses
//! - File watching and auto-rebuild (via `watch` module)
//! - Graceful shutdown on Ctrl+C
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐
//! │   Main Thread   │     │  Watcher Thread  │
//! │  (HTTP Server)  │     │  (File Monitor)  │
//! └────────┬────────┘     └────────┬─────────┘
//!          │                       │
//!          ▼                       ▼
//!    Serve files             Re-run tasks
//!    Accept sockets ◄──────  Broadcast reload
//! └─────────────────────────────────────────────┘
//!                    │
//!                    ▼
//!            config.build.output
//!              (public/ dir)
//! ```

use crate::{
    config::{SiteConfig, cfg},
    log,
    reload::{self, CLIENT_SCRIPT, SCRIPT_PATH, SOCKET_PATH, hub, inject_script},
    watch::watch_for_changes_blocking,
};
use anyhow::{Context, Result, anyhow, bail};
use std::{
    fs,
    io::Cursor,
    net::{IpAddr, SocketAddr},
    path::{Path, PathBuf},
    sync::Arc,
};
use tiny_http::{Header, Request, Response, Server, StatusCode};

/// Directory listing HTML template (embedded at compile time)
const DIRECTORY_TEMPLATE: &str = include_str!("embed/serve/directory.html");

/// Welcome page HTML template (shown when output directory is empty)
const WELCOME_TEMPLATE: &str = include_str!("embed/serve/welcome.html");

/// Try binding to port, retry with incremented port if in use
const MAX_PORT_RETRIES: u16 = 10;

// ============================================================================
// Server Entry Point
// ============================================================================

/// Start the development server with optional file watching.
///
/// Binds to the configured interface and port (retrying on conflict), spawns
/// the watcher thread if enabled, then handles requests until Ctrl+C.
pub fn serve_site() -> Result<()> {
    let c = cfg();
    let interface: IpAddr = c
        .serve
        .interface
        .parse()
        .with_context(|| format!("Invalid [serve.interface]: {}", c.serve.interface))?;

    let (server, addr) = try_bind_port(interface, c.serve.port, MAX_PORT_RETRIES)?;
    let server = Arc::new(server);

    let server_for_signal = Arc::clone(&server);
    ctrlc::set_handler(move || {
        log!("serve"; "shutting down...");
        server_for_signal.unblock();
    })
    .context("Failed to set Ctrl+C handler")?;

    log!("serve"; "http://{}", addr);

    if c.serve.watch {
        std::thread::spawn(move || {
            if let Err(err) = watch_for_changes_blocking() {
                log!("watch"; "{err:#}");
            }
        });
    }

    for request in server.incoming_requests() {
        // Load per request to pick up hot-reloaded config
        if let Err(e) = handle_request(request, &cfg()) {
            log!("serve"; "request error: {e:#}");
        }
    }

    Ok(())
}

/// Try to bind to a port, retrying with incremented port numbers if in use.
fn try_bind_port(interface: IpAddr, base_port: u16, max_retries: u16) -> Result<(Server, SocketAddr)> {
    let mut last_error = None;

    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                return Ok((server, addr));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(anyhow!(
        "Failed to bind after {} attempts (ports {}-{}): {}",
        max_retries,
        base_port,
        base_port.saturating_add(max_retries.saturating_sub(1)),
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

// ============================================================================
// Request Handling
// ============================================================================

/// What a request path maps to under the serve root.
#[derive(Debug, PartialEq, Eq)]
enum Resolved {
    File(PathBuf),
    Listing(PathBuf, String),
    NotFound,
}

/// Resolve a raw request URL against `serve_root`.
///
/// Resolution order:
/// 1. Exact file match
/// 2. Directory with index.html
/// 3. Directory without index.html → listing
/// 4. Nothing found → 404
fn resolve(serve_root: &Path, url: &str) -> Resolved {
    let request_path = request_path(url);
    if request_path.split('/').any(|part| part == "..") {
        return Resolved::NotFound;
    }
    let local_path = serve_root.join(&request_path);

    if local_path.is_file() {
        return Resolved::File(local_path);
    }

    if local_path.is_dir() {
        let index_path = local_path.join("index.html");
        if index_path.is_file() {
            return Resolved::File(index_path);
        }
        return Resolved::Listing(local_path, request_path);
    }

    Resolved::NotFound
}

/// Decode the URL and strip the query string and surrounding slashes.
fn request_path(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let decoded = urlencoding::decode(without_query)
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_else(|_| without_query.to_string());
    decoded.trim_matches('/').to_string()
}

fn handle_request(request: Request, config: &SiteConfig) -> Result<()> {
    if config.serve.live_reload {
        let path = request.url().split('?').next().unwrap_or_default();
        if path == SCRIPT_PATH {
            return serve_bytes(request, CLIENT_SCRIPT.as_bytes().to_vec(), "application/javascript; charset=utf-8");
        }
        if path == SOCKET_PATH && reload::is_upgrade(&request) {
            return hub().accept(request);
        }
    }

    match resolve(&config.build.output, request.url()) {
        Resolved::File(path) => serve_file(request, &path, config.serve.live_reload),
        Resolved::Listing(dir, request_path) => {
            let listing = generate_directory_listing(&dir, &request_path)?;
            serve_html(request, listing, config.serve.live_reload)
        }
        Resolved::NotFound => serve_not_found(request),
    }
}

// ============================================================================
// Response Helpers
// ============================================================================

pub(crate) fn header(name: &str, value: &str) -> Result<Header> {
    match Header::from_bytes(name, value) {
        Ok(header) => Ok(header),
        Err(()) => bail!("Invalid header {name}: {value}"),
    }
}

/// Serve a file with appropriate content type.
fn serve_file(request: Request, path: &Path, live_reload: bool) -> Result<()> {
    let content = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let content_type = guess_content_type(path);

    if live_reload && content_type.starts_with("text/html") {
        let html = String::from_utf8_lossy(&content).into_owned();
        return serve_html(request, html, true);
    }

    serve_bytes(request, content, content_type)
}

fn serve_bytes(request: Request, content: Vec<u8>, content_type: &str) -> Result<()> {
    let response = Response::from_data(content).with_header(header("Content-Type", content_type)?);
    request.respond(response)?;
    Ok(())
}

fn serve_html(request: Request, content: String, live_reload: bool) -> Result<()> {
    let content = if live_reload {
        inject_script(&content)
    } else {
        content
    };
    let response = Response::from_string(content)
        .with_header(header("Content-Type", "text/html; charset=utf-8")?);
    request.respond(response)?;
    Ok(())
}

fn serve_not_found(request: Request) -> Result<()> {
    let response = Response::new(
        StatusCode(404),
        vec![header("Content-Type", "text/plain")?],
        Cursor::new("404 Not Found"),
        Some(13),
        None,
    );
    request.respond(response)?;
    Ok(())
}

// ============================================================================
// Content Type Detection
// ============================================================================

/// Guess MIME content type from file extension.
///
/// Returns `application/octet-stream` for unknown extensions.
fn guess_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        // Web content
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "application/javascript; charset=utf-8",
        Some("map" | "json") => "application/json; charset=utf-8",
        Some("xml") => "application/xml; charset=utf-8",

        // Images
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("avif") => "image/avif",
        Some("ico") => "image/x-icon",

        // Fonts
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("otf") => "font/otf",

        // Documents
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain; charset=utf-8",

        _ => "application/octet-stream",
    }
}

// ============================================================================
// Directory Listing
// ============================================================================

/// Generate HTML directory listing for browsing.
///
/// Shows directories and `.html` files, hides dotfiles, and falls back to
/// the welcome page when nothing is visible.
fn generate_directory_listing(dir_path: &Path, request_path: &str) -> std::io::Result<String> {
    let mut entries: Vec<(bool, String)> = fs::read_dir(dir_path)?
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_dir = entry.file_type().is_ok_and(|t| t.is_dir());
            let visible = !name.starts_with('.') && (is_dir || name.ends_with(".html"));
            visible.then_some((is_dir, name))
        })
        .collect();

    if entries.is_empty() {
        return Ok(WELCOME_TEMPLATE
            .replace("{title}", "Welcome")
            .replace("{version}", env!("CARGO_PKG_VERSION")));
    }

    // Directories first, then by name
    entries.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

    let items: Vec<String> = entries
        .into_iter()
        .map(|(is_dir, name)| {
            let icon = if is_dir { "📁" } else { "📄" };
            let href = if request_path.is_empty() {
                format!("/{name}")
            } else {
                format!("/{request_path}/{name}")
            };
            format!(r#"<li><span class="icon">{icon}</span><a href="{href}">{name}</a></li>"#)
        })
        .collect();

    let parent_link = if request_path.is_empty() {
        String::new()
    } else {
        let parent_path = Path::new(request_path)
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!(
            r#"<li class="parent"><span class="icon">📂</span><a href="/{parent_path}">..</a></li>"#
        )
    };

    #[allow(clippy::literal_string_with_formatting_args)] // template placeholders
    Ok(DIRECTORY_TEMPLATE
        .replace("{path}", request_path)
        .replace("{parent_link}", &parent_link)
        .replace("{entries}", &items.join("\n        ")))
}
