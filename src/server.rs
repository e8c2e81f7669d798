//! HTTP surface built on `tiny_http`.
//!
//! A fixed set of worker threads share one listener and each loops on
//! `recv()`; a request is handled start to finish on the thread that
//! received it. Routing is a pure function ([`route`]) over the method,
//! path, content type and body so handlers can be tested without sockets.

use std::io::{Cursor, Read};
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use percent_encoding::percent_decode_str;
use serde_json::json;
use tiny_http::{Header, Method, Request, Response};

use crate::rendering::RenderedImage;
use crate::request::GenerateRequest;
use crate::{Error, Result, ServerConfig, StampService};

pub const GENERATE_FAILED: &str = "Failed to generate image";
pub const TEMPLATE_FAILED: &str = "Could not create template";
pub const DOWNLOAD_NAME: &str = "generated-image.png";

/// State shared by every worker thread
pub struct AppState {
    pub service: StampService,
    pub config: ServerConfig,
}

/// A response before it is handed to `tiny_http`
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpReply {
    pub fn json(status: u16, value: serde_json::Value) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".into(), "application/json".into())],
            body: value.to_string().into_bytes(),
        }
    }

    /// Error body: client errors keep their message, server errors are
    /// logged and replaced with `fallback`.
    pub fn from_error(err: &Error, fallback: &str) -> Self {
        let message = if err.is_client_error() {
            err.to_string()
        } else {
            log::error!("request failed: {}", err);
            fallback.to_string()
        };
        Self::json(err.status_code(), json!({ "error": message, "kind": err.kind() }))
    }

    pub fn png(image: &RenderedImage) -> Self {
        Self {
            status: 200,
            headers: vec![
                ("Content-Type".into(), "image/png".into()),
                (
                    "Content-Disposition".into(),
                    format!("attachment; filename=\"{}\"", DOWNLOAD_NAME),
                ),
                ("Content-Length".into(), image.png_data.len().to_string()),
                ("ETag".into(), format!("\"{}\"", image.digest())),
            ],
            body: image.png_data.clone(),
        }
    }

    pub fn not_found() -> Self {
        Self::json(404, json!({ "error": "Not found", "kind": "not_found" }))
    }

    pub fn preflight() -> Self {
        Self {
            status: 204,
            headers: vec![
                ("Access-Control-Allow-Methods".into(), "GET, POST, OPTIONS".into()),
                ("Access-Control-Allow-Headers".into(), "Content-Type".into()),
            ],
            body: Vec::new(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn into_response(self) -> Response<Cursor<Vec<u8>>> {
        // Known lengths always go out with Content-Length, never chunked.
        let mut response = Response::from_data(self.body)
            .with_status_code(self.status)
            .with_chunked_threshold(usize::MAX);
        let cors = std::iter::once(("Access-Control-Allow-Origin".to_string(), "*".to_string()));
        for (name, value) in self.headers.into_iter().chain(cors) {
            match Header::from_bytes(name.as_bytes(), value.as_bytes()) {
                Ok(header) => response.add_header(header),
                Err(()) => log::warn!("dropping invalid header {}", name),
            }
        }
        response
    }
}

/// Dispatch one request.
pub fn route(
    state: &AppState,
    method: &Method,
    url: &str,
    content_type: Option<&str>,
    body: &[u8],
) -> HttpReply {
    let path = url.split('?').next().unwrap_or("/");
    match (method, path) {
        (Method::Options, _) => HttpReply::preflight(),
        (Method::Get, "/check-template") => check_template(state),
        (Method::Post, "/generate") => generate(state, content_type, body),
        (Method::Get, _) => serve_static(state.config.public_dir.as_deref(), path),
        _ => HttpReply::not_found(),
    }
}

fn check_template(state: &AppState) -> HttpReply {
    match state.service.check_template() {
        Ok(status) => HttpReply::json(200, json!({ "exists": true, "created": status.created })),
        Err(err) => {
            log::error!("Error loading template: {}", err);
            HttpReply::json(500, json!({ "error": TEMPLATE_FAILED, "kind": err.kind() }))
        }
    }
}

fn generate(state: &AppState, content_type: Option<&str>, body: &[u8]) -> HttpReply {
    let result = GenerateRequest::parse(content_type, body)
        .and_then(GenerateRequest::into_parts)
        .and_then(|(text, style)| state.service.generate(&text, &style));

    match result {
        Ok(image) => HttpReply::png(&image),
        Err(err) => HttpReply::from_error(&err, GENERATE_FAILED),
    }
}

fn serve_static(public_dir: Option<&Path>, path: &str) -> HttpReply {
    let Some(root) = public_dir else {
        return HttpReply::not_found();
    };
    let Ok(decoded) = percent_decode_str(path).decode_utf8() else {
        return HttpReply::not_found();
    };
    let relative = match decoded.trim_start_matches('/') {
        "" => "index.html",
        other => other,
    };
    let Some(file) = safe_join(root, relative) else {
        return HttpReply::not_found();
    };
    match std::fs::read(&file) {
        Ok(body) => HttpReply {
            status: 200,
            headers: vec![("Content-Type".into(), content_type_for(&file).into())],
            body,
        },
        Err(_) => HttpReply::not_found(),
    }
}

/// Join `relative` under `root`, refusing anything that could escape it.
fn safe_join(root: &Path, relative: &str) -> Option<PathBuf> {
    let rel = Path::new(relative);
    if rel.components().all(|c| matches!(c, Component::Normal(_))) {
        Some(root.join(rel))
    } else {
        None
    }
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("js") => "application/javascript",
        Some("css") => "text/css",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        _ => "application/octet-stream",
    }
}

fn read_body(request: &mut Request, limit: usize) -> Result<Vec<u8>> {
    if request.body_length().map(|len| len > limit).unwrap_or(false) {
        return Err(Error::PayloadTooLarge(limit));
    }
    let mut body = Vec::new();
    request
        .as_reader()
        .take(limit as u64 + 1)
        .read_to_end(&mut body)?;
    if body.len() > limit {
        return Err(Error::PayloadTooLarge(limit));
    }
    Ok(body)
}

fn handle_request(state: &AppState, mut request: Request) {
    let method = request.method().clone();
    let url = request.url().to_string();
    let content_type = request
        .headers()
        .iter()
        .find(|h| h.field.equiv("Content-Type"))
        .map(|h| h.value.as_str().to_string());

    let reply = match read_body(&mut request, state.config.max_body_bytes) {
        Ok(body) => route(state, &method, &url, content_type.as_deref(), &body),
        Err(err) => HttpReply::from_error(&err, GENERATE_FAILED),
    };

    log::info!("{} {} -> {}", method, url, reply.status);
    if let Err(e) = request.respond(reply.into_response()) {
        log::warn!("failed to send response for {}: {}", url, e);
    }
}

fn worker_loop(id: usize, http: &tiny_http::Server, state: &AppState) {
    loop {
        match http.recv() {
            Ok(request) => handle_request(state, request),
            Err(e) => {
                log::debug!("worker {} stopping: {}", id, e);
                break;
            }
        }
    }
}

pub struct Server {
    http: Arc<tiny_http::Server>,
    state: Arc<AppState>,
}

impl Server {
    /// Bind the listener. With `eager_template` the template is initialized
    /// here; a failure is logged and retried on the first `/check-template`.
    pub fn bind(config: ServerConfig, service: StampService) -> Result<Self> {
        config.validate()?;
        let addr = config.bind_addr();
        let http = tiny_http::Server::http(addr.as_str())
            .map_err(|e| Error::ServerError(format!("Failed to bind {}: {}", addr, e)))?;

        if config.eager_template {
            if let Err(err) = service.check_template() {
                log::error!("Error loading template at startup: {}", err);
            }
        }

        Ok(Self {
            http: Arc::new(http),
            state: Arc::new(AppState { service, config }),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.http
            .server_addr()
            .to_ip()
            .ok_or_else(|| Error::ServerError("listener has no IP address".into()))
    }

    fn spawn_workers(&self) -> Result<Vec<JoinHandle<()>>> {
        let mut handles = Vec::with_capacity(self.state.config.workers);
        for id in 0..self.state.config.workers {
            let http = self.http.clone();
            let state = self.state.clone();
            let handle = thread::Builder::new()
                .name(format!("textstamp-worker-{}", id))
                .spawn(move || worker_loop(id, &http, &state))?;
            handles.push(handle);
        }
        Ok(handles)
    }

    /// Serve until the process exits.
    pub fn run(self) -> Result<()> {
        log::info!(
            "Server running on {} with {} worker(s)",
            self.local_addr()?,
            self.state.config.workers
        );
        for handle in self.spawn_workers()? {
            let _ = handle.join();
        }
        Ok(())
    }

    /// Serve in the background; stop with [`ServerHandle::shutdown`].
    pub fn spawn(self) -> Result<ServerHandle> {
        let addr = self.local_addr()?;
        let threads = self.spawn_workers()?;
        Ok(ServerHandle {
            addr,
            http: self.http,
            threads,
        })
    }
}

pub struct ServerHandle {
    addr: SocketAddr,
    http: Arc<tiny_http::Server>,
    threads: Vec<JoinHandle<()>>,
}

impl ServerHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn shutdown(self) {
        for _ in &self.threads {
            self.http.unblock();
        }
        for handle in self.threads {
            let _ = handle.join();
        }
    }
}
