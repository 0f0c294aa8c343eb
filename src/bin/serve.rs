//! Development server for scratchide
//!
//! Serves the built page, the toolchain binaries and the sysroot archive.
//! Every response carries the cross-origin isolation headers the WASI
//! worker host needs for `SharedArrayBuffer`.
//!
//! Usage: `serve [port] [root]`

use std::fs;
use std::path::{Component, Path, PathBuf};
use tiny_http::{Header, Response, Server};

const DEFAULT_PORT: u16 = 8080;

const ISOLATION_HEADERS: [(&str, &str); 2] = [
    ("Cross-Origin-Opener-Policy", "same-origin"),
    ("Cross-Origin-Embedder-Policy", "require-corp"),
];

fn main() {
    let mut args = std::env::args().skip(1);
    let port = args
        .next()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_PORT);
    let root = PathBuf::from(args.next().unwrap_or_else(|| ".".to_string()));

    let addr = format!("0.0.0.0:{}", port);
    let server = Server::http(&addr).expect("Failed to start server");

    println!("┌─────────────────────────────────────┐");
    println!("│  scratchide dev server              │");
    println!("├─────────────────────────────────────┤");
    println!("│  http://localhost:{}              │", port);
    println!("└─────────────────────────────────────┘");

    for request in server.incoming_requests() {
        let response = match resolve(&root, request.url()) {
            Some(path) => serve_file(&path),
            None => not_found(),
        };
        let _ = request.respond(with_isolation(response));
    }
}

/// Map a request URL onto a file under `root`, refusing to leave it
fn resolve(root: &Path, url: &str) -> Option<PathBuf> {
    let path = url.split(['?', '#']).next().unwrap_or("");
    let relative = match path.trim_start_matches('/') {
        "" => "index.html",
        rest => rest,
    };

    let relative = Path::new(relative);
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }
    Some(root.join(relative))
}

fn serve_file(path: &Path) -> Response<std::io::Cursor<Vec<u8>>> {
    match fs::read(path) {
        Ok(contents) => {
            let header = Header::from_bytes("Content-Type", mime_type(path)).unwrap();
            Response::from_data(contents).with_header(header)
        }
        Err(_) => not_found(),
    }
}

fn not_found() -> Response<std::io::Cursor<Vec<u8>>> {
    Response::from_string("404 Not Found")
        .with_status_code(404)
        .with_header(Header::from_bytes("Content-Type", "text/plain").unwrap())
}

fn with_isolation<R: std::io::Read>(mut response: Response<R>) -> Response<R> {
    for (name, value) in ISOLATION_HEADERS {
        response.add_header(Header::from_bytes(name, value).unwrap());
    }
    response
}

fn mime_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") => "text/html; charset=utf-8",
        Some("js") => "application/javascript",
        Some("wasm") => "application/wasm",
        Some("css") => "text/css",
        Some("json") => "application/json",
        Some("gz") => "application/gzip",
        Some("tar") => "application/x-tar",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        _ => "application/octet-stream",
    }
}
