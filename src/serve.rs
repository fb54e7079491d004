//! Local preview and admin server
//!
//! `satchel site serve` → builds the site, serves the html dir, and hosts an
//! admin page that edits front matter through a small JSON API.

use crate::config::SiteConfig;
use crate::errors::{Result, ToolError};
use crate::fsutil;
use crate::site::{self, PageMeta};
use colored::Colorize;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use tiny_http::{Header, Method, Request, Response, Server};

#[derive(Serialize)]
struct ApiResponse<T> {
    ok: bool,
    data: Option<T>,
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    fn failure(message: String) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(message),
        }
    }
}

// Embedded meta editor, served at /admin
const ADMIN_HTML: &str = include_str!("admin.html");

/// Build once, then serve until interrupted
pub fn run(config: &SiteConfig, port: u16, watch: bool, open_browser: bool) -> Result<()> {
    site::build(config, false)?;

    let addr = format!("127.0.0.1:{}", port);
    let server = Server::http(&addr).map_err(|e| ToolError::Http(e.to_string()))?;
    let url = format!("http://localhost:{}", port);

    println!("\n   {} {}", "Serving".green().bold(), url);
    println!("   Admin:  {}/admin", url);
    println!("   Press Ctrl+C to stop\n");

    if watch {
        let (tx, rx) = mpsc::channel();
        let mut watcher = RecommendedWatcher::new(tx, notify::Config::default())?;
        watcher.watch(&config.md_dir, RecursiveMode::Recursive)?;
        let watch_config = config.clone();
        thread::spawn(move || {
            // The watcher lives exactly as long as this thread
            let _watcher = watcher;
            while rx.recv().is_ok() {
                // An editor save fires a burst of events; take the last
                while rx.recv_timeout(Duration::from_millis(300)).is_ok() {}
                println!("   {} md change, rebuilding", "Watching".cyan());
                if let Err(e) = site::build(&watch_config, false) {
                    eprintln!("   {} rebuild failed: {}", "Warning:".yellow(), e);
                }
            }
        });
        println!("   {} {}", "Watching".cyan(), config.md_dir.display());
    }

    if open_browser {
        let _ = open::that(&url);
    }

    for request in server.incoming_requests() {
        if let Err(e) = handle_request(request, config) {
            eprintln!("Error: {}", e);
        }
    }

    Ok(())
}

fn handle_request(request: Request, config: &SiteConfig) -> std::io::Result<()> {
    let url = request.url().to_string();
    let path = url.split('?').next().unwrap_or("/");
    let method = request.method().clone();

    match (&method, path) {
        (&Method::Get, "/") => serve_file(request, &config.html_dir.join("index.html")),

        (&Method::Get, "/admin") => {
            let response = Response::from_string(ADMIN_HTML)
                .with_header(Header::from_bytes(&b"Content-Type"[..], &b"text/html"[..]).unwrap());
            request.respond(response)
        }

        (&Method::Get, "/api/pages") => {
            respond_json(request, 200, &ApiResponse::success(list_pages(config)))
        }

        (&Method::Post, "/api/meta") => handle_meta_update(request, config),

        (&Method::Get, _) => match safe_relative(path) {
            Some(rel) => serve_file(request, &config.html_dir.join(rel)),
            None => respond_not_found(request),
        },

        _ => respond_not_found(request),
    }
}

fn respond_not_found(request: Request) -> std::io::Result<()> {
    let response = Response::from_string("Not found").with_status_code(404);
    request.respond(response)
}

fn respond_json<T: Serialize>(
    request: Request,
    status: u16,
    payload: &ApiResponse<T>,
) -> std::io::Result<()> {
    let json = serde_json::to_string(payload)?;
    let response = Response::from_string(json)
        .with_status_code(status)
        .with_header(Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap());
    request.respond(response)
}

/// Reject anything that could escape the html dir
fn safe_relative(path: &str) -> Option<&str> {
    let rel = path.trim_start_matches('/');
    if rel.is_empty() || rel.contains('\\') {
        return None;
    }
    if rel.split('/').any(|seg| seg == "..") {
        return None;
    }
    Some(rel)
}

fn content_type(path: &Path) -> &'static [u8] {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") => b"text/html; charset=utf-8",
        Some("css") => b"text/css",
        Some("js") => b"application/javascript",
        Some("json") => b"application/json",
        Some("png") => b"image/png",
        Some("svg") => b"image/svg+xml",
        Some("ico") => b"image/x-icon",
        Some("txt") => b"text/plain; charset=utf-8",
        _ => b"application/octet-stream",
    }
}

fn serve_file(request: Request, path: &Path) -> std::io::Result<()> {
    if !path.is_file() {
        return respond_not_found(request);
    }
    let body = fs::read(path)?;
    let response = Response::from_data(body)
        .with_header(Header::from_bytes(&b"Content-Type"[..], content_type(path)).unwrap());
    request.respond(response)
}

/// Current page listing, straight from the markdown sources
fn list_pages(config: &SiteConfig) -> Vec<PageMeta> {
    let mut files: Vec<std::path::PathBuf> = match fs::read_dir(&config.md_dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.is_file()
                    && p.extension()
                        .map(|ext| ext.eq_ignore_ascii_case("md"))
                        .unwrap_or(false)
            })
            .collect(),
        Err(_) => return vec![],
    };
    files.sort();

    let mut pages = Vec::with_capacity(files.len());
    for path in files {
        let raw = match fsutil::read_utf8(&path) {
            Ok(raw) => raw,
            Err(_) => continue,
        };
        let parsed = site::parse(&raw, &config.default_category);
        pages.push(PageMeta {
            file: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            category: parsed.category,
            tags: parsed.tags,
        });
    }
    pages
}

#[derive(serde::Deserialize)]
struct MetaUpdate {
    file: String,
    category: String,
    tags: String,
}

fn handle_meta_update(mut request: Request, config: &SiteConfig) -> std::io::Result<()> {
    let mut body = String::new();
    if let Err(e) = request.as_reader().read_to_string(&mut body) {
        return respond_json(
            request,
            400,
            &ApiResponse::<bool>::failure(format!("Failed to read body: {}", e)),
        );
    }

    let update: MetaUpdate = match serde_json::from_str(&body) {
        Ok(u) => u,
        Err(e) => {
            return respond_json(
                request,
                400,
                &ApiResponse::<bool>::failure(format!("Invalid JSON: {}", e)),
            )
        }
    };

    // File names come from our own listing, anything else is suspect
    if update.file.contains('/') || update.file.contains('\\') || update.file.contains("..") {
        return respond_json(
            request,
            400,
            &ApiResponse::<bool>::failure("invalid file name".to_string()),
        );
    }
    let md_path = config.md_dir.join(&update.file);
    if !md_path.is_file() {
        return respond_json(
            request,
            404,
            &ApiResponse::<bool>::failure(format!("no such page: {}", update.file)),
        );
    }

    let tags: Vec<String> = update
        .tags
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect();

    let result = fsutil::read_utf8(&md_path)
        .and_then(|raw| site::rewrite(&raw, &update.category, &tags))
        .and_then(|updated| fs::write(&md_path, updated).map_err(Into::into))
        .and_then(|_| site::build(config, false).map(|_| ()));

    match result {
        Ok(()) => respond_json(request, 200, &ApiResponse::success(true)),
        Err(e) => respond_json(
            request,
            500,
            &ApiResponse::<bool>::failure(format!("update failed: {}", e)),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // === ApiResponse Tests ===

    #[test]
    fn test_api_response_success() {
        let response: ApiResponse<String> = ApiResponse::success("hello".to_string());
        assert!(response.ok);
        assert_eq!(response.data, Some("hello".to_string()));
        assert!(response.error.is_none());
    }

    #[test]
    fn test_api_response_failure_serializes() {
        let response = ApiResponse::<bool>::failure("nope".to_string());
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"ok\":false"));
        assert!(json.contains("\"error\":\"nope\""));
        assert!(json.contains("\"data\":null"));
    }

    // === Routing helper Tests ===

    #[test]
    fn test_safe_relative_rejects_traversal() {
        assert_eq!(safe_relative("/page.html"), Some("page.html"));
        assert_eq!(safe_relative("/sub/page.html"), Some("sub/page.html"));
        assert!(safe_relative("/../secrets").is_none());
        assert!(safe_relative("/a/../../b").is_none());
        assert!(safe_relative("/a\\b").is_none());
        assert!(safe_relative("/").is_none());
    }

    #[test]
    fn test_content_types() {
        assert_eq!(content_type(Path::new("a.css")), b"text/css");
        assert_eq!(content_type(Path::new("a.js")), b"application/javascript");
        assert_eq!(content_type(Path::new("a.bin")), b"application/octet-stream");
    }

    // === Admin page Tests ===

    #[test]
    fn test_admin_html_is_valid() {
        assert!(ADMIN_HTML.contains("<!DOCTYPE html>"));
        assert!(ADMIN_HTML.contains("</html>"));
        assert!(ADMIN_HTML.contains("/api/pages"));
        assert!(ADMIN_HTML.contains("/api/meta"));
    }
}
