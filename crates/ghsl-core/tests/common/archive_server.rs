//! Minimal HTTP/1.1 server that publishes zip archives for integration tests.
//!
//! Serves a set of paths; anything else is 404. Supports HEAD and
//! `Range: bytes=N-` GETs, and can cut the first GET of each path short to
//! exercise resume.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Debug, Clone, Copy)]
pub struct ServerOptions {
    /// If false, GET ignores Range and always returns 200 with the full body.
    pub support_ranges: bool,
    /// Close the connection after this many body bytes on the first GET of a path.
    pub cut_first_get_at: Option<usize>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            support_ranges: true,
            cut_first_get_at: None,
        }
    }
}

/// One request as seen by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub method: String,
    pub path: String,
    pub range_start: Option<u64>,
}

#[derive(Clone)]
pub struct ArchiveServer {
    pub base_url: String,
    routes: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    hits: Arc<Mutex<Vec<Hit>>>,
}

impl ArchiveServer {
    /// Make `url` (must start with `base_url`) return `body`.
    pub fn publish(&self, url: &str, body: Vec<u8>) {
        assert!(url.starts_with(&self.base_url), "url on this server");
        let after_scheme = &url[url.find("://").unwrap() + 3..];
        let path = after_scheme[after_scheme.find('/').unwrap()..].to_string();
        self.routes.lock().unwrap().insert(path, body);
    }

    pub fn hits(&self) -> Vec<Hit> {
        self.hits.lock().unwrap().clone()
    }

    pub fn gets(&self) -> Vec<Hit> {
        self.hits().into_iter().filter(|h| h.method == "GET").collect()
    }
}

pub fn start() -> ArchiveServer {
    start_with_options(ServerOptions::default())
}

/// Starts a server in a background thread. It runs until the process exits.
pub fn start_with_options(opts: ServerOptions) -> ArchiveServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let server = ArchiveServer {
        base_url: format!("http://127.0.0.1:{}/GHSL/", port),
        routes: Arc::new(Mutex::new(HashMap::new())),
        hits: Arc::new(Mutex::new(Vec::new())),
    };
    let shared = server.clone();
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let s = shared.clone();
            thread::spawn(move || handle(stream, &s, opts));
        }
    });
    server
}

fn handle(mut stream: std::net::TcpStream, server: &ArchiveServer, opts: ServerOptions) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let Ok(request) = std::str::from_utf8(&buf[..n]) else {
        return;
    };
    let (method, path, range_start) = parse_request(request);
    let first_get = {
        let mut hits = server.hits.lock().unwrap();
        let first = method == "GET" && !hits.iter().any(|h| h.method == "GET" && h.path == path);
        hits.push(Hit {
            method: method.clone(),
            path: path.clone(),
            range_start,
        });
        first
    };

    let body = server.routes.lock().unwrap().get(&path).cloned();
    let Some(body) = body else {
        let _ = stream.write_all(
            b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        );
        return;
    };
    let total = body.len() as u64;
    let accept_ranges = if opts.support_ranges {
        "Accept-Ranges: bytes\r\n"
    } else {
        ""
    };

    match method.as_str() {
        "HEAD" => {
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n{}ETag: \"v1-{}\"\r\nConnection: close\r\n\r\n",
                total, accept_ranges, total
            );
            let _ = stream.write_all(response.as_bytes());
        }
        "GET" => {
            let (status, slice) = match range_start.filter(|_| opts.support_ranges) {
                Some(start) if start >= total => {
                    let response = format!(
                        "HTTP/1.1 416 Range Not Satisfiable\r\nContent-Range: bytes */{}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                        total
                    );
                    let _ = stream.write_all(response.as_bytes());
                    return;
                }
                Some(start) => ("206 Partial Content", &body[start as usize..]),
                None => ("200 OK", &body[..]),
            };
            let start = total - slice.len() as u64;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Length: {}\r\nContent-Range: bytes {}-{}/{}\r\n{}Connection: close\r\n\r\n",
                status,
                slice.len(),
                start,
                total.saturating_sub(1),
                total,
                accept_ranges
            );
            let _ = stream.write_all(response.as_bytes());
            match opts.cut_first_get_at {
                Some(cut) if first_get && cut < slice.len() => {
                    let _ = stream.write_all(&slice[..cut]);
                    let _ = stream.flush();
                    let _ = stream.shutdown(std::net::Shutdown::Both);
                }
                _ => {
                    let _ = stream.write_all(slice);
                }
            }
        }
        _ => {
            let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nConnection: close\r\n\r\n");
        }
    }
}

/// Returns (method, path, start of `Range: bytes=N-`).
fn parse_request(request: &str) -> (String, String, Option<u64>) {
    let mut lines = request.lines();
    let mut first = lines.next().unwrap_or("").split_whitespace();
    let method = first.next().unwrap_or("").to_string();
    let path = first.next().unwrap_or("").to_string();
    let mut range = None;
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("range") {
                range = value
                    .trim()
                    .strip_prefix("bytes=")
                    .and_then(|v| v.split('-').next())
                    .and_then(|s| s.trim().parse::<u64>().ok());
            }
        }
    }
    (method, path, range)
}
