//! Minimal HTTP/1.1 server with canned redirect routes for integration tests.
//!
//! Every connection serves one request and is closed. Routes:
//!
//! - `/ok`, `/final`, `/dir/next`, `/cookie/yes`, `/cookie/no`: 200
//! - `/start`: 302 to `/middle?utm_source=shortener&id=7` (root-relative)
//! - `/middle`: 500 if any `utm_` field arrived, else 301 to `final` (relative)
//! - `/absolute`, `/scheme-relative`: 302 to `/ok` spelled absolute or `//host/ok`
//! - `/dir/relative`: 302 to `next`
//! - `/content-location`: 200 carrying only `Content-Location: /ok`
//! - `/loop`: 302 to itself
//! - `/chain/N`: 302 to `/chain/N+1`, forever
//! - `/flaky/KEY`: 503 (`Retry-After: 0`) for the first two hits of KEY, then 200
//! - `/drop-first/KEY`: closes the first connection for KEY without a response, then 200
//! - `/unavailable`: always 503 with `Retry-After: 0`
//! - `/cookie/set`: sets `session=abc` and redirects to `/cookie/check`
//! - `/cookie/check`: redirects to `/cookie/yes` if the cookie came back, else `/cookie/no`
//! - `/meta`: 200 HTML page with a meta refresh to `/ok?from=meta&utm_medium=x`
//! - `/slow`: waits two seconds, then 200

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Hit counters shared by all connections.
type Hits = Arc<Mutex<HashMap<String, u32>>>;

/// Starts the server in a background thread. Returns the base URL without a
/// trailing slash (e.g. "http://127.0.0.1:12345"). Runs until the process exits.
pub fn start() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let base = format!("http://127.0.0.1:{}", port);
    let hits: Hits = Arc::default();
    let server_base = base.clone();
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let base = server_base.clone();
            let hits = Arc::clone(&hits);
            thread::spawn(move || handle(stream, &base, &hits));
        }
    });
    base
}

/// A local URL nothing listens on.
pub fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}/ok", port)
}

struct Request {
    method: String,
    path: String,
    query: String,
    headers: Vec<(String, String)>,
}

impl Request {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

fn handle(mut stream: TcpStream, base: &str, hits: &Hits) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let Some(req) = std::str::from_utf8(&buf[..n]).ok().and_then(parse_request) else {
        return;
    };

    let ok = |stream: &mut TcpStream| respond(stream, &req, "200 OK", &[], b"ok");
    let redirect = |stream: &mut TcpStream, status: &str, location: &str| {
        respond(stream, &req, status, &[("Location", location)], b"")
    };

    match req.path.as_str() {
        "/ok" | "/final" | "/dir/next" | "/cookie/yes" | "/cookie/no" => ok(&mut stream),
        "/start" => redirect(&mut stream, "302 Found", "/middle?utm_source=shortener&id=7"),
        "/middle" if req.query.contains("utm_") => {
            respond(&mut stream, &req, "500 Internal Server Error", &[], b"tracking leaked")
        }
        "/middle" => redirect(&mut stream, "301 Moved Permanently", "final"),
        "/absolute" => redirect(&mut stream, "302 Found", &format!("{}/ok", base)),
        "/scheme-relative" => {
            let authority = base.trim_start_matches("http:");
            redirect(&mut stream, "302 Found", &format!("{}/ok", authority))
        }
        "/dir/relative" => redirect(&mut stream, "302 Found", "next"),
        "/content-location" => {
            respond(&mut stream, &req, "200 OK", &[("Content-Location", "/ok")], b"moved")
        }
        "/loop" => redirect(&mut stream, "302 Found", "/loop"),
        path if path.starts_with("/chain/") => {
            let n: u32 = path["/chain/".len()..].parse().unwrap_or(0);
            redirect(&mut stream, "302 Found", &format!("/chain/{}", n + 1))
        }
        path if path.starts_with("/flaky/") => {
            if bump(hits, path) <= 2 {
                respond(&mut stream, &req, "503 Service Unavailable", &[("Retry-After", "0")], b"")
            } else {
                ok(&mut stream)
            }
        }
        path if path.starts_with("/drop-first/") => {
            if bump(hits, path) == 1 {
                // Close without answering.
                return;
            }
            ok(&mut stream)
        }
        "/unavailable" => {
            respond(&mut stream, &req, "503 Service Unavailable", &[("Retry-After", "0")], b"")
        }
        "/cookie/set" => respond(
            &mut stream,
            &req,
            "302 Found",
            &[("Set-Cookie", "session=abc; Path=/"), ("Location", "/cookie/check")],
            b"",
        ),
        "/cookie/check" => {
            let has_session = req
                .header("cookie")
                .map(|c| c.split(';').any(|kv| kv.trim() == "session=abc"))
                .unwrap_or(false);
            let target = if has_session { "/cookie/yes" } else { "/cookie/no" };
            redirect(&mut stream, "302 Found", target)
        }
        "/meta" => {
            let page = format!(
                "<html><head><meta http-equiv=\"refresh\" content=\"0;url={}/ok?from=meta&amp;utm_medium=x\"></head></html>",
                base
            );
            respond(
                &mut stream,
                &req,
                "200 OK",
                &[("Content-Type", "text/html; charset=utf-8")],
                page.as_bytes(),
            )
        }
        "/slow" => {
            thread::sleep(Duration::from_secs(2));
            ok(&mut stream)
        }
        _ => respond(&mut stream, &req, "404 Not Found", &[], b"not found"),
    }
}

/// Counts a hit on `key` and returns the new total.
fn bump(hits: &Hits, key: &str) -> u32 {
    let mut hits = hits.lock().unwrap();
    let count = hits.entry(key.to_string()).or_insert(0);
    *count += 1;
    *count
}

fn respond(stream: &mut TcpStream, req: &Request, status: &str, headers: &[(&str, &str)], body: &[u8]) {
    let mut head = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        status,
        body.len()
    );
    for (name, value) in headers {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    head.push_str("\r\n");
    let _ = stream.write_all(head.as_bytes());
    if !req.method.eq_ignore_ascii_case("HEAD") {
        let _ = stream.write_all(body);
    }
}

fn parse_request(request: &str) -> Option<Request> {
    let mut lines = request.lines();
    let mut first = lines.next()?.split_whitespace();
    let method = first.next()?.to_string();
    let target = first.next()?;
    let (path, query) = target.split_once('?').unwrap_or((target, ""));

    let mut headers = Vec::new();
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }
    }
    Some(Request {
        method,
        path: path.to_string(),
        query: query.to_string(),
        headers,
    })
}
