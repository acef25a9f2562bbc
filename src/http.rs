//! HTTP request logging
//!
//! Middleware that logs one line per request under the `HTTP` prefix, plus
//! the minimal router the service binary serves.

use std::net::SocketAddr;
use std::time::Instant;

use axum::body::{Body, Bytes};
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use futures::stream::{self, StreamExt};

use crate::logging::{Level, Logger};

/// Prefix tag on request log lines
pub const HTTP_PREFIX: &str = "HTTP";

/// Request body bytes copied into the log line
pub const MAX_LOGGED_BODY: usize = 10 * 1024;

/// Appended to a logged body that was cut at `MAX_LOGGED_BODY`
pub const TRUNCATED_MARKER: &str = "... (truncated)";

/// Build the service router with request logging installed
pub fn router(logger: Logger) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .layer(middleware::from_fn_with_state(
            logger.with_prefix(HTTP_PREFIX),
            request_logging,
        ))
}

async fn index() -> &'static str {
    "ok"
}

async fn health() -> StatusCode {
    StatusCode::OK
}

/// Paths served to the browser that are not worth a log line
fn is_asset_path(path: &str) -> bool {
    path == "/" || path.starts_with("/static") || path.starts_with("/favicon.ico")
}

/// Best guess at the real client address
fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next().map(str::trim) {
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        return real_ip.trim().to_string();
    }
    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Read up to `MAX_LOGGED_BODY + 1` bytes of the body for logging and return
/// a body that still yields the complete, unmodified stream downstream
async fn capture_body(body: Body) -> (String, Body) {
    let mut stream = body.into_data_stream();
    let mut head: Vec<Result<Bytes, axum::Error>> = Vec::new();
    let mut seen: Vec<u8> = Vec::new();

    while seen.len() <= MAX_LOGGED_BODY {
        match stream.next().await {
            Some(Ok(chunk)) => {
                let room = MAX_LOGGED_BODY + 1 - seen.len();
                seen.extend_from_slice(&chunk[..chunk.len().min(room)]);
                head.push(Ok(chunk));
            }
            Some(Err(e)) => {
                head.push(Err(e));
                break;
            }
            None => break,
        }
    }

    let mut logged = if seen.len() > MAX_LOGGED_BODY {
        let mut text = String::from_utf8_lossy(&seen[..MAX_LOGGED_BODY]).into_owned();
        text.push_str(TRUNCATED_MARKER);
        text
    } else {
        String::from_utf8_lossy(&seen).into_owned()
    };
    // Keep the record on one line
    logged = logged.replace(['\r', '\n'], " ");

    let body = Body::from_stream(stream::iter(head).chain(stream));
    (logged, body)
}

/// Log method, path, status, duration, client address and body of each
/// request
///
/// Bodies are capped at `MAX_LOGGED_BODY` bytes in the log line; the handler
/// always receives the full body. Server errors are logged at `Error` so they
/// also reach the error log.
pub async fn request_logging(State(logger): State<Logger>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    if is_asset_path(&path) {
        return next.run(request).await;
    }

    let method = request.method().clone();
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let remote = client_ip(request.headers(), peer);
    let start = Instant::now();

    let (parts, body) = request.into_parts();
    let (logged_body, body) = capture_body(body).await;
    let request = Request::from_parts(parts, body);

    let response = next.run(request).await;

    let status = response.status();
    let level = if status.is_server_error() {
        Level::Error
    } else {
        Level::Info
    };
    let status_code = status.as_u16();
    let duration_ms = start.elapsed().as_millis();
    let message = format!("{} {}", method, path);
    if logged_body.is_empty() {
        logger.log(
            level,
            message,
            &[
                ("status", &status_code),
                ("duration_ms", &duration_ms),
                ("remote", &remote),
            ],
        );
    } else {
        logger.log(
            level,
            message,
            &[
                ("status", &status_code),
                ("duration_ms", &duration_ms),
                ("remote", &remote),
                ("body", &logged_body),
            ],
        );
    }

    response
}
