//! Request dispatch.
//!
//! # Flow
//! ```text
//! method != GET        → 405
//! site not built yet   → 503
//! store miss + no route→ 404
//! If-Modified-Since == Last-Modified (verbatim) → 304
//! otherwise            → 200 with the stored payload
//! ```
//!
//! Request bodies are never read. When a request announces one the response
//! carries `Connection: close`, so the connection is torn down instead of
//! the upload being drained.

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode},
    response::{IntoResponse, Response},
};
use percent_encoding::percent_decode_str;

use crate::assets::Asset;
use crate::http::access::{self, AccessRecord};
use crate::http::server::AppState;
use crate::http::site::Site;
use crate::observability::metrics;

/// Result of negotiating one request against the site.
#[derive(Debug)]
pub enum Outcome {
    MethodNotAllowed,
    Unavailable,
    NotFound,
    NotModified,
    Found(Arc<Asset>),
}

impl Outcome {
    pub fn status(&self) -> StatusCode {
        match self {
            Outcome::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Outcome::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            Outcome::NotFound => StatusCode::NOT_FOUND,
            Outcome::NotModified => StatusCode::NOT_MODIFIED,
            Outcome::Found(_) => StatusCode::OK,
        }
    }
}

pub fn negotiate(
    site: Option<&Site>,
    method: &Method,
    path: &str,
    if_modified_since: Option<&str>,
) -> Outcome {
    if method != Method::GET {
        return Outcome::MethodNotAllowed;
    }
    let Some(site) = site else {
        return Outcome::Unavailable;
    };
    let Some(asset) = site.lookup(path) else {
        return Outcome::NotFound;
    };
    if if_modified_since == Some(asset.last_modified.as_str()) {
        return Outcome::NotModified;
    }
    Outcome::Found(asset)
}

/// Fallback handler for every request.
pub async fn dispatch(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let seq = state.requests.fetch_add(1, Ordering::Relaxed) + 1;
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let path = decode_path(request.uri().path());
    let if_modified_since = request
        .headers()
        .get(header::IF_MODIFIED_SINCE)
        .and_then(|value| value.to_str().ok());

    let site = state.site.load_full();
    let outcome = negotiate(site.as_deref(), request.method(), &path, if_modified_since);
    let status = outcome.status();

    tracing::debug!(method = %request.method(), path = %path, status = status.as_u16(), "Dispatched");

    let mut response = render(outcome);
    if announces_body(request.headers()) {
        response
            .headers_mut()
            .insert(header::CONNECTION, HeaderValue::from_static("close"));
    }

    metrics::record_request(status.as_u16(), start);
    if access::enabled(&state.logging, status) {
        AccessRecord::capture(&request, peer, seq).emit(status, start.elapsed());
    }

    response
}

fn render(outcome: Outcome) -> Response {
    match outcome {
        Outcome::Found(asset) => found(&asset),
        Outcome::MethodNotAllowed => (
            StatusCode::METHOD_NOT_ALLOWED,
            [(header::ALLOW, HeaderValue::from_static("GET"))],
        )
            .into_response(),
        other => other.status().into_response(),
    }
}

fn found(asset: &Asset) -> Response {
    let mut response = Response::new(Body::from(asset.payload.bytes().clone()));
    let headers = response.headers_mut();

    if let Ok(value) = HeaderValue::from_str(&asset.last_modified) {
        headers.insert(header::LAST_MODIFIED, value);
    }
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(asset.size()));
    if let Ok(value) = HeaderValue::try_from(format!("max-age={}", asset.max_age)) {
        headers.insert(header::CACHE_CONTROL, value);
    }
    if let Some(encoding) = asset.payload.encoding() {
        headers.insert(header::CONTENT_ENCODING, HeaderValue::from_static(encoding));
    }
    if let Some(content_type) = asset.content_type {
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    }

    response
}

fn decode_path(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

fn announces_body(headers: &HeaderMap) -> bool {
    headers.contains_key(header::TRANSFER_ENCODING)
        || access::content_length(headers).is_some_and(|len| len > 0)
}
