//! Access records.
//!
//! One `tracing` event per logged request on the `memserve::access` target,
//! so the subscriber can filter or route access lines separately.

use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderMap, Request, StatusCode};

use crate::config::LoggingConfig;

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";

/// Request fields captured before the request is consumed.
#[derive(Debug, Clone)]
pub struct AccessRecord {
    method: String,
    seq: u64,
    content_length: u64,
    client_ip: String,
    remote_ip: String,
    user_agent: String,
    url: String,
}

impl AccessRecord {
    pub fn capture(request: &Request<Body>, peer: Option<SocketAddr>, seq: u64) -> Self {
        let headers = request.headers();
        let remote_ip = peer.map(|addr| addr.ip().to_string()).unwrap_or_default();
        Self {
            method: request.method().to_string(),
            seq,
            content_length: content_length(headers).unwrap_or(0),
            client_ip: client_ip(headers).unwrap_or_else(|| remote_ip.clone()),
            remote_ip,
            user_agent: header_str(headers, header::USER_AGENT.as_str())
                .unwrap_or_default()
                .to_string(),
            url: request.uri().to_string(),
        }
    }

    pub fn emit(&self, status: StatusCode, elapsed: Duration) {
        tracing::info!(
            target: "memserve::access",
            method = %self.method,
            status = status.as_u16(),
            seq = self.seq,
            content_length = self.content_length,
            response_ms = elapsed.as_secs_f64() * 1000.0,
            client_ip = %self.client_ip,
            remote_ip = %self.remote_ip,
            user_agent = %self.user_agent,
            url = %self.url,
        );
    }
}

/// Whether a response with `status` gets an access record.
pub fn enabled(config: &LoggingConfig, status: StatusCode) -> bool {
    if !config.access {
        return false;
    }
    match status {
        StatusCode::OK => true,
        StatusCode::NOT_FOUND => config.not_found,
        StatusCode::NOT_MODIFIED => config.not_modified,
        _ => false,
    }
}

/// Declared request body length, if any.
pub fn content_length(headers: &HeaderMap) -> Option<u64> {
    header_str(headers, header::CONTENT_LENGTH.as_str())?
        .trim()
        .parse()
        .ok()
}

fn client_ip(headers: &HeaderMap) -> Option<String> {
    let forwarded = header_str(headers, X_FORWARDED_FOR)
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|hop| !hop.is_empty());
    forwarded
        .or_else(|| header_str(headers, X_REAL_IP).map(str::trim))
        .map(str::to_string)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
