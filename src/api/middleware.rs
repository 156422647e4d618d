//! Request middleware
//!
//! Provides:
//! - CORS preflight handling and response headers
//! - Client IP extraction from edge-proxy headers
//! - Per-IP hourly rate limiting over the shared KV

use axum::extract::Request;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::kv::KvStore;

/// Rate window length; also the `Retry-After` hint on 429.
pub const RATE_WINDOW_SECS: u64 = 3600;

const ALLOW_ORIGIN: &str = "*";
const ALLOW_METHODS: &str = "GET, POST, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, Payment-Signature, X-Payment";

/// Extract the client IP as reported by the edge proxy.
pub fn client_ip(headers: &HeaderMap) -> String {
    if let Some(ip) = headers.get("cf-connecting-ip").and_then(|v| v.to_str().ok()) {
        return ip.trim().to_string();
    }
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        // First entry is the original client.
        if let Some(ip) = forwarded.split(',').next() {
            return ip.trim().to_string();
        }
    }
    if let Some(ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        return ip.trim().to_string();
    }
    "unknown".to_string()
}

fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert(
        "Access-Control-Allow-Origin",
        HeaderValue::from_static(ALLOW_ORIGIN),
    );
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        "Access-Control-Allow-Headers",
        HeaderValue::from_static(ALLOW_HEADERS),
    );
}

/// Answer preflight on any path with 204 and attach the CORS headers to
/// every other response.
pub async fn cors_middleware(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        let mut response = StatusCode::NO_CONTENT.into_response();
        apply_cors_headers(response.headers_mut());
        return response;
    }

    let mut response = next.run(request).await;
    apply_cors_headers(response.headers_mut());
    response
}

/// Per-client-IP hourly quota backed by the shared KV.
///
/// The counter key expires 3600 s after the first increment of a window; the
/// expiry is not renewed by later increments. A counter at the limit is not
/// incremented further. KV failures fail open: a counter outage must not
/// take scoring down.
#[derive(Clone)]
pub struct RateLimiter {
    kv: Arc<dyn KvStore>,
    limit: u32,
    bypass: HashSet<String>,
}

impl RateLimiter {
    pub fn new(kv: Arc<dyn KvStore>, limit: u32, bypass: impl IntoIterator<Item = String>) -> Self {
        Self {
            kv,
            limit,
            bypass: bypass.into_iter().collect(),
        }
    }

    /// True when the request may proceed. Consumes one permit on success.
    pub async fn check(&self, ip: &str) -> bool {
        if self.bypass.contains(ip) {
            debug!(ip = %ip, "Rate-limit bypass");
            return true;
        }

        let key = format!("ratelimit:{ip}");
        let count: u32 = match self.kv.get(&key).await {
            Ok(Some(raw)) => raw.parse().unwrap_or(0),
            Ok(None) => 0,
            Err(e) => {
                warn!(error = %e, ip = %ip, "Rate-counter read failed, allowing request");
                0
            }
        };

        if count >= self.limit {
            warn!(ip = %ip, count = count, "Rate limit exceeded");
            return false;
        }

        let ttl = if count == 0 {
            Some(Duration::from_secs(RATE_WINDOW_SECS))
        } else {
            None
        };
        if let Err(e) = self.kv.put(&key, (count + 1).to_string(), ttl).await {
            warn!(error = %e, ip = %ip, "Rate-counter write failed");
        }
        true
    }
}
