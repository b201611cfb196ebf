//! Header parsing utilities for booth API requests.

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request};
use std::net::SocketAddr;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Extension trait for convenient header parsing.
pub trait HeaderMapExt {
    /// Get a header value as a string, returning None if missing.
    fn get_str(&self, name: &str) -> Option<&str>;

    /// Get a trimmed, non-empty header value.
    fn get_non_empty(&self, name: &str) -> Option<&str>;

    /// First address of `X-Forwarded-For`, the original client behind proxies.
    fn forwarded_client(&self) -> Option<&str>;
}

impl HeaderMapExt for HeaderMap {
    fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|v| v.to_str().ok())
    }

    fn get_non_empty(&self, name: &str) -> Option<&str> {
        self.get_str(name).map(str::trim).filter(|v| !v.is_empty())
    }

    fn forwarded_client(&self) -> Option<&str> {
        self.get_str(FORWARDED_FOR_HEADER)
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

/// Key identifying the client of a request for rate limiting.
///
/// The socket peer, or `"unknown"` when the connection address is not
/// available. With `trust_proxy` the first `X-Forwarded-For` hop wins.
pub fn client_key<B>(request: &Request<B>, trust_proxy: bool) -> String {
    if trust_proxy {
        if let Some(forwarded) = request.headers().forwarded_client() {
            return forwarded.to_string();
        }
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
