//! Request guards: API key authentication and per-client rate limits.

use axum::{
    extract::{Query, Request, State},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::headers::{client_key, HeaderMapExt, API_KEY_HEADER};
use crate::error::ApiError;
use crate::services::{RateDecision, RateLimiter};

const API_KEY_QUERY: &str = "apiKey";

const RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
const RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
const RATELIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

/// Server-side API key. `None` disables authentication.
#[derive(Clone)]
pub struct ApiKeyGuard {
    expected: Option<Arc<str>>,
}

impl ApiKeyGuard {
    pub fn new(expected: Option<String>) -> Self {
        Self {
            expected: expected.filter(|k| !k.is_empty()).map(Arc::from),
        }
    }

    /// Check the key supplied by a client.
    pub fn check(&self, provided: Option<&str>) -> Result<(), ApiError> {
        let Some(expected) = self.expected.as_deref() else {
            tracing::warn!("API_KEY not set, accepting request without authentication");
            return Ok(());
        };
        match provided {
            None => {
                tracing::warn!("Request without API key rejected");
                Err(ApiError::MissingApiKey)
            }
            Some(key) if key != expected => {
                tracing::warn!("Request with invalid API key rejected");
                Err(ApiError::InvalidApiKey)
            }
            Some(_) => Ok(()),
        }
    }
}

/// API key from the `X-API-Key` header, else the `apiKey` query parameter.
fn provided_key(request: &Request) -> Option<String> {
    if let Some(key) = request.headers().get_non_empty(API_KEY_HEADER) {
        return Some(key.to_string());
    }
    Query::<HashMap<String, String>>::try_from_uri(request.uri())
        .ok()
        .and_then(|Query(mut params)| params.remove(API_KEY_QUERY))
        .filter(|k| !k.is_empty())
}

/// Middleware rejecting requests without the server API key.
pub async fn require_api_key(
    State(guard): State<ApiKeyGuard>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    guard.check(provided_key(&request).as_deref())?;
    Ok(next.run(request).await)
}

/// State of the rate limit middleware: a limiter and how clients are keyed.
#[derive(Clone)]
pub struct ClientLimit {
    limiter: Arc<RateLimiter>,
    trust_proxy: bool,
}

impl ClientLimit {
    /// `trust_proxy` keys clients by `X-Forwarded-For` instead of the peer address.
    pub fn new(limiter: Arc<RateLimiter>, trust_proxy: bool) -> Self {
        Self {
            limiter,
            trust_proxy,
        }
    }
}

/// Middleware counting requests per client against a limiter.
pub async fn rate_limit(
    State(ClientLimit {
        limiter,
        trust_proxy,
    }): State<ClientLimit>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_key(&request, trust_proxy);
    match limiter.check(&client) {
        RateDecision::Allowed {
            remaining,
            reset_after,
        } => {
            let mut response = next.run(request).await;
            set_limit_headers(&mut response, limiter.max_requests(), remaining, reset_after);
            response
        }
        RateDecision::Limited { reset_after } => {
            tracing::warn!(%client, "Rate limit exceeded");
            let mut response = ApiError::RateLimited(limiter.message()).into_response();
            set_limit_headers(&mut response, limiter.max_requests(), 0, reset_after);
            response.headers_mut().insert(
                axum::http::header::RETRY_AFTER,
                HeaderValue::from(seconds_ceil(reset_after)),
            );
            response
        }
    }
}

fn set_limit_headers(response: &mut Response, limit: u32, remaining: u32, reset_after: Duration) {
    let headers = response.headers_mut();
    headers.insert(RATELIMIT_LIMIT, HeaderValue::from(limit));
    headers.insert(RATELIMIT_REMAINING, HeaderValue::from(remaining));
    headers.insert(
        RATELIMIT_RESET,
        HeaderValue::from(seconds_ceil(reset_after)),
    );
}

fn seconds_ceil(duration: Duration) -> u64 {
    duration.as_millis().div_ceil(1000) as u64
}
