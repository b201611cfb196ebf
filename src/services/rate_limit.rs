//! Fixed-window request limiter keyed by client address.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Number of tracked clients above which expired windows are purged
const PURGE_THRESHOLD: usize = 10_000;

/// Result of counting one request against the limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32, reset_after: Duration },
    Limited { reset_after: Duration },
}

struct Window {
    started: Instant,
    hits: u32,
}

/// Allows `max_requests` per client per `window`.
pub struct RateLimiter {
    window: Duration,
    max_requests: u32,
    message: &'static str,
    clients: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32, message: &'static str) -> Self {
        Self {
            window,
            max_requests,
            message,
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Message returned to limited clients
    pub fn message(&self) -> &'static str {
        self.message
    }

    /// Count a request from `client`.
    pub fn check(&self, client: &str) -> RateDecision {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: &str, now: Instant) -> RateDecision {
        let mut clients = match self.clients.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if clients.len() > PURGE_THRESHOLD {
            let window = self.window;
            clients.retain(|_, w| now.duration_since(w.started) < window);
        }

        let entry = clients.entry(client.to_string()).or_insert(Window {
            started: now,
            hits: 0,
        });
        if now.duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.hits = 0;
        }

        let reset_after = self.window.saturating_sub(now.duration_since(entry.started));
        if entry.hits >= self.max_requests {
            return RateDecision::Limited { reset_after };
        }
        entry.hits += 1;
        RateDecision::Allowed {
            remaining: self.max_requests - entry.hits,
            reset_after,
        }
    }
}
