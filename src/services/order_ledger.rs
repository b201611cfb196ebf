use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::ApiError;

/// Trait for remembering which payment orders have been processed
#[async_trait]
pub trait OrderLedger: Send + Sync {
    /// Whether the order has already been processed
    async fn has_seen(&self, order_id: &str) -> Result<bool, ApiError>;

    /// Mark the order as processed.
    ///
    /// Returns `true` if this call marked it, `false` if it was already
    /// marked. Check and mark happen atomically.
    async fn mark_seen(&self, order_id: &str) -> Result<bool, ApiError>;
}

/// Process-lifetime order ledger. Contents are lost on restart.
pub struct InMemoryLedger {
    seen: Arc<RwLock<HashSet<String>>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            seen: Arc::new(RwLock::new(HashSet::new())),
        }
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderLedger for InMemoryLedger {
    async fn has_seen(&self, order_id: &str) -> Result<bool, ApiError> {
        let seen = self.seen.read().await;
        Ok(seen.contains(order_id))
    }

    async fn mark_seen(&self, order_id: &str) -> Result<bool, ApiError> {
        let mut seen = self.seen.write().await;
        Ok(seen.insert(order_id.to_string()))
    }
}
