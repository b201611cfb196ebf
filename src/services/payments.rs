//! Payment creation and gateway callback handling.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::ApiError;
use crate::models::payment::RESULT_SUCCESS;
use crate::models::{CallbackPayload, PaymentOrder, PaymentRecord, QrisPayment};
use crate::services::signature;
use crate::services::{OrderLedger, PaymentGateway};

/// Side effects run once per settled or failed order
#[async_trait]
pub trait PaymentListener: Send + Sync {
    async fn on_paid(&self, record: &PaymentRecord);

    async fn on_failed(&self, record: &PaymentRecord);
}

/// Latest known state of every order seen by the callback.
///
/// Kiosks poll it to find out whether printing may start.
pub struct PaymentBoard {
    records: Arc<RwLock<HashMap<String, PaymentRecord>>>,
}

impl PaymentBoard {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn get(&self, order_id: &str) -> Option<PaymentRecord> {
        let records = self.records.read().await;
        records.get(order_id).cloned()
    }

    async fn insert(&self, record: &PaymentRecord) {
        let mut records = self.records.write().await;
        records.insert(record.order_id.clone(), record.clone());
    }
}

impl Default for PaymentBoard {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentListener for PaymentBoard {
    async fn on_paid(&self, record: &PaymentRecord) {
        self.insert(record).await;
    }

    async fn on_failed(&self, record: &PaymentRecord) {
        self.insert(record).await;
    }
}

/// What the callback handler did with a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackOutcome {
    Paid,
    Failed,
    /// Order was already processed; nothing happened
    Duplicate,
    /// Processing failed internally; acknowledged anyway
    Unprocessed,
}

/// Why a callback was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackRejection {
    /// Order id or result code missing
    MissingFields,
    /// No gateway API key configured to check the signature
    NotConfigured,
    InvalidSignature,
}

/// Coordinates the gateway, the order ledger and payment listeners.
pub struct PaymentService {
    gateway: Arc<dyn PaymentGateway>,
    ledger: Arc<dyn OrderLedger>,
    listener: Arc<dyn PaymentListener>,
    api_key: Option<String>,
}

impl PaymentService {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        ledger: Arc<dyn OrderLedger>,
        listener: Arc<dyn PaymentListener>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            gateway,
            ledger,
            listener,
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }

    /// Create a QRIS payment for a validated order.
    pub async fn create(&self, order: &PaymentOrder) -> Result<QrisPayment, ApiError> {
        if self.ledger.has_seen(&order.order_id).await? {
            return Err(ApiError::BadRequest(
                "orderId has already been used".to_string(),
            ));
        }

        tracing::info!(
            order_id = %order.order_id,
            amount = %order.amount,
            "Create payment request"
        );
        Ok(self.gateway.create_qris(order).await?)
    }

    /// Process a gateway callback.
    ///
    /// `Err` is returned for callbacks that must be refused. Internal
    /// failures after the signature check are reported as `Ok` so the gateway
    /// does not keep redelivering.
    pub async fn handle_callback(
        &self,
        payload: &CallbackPayload,
    ) -> Result<CallbackOutcome, CallbackRejection> {
        let present = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());
        let (Some(order_id), Some(result_code)) = (
            present(&payload.merchant_order_id),
            present(&payload.result_code),
        ) else {
            tracing::warn!("Invalid callback data: missing required fields");
            return Err(CallbackRejection::MissingFields);
        };

        tracing::info!(%order_id, %result_code, "Payment callback received");

        let Some(api_key) = self.api_key.as_deref() else {
            tracing::error!("DUITKU_API_KEY not configured, cannot verify callback");
            return Err(CallbackRejection::NotConfigured);
        };

        if !signature::verify(payload, api_key) {
            tracing::warn!(%order_id, "Invalid callback signature");
            return Err(CallbackRejection::InvalidSignature);
        }

        match self.ledger.mark_seen(&order_id).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!(%order_id, "Transaction already processed");
                return Ok(CallbackOutcome::Duplicate);
            }
            Err(e) => {
                tracing::error!(%order_id, error = %e, "Order ledger unavailable");
                return Ok(CallbackOutcome::Unprocessed);
            }
        }

        let record = PaymentRecord::from_callback(&order_id, &result_code, payload);
        if result_code == RESULT_SUCCESS {
            tracing::info!(%order_id, amount = ?record.amount, "Payment successful");
            self.listener.on_paid(&record).await;
            Ok(CallbackOutcome::Paid)
        } else {
            tracing::info!(%order_id, %result_code, "Payment failed");
            self.listener.on_failed(&record).await;
            Ok(CallbackOutcome::Failed)
        }
    }
}
