//! Duitku request and callback signatures.
//!
//! A signature is the lowercase hex MD5 of
//! `merchantCode + merchantOrderId + amount + apiKey`, concatenated without
//! separators.

use crate::models::CallbackPayload;

/// Compute the signature for a payment request or callback.
pub fn sign(merchant_code: &str, order_id: &str, amount: &str, api_key: &str) -> String {
    let input = format!("{merchant_code}{order_id}{amount}{api_key}");
    format!("{:x}", md5::compute(input.as_bytes()))
}

/// Check a callback's signature against the configured API key.
///
/// Returns `false` when any field needed for the check is missing or empty.
pub fn verify(callback: &CallbackPayload, api_key: &str) -> bool {
    fn field(v: &Option<String>) -> Option<&str> {
        v.as_deref().filter(|s| !s.is_empty())
    }

    let (Some(merchant_code), Some(order_id), Some(amount), Some(signature)) = (
        field(&callback.merchant_code),
        field(&callback.merchant_order_id),
        field(&callback.payment_amount),
        field(&callback.signature),
    ) else {
        return false;
    };

    sign(merchant_code, order_id, amount, api_key) == signature
}
