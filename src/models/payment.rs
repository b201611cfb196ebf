//! Payment request, gateway and callback types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::error::ApiError;

pub const MAX_ORDER_ID_LEN: usize = 100;

/// Result code the gateway uses for a settled payment.
pub const RESULT_SUCCESS: &str = "00";

/// Request body for QRIS payment creation
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    /// Amount in rupiah, as a number or numeric string
    #[schema(value_type = f64, example = 50000)]
    #[serde(default)]
    pub amount: Value,
    /// Merchant order id, at most 100 characters
    #[schema(value_type = String, example = "ORDER-1")]
    #[serde(default)]
    pub order_id: Value,
}

/// A validated payment order.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentOrder {
    /// Trimmed order id
    pub order_id: String,
    /// Amount formatted the way it is signed and sent to the gateway
    pub amount: String,
}

impl CreatePaymentRequest {
    pub fn validate(&self) -> Result<PaymentOrder, ApiError> {
        if is_blank(&self.amount) || is_blank(&self.order_id) {
            return Err(ApiError::BadRequest(
                "amount and orderId are required".to_string(),
            ));
        }

        let amount = match &self.amount {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .filter(|a| a.is_finite() && *a > 0.0)
        .ok_or_else(|| ApiError::BadRequest("amount must be a positive number".to_string()))?;

        let order_id = match &self.order_id {
            Value::String(s) if !s.trim().is_empty() => s,
            _ => {
                return Err(ApiError::BadRequest(
                    "orderId must be a non-empty string".to_string(),
                ))
            }
        };
        if order_id.chars().count() > MAX_ORDER_ID_LEN {
            return Err(ApiError::BadRequest(format!(
                "orderId must be at most {MAX_ORDER_ID_LEN} characters"
            )));
        }

        Ok(PaymentOrder {
            order_id: order_id.trim().to_string(),
            amount: format_amount(amount),
        })
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        _ => false,
    }
}

/// Integral amounts are written without a fractional part (`50000`, not `50000.0`).
pub fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 && amount.abs() < 1e15 {
        format!("{}", amount as i64)
    } else {
        amount.to_string()
    }
}

/// Response to a successful payment creation
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentResponse {
    pub success: bool,
    /// QRIS payload to render as a QR code
    pub qr_string: String,
    /// Gateway reference for the transaction
    pub reference: String,
}

/// Payment as created by the gateway.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrisPayment {
    #[serde(default)]
    pub reference: String,
    #[serde(default)]
    pub qr_string: String,
    #[serde(default)]
    pub payment_url: Option<String>,
    #[serde(default)]
    pub status_code: String,
    #[serde(default)]
    pub status_message: Option<String>,
}

/// Notification posted by the gateway when a payment settles or fails.
///
/// All fields are optional so that malformed callbacks can be reported
/// instead of rejected by the extractor. Numeric fields are accepted as
/// numbers or strings.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CallbackPayload {
    #[serde(default, deserialize_with = "string_or_number")]
    pub merchant_code: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub merchant_order_id: Option<String>,
    #[serde(default, alias = "amount", deserialize_with = "string_or_number")]
    pub payment_amount: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub result_code: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub reference: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub signature: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Final state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Paid,
    Failed,
}

/// Entry on the payment status board.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub order_id: String,
    pub status: PaymentStatus,
    /// Settled amount reported by the gateway
    pub amount: Option<String>,
    /// Gateway result code
    pub result_code: String,
    pub reference: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentRecord {
    /// Build a record from a verified callback.
    pub fn from_callback(order_id: &str, result_code: &str, payload: &CallbackPayload) -> Self {
        let status = if result_code == RESULT_SUCCESS {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Failed
        };
        Self {
            order_id: order_id.to_string(),
            status,
            amount: payload.payment_amount.clone(),
            result_code: result_code.to_string(),
            reference: payload.reference.clone(),
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(body: Value) -> CreatePaymentRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_validate_accepts_number_and_trims() {
        let order = request(json!({"amount": 50000, "orderId": "  ORDER-1 "}))
            .validate()
            .unwrap();
        assert_eq!(
            order,
            PaymentOrder {
                order_id: "ORDER-1".to_string(),
                amount: "50000".to_string()
            }
        );
    }

    #[test]
    fn test_validate_accepts_numeric_string() {
        let order = request(json!({"amount": "15000.5", "orderId": "A"}))
            .validate()
            .unwrap();
        assert_eq!(order.amount, "15000.5");
    }

    #[test]
    fn test_validate_rejects_missing_fields() {
        assert!(request(json!({"orderId": "A"})).validate().is_err());
        assert!(request(json!({"amount": 10})).validate().is_err());
        assert!(request(json!({"amount": 0, "orderId": "A"})).validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_amount() {
        for amount in [json!(-5), json!("abc"), json!([1])] {
            let err = request(json!({"amount": amount, "orderId": "A"}))
                .validate()
                .unwrap_err();
            assert_eq!(err.to_string(), "amount must be a positive number");
        }
    }

    #[test]
    fn test_validate_rejects_bad_order_id() {
        let err = request(json!({"amount": 1, "orderId": 12}))
            .validate()
            .unwrap_err();
        assert_eq!(err.to_string(), "orderId must be a non-empty string");

        let err = request(json!({"amount": 1, "orderId": "   "}))
            .validate()
            .unwrap_err();
        assert_eq!(err.to_string(), "orderId must be a non-empty string");

        let long = "x".repeat(101);
        let err = request(json!({"amount": 1, "orderId": long}))
            .validate()
            .unwrap_err();
        assert_eq!(err.to_string(), "orderId must be at most 100 characters");
    }

    #[test]
    fn test_callback_accepts_numbers_and_amount_alias() {
        let payload: CallbackPayload = serde_json::from_value(json!({
            "merchantCode": "D1234",
            "merchantOrderId": "ORDER-1",
            "amount": 50000,
            "resultCode": "00",
            "signature": "abc"
        }))
        .unwrap();
        assert_eq!(payload.payment_amount.as_deref(), Some("50000"));
        assert_eq!(payload.result_code.as_deref(), Some("00"));
        assert!(payload.reference.is_none());
    }

    #[test]
    fn test_payment_record_serialization() {
        let payload = CallbackPayload {
            payment_amount: Some("50000".to_string()),
            ..Default::default()
        };
        let record = PaymentRecord::from_callback("ORDER-1", "01", &payload);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["orderId"], "ORDER-1");
        assert_eq!(value["status"], "failed");
        assert_eq!(value["resultCode"], "01");
        assert_eq!(value["amount"], "50000");

        let paid = PaymentRecord::from_callback("ORDER-2", RESULT_SUCCESS, &payload);
        assert_eq!(paid.status, PaymentStatus::Paid);
    }
}
