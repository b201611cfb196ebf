//! Duitku QRIS payment gateway client.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use crate::error::GatewayError;
use crate::models::payment::RESULT_SUCCESS;
use crate::models::{GatewayCredentials, PaymentConfig, PaymentOrder, QrisPayment};
use crate::services::signature;

/// Payment method code for ShopeePay QRIS
const PAYMENT_METHOD_QRIS: &str = "SP";
const PRODUCT_DETAILS: &str = "Receipt Photobooth";
const INQUIRY_PATH: &str = "/webapi/api/merchant/v2/inquiry";

/// Trait for creating QRIS payments
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_qris(&self, order: &PaymentOrder) -> Result<QrisPayment, GatewayError>;
}

/// Inquiry request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InquiryRequest<'a> {
    merchant_code: &'a str,
    payment_amount: &'a str,
    payment_method: &'a str,
    merchant_order_id: &'a str,
    product_details: &'a str,
    callback_url: String,
    return_url: String,
    signature: String,
}

/// Duitku merchant API client.
///
/// Credentials are validated per request, so a server without payment
/// settings still starts and reports the missing variables on use.
pub struct DuitkuGateway {
    client: reqwest::Client,
    config: PaymentConfig,
}

impl DuitkuGateway {
    pub fn new(config: PaymentConfig, timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, config })
    }

    fn inquiry<'a>(creds: &'a GatewayCredentials, order: &'a PaymentOrder) -> InquiryRequest<'a> {
        InquiryRequest {
            merchant_code: &creds.merchant_code,
            payment_amount: &order.amount,
            payment_method: PAYMENT_METHOD_QRIS,
            merchant_order_id: &order.order_id,
            product_details: PRODUCT_DETAILS,
            callback_url: format!("{}/api/payment/callback", creds.public_base_url),
            return_url: format!("{}/payment-success", creds.public_base_url),
            signature: signature::sign(
                &creds.merchant_code,
                &order.order_id,
                &order.amount,
                &creds.api_key,
            ),
        }
    }
}

#[async_trait]
impl PaymentGateway for DuitkuGateway {
    async fn create_qris(&self, order: &PaymentOrder) -> Result<QrisPayment, GatewayError> {
        let creds = self.config.validate()?;
        let payload = Self::inquiry(&creds, order);

        tracing::info!(
            order_id = %order.order_id,
            amount = %order.amount,
            "Creating QRIS payment"
        );

        let response = self
            .client
            .post(format!("{}{}", creds.base_url, INQUIRY_PATH))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body: serde_json::Value = response.json().await.unwrap_or_default();
            let message = body["statusMessage"]
                .as_str()
                .or_else(|| body["Message"].as_str())
                .map(str::to_string)
                .unwrap_or_else(|| format!("Gateway responded with HTTP {}", status.as_u16()));
            tracing::error!(
                order_id = %order.order_id,
                status = status.as_u16(),
                %message,
                "Gateway rejected inquiry"
            );
            return Err(GatewayError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let payment: QrisPayment = response.json().await?;
        if payment.status_code != RESULT_SUCCESS {
            let message = payment
                .status_message
                .clone()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "Payment creation failed".to_string());
            tracing::error!(
                order_id = %order.order_id,
                status_code = %payment.status_code,
                %message,
                "Gateway returned error status"
            );
            return Err(GatewayError::Rejected {
                status_code: payment.status_code,
                message,
            });
        }

        tracing::info!(
            order_id = %order.order_id,
            reference = %payment.reference,
            "Payment created"
        );
        Ok(payment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: &str) -> PaymentConfig {
        PaymentConfig {
            merchant_code: Some("D0001".to_string()),
            api_key: Some("secret".to_string()),
            base_url: Some(base_url.to_string()),
            public_base_url: Some("https://booth.example".to_string()),
        }
    }

    fn order() -> PaymentOrder {
        PaymentOrder {
            order_id: "ORDER-1".to_string(),
            amount: "50000".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_qris_sends_signed_inquiry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(INQUIRY_PATH))
            .and(body_partial_json(json!({
                "merchantCode": "D0001",
                "paymentAmount": "50000",
                "paymentMethod": "SP",
                "merchantOrderId": "ORDER-1",
                "productDetails": "Receipt Photobooth",
                "callbackUrl": "https://booth.example/api/payment/callback",
                "returnUrl": "https://booth.example/payment-success",
                "signature": signature::sign("D0001", "ORDER-1", "50000", "secret"),
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "merchantCode": "D0001",
                "reference": "DS1234",
                "paymentUrl": "https://pay.example/DS1234",
                "qrString": "00020101021226",
                "statusCode": "00",
                "statusMessage": "SUCCESS"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = DuitkuGateway::new(config(&server.uri()), Duration::from_secs(5)).unwrap();
        let payment = gateway.create_qris(&order()).await.unwrap();

        assert_eq!(payment.reference, "DS1234");
        assert_eq!(payment.qr_string, "00020101021226");
    }

    #[tokio::test]
    async fn test_non_success_status_code_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "statusCode": "01",
                "statusMessage": "Merchant not active"
            })))
            .mount(&server)
            .await;

        let gateway = DuitkuGateway::new(config(&server.uri()), Duration::from_secs(5)).unwrap();
        match gateway.create_qris(&order()).await {
            Err(GatewayError::Rejected {
                status_code,
                message,
            }) => {
                assert_eq!(status_code, "01");
                assert_eq!(message, "Merchant not active");
            }
            other => panic!("Expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_http_error_keeps_status_and_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "Message": "Wrong signature"
            })))
            .mount(&server)
            .await;

        let gateway = DuitkuGateway::new(config(&server.uri()), Duration::from_secs(5)).unwrap();
        match gateway.create_qris(&order()).await {
            Err(GatewayError::Http { status, message }) => {
                assert_eq!(status, 401);
                assert_eq!(message, "Wrong signature");
            }
            other => panic!("Expected Http, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_configuration() {
        let gateway = DuitkuGateway::new(PaymentConfig::default(), Duration::from_secs(5)).unwrap();
        let err = gateway.create_qris(&order()).await.unwrap_err();
        assert!(matches!(err, GatewayError::NotConfigured(ref m) if m.len() == 4));
    }

    #[tokio::test]
    async fn test_timeout_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let gateway =
            DuitkuGateway::new(config(&server.uri()), Duration::from_millis(50)).unwrap();
        let err = gateway.create_qris(&order()).await.unwrap_err();
        assert!(matches!(err, GatewayError::Transport(_)));
    }
}
