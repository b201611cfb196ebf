use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Json,
};
use std::sync::Arc;

use crate::error::ApiError;
use crate::models::{CallbackPayload, CreatePaymentRequest, CreatePaymentResponse, PaymentRecord};
use crate::services::{CallbackRejection, PaymentBoard, PaymentService};

/// Create a QRIS payment
///
/// Registers the order with the payment gateway and returns the QRIS payload
/// the kiosk renders as a QR code.
#[utoipa::path(
    post,
    path = "/api/payment/qris",
    request_body = CreatePaymentRequest,
    responses(
        (status = 200, description = "Payment created", body = CreatePaymentResponse),
        (status = 400, description = "Invalid amount or orderId, or orderId already used"),
        (status = 500, description = "Gateway not configured"),
        (status = 502, description = "Gateway rejected the payment or was unreachable"),
    ),
    tag = "Payment"
)]
pub async fn handle_create_payment(
    State(payments): State<Arc<PaymentService>>,
    body: Result<Json<CreatePaymentRequest>, JsonRejection>,
) -> Result<Json<CreatePaymentResponse>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let order = request.validate()?;

    let payment = payments.create(&order).await.inspect_err(|e| {
        tracing::error!(order_id = %order.order_id, error = %e, "Create payment error")
    })?;

    Ok(Json(CreatePaymentResponse {
        success: true,
        qr_string: payment.qr_string,
        reference: payment.reference,
    }))
}

/// Payment gateway callback
///
/// Called by the gateway when a payment settles or fails. Answers with the
/// plain-text token `OK` once the notification is accepted, including for
/// repeated deliveries of an already processed order.
#[utoipa::path(
    post,
    path = "/api/payment/callback",
    request_body = CallbackPayload,
    responses(
        (status = 200, description = "Notification accepted", body = String, content_type = "text/plain"),
        (status = 400, description = "Missing fields or invalid signature", body = String, content_type = "text/plain"),
        (status = 500, description = "Gateway key not configured", body = String, content_type = "text/plain"),
    ),
    tag = "Payment"
)]
pub async fn handle_callback(
    State(payments): State<Arc<PaymentService>>,
    body: Bytes,
) -> (StatusCode, &'static str) {
    let payload: CallbackPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!(error = %e, "Unreadable callback body");
            CallbackPayload::default()
        }
    };

    match payments.handle_callback(&payload).await {
        Ok(outcome) => {
            tracing::debug!(?outcome, "Callback handled");
            (StatusCode::OK, "OK")
        }
        Err(CallbackRejection::MissingFields) => (StatusCode::BAD_REQUEST, "Invalid callback data"),
        Err(CallbackRejection::NotConfigured) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "Server configuration error")
        }
        Err(CallbackRejection::InvalidSignature) => (StatusCode::BAD_REQUEST, "Invalid signature"),
    }
}

/// Payment status
///
/// Final state of an order as reported by the gateway callback.
#[utoipa::path(
    get,
    path = "/api/payment/status/{order_id}",
    params(("order_id" = String, Path, description = "Merchant order id")),
    responses(
        (status = 200, description = "Order settled or failed", body = PaymentRecord),
        (status = 404, description = "No callback received for this order"),
    ),
    tag = "Payment"
)]
pub async fn handle_payment_status(
    State(board): State<Arc<PaymentBoard>>,
    Path(order_id): Path<String>,
) -> Result<Json<PaymentRecord>, ApiError> {
    board
        .get(order_id.trim())
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No payment status for order {order_id}")))
}
