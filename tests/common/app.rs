//! Test application factory for integration tests.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use receiptbooth::models::AppConfig;
use receiptbooth::server::{build_router, AppState, Backends};
use receiptbooth::services::{
    signature, CaptureTransport, DuitkuGateway, InMemoryLedger, InMemoryStore, PaymentBoard,
    PrinterTransport,
};

use super::fixtures::MultipartBody;

pub const BUCKET: &str = "test-bucket";
pub const MERCHANT_CODE: &str = "D0001";
pub const GATEWAY_KEY: &str = "gateway-secret";
pub const PUBLIC_BASE_URL: &str = "https://booth.example";
pub const INQUIRY_PATH: &str = "/webapi/api/merchant/v2/inquiry";

/// Test application with router and direct access to backends
pub struct TestApp {
    router: axum::Router,
    pub store: Arc<InMemoryStore>,
    pub printer: CaptureTransport,
    pub board: Arc<PaymentBoard>,
    /// Stand-in for the payment gateway
    pub gateway: MockServer,
}

impl TestApp {
    /// Create a test application with a printer attached
    pub async fn new() -> Self {
        Self::build(|_| {}, true).await
    }

    /// Create a test application after adjusting the default config
    pub async fn with_config(configure: impl FnOnce(&mut AppConfig)) -> Self {
        Self::build(configure, true).await
    }

    /// Create a test application without a printer
    pub async fn without_printer() -> Self {
        Self::build(|_| {}, false).await
    }

    async fn build(configure: impl FnOnce(&mut AppConfig), attach_printer: bool) -> Self {
        let gateway = MockServer::start().await;

        let mut config = AppConfig::default();
        config.payment.merchant_code = Some(MERCHANT_CODE.to_string());
        config.payment.api_key = Some(GATEWAY_KEY.to_string());
        config.payment.base_url = Some(gateway.uri());
        config.payment.public_base_url = Some(PUBLIC_BASE_URL.to_string());
        configure(&mut config);

        let store = Arc::new(InMemoryStore::new(BUCKET));
        let printer = CaptureTransport::new();
        let transport: Option<Arc<dyn PrinterTransport>> = if attach_printer {
            Some(Arc::new(printer.clone()))
        } else {
            None
        };
        let duitku = DuitkuGateway::new(config.payment.clone(), config.upstream_timeout())
            .expect("Failed to create gateway client");

        let state = AppState::new(
            config,
            Backends {
                store: store.clone(),
                gateway: Arc::new(duitku),
                ledger: Arc::new(InMemoryLedger::new()),
                printer: transport,
            },
        );
        let board = state.board.clone();

        // Build router using shared server module (same as production)
        let router = build_router(state);

        Self {
            router,
            store,
            printer,
            board,
            gateway,
        }
    }

    /// Make the gateway accept inquiries with the given QR payload and reference
    pub async fn mock_gateway_success(&self, qr_string: &str, reference: &str) {
        Mock::given(method("POST"))
            .and(path(INQUIRY_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "merchantCode": MERCHANT_CODE,
                "reference": reference,
                "paymentUrl": format!("https://pay.example/{reference}"),
                "qrString": qr_string,
                "amount": "50000",
                "statusCode": "00",
                "statusMessage": "SUCCESS"
            })))
            .mount(&self.gateway)
            .await;
    }

    /// Make the gateway answer every inquiry with `status` and `body`
    pub async fn mock_gateway_response(&self, status: u16, body: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path(INQUIRY_PATH))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&self.gateway)
            .await;
    }

    /// Callback body as the gateway would send it, correctly signed
    pub fn signed_callback(order_id: &str, amount: &str, result_code: &str) -> serde_json::Value {
        json!({
            "merchantCode": MERCHANT_CODE,
            "merchantOrderId": order_id,
            "paymentAmount": amount,
            "resultCode": result_code,
            "reference": format!("REF-{order_id}"),
            "signature": signature::sign(MERCHANT_CODE, order_id, amount, GATEWAY_KEY),
        })
    }

    /// Make a GET request to the given path
    pub async fn get(&self, path: &str) -> TestResponse {
        self.get_with_headers(path, &[]).await
    }

    /// Make a GET request with custom headers
    pub async fn get_with_headers(&self, path: &str, headers: &[(&str, &str)]) -> TestResponse {
        let mut builder = Request::get(path);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        self.request(builder.body(Body::empty()).unwrap()).await
    }

    /// Make a POST request with JSON body
    pub async fn post_json(&self, path: &str, body: &serde_json::Value) -> TestResponse {
        self.post_raw(path, "application/json", body.to_string().into_bytes(), &[])
            .await
    }

    /// Make a POST request with a multipart body
    pub async fn post_multipart(
        &self,
        path: &str,
        form: MultipartBody,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let content_type = form.content_type();
        self.post_raw(path, &content_type, form.finish(), headers)
            .await
    }

    /// Make a POST request with an arbitrary body
    pub async fn post_raw(
        &self,
        path: &str,
        content_type: &str,
        body: Vec<u8>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::post(path).header("Content-Type", content_type);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        self.request(builder.body(Body::from(body)).unwrap()).await
    }

    /// Send a request to the router
    pub async fn request(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Request failed");

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes()
            .to_vec();

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

/// Test response with convenience methods
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    /// Parse body as JSON
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body).expect("Failed to parse JSON response")
    }

    /// Get body as string
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    /// Get a header value as string
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}
