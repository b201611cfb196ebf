//! HTTP server setup and configuration.
//!
//! This module provides the router and application state used by both
//! the production server and integration tests.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS},
        HeaderName, HeaderValue, Method, StatusCode,
    },
    middleware,
    response::{Json, Response},
    routing::{get, post},
    Router,
};
use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use booth_raster::GifCompositor;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::api::headers::API_KEY_HEADER;
use crate::api::{self, ApiKeyGuard, ClientLimit, SessionQuery};
use crate::error::ApiError;
use crate::models::media::{MAX_FILES, MAX_FILE_SIZE};
use crate::models::{
    AppConfig, CreatePaymentRequest, CreatePaymentResponse, PaymentRecord, ServerConfig,
};
use crate::services::{
    DeviceFileTransport, DuitkuGateway, FirebaseStore, InMemoryLedger, InMemoryStore,
    MediaService, ObjectStore, OrderLedger, PaymentBoard, PaymentGateway, PaymentService,
    PrintService, PrinterTransport, RateLimiter,
};

pub const UPLOAD_LIMIT_MESSAGE: &str =
    "Too many upload requests from this IP, please try again later.";
pub const VIEW_LIMIT_MESSAGE: &str = "Too many requests from this IP, please try again later.";

const JSON_BODY_LIMIT: usize = 10 * 1024 * 1024;
/// Room for the maximum number of files plus multipart framing
const UPLOAD_BODY_LIMIT: usize = MAX_FILES * MAX_FILE_SIZE + 1024 * 1024;
const PRINT_BODY_LIMIT: usize = MAX_FILE_SIZE + 1024 * 1024;

const CROSS_ORIGIN_RESOURCE_POLICY: HeaderName =
    HeaderName::from_static("cross-origin-resource-policy");

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub media: Arc<MediaService>,
    pub payments: Arc<PaymentService>,
    pub board: Arc<PaymentBoard>,
    pub printer: Arc<PrintService>,
    pub upload_limiter: Arc<RateLimiter>,
    pub view_limiter: Arc<RateLimiter>,
}

/// External systems the server talks to.
pub struct Backends {
    pub store: Arc<dyn ObjectStore>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub ledger: Arc<dyn OrderLedger>,
    pub printer: Option<Arc<dyn PrinterTransport>>,
}

impl AppState {
    /// Assemble the services around the given backends.
    pub fn new(config: AppConfig, backends: Backends) -> Self {
        let board = Arc::new(PaymentBoard::new());
        let payments = Arc::new(PaymentService::new(
            backends.gateway,
            backends.ledger,
            board.clone(),
            config.payment.api_key.clone(),
        ));
        let media = Arc::new(MediaService::new(backends.store, GifCompositor::default()));
        let printer = Arc::new(PrintService::new(backends.printer, config.printer.width));

        let window = Duration::from_secs(config.server.rate_limit_window_secs);
        let upload_limiter = Arc::new(RateLimiter::new(
            window,
            config.server.upload_rate_limit,
            UPLOAD_LIMIT_MESSAGE,
        ));
        let view_limiter = Arc::new(RateLimiter::new(
            window,
            config.server.view_rate_limit,
            VIEW_LIMIT_MESSAGE,
        ));

        Self {
            config: Arc::new(config),
            media,
            payments,
            board,
            printer,
            upload_limiter,
            view_limiter,
        }
    }
}

/// Create application state with production backends.
pub fn create_app_state(config: AppConfig) -> anyhow::Result<AppState> {
    let timeout = config.upstream_timeout();

    let store: Arc<dyn ObjectStore> = match &config.storage.bucket {
        Some(bucket) => Arc::new(
            FirebaseStore::new(
                &config.storage.api_base,
                bucket.clone(),
                config.storage.access_token.clone(),
                timeout,
            )
            .map_err(|e| anyhow::anyhow!("Failed to create storage client: {e}"))?,
        ),
        None => {
            tracing::warn!("FIREBASE_BUCKET not set, storing uploads in memory");
            Arc::new(InMemoryStore::default())
        }
    };

    let gateway = Arc::new(
        DuitkuGateway::new(config.payment.clone(), timeout)
            .map_err(|e| anyhow::anyhow!("Failed to create payment gateway client: {e}"))?,
    );
    if let Err(e) = config.payment.validate() {
        tracing::warn!(%e, "Payment gateway not fully configured");
    }

    let printer: Option<Arc<dyn PrinterTransport>> = match &config.printer.device {
        Some(path) => {
            tracing::info!(device = %path.display(), "Receipt printer configured");
            Some(Arc::new(DeviceFileTransport::new(path)))
        }
        None => {
            tracing::info!("PRINTER_DEVICE not set, printing disabled");
            None
        }
    };

    if config.server.api_key.is_none() {
        tracing::warn!("API_KEY not set, uploads are not authenticated");
    }

    Ok(AppState::new(
        config,
        Backends {
            store,
            gateway,
            ledger: Arc::new(InMemoryLedger::new()),
            printer,
        },
    ))
}

/// Build the API router with all endpoints and middleware.
///
/// This is the core router used by both production and tests.
pub fn build_router(state: AppState) -> Router {
    let api_key = ApiKeyGuard::new(state.config.server.api_key.clone());
    let cors = cors_layer(&state.config.server);

    let trust_proxy = state.config.server.trust_proxy;
    let upload_limit = ClientLimit::new(state.upload_limiter.clone(), trust_proxy);
    let view_limit = ClientLimit::new(state.view_limiter.clone(), trust_proxy);

    // Route layers run bottom-up: authentication before the upload limiter
    let upload = Router::new()
        .route("/upload", post(handle_upload))
        .route_layer(middleware::from_fn_with_state(upload_limit, api::rate_limit))
        .route_layer(middleware::from_fn_with_state(api_key, api::require_api_key))
        .route_layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT));
    let view = Router::new()
        .route("/view", get(handle_view))
        .route_layer(middleware::from_fn_with_state(view_limit, api::rate_limit));
    let print_image = Router::new()
        .route("/print/image", post(handle_print_image))
        .route_layer(DefaultBodyLimit::max(PRINT_BODY_LIMIT));

    Router::new()
        // Media
        .merge(upload)
        .merge(view)
        // Payment
        .route("/api/payment/qris", post(handle_create_payment))
        .route("/api/payment/callback", post(handle_callback))
        .route("/api/payment/status/:order_id", get(handle_payment_status))
        // Printing
        .route("/print", post(handle_print_text))
        .merge(print_image)
        // Health check
        .route("/health", get(|| async { "OK" }))
        // Add state and tracing
        .with_state(state)
        .layer(DefaultBodyLimit::max(JSON_BODY_LIMIT))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::if_not_present(
            X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            CROSS_ORIGIN_RESOURCE_POLICY,
            HeaderValue::from_static("cross-origin"),
        ))
}

/// CORS for the kiosk frontend. Credentials are allowed, so "any origin"
/// mirrors the request origin instead of answering `*`.
fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origin = if config.allows_any_origin() {
        AllowOrigin::mirror_request()
    } else {
        let origins = config.cors_origins();
        tracing::info!(origins = ?origins, "CORS restricted to configured origins");
        AllowOrigin::list(
            origins
                .iter()
                .filter_map(|o| HeaderValue::from_str(o).ok()),
        )
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            HeaderName::from_static(API_KEY_HEADER),
            CONTENT_TYPE,
            AUTHORIZATION,
        ])
        .allow_credentials(true)
}

// Wrapper handlers to extract state components for the underlying API handlers

async fn handle_upload(
    State(state): State<AppState>,
    query: Query<SessionQuery>,
    multipart: Multipart,
) -> Result<Json<api::UploadResponse>, ApiError> {
    api::handle_upload(State(state.media), query, multipart).await
}

async fn handle_view(
    State(state): State<AppState>,
    query: Query<SessionQuery>,
) -> Result<Response, ApiError> {
    api::handle_view(State(state.media), query).await
}

async fn handle_create_payment(
    State(state): State<AppState>,
    body: Result<Json<CreatePaymentRequest>, JsonRejection>,
) -> Result<Json<CreatePaymentResponse>, ApiError> {
    api::handle_create_payment(State(state.payments), body).await
}

async fn handle_callback(
    State(state): State<AppState>,
    body: Bytes,
) -> (StatusCode, &'static str) {
    api::handle_callback(State(state.payments), body).await
}

async fn handle_payment_status(
    State(state): State<AppState>,
    path: Path<String>,
) -> Result<Json<PaymentRecord>, ApiError> {
    api::handle_payment_status(State(state.board), path).await
}

async fn handle_print_text(
    State(state): State<AppState>,
    body: Result<Json<api::PrintTextRequest>, JsonRejection>,
) -> Result<Json<api::PrintTextResponse>, ApiError> {
    api::handle_print_text(State(state.printer), body).await
}

async fn handle_print_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<api::PrintImageResponse>, ApiError> {
    api::handle_print_image(State(state.printer), multipart).await
}
