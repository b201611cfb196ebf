use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Multipart, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::services::{PrintService, MAX_COPIES};

const QUANTITY_FIELD: &str = "quantity";

/// Text receipt to print
#[derive(Debug, Deserialize, ToSchema)]
pub struct PrintTextRequest {
    #[serde(default)]
    pub text: Option<String>,
}

/// Result of a text print
#[derive(Debug, Serialize, ToSchema)]
pub struct PrintTextResponse {
    /// Always "OK"
    pub status: String,
    pub message: String,
}

/// Result of an image print
#[derive(Debug, Serialize, ToSchema)]
pub struct PrintImageResponse {
    pub success: bool,
    pub message: String,
}

/// Print a text receipt
#[utoipa::path(
    post,
    path = "/print",
    request_body = PrintTextRequest,
    responses(
        (status = 200, description = "Receipt printed", body = PrintTextResponse),
        (status = 400, description = "Text missing"),
        (status = 500, description = "Printer could not be opened or written"),
        (status = 503, description = "No printer configured"),
    ),
    tag = "Print"
)]
pub async fn handle_print_text(
    State(printer): State<Arc<PrintService>>,
    body: Result<Json<PrintTextRequest>, JsonRejection>,
) -> Result<Json<PrintTextResponse>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let text = request
        .text
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Text is required".to_string()))?;

    printer.print_text(text).await?;

    Ok(Json(PrintTextResponse {
        status: "OK".to_string(),
        message: "Printed".to_string(),
    }))
}

/// Print a photo
///
/// Takes the first file part of a multipart body (any field name), dithers it
/// for the thermal head and prints it `quantity` times (1 to 10, default 1).
#[utoipa::path(
    post,
    path = "/print/image",
    request_body(content_type = "multipart/form-data", description = "Image file and optional quantity field"),
    responses(
        (status = 200, description = "Image printed", body = PrintImageResponse),
        (status = 400, description = "No image, undecodable image or invalid quantity"),
        (status = 500, description = "Printer could not be opened or written"),
        (status = 503, description = "No printer configured"),
    ),
    tag = "Print"
)]
pub async fn handle_print_image(
    State(printer): State<Arc<PrintService>>,
    mut multipart: Multipart,
) -> Result<Json<PrintImageResponse>, ApiError> {
    let mut image: Option<Bytes> = None;
    let mut quantity: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Multipart(e.body_text()))?
    {
        if field.file_name().is_some() {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::Multipart(e.body_text()))?;
            // Only the first file is printed
            image.get_or_insert(bytes);
        } else if field.name() == Some(QUANTITY_FIELD) {
            quantity = Some(
                field
                    .text()
                    .await
                    .map_err(|e| ApiError::Multipart(e.body_text()))?,
            );
        }
    }

    let image = image.ok_or_else(|| ApiError::BadRequest("No photo uploaded".to_string()))?;
    let copies = parse_quantity(quantity.as_deref())?;

    tracing::info!(copies, bytes = image.len(), "Print image request");
    printer.print_image(image, copies).await?;

    Ok(Json(PrintImageResponse {
        success: true,
        message: "Printed successfully".to_string(),
    }))
}

/// Number of copies; blank means one.
fn parse_quantity(raw: Option<&str>) -> Result<u8, ApiError> {
    let Some(raw) = raw.map(str::trim).filter(|q| !q.is_empty()) else {
        return Ok(1);
    };
    raw.parse::<u8>()
        .ok()
        .filter(|q| (1..=MAX_COPIES).contains(q))
        .ok_or_else(|| {
            ApiError::BadRequest(format!("quantity must be between 1 and {MAX_COPIES}"))
        })
}
