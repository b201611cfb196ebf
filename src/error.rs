use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use booth_raster::RasterError;
use serde_json::json;
use thiserror::Error;

use crate::models::media::{ALLOWED_EXTENSIONS, MAX_FILES, MAX_FILE_SIZE_MB};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("sessionId is required. Send it as query parameter or in request body.")]
    MissingSessionId,

    #[error(
        "Invalid sessionId format. Only alphanumeric characters, hyphens, and underscores are allowed (max 100 chars)."
    )]
    InvalidSessionId,

    #[error("No files uploaded.")]
    NoFiles,

    #[error("File {name} exceeds maximum size of {}MB.", MAX_FILE_SIZE_MB)]
    FileTooLarge { name: String },

    #[error("Too many files. Maximum is {} files per request.", MAX_FILES)]
    TooManyFiles,

    #[error("Invalid file type: {name}. Allowed types: {}", ALLOWED_EXTENSIONS.join(", "))]
    InvalidFileType { name: String },

    #[error("Upload error: {0}")]
    Multipart(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("API key is required. Provide it via X-API-Key header or apiKey query parameter.")]
    MissingApiKey,

    #[error("Invalid API key.")]
    InvalidApiKey,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    RateLimited(&'static str),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Payment gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Print error: {0}")]
    Print(#[from] PrintError),
}

/// Errors from the object storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage request failed: {0}")]
    Transport(String),

    #[error("Storage returned HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Invalid storage response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for StorageError {
    fn from(e: reqwest::Error) -> Self {
        StorageError::Transport(e.to_string())
    }
}

/// Errors from the QRIS payment gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Missing required environment variables: {}", .0.join(", "))]
    NotConfigured(Vec<&'static str>),

    #[error("{message}")]
    Http { status: u16, message: String },

    #[error("{message} (status code {status_code})")]
    Rejected {
        status_code: String,
        message: String,
    },

    #[error("Gateway request failed: {0}")]
    Transport(String),

    #[error("Invalid gateway response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            GatewayError::InvalidResponse(e.to_string())
        } else {
            GatewayError::Transport(e.to_string())
        }
    }
}

/// Errors from the receipt printer pipeline.
#[derive(Debug, Error)]
pub enum PrintError {
    #[error("Printing service not available (no printer device configured)")]
    Unavailable,

    #[error("Cannot open printer {device}: {source}")]
    Open {
        device: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write to printer: {0}")]
    Write(#[source] std::io::Error),

    #[error("Failed to close printer: {0}")]
    Close(#[source] std::io::Error),

    #[error("Invalid image: {0}")]
    Image(#[from] RasterError),

    #[error("Print task failed: {0}")]
    Task(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingSessionId
            | ApiError::InvalidSessionId
            | ApiError::NoFiles
            | ApiError::FileTooLarge { .. }
            | ApiError::TooManyFiles
            | ApiError::InvalidFileType { .. }
            | ApiError::Multipart(_)
            | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::MissingApiKey => StatusCode::UNAUTHORIZED,
            ApiError::InvalidApiKey => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Gateway(e) => match e {
                GatewayError::NotConfigured(_) => StatusCode::INTERNAL_SERVER_ERROR,
                GatewayError::Http { status, .. } => {
                    StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
                }
                GatewayError::Rejected { .. }
                | GatewayError::Transport(_)
                | GatewayError::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
            },
            ApiError::Print(e) => match e {
                PrintError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
                PrintError::Image(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Message shown to the client. Internal failures are not described.
    fn public_message(&self) -> String {
        match self {
            ApiError::Storage(_) => "Internal server error".to_string(),
            ApiError::Gateway(GatewayError::NotConfigured(_)) => {
                "Internal server error".to_string()
            }
            ApiError::Gateway(GatewayError::Http { message, .. }) => message.clone(),
            ApiError::Gateway(GatewayError::Rejected { message, .. }) => message.clone(),
            ApiError::Gateway(_) => "Payment gateway unavailable".to_string(),
            ApiError::Print(e) => e.to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "Request failed");
        }

        let message = self.public_message();
        let body = Json(json!({
            "success": false,
            "error": message,
            "message": message,
        }));

        (status, body).into_response()
    }
}
