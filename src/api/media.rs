use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use crate::error::ApiError;
use crate::models::media::MAX_FILES;
use crate::models::{IncomingFile, SessionAsset, SessionId, UploadedAsset};
use crate::services::MediaService;

/// Multipart text field carrying the session id
const SESSION_FIELD: &str = "sessionId";

/// Session id query parameter
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct SessionQuery {
    /// Booth session id (letters, digits, `-`, `_`; at most 100 chars)
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Response of a successful upload
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub session_id: String,
    /// Download base of the storage bucket
    pub bucket_url: String,
    pub count: usize,
    /// Stored files; the generated GIF comes last when one was produced
    pub files: Vec<UploadedAsset>,
}

/// Stored assets of a session
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ViewResponse {
    pub success: bool,
    pub session_id: String,
    pub bucket_url: String,
    pub count: usize,
    /// Photos ordered by index, GIF last
    pub files: Vec<SessionAsset>,
}

/// Body returned when a session has no stored assets
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmptySessionResponse {
    pub success: bool,
    pub message: String,
    pub session_id: String,
    pub files: Vec<SessionAsset>,
}

/// Upload session media
///
/// Accepts any number of file parts (up to 10) under any field name. The
/// session id comes from the query string or a `sessionId` text field. When
/// more than one still photo is uploaded, an animated GIF of the session is
/// generated and stored next to them.
#[utoipa::path(
    post,
    path = "/upload",
    params(
        SessionQuery,
        ("X-API-Key" = Option<String>, Header, description = "API key (or `apiKey` query parameter)"),
    ),
    request_body(content_type = "multipart/form-data", description = "Photo and video files"),
    responses(
        (status = 200, description = "Files stored", body = UploadResponse),
        (status = 400, description = "Invalid session id or files"),
        (status = 401, description = "API key missing"),
        (status = 403, description = "API key invalid"),
        (status = 429, description = "Too many uploads from this client"),
    ),
    tag = "Media"
)]
pub async fn handle_upload(
    State(media): State<Arc<MediaService>>,
    Query(query): Query<SessionQuery>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut files = Vec::new();
    let mut form_session: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Multipart(e.body_text()))?
    {
        let field_name = field.name().unwrap_or_default().to_string();

        let Some(filename) = field.file_name().map(str::to_string) else {
            if field_name == SESSION_FIELD {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::Multipart(e.body_text()))?;
                form_session = Some(value);
            }
            continue;
        };

        if files.len() == MAX_FILES {
            return Err(ApiError::TooManyFiles);
        }

        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::Multipart(e.body_text()))?;

        files.push(IncomingFile::new(field_name, filename, content_type, bytes)?);
    }

    let session = session_from(query.session_id.or(form_session), ApiError::MissingSessionId)?;
    if files.is_empty() {
        return Err(ApiError::NoFiles);
    }

    tracing::info!(session_id = %session, files = files.len(), "Upload request");
    let outcome = media.upload(&session, files).await?;

    Ok(Json(UploadResponse {
        success: true,
        session_id: session.to_string(),
        bucket_url: outcome.bucket_url,
        count: outcome.files.len(),
        files: outcome.files,
    }))
}

/// List session media
///
/// Returns every stored asset of a session with its public URL.
#[utoipa::path(
    get,
    path = "/view",
    params(SessionQuery),
    responses(
        (status = 200, description = "Session assets", body = ViewResponse),
        (status = 400, description = "Missing or invalid session id"),
        (status = 404, description = "No files for this session", body = EmptySessionResponse),
        (status = 429, description = "Too many requests from this client"),
    ),
    tag = "Media"
)]
pub async fn handle_view(
    State(media): State<Arc<MediaService>>,
    Query(query): Query<SessionQuery>,
) -> Result<Response, ApiError> {
    let session = session_from(
        query.session_id,
        ApiError::BadRequest("sessionId is required as query parameter.".to_string()),
    )?;

    let files = media.list(&session).await?;
    if files.is_empty() {
        let body = EmptySessionResponse {
            success: false,
            message: "No files found for this sessionId".to_string(),
            session_id: session.to_string(),
            files,
        };
        return Ok((StatusCode::NOT_FOUND, Json(body)).into_response());
    }

    tracing::debug!(session_id = %session, count = files.len(), "Listed session media");
    Ok(Json(ViewResponse {
        success: true,
        session_id: session.to_string(),
        bucket_url: media.bucket_url(),
        count: files.len(),
        files,
    })
    .into_response())
}

fn session_from(raw: Option<String>, missing: ApiError) -> Result<SessionId, ApiError> {
    let raw = raw.filter(|s| !s.is_empty()).ok_or(missing)?;
    SessionId::parse(&raw).ok_or(ApiError::InvalidSessionId)
}
