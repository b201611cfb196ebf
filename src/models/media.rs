//! Uploaded and stored media assets.
//!
//! Every uploaded file is classified once, at ingestion, into a [`MediaKind`].
//! The kind decides the stored object name and whether the file can become a
//! frame of the session GIF.

use axum::body::Bytes;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use std::cmp::Ordering;
use std::path::Path;
use std::sync::OnceLock;
use utoipa::ToSchema;

use super::SessionId;
use crate::error::ApiError;

pub const MAX_FILE_SIZE_MB: usize = 10;
pub const MAX_FILE_SIZE: usize = MAX_FILE_SIZE_MB * 1024 * 1024;
pub const MAX_FILES: usize = 10;

pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
    "video/mp4",
];

pub const ALLOWED_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp", ".mp4"];

/// Marker used in object names and responses for the session animation.
pub const GIF_MARKER: &str = "gif";

/// Name of the server-generated GIF as reported to clients.
pub const GENERATED_GIF_FILENAME: &str = "generated.gif";

/// What an uploaded file is, decided from its form field and MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Still photo. `index` is the first number in the field name.
    Photo { index: Option<u64> },
    /// Animation supplied by the client (field name mentions "gif").
    Gif,
    /// Video clip, indexed like photos.
    Video { index: Option<u64> },
}

impl MediaKind {
    pub fn classify(field_name: &str, content_type: &str) -> Self {
        if field_name.to_lowercase().contains(GIF_MARKER) {
            return MediaKind::Gif;
        }
        let index = first_number(field_name);
        if content_type.starts_with("video/") {
            MediaKind::Video { index }
        } else {
            MediaKind::Photo { index }
        }
    }

    /// Index label used in object names and responses.
    ///
    /// Photos and videos without a number in their field name become `1`.
    pub fn label(&self) -> String {
        match self {
            MediaKind::Gif => GIF_MARKER.to_string(),
            MediaKind::Photo { index } | MediaKind::Video { index } => {
                index.unwrap_or(1).to_string()
            }
        }
    }
}

fn first_number(field_name: &str) -> Option<u64> {
    static DIGITS: OnceLock<Regex> = OnceLock::new();
    let digits = DIGITS.get_or_init(|| Regex::new(r"\d+").expect("valid digits regex"));
    digits
        .find(field_name)
        .and_then(|m| m.as_str().parse().ok())
}

/// Extension of `filename` including the dot, as written by the client.
pub fn extension_of(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default()
}

/// A file received in an upload request.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub field_name: String,
    pub filename: String,
    pub content_type: String,
    pub kind: MediaKind,
    pub bytes: Bytes,
}

impl IncomingFile {
    /// Validate and classify a multipart file part.
    pub fn new(
        field_name: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Bytes,
    ) -> Result<Self, ApiError> {
        let field_name = field_name.into();
        let filename = filename.into();
        let content_type = content_type.into();

        let ext = extension_of(&filename).to_lowercase();
        if !ALLOWED_MIME_TYPES.contains(&content_type.as_str())
            || !ALLOWED_EXTENSIONS.contains(&ext.as_str())
        {
            return Err(ApiError::InvalidFileType { name: filename });
        }
        if bytes.len() > MAX_FILE_SIZE {
            return Err(ApiError::FileTooLarge { name: filename });
        }

        let kind = MediaKind::classify(&field_name, &content_type);
        Ok(Self {
            field_name,
            filename,
            content_type,
            kind,
            bytes,
        })
    }

    /// Object name: `<session>-<index><ext>` or `<session>-gif<ext>`.
    pub fn object_name(&self, session: &SessionId) -> String {
        format!(
            "{}-{}{}",
            session,
            self.kind.label(),
            extension_of(&self.filename)
        )
    }

    /// Still image that may be used as a GIF frame.
    pub fn is_gif_frame(&self) -> bool {
        matches!(self.kind, MediaKind::Photo { .. })
            && self.content_type.starts_with("image/")
            && !self.content_type.contains(GIF_MARKER)
    }

    /// Frame order key: photos without an index sort last.
    fn frame_order(&self) -> u64 {
        match self.kind {
            MediaKind::Photo { index } | MediaKind::Video { index } => index.unwrap_or(u64::MAX),
            MediaKind::Gif => u64::MAX,
        }
    }
}

/// GIF frame candidates ordered by their field-name index.
pub fn gif_frames(files: &[IncomingFile]) -> Vec<&IncomingFile> {
    let mut frames: Vec<&IncomingFile> = files.iter().filter(|f| f.is_gif_frame()).collect();
    frames.sort_by_key(|f| f.frame_order());
    frames
}

/// One asset written during an upload.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadedAsset {
    /// File name as sent by the client
    pub filename: String,
    /// Stored object name
    pub uploaded_name: String,
    /// Public download URL
    pub url: String,
    /// Photo index or "gif"
    pub photo_index: String,
}

/// Object metadata as listed from storage.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub name: String,
    pub content_type: Option<String>,
    pub size: u64,
    pub time_created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
}

/// Position of a stored asset within its session, parsed from the object name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetIndex {
    Photo(u64),
    Gif,
    Unknown,
}

impl AssetIndex {
    pub fn from_object_name(name: &str) -> Self {
        static INDEX: OnceLock<Regex> = OnceLock::new();
        let pattern = INDEX.get_or_init(|| Regex::new(r"-(\d+|gif)\.").expect("valid index regex"));
        match pattern.captures(name).and_then(|c| c.get(1)) {
            Some(m) if m.as_str() == GIF_MARKER => AssetIndex::Gif,
            Some(m) => m
                .as_str()
                .parse()
                .map(AssetIndex::Photo)
                .unwrap_or(AssetIndex::Unknown),
            None => AssetIndex::Unknown,
        }
    }

    pub fn label(&self) -> Option<String> {
        match self {
            AssetIndex::Photo(n) => Some(n.to_string()),
            AssetIndex::Gif => Some(GIF_MARKER.to_string()),
            AssetIndex::Unknown => None,
        }
    }

    /// Numbered photos ascending, then unindexed objects, then the GIF.
    pub fn display_order(&self, other: &Self) -> Ordering {
        fn rank(index: &AssetIndex) -> (u8, u64) {
            match index {
                AssetIndex::Photo(n) => (0, *n),
                AssetIndex::Unknown => (1, 0),
                AssetIndex::Gif => (2, 0),
            }
        }
        rank(self).cmp(&rank(other))
    }
}

/// One asset in a session listing.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionAsset {
    pub name: String,
    pub url: String,
    /// Photo index, "gif", or null when the name carries neither
    pub photo_index: Option<String>,
    pub content_type: Option<String>,
    pub size: u64,
    pub time_created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
}
