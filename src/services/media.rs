//! Session media: storing uploads, building the session GIF, listing assets.

use axum::body::Bytes;
use booth_raster::GifCompositor;
use std::sync::Arc;

use crate::error::{ApiError, StorageError};
use crate::models::media::{gif_frames, GENERATED_GIF_FILENAME, GIF_MARKER};
use crate::models::{AssetIndex, IncomingFile, SessionAsset, SessionId, UploadedAsset};
use crate::services::ObjectStore;

/// Result of storing one upload request.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    /// Stored files in request order, followed by the generated GIF if any
    pub files: Vec<UploadedAsset>,
    pub bucket_url: String,
}

pub struct MediaService {
    store: Arc<dyn ObjectStore>,
    compositor: Arc<GifCompositor>,
}

impl MediaService {
    pub fn new(store: Arc<dyn ObjectStore>, compositor: GifCompositor) -> Self {
        Self {
            store,
            compositor: Arc::new(compositor),
        }
    }

    pub fn bucket_url(&self) -> String {
        self.store.bucket_url()
    }

    /// Store every file of an upload and try to build the session GIF.
    ///
    /// A storage failure for any uploaded file fails the request. GIF
    /// problems are logged and leave the upload intact.
    pub async fn upload(
        &self,
        session: &SessionId,
        files: Vec<IncomingFile>,
    ) -> Result<UploadOutcome, ApiError> {
        if files.is_empty() {
            return Err(ApiError::NoFiles);
        }

        let uploads = files.iter().map(|file| self.store_file(session, file));
        let mut stored = futures_util::future::try_join_all(uploads).await?;

        let frames: Vec<Bytes> = gif_frames(&files)
            .into_iter()
            .map(|f| f.bytes.clone())
            .collect();
        if frames.len() > 1 {
            if let Some(gif) = self.store_gif(session, frames).await {
                stored.push(gif);
            }
        }

        tracing::info!(
            session_id = %session,
            count = stored.len(),
            "Upload complete"
        );

        Ok(UploadOutcome {
            files: stored,
            bucket_url: self.store.bucket_url(),
        })
    }

    async fn store_file(
        &self,
        session: &SessionId,
        file: &IncomingFile,
    ) -> Result<UploadedAsset, StorageError> {
        let name = file.object_name(session);
        self.store
            .put(&name, &file.content_type, file.bytes.clone())
            .await
            .inspect_err(|e| tracing::error!(%name, error = %e, "Failed to store upload"))?;

        Ok(UploadedAsset {
            filename: file.filename.clone(),
            url: self.store.public_url(&name),
            uploaded_name: name,
            photo_index: file.kind.label(),
        })
    }

    /// Composite and store the GIF. Any failure is logged and yields `None`.
    async fn store_gif(&self, session: &SessionId, frames: Vec<Bytes>) -> Option<UploadedAsset> {
        let compositor = self.compositor.clone();
        let frame_count = frames.len();
        let composed =
            tokio::task::spawn_blocking(move || compositor.compose_encoded(&frames)).await;

        let gif = match composed {
            Ok(Ok(Some(gif))) => gif,
            Ok(Ok(None)) => return None,
            Ok(Err(e)) => {
                tracing::error!(session_id = %session, error = %e, "Error creating GIF");
                return None;
            }
            Err(e) => {
                tracing::error!(session_id = %session, error = %e, "GIF task failed");
                return None;
            }
        };

        let name = format!("{session}-{GIF_MARKER}.gif");
        let size = gif.len();
        if let Err(e) = self.store.put(&name, "image/gif", Bytes::from(gif)).await {
            tracing::error!(session_id = %session, error = %e, "Failed to store GIF");
            return None;
        }

        tracing::info!(session_id = %session, frames = frame_count, size, "Stored session GIF");
        Some(UploadedAsset {
            filename: GENERATED_GIF_FILENAME.to_string(),
            url: self.store.public_url(&name),
            uploaded_name: name,
            photo_index: GIF_MARKER.to_string(),
        })
    }

    /// List the stored assets of a session: photos by index, GIF last.
    pub async fn list(&self, session: &SessionId) -> Result<Vec<SessionAsset>, StorageError> {
        let objects = self.store.list(&session.asset_prefix()).await?;

        let mut assets: Vec<(AssetIndex, SessionAsset)> = objects
            .into_iter()
            .map(|object| {
                let index = AssetIndex::from_object_name(&object.name);
                let asset = SessionAsset {
                    url: self.store.public_url(&object.name),
                    photo_index: index.label(),
                    name: object.name,
                    content_type: object.content_type,
                    size: object.size,
                    time_created: object.time_created,
                    updated: object.updated,
                };
                (index, asset)
            })
            .collect();
        assets.sort_by(|(a, _), (b, _)| a.display_order(b));

        Ok(assets.into_iter().map(|(_, asset)| asset).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::InMemoryStore;
    use image::{DynamicImage, ImageFormat, RgbImage};
    use std::io::Cursor;

    fn jpeg(value: u8) -> Bytes {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 30, image::Rgb([value; 3])));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)
            .unwrap();
        Bytes::from(bytes)
    }

    fn photo(field: &str, value: u8) -> IncomingFile {
        IncomingFile::new(field, format!("{field}.jpg"), "image/jpeg", jpeg(value)).unwrap()
    }

    fn service() -> (Arc<InMemoryStore>, MediaService) {
        let store = Arc::new(InMemoryStore::new("bucket"));
        let service = MediaService::new(store.clone(), GifCompositor::default());
        (store, service)
    }

    #[tokio::test]
    async fn test_upload_stores_files_and_gif() {
        let (store, service) = service();
        let session = SessionId::parse("s1").unwrap();
        let files = vec![photo("photo1", 0), photo("photo2", 100), photo("photo3", 200)];

        let outcome = service.upload(&session, files).await.unwrap();

        let names: Vec<&str> = outcome
            .files
            .iter()
            .map(|f| f.uploaded_name.as_str())
            .collect();
        assert_eq!(names, vec!["s1-1.jpg", "s1-2.jpg", "s1-3.jpg", "s1-gif.gif"]);
        assert_eq!(outcome.files[3].filename, "generated.gif");
        assert_eq!(outcome.files[3].photo_index, "gif");

        let gif = store.get("s1-gif.gif").await.unwrap();
        assert_eq!(image::guess_format(&gif).unwrap(), ImageFormat::Gif);
    }

    #[tokio::test]
    async fn test_single_photo_has_no_gif() {
        let (store, service) = service();
        let session = SessionId::parse("s2").unwrap();

        let outcome = service
            .upload(&session, vec![photo("photo1", 0)])
            .await
            .unwrap();

        assert_eq!(outcome.files.len(), 1);
        assert_eq!(store.names().await, vec!["s2-1.jpg"]);
    }

    #[tokio::test]
    async fn test_gif_failure_does_not_fail_upload() {
        let (store, service) = service();
        let session = SessionId::parse("s3").unwrap();
        // Valid type and extension but undecodable content
        let broken = IncomingFile::new(
            "photo1",
            "a.png",
            "image/png",
            Bytes::from_static(b"not a png"),
        )
        .unwrap();

        let outcome = service
            .upload(&session, vec![broken, photo("photo2", 50)])
            .await
            .unwrap();

        assert_eq!(outcome.files.len(), 2);
        assert!(store.get("s3-gif.gif").await.is_none());
    }

    #[tokio::test]
    async fn test_empty_upload_is_rejected() {
        let (_, service) = service();
        let session = SessionId::parse("s4").unwrap();
        assert!(matches!(
            service.upload(&session, Vec::new()).await,
            Err(ApiError::NoFiles)
        ));
    }

    #[tokio::test]
    async fn test_list_orders_assets() {
        let (store, service) = service();
        for name in ["s5-gif.gif", "s5-10.jpg", "s5-2.jpg", "s50-1.jpg"] {
            store
                .put(name, "image/jpeg", Bytes::from_static(b"x"))
                .await
                .unwrap();
        }

        let assets = service.list(&SessionId::parse("s5").unwrap()).await.unwrap();
        let names: Vec<&str> = assets.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["s5-2.jpg", "s5-10.jpg", "s5-gif.gif"]);
        assert_eq!(assets[0].photo_index.as_deref(), Some("2"));
        assert!(assets[0].url.ends_with("/o/s5-2.jpg?alt=media"));
    }
}
