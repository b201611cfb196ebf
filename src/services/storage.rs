//! Cloud object storage for session media.
//!
//! Production uses the Google Cloud Storage JSON API behind a Firebase
//! bucket. Objects are uploaded first and then granted public read as a
//! separate step, which buckets with uniform access reject without harm.
//! Either way they are served through the Firebase download endpoint.

use async_trait::async_trait;
use axum::body::Bytes;
use chrono::{DateTime, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::error::StorageError;
use crate::models::StoredObject;

const FIREBASE_DOWNLOAD_BASE: &str = "https://firebasestorage.googleapis.com/v0/b";

/// Characters left alone by JavaScript's `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Base URL of a bucket on the Firebase download endpoint.
pub fn bucket_url(bucket: &str) -> String {
    format!("{FIREBASE_DOWNLOAD_BASE}/{bucket}")
}

/// Public download URL for an object.
pub fn public_url(bucket: &str, name: &str) -> String {
    format!(
        "{}/o/{}?alt=media",
        bucket_url(bucket),
        utf8_percent_encode(name, URI_COMPONENT)
    )
}

/// Trait for media object storage
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write an object, replacing any existing object of the same name
    async fn put(&self, name: &str, content_type: &str, bytes: Bytes)
        -> Result<(), StorageError>;

    /// List objects whose names start with `prefix`
    async fn list(&self, prefix: &str) -> Result<Vec<StoredObject>, StorageError>;

    /// Bucket name
    fn bucket(&self) -> &str;

    fn bucket_url(&self) -> String {
        bucket_url(self.bucket())
    }

    fn public_url(&self, name: &str) -> String {
        public_url(self.bucket(), name)
    }
}

/// Firebase bucket accessed through the GCS JSON API.
pub struct FirebaseStore {
    client: reqwest::Client,
    api_base: String,
    bucket: String,
    access_token: Option<String>,
}

impl FirebaseStore {
    pub fn new(
        api_base: &str,
        bucket: impl Into<String>,
        access_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            bucket: bucket.into(),
            access_token,
        })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Grant `allUsers` read on an object. Failure leaves the object private
    /// but stored.
    async fn make_public(&self, name: &str) {
        let url = format!(
            "{}/storage/v1/b/{}/o/{}/acl",
            self.api_base,
            self.bucket,
            utf8_percent_encode(name, URI_COMPONENT)
        );
        let request = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "entity": "allUsers", "role": "READER" }));

        let result = match self.authorize(request).send().await {
            Ok(response) => Self::check(response).await.map(|_| ()),
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            tracing::warn!(name, error = %e, "Could not make object public");
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, StorageError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(StorageError::Upstream {
            status: status.as_u16(),
            body,
        })
    }
}

/// Page of a GCS object listing
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectList {
    #[serde(default)]
    items: Vec<ObjectResource>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectResource {
    name: String,
    content_type: Option<String>,
    /// GCS reports sizes as decimal strings
    #[serde(default)]
    size: Option<String>,
    time_created: Option<DateTime<Utc>>,
    updated: Option<DateTime<Utc>>,
}

impl From<ObjectResource> for StoredObject {
    fn from(o: ObjectResource) -> Self {
        StoredObject {
            name: o.name,
            content_type: o.content_type,
            size: o.size.and_then(|s| s.parse().ok()).unwrap_or(0),
            time_created: o.time_created,
            updated: o.updated,
        }
    }
}

#[async_trait]
impl ObjectStore for FirebaseStore {
    async fn put(
        &self,
        name: &str,
        content_type: &str,
        bytes: Bytes,
    ) -> Result<(), StorageError> {
        let url = format!("{}/upload/storage/v1/b/{}/o", self.api_base, self.bucket);
        let size = bytes.len();
        let request = self
            .client
            .post(&url)
            .query(&[("uploadType", "media"), ("name", name)])
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes);

        let response = self.authorize(request).send().await?;
        Self::check(response).await?;
        self.make_public(name).await;

        tracing::debug!(name, content_type, size, "Stored object");
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<StoredObject>, StorageError> {
        let url = format!("{}/storage/v1/b/{}/o", self.api_base, self.bucket);
        let mut objects = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("prefix", prefix.to_string())];
            if let Some(token) = page_token.take() {
                query.push(("pageToken", token));
            }
            let request = self.client.get(&url).query(&query);
            let response = Self::check(self.authorize(request).send().await?).await?;
            let page: ObjectList = response
                .json()
                .await
                .map_err(|e| StorageError::InvalidResponse(e.to_string()))?;

            objects.extend(page.items.into_iter().map(StoredObject::from));
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        tracing::debug!(prefix, count = objects.len(), "Listed objects");
        Ok(objects)
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }
}

/// In-memory object store
pub struct InMemoryStore {
    bucket: String,
    objects: RwLock<BTreeMap<String, (StoredObject, Bytes)>>,
}

impl InMemoryStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: RwLock::new(BTreeMap::new()),
        }
    }

    /// Raw bytes of a stored object
    pub async fn get(&self, name: &str) -> Option<Bytes> {
        let objects = self.objects.read().await;
        objects.get(name).map(|(_, bytes)| bytes.clone())
    }

    /// Names of all stored objects, sorted
    pub async fn names(&self) -> Vec<String> {
        let objects = self.objects.read().await;
        objects.keys().cloned().collect()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new("receiptbooth-local")
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn put(
        &self,
        name: &str,
        content_type: &str,
        bytes: Bytes,
    ) -> Result<(), StorageError> {
        let now = Utc::now();
        let mut objects = self.objects.write().await;
        let time_created = objects
            .get(name)
            .and_then(|(o, _)| o.time_created)
            .unwrap_or(now);
        let object = StoredObject {
            name: name.to_string(),
            content_type: Some(content_type.to_string()),
            size: bytes.len() as u64,
            time_created: Some(time_created),
            updated: Some(now),
        };
        objects.insert(name.to_string(), (object, bytes));
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<StoredObject>, StorageError> {
        let objects = self.objects.read().await;
        Ok(objects
            .values()
            .filter(|(o, _)| o.name.starts_with(prefix))
            .map(|(o, _)| o.clone())
            .collect())
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }
}
