use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::primitives::ByteStream;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// UploadError
///
/// Callers only ever learn that the upload failed; the underlying cause is
/// logged where it happens.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("Not an image: {0}")]
    InvalidFile(String),

    #[error("Failed to upload image")]
    Failed,
}

/// UploadFile
///
/// An in-memory file received from the client.
#[derive(Debug, Clone, Default)]
pub struct UploadFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    /// Rejects empty payloads and anything not declared as an image.
    pub fn ensure_image(&self) -> Result<(), UploadError> {
        if !self.content_type.starts_with("image/") {
            return Err(UploadError::InvalidFile(self.content_type.clone()));
        }
        if self.bytes.is_empty() {
            return Err(UploadError::InvalidFile("empty file".to_string()));
        }
        Ok(())
    }

    fn extension(&self) -> &str {
        std::path::Path::new(&self.filename)
            .extension()
            .and_then(std::ffi::OsStr::to_str)
            .unwrap_or("bin")
    }
}

// 1. UploadService Contract
/// UploadService
///
/// Stores an image with a hosting backend and returns the public HTTPS URL.
/// `preset` names the backend-side upload profile (folder, transformations).
#[async_trait]
pub trait UploadService: Send + Sync {
    async fn upload_image(&self, file: UploadFile, preset: &str) -> Result<String, UploadError>;
}

/// UploadState
///
/// The concrete type used to share the upload service across the application state.
pub type UploadState = Arc<dyn UploadService>;

// 2. Third-party image host
#[derive(Deserialize)]
struct ImageHostResponse {
    secure_url: String,
}

/// ImageHostClient
///
/// Unsigned uploads to a hosted image service: a multipart POST carrying the
/// file and an upload preset to `{base_url}/{cloud}/image/upload`.
#[derive(Clone)]
pub struct ImageHostClient {
    client: reqwest::Client,
    endpoint: String,
}

impl ImageHostClient {
    pub fn new(base_url: &str, cloud_name: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/{}/image/upload", base_url.trim_end_matches('/'), cloud_name),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl UploadService for ImageHostClient {
    async fn upload_image(&self, file: UploadFile, preset: &str) -> Result<String, UploadError> {
        let part = reqwest::multipart::Part::bytes(file.bytes)
            .file_name(file.filename)
            .mime_str(&file.content_type)
            .map_err(|e| {
                tracing::error!("image host rejected mime type: {:?}", e);
                UploadError::Failed
            })?;

        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("upload_preset", preset.to_string());

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("image host request failed: {:?}", e);
                UploadError::Failed
            })?;

        if !response.status().is_success() {
            tracing::error!(status = %response.status(), "image host returned an error");
            return Err(UploadError::Failed);
        }

        let body = response.json::<ImageHostResponse>().await.map_err(|e| {
            tracing::error!("image host response unreadable: {:?}", e);
            UploadError::Failed
        })?;

        Ok(body.secure_url)
    }
}

// 3. S3-compatible bucket
/// S3UploadClient
///
/// Writes images straight into an S3-compatible bucket (MinIO locally) and
/// returns the path-style object URL. The preset becomes the key prefix.
#[derive(Clone)]
pub struct S3UploadClient {
    client: s3::Client,
    endpoint: String,
    bucket_name: String,
}

impl S3UploadClient {
    pub async fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            // MinIO needs path-style addressing.
            .force_path_style(true)
            .build();

        Self {
            client: s3::Client::from_conf(config),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            bucket_name: bucket.to_string(),
        }
    }

    /// Creates the bucket if missing. Local development convenience.
    pub async fn ensure_bucket_exists(&self) {
        let _ = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await;
    }

    /// Object key for an upload: `{preset}/{uuid}.{ext}`, with traversal segments removed.
    pub fn object_key(file: &UploadFile, preset: &str) -> String {
        let prefix = sanitize_key(preset);
        let name = format!("{}.{}", Uuid::new_v4(), sanitize_key(file.extension()));
        if prefix.is_empty() {
            name
        } else {
            format!("{}/{}", prefix, name)
        }
    }

    pub fn object_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, self.bucket_name, key)
    }
}

#[async_trait]
impl UploadService for S3UploadClient {
    async fn upload_image(&self, file: UploadFile, preset: &str) -> Result<String, UploadError> {
        let key = Self::object_key(&file, preset);

        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .content_type(&file.content_type)
            .body(ByteStream::from(file.bytes))
            .send()
            .await
            .map_err(|e| {
                tracing::error!("s3 put_object failed: {:?}", e);
                UploadError::Failed
            })?;

        Ok(self.object_url(&key))
    }
}

/// sanitize_key
///
/// Strips directory navigation components (`..`, `.`) and empty segments from a
/// user-provided key segment.
pub fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

// 4. The Mock Implementation (For Tests)
/// MockUploadService
///
/// Deterministic stand-in that never touches the network.
#[derive(Clone, Default)]
pub struct MockUploadService {
    /// When true, every upload fails.
    pub should_fail: bool,
}

impl MockUploadService {
    pub fn new() -> Self {
        Self { should_fail: false }
    }

    pub fn new_failing() -> Self {
        Self { should_fail: true }
    }
}

#[async_trait]
impl UploadService for MockUploadService {
    async fn upload_image(&self, file: UploadFile, preset: &str) -> Result<String, UploadError> {
        if self.should_fail {
            tracing::error!("mock upload failure requested");
            return Err(UploadError::Failed);
        }

        Ok(format!(
            "https://images.test/{}/{}",
            sanitize_key(preset),
            sanitize_key(&file.filename)
        ))
    }
}
