use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::presigning::PresigningConfig;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Lifetime of a presigned upload URL.
const UPLOAD_URL_TTL: Duration = Duration::from_secs(600);

/// StorageService
///
/// Contract for the object store holding car media. The S3 client is used against
/// MinIO locally and the hosted storage gateway in production; tests use the mock.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Creates the bucket if missing. Only called for the local MinIO setup.
    async fn ensure_bucket_exists(&self);

    /// Presigned PUT URL bound to `key` and `content_type`.
    async fn get_presigned_upload_url(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<String, String>;
}

/// S3StorageClient
///
/// `force_path_style(true)` is required by both MinIO and the hosted gateway.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    bucket_name: String,
}

impl S3StorageClient {
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
            .force_path_style(true)
            .build();

        Self {
            client: s3::Client::from_conf(config),
            bucket_name: bucket.to_string(),
        }
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    async fn ensure_bucket_exists(&self) {
        if let Err(e) = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
        {
            tracing::debug!(error = %e, bucket = %self.bucket_name, "create_bucket skipped");
        }
    }

    async fn get_presigned_upload_url(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<String, String> {
        let presigning = PresigningConfig::expires_in(UPLOAD_URL_TTL).map_err(|e| e.to_string())?;

        let presigned_req = self
            .client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .content_type(content_type)
            .presigned(presigning)
            .await
            .map_err(|e| e.to_string())?;

        Ok(presigned_req.uri().to_string())
    }
}

/// MediaKind
///
/// Upload categories accepted for listings, each with its own key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// from_content_type
    ///
    /// Maps an allowed MIME type to its kind and canonical file extension.
    pub fn from_content_type(content_type: &str) -> Option<(MediaKind, &'static str)> {
        match content_type.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some((MediaKind::Image, "jpg")),
            "image/png" => Some((MediaKind::Image, "png")),
            "image/webp" => Some((MediaKind::Image, "webp")),
            "video/mp4" => Some((MediaKind::Video, "mp4")),
            "video/quicktime" => Some((MediaKind::Video, "mov")),
            "video/webm" => Some((MediaKind::Video, "webm")),
            _ => None,
        }
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            MediaKind::Image => "car-images",
            MediaKind::Video => "car-videos",
        }
    }
}

/// media_key
///
/// Server-generated object key: `<prefix>/<dealer id>/<uuid>.<ext>`. The client's
/// filename never reaches the key, so it cannot escape the dealer's folder.
pub fn media_key(kind: MediaKind, dealer_id: Uuid, extension: &str) -> String {
    format!("{}/{}/{}.{}", kind.prefix(), dealer_id, Uuid::new_v4(), extension)
}

/// MockStorageService
///
/// In-memory stand-in used by the handler tests.
#[derive(Clone, Default)]
pub struct MockStorageService {
    /// When true, every presign call fails.
    pub should_fail: bool,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self { should_fail: false }
    }

    pub fn new_failing() -> Self {
        Self { should_fail: true }
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) {}

    async fn get_presigned_upload_url(
        &self,
        key: &str,
        _content_type: &str,
    ) -> Result<String, String> {
        if self.should_fail {
            return Err("Mock Storage Error: Simulation requested".to_string());
        }
        Ok(format!(
            "http://localhost:9000/mock-bucket/{}?signature=fake",
            key
        ))
    }
}

pub type StorageState = Arc<dyn StorageService>;
