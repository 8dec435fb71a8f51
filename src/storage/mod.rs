//! Object storage layer (S3-compatible)
//!
//! One `ObjectStorage` trait with two production backends built on rust-s3:
//! a hosted provider (Cloudflare R2, AWS, ...) and a local development server
//! (MinIO). The backend is chosen once at startup by [`select_backend`] and
//! shared through `AppState`; business logic never branches on it.

pub mod bucket;
pub mod memory;
pub mod s3_client;
mod sigv4;

use async_trait::async_trait;
use bytes::Bytes;
use rand::{distributions::Alphanumeric, Rng};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::config::StorageConfig;

pub use bucket::{configure_cors, ensure_bucket, validate_bucket_name, BucketSetup, CorsPolicy};
pub use memory::MemoryStorage;
pub use s3_client::S3Storage;

/// Default validity of presigned URLs, in seconds.
pub const DEFAULT_PRESIGN_EXPIRY_SECS: u32 = 60 * 60;

/// Length of the random prefix added to storage keys.
const KEY_PREFIX_LEN: usize = 5;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("bucket `{name}` invalid: {reason}")]
    InvalidBucketName { name: String, reason: String },
    #[error("bucket `{0}` not found")]
    BucketNotFound(String),
    #[error("bucket name `{0}` is already taken by another account")]
    BucketNameConflict(String),
    #[error("bucket quota exceeded: {0}")]
    QuotaExceeded(String),
    #[error("object `{key}` not found in bucket `{bucket}`")]
    ObjectNotFound { bucket: String, key: String },
    #[error("object `{key}` already exists in bucket `{bucket}`")]
    ObjectExists { bucket: String, key: String },
    #[error("refusing to store an empty object")]
    EmptyObject,
    #[error("access denied: {0}")]
    AccessDenied(String),
    #[error("invalid storage credentials: {0}")]
    Credentials(String),
    #[error("storage provider error: {0}")]
    Provider(String),
}

impl StorageError {
    /// Actionable advice shown next to the upstream message, where one is known.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            StorageError::AccessDenied(_) => Some(
                "Check the storage API token permissions. It needs 'Object:Write' and 'Bucket:Write'.",
            ),
            StorageError::BucketNameConflict(_) => {
                Some("Bucket names are global on this provider; choose a different name.")
            }
            StorageError::QuotaExceeded(_) => {
                Some("Delete unused buckets or raise the bucket limit of the storage account.")
            }
            StorageError::Credentials(_) => {
                Some("Check the storage access key, secret key and endpoint configuration.")
            }
            _ => None,
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Which backend is serving requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Cloud,
    Local,
    Memory,
}

impl StorageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKind::Cloud => "cloud",
            StorageKind::Local => "local",
            StorageKind::Memory => "memory",
        }
    }
}

impl std::fmt::Display for StorageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a create-bucket call that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketCreation {
    Created,
    /// Someone (possibly a concurrent request of ours) created it first.
    AlreadyOwned,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub size: u64,
    pub content_type: Option<String>,
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    fn kind(&self) -> StorageKind;

    async fn list_buckets(&self) -> StorageResult<Vec<String>>;

    /// Metadata-only existence probe.
    async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool>;

    async fn create_bucket(&self, bucket: &str) -> StorageResult<BucketCreation>;

    async fn put_bucket_cors(&self, bucket: &str, policy: &CorsPolicy) -> StorageResult<()>;

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> StorageResult<()>;

    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<Bytes>;

    /// `Ok(None)` when the object does not exist.
    async fn head_object(&self, bucket: &str, key: &str) -> StorageResult<Option<ObjectInfo>>;

    async fn delete_object(&self, bucket: &str, key: &str) -> StorageResult<()>;

    async fn presign_put(&self, bucket: &str, key: &str, expiry_secs: u32) -> StorageResult<String>;

    async fn presign_get(&self, bucket: &str, key: &str, expiry_secs: u32) -> StorageResult<String>;
}

/// Pick the storage backend for this process.
///
/// The cloud backend is used iff access key, secret key and endpoint are all
/// configured; otherwise the local development server is addressed.
pub fn select_backend(config: &StorageConfig) -> StorageResult<Arc<dyn ObjectStorage>> {
    match &config.cloud {
        Some(cloud) => {
            info!("Using cloud object storage at {} (region {})", cloud.endpoint, cloud.region);
            Ok(Arc::new(S3Storage::cloud(cloud)?))
        }
        None => {
            info!("Using local object storage at {}", config.local.url());
            Ok(Arc::new(S3Storage::local(&config.local)?))
        }
    }
}

/// Build a collision-resistant storage key: a short random token, a dash,
/// and the final path segment of the client's filename.
pub fn generate_storage_key(original_name: &str) -> String {
    let base = original_name
        .rsplit(['/', '\\'])
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("file");

    let prefix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(KEY_PREFIX_LEN)
        .map(char::from)
        .collect();

    format!("{}-{}", prefix, base)
}

/// Content type used when writing or serving an object.
pub fn content_type_for(file_name: &str) -> String {
    mime_guess::from_path(file_name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}
