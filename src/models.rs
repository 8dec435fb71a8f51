use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::config::Config;
use crate::db::MetadataStore;
use crate::llm::LLMAdapter;
use crate::storage::{CorsPolicy, ObjectStorage};

/// Process-wide handles, built once in `main` and cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub metadata: Arc<dyn MetadataStore>,
    pub storage: Arc<dyn ObjectStorage>,
    pub llm: Arc<dyn LLMAdapter>,
    pub cors: CorsPolicy,
}

impl AppState {
    pub fn new(
        config: Config,
        metadata: Arc<dyn MetadataStore>,
        storage: Arc<dyn ObjectStorage>,
        llm: Arc<dyn LLMAdapter>,
    ) -> Self {
        let cors = CorsPolicy::for_environment(
            config.server.environment,
            &config.server.cors_allowed_origins,
            config.server.site_url.as_deref(),
        );
        Self {
            config,
            metadata,
            storage,
            llm,
            cors,
        }
    }
}

// Persisted records
// Note: FromRow is needed for runtime query_as (without DATABASE_URL at compile time)

/// Metadata for one stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct FileRecord {
    pub id: String,
    pub bucket: String,
    /// Storage key inside `bucket`
    pub file_name: String,
    pub original_name: String,
    /// Byte count as recorded at upload time
    pub size: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFile {
    pub bucket: String,
    pub file_name: String,
    pub original_name: String,
    pub size: i64,
}

/// Password-gated bucket. The hash is PHC-formatted argon2id.
#[derive(Clone, sqlx::FromRow)]
pub struct BucketRecord {
    pub id: String,
    pub name: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Debug for BucketRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BucketRecord")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

// API Request/Response types

#[derive(Debug, Deserialize)]
pub struct ListFilesQuery {
    pub bucket: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileSummary {
    pub id: String,
    pub original_file_name: String,
    pub file_size: i64,
    pub created_at: DateTime<Utc>,
}

impl From<FileRecord> for FileSummary {
    fn from(record: FileRecord) -> Self {
        Self {
            id: record.id,
            original_file_name: record.original_name,
            file_size: record.size,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortFile {
    pub original_file_name: String,
    pub file_size: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedUploadRequest {
    #[serde(default)]
    pub files: Vec<ShortFile>,
    #[serde(default)]
    pub bucket_name: String,
}

/// One presigned upload slot handed to the browser.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PresignedUrlDescriptor {
    pub file_name_in_bucket: String,
    pub original_file_name: String,
    pub file_size: i64,
    pub url: String,
}

/// A file the browser reports as uploaded; the URL it used is ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub file_name_in_bucket: String,
    pub original_file_name: String,
    pub file_size: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveInfoRequest {
    #[serde(default)]
    pub presigned_urls: Vec<UploadedFile>,
    #[serde(default)]
    pub bucket_name: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
    /// Present when the primary operation succeeded but a follow-up step did not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            warning: None,
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredFileInfo {
    pub file_name: String,
    pub original_name: String,
    pub size: i64,
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct DirectUploadResponse {
    pub status: String,
    pub message: String,
    pub files: Vec<StoredFileInfo>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BucketCredentials {
    #[serde(default)]
    #[validate(length(min = 1, message = "Bucket name and password are required"))]
    pub bucket_name: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Bucket name and password are required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketInfo {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageSetupInfo {
    pub message: String,
    pub cors_configured: bool,
    pub provider: String,
}

#[derive(Debug, Serialize)]
pub struct CreateBucketResponse {
    pub success: bool,
    pub message: String,
    pub bucket: BucketInfo,
    pub storage: StorageSetupInfo,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticateResponse {
    pub message: String,
    pub bucket_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default)]
    pub file_id: String,
    #[serde(default)]
    pub question: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub response: String,
    pub file_name: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub database: String,
    pub storage: String,
}

#[derive(Debug, Deserialize)]
pub struct StorageStatusQuery {
    pub bucket: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageStatusResponse {
    pub provider: String,
    pub has_cloud_credentials: bool,
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<BucketAccessStatus>,
}

#[derive(Debug, Serialize)]
pub struct BucketAccessStatus {
    pub name: String,
    pub accessible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
