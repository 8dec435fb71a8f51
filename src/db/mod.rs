use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use crate::config::DatabaseConfig;
use crate::models::{BucketRecord, FileRecord, NewFile};
use crate::types::AppResult;
use anyhow::Result;

pub use memory::MemoryMetadataStore;
pub use operations::PgMetadataStore;
pub use pool::*;

pub mod memory;
pub mod operations;
pub mod pool;

/// Record store for file and bucket metadata.
///
/// Calls here and calls to object storage are independent failure domains;
/// nothing spans both in a transaction.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn create_file(&self, file: &NewFile) -> AppResult<FileRecord>;

    /// Insert all records or none.
    async fn create_files(&self, files: &[NewFile]) -> AppResult<Vec<FileRecord>>;

    async fn find_file(&self, id: &str) -> AppResult<Option<FileRecord>>;

    /// Newest first.
    async fn list_files(&self, bucket: &str, limit: i64) -> AppResult<Vec<FileRecord>>;

    /// Returns whether a record was removed.
    async fn delete_file(&self, id: &str) -> AppResult<bool>;

    async fn find_bucket_by_name(&self, name: &str) -> AppResult<Option<BucketRecord>>;

    /// Fails with `AppError::Conflict` when the name is taken.
    async fn create_bucket(&self, name: &str, password_hash: &str) -> AppResult<BucketRecord>;

    async fn ping(&self) -> AppResult<()>;
}

pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect(&config.url)
        .await?;

    // Test connection
    health_check(&pool).await?;

    Ok(pool)
}
