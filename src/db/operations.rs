use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{health_check, MetadataStore};
use crate::models::{BucketRecord, FileRecord, NewFile};
use crate::types::{AppError, AppResult};

const FILE_COLUMNS: &str = "id, bucket, file_name, original_name, size, created_at";

// clock_timestamp() rather than NOW(): rows of one transaction must not share
// a timestamp.
fn insert_file_sql() -> String {
    format!(
        r#"
        INSERT INTO files (id, bucket, file_name, original_name, size, created_at)
        VALUES ($1, $2, $3, $4, $5, clock_timestamp())
        RETURNING {FILE_COLUMNS}
        "#
    )
}

fn list_files_sql() -> String {
    format!(
        r#"
        SELECT {FILE_COLUMNS} FROM files
        WHERE bucket = $1
        ORDER BY created_at DESC, seq DESC
        LIMIT $2
        "#
    )
}

/// Postgres-backed metadata store.
#[derive(Clone)]
pub struct PgMetadataStore {
    pool: PgPool,
}

impl PgMetadataStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl MetadataStore for PgMetadataStore {
    async fn create_file(&self, file: &NewFile) -> AppResult<FileRecord> {
        let record = sqlx::query_as::<_, FileRecord>(&insert_file_sql())
            .bind(Uuid::new_v4().to_string())
            .bind(&file.bucket)
            .bind(&file.file_name)
            .bind(&file.original_name)
            .bind(file.size)
            .fetch_one(&self.pool)
            .await?;

        Ok(record)
    }

    async fn create_files(&self, files: &[NewFile]) -> AppResult<Vec<FileRecord>> {
        let mut tx = self.pool.begin().await?;
        let mut records = Vec::with_capacity(files.len());

        for file in files {
            let record = sqlx::query_as::<_, FileRecord>(&insert_file_sql())
                .bind(Uuid::new_v4().to_string())
                .bind(&file.bucket)
                .bind(&file.file_name)
                .bind(&file.original_name)
                .bind(file.size)
                .fetch_one(&mut *tx)
                .await?;
            records.push(record);
        }

        tx.commit().await?;
        Ok(records)
    }

    async fn find_file(&self, id: &str) -> AppResult<Option<FileRecord>> {
        let record = sqlx::query_as::<_, FileRecord>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn list_files(&self, bucket: &str, limit: i64) -> AppResult<Vec<FileRecord>> {
        let records = sqlx::query_as::<_, FileRecord>(&list_files_sql())
            .bind(bucket)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(records)
    }

    async fn delete_file(&self, id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM files WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_bucket_by_name(&self, name: &str) -> AppResult<Option<BucketRecord>> {
        let bucket = sqlx::query_as::<_, BucketRecord>(
            "SELECT id, name, password_hash, created_at FROM buckets WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(bucket)
    }

    async fn create_bucket(&self, name: &str, password_hash: &str) -> AppResult<BucketRecord> {
        let result = sqlx::query_as::<_, BucketRecord>(
            r#"
            INSERT INTO buckets (id, name, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, name, password_hash, created_at
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(name)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(bucket) => Ok(bucket),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(AppError::Conflict("Bucket name already exists".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn ping(&self) -> AppResult<()> {
        health_check(&self.pool).await?;
        Ok(())
    }
}
