//! In-process metadata store with the same contract as the Postgres one.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

use super::MetadataStore;
use crate::models::{BucketRecord, FileRecord, NewFile};
use crate::types::{AppError, AppResult};

#[derive(Default)]
struct Tables {
    /// Insertion order; listing walks it backwards.
    files: Vec<FileRecord>,
    buckets: HashMap<String, BucketRecord>,
}

#[derive(Default)]
pub struct MemoryMetadataStore {
    tables: Mutex<Tables>,
    fail_inserts: AtomicBool,
    fail_deletes: AtomicBool,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent file insert fail.
    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent file delete fail.
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn file_count(&self) -> usize {
        self.lock().files.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_inserts(&self) -> AppResult<()> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    fn record(file: &NewFile) -> FileRecord {
        FileRecord {
            id: Uuid::new_v4().to_string(),
            bucket: file.bucket.clone(),
            file_name: file.file_name.clone(),
            original_name: file.original_name.clone(),
            size: file.size,
            created_at: Utc::now(),
        }
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn create_file(&self, file: &NewFile) -> AppResult<FileRecord> {
        self.check_inserts()?;
        let record = Self::record(file);
        self.lock().files.push(record.clone());
        Ok(record)
    }

    async fn create_files(&self, files: &[NewFile]) -> AppResult<Vec<FileRecord>> {
        self.check_inserts()?;
        let records: Vec<FileRecord> = files.iter().map(Self::record).collect();
        self.lock().files.extend(records.iter().cloned());
        Ok(records)
    }

    async fn find_file(&self, id: &str) -> AppResult<Option<FileRecord>> {
        Ok(self.lock().files.iter().find(|f| f.id == id).cloned())
    }

    async fn list_files(&self, bucket: &str, limit: i64) -> AppResult<Vec<FileRecord>> {
        let tables = self.lock();
        let mut files: Vec<FileRecord> = tables
            .files
            .iter()
            .rev()
            .filter(|f| f.bucket == bucket)
            .cloned()
            .collect();
        // Stable: equal timestamps keep newest-inserted first.
        files.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        files.truncate(limit.max(0) as usize);
        Ok(files)
    }

    async fn delete_file(&self, id: &str) -> AppResult<bool> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        let mut tables = self.lock();
        let before = tables.files.len();
        tables.files.retain(|f| f.id != id);
        Ok(tables.files.len() < before)
    }

    async fn find_bucket_by_name(&self, name: &str) -> AppResult<Option<BucketRecord>> {
        Ok(self.lock().buckets.get(name).cloned())
    }

    async fn create_bucket(&self, name: &str, password_hash: &str) -> AppResult<BucketRecord> {
        let mut tables = self.lock();
        if tables.buckets.contains_key(name) {
            return Err(AppError::Conflict("Bucket name already exists".to_string()));
        }
        let record = BucketRecord {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        tables.buckets.insert(name.to_string(), record.clone());
        Ok(record)
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_file(bucket: &str, name: &str) -> NewFile {
        NewFile {
            bucket: bucket.to_string(),
            file_name: format!("abcde-{}", name),
            original_name: name.to_string(),
            size: 10,
        }
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_limited() {
        let store = MemoryMetadataStore::new();
        for i in 0..5 {
            store.create_file(&new_file("docs", &format!("{}.txt", i))).await.unwrap();
        }
        store.create_file(&new_file("other", "x.txt")).await.unwrap();

        let listed = store.list_files("docs", 3).await.unwrap();
        let names: Vec<&str> = listed.iter().map(|f| f.original_name.as_str()).collect();
        assert_eq!(names, vec!["4.txt", "3.txt", "2.txt"]);
    }

    #[tokio::test]
    async fn test_delete_reports_removal() {
        let store = MemoryMetadataStore::new();
        let record = store.create_file(&new_file("docs", "a.txt")).await.unwrap();
        assert!(store.delete_file(&record.id).await.unwrap());
        assert!(!store.delete_file(&record.id).await.unwrap());
        assert!(store.find_file(&record.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_batch_insert_all_or_nothing() {
        let store = MemoryMetadataStore::new();
        store.fail_inserts(true);
        let batch = vec![new_file("docs", "a.txt"), new_file("docs", "b.txt")];
        assert!(store.create_files(&batch).await.is_err());
        assert_eq!(store.file_count(), 0);

        store.fail_inserts(false);
        let records = store.create_files(&batch).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_ne!(records[0].id, records[1].id);
    }

    #[tokio::test]
    async fn test_bucket_names_unique() {
        let store = MemoryMetadataStore::new();
        store.create_bucket("team", "hash").await.unwrap();
        let dup = store.create_bucket("team", "hash").await;
        assert!(matches!(dup, Err(AppError::Conflict(_))));
    }
}
