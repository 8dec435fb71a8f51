//! In-process object storage.
//!
//! Keeps objects in a map behind a mutex. Used by the test suite and for
//! running the service without an S3 endpoint. Failures can be injected per
//! operation to exercise the partial-failure paths of the orchestrators.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{
    BucketCreation, CorsPolicy, ObjectInfo, ObjectStorage, StorageError, StorageKind,
    StorageResult,
};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    content_type: String,
}

#[derive(Default)]
struct MemoryBucket {
    objects: BTreeMap<String, StoredObject>,
    cors: Option<CorsPolicy>,
}

#[derive(Default)]
pub struct MemoryStorage {
    buckets: Mutex<HashMap<String, MemoryBucket>>,
    create_bucket_calls: AtomicUsize,
    last_presign_expiry: AtomicU32,
    fail_puts: AtomicBool,
    fail_deletes: AtomicBool,
    fail_cors: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `put_object` fail.
    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `delete_object` fail.
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `put_bucket_cors` fail, like MinIO does.
    pub fn fail_cors(&self, fail: bool) {
        self.fail_cors.store(fail, Ordering::SeqCst);
    }

    /// Number of times `create_bucket` reached the backend.
    pub fn create_bucket_calls(&self) -> usize {
        self.create_bucket_calls.load(Ordering::SeqCst)
    }

    /// Expiry passed to the most recent presign call.
    pub fn last_presign_expiry(&self) -> u32 {
        self.last_presign_expiry.load(Ordering::SeqCst)
    }

    pub fn object_count(&self, bucket: &str) -> usize {
        self.lock()
            .get(bucket)
            .map(|b| b.objects.len())
            .unwrap_or(0)
    }

    pub fn cors_policy(&self, bucket: &str) -> Option<CorsPolicy> {
        self.lock().get(bucket).and_then(|b| b.cors.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, MemoryBucket>> {
        // A panic while holding the lock leaves the map itself consistent.
        self.buckets.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // Signing is offline on S3 too, so a missing bucket only shows up when the
    // URL is used.
    fn presign(&self, method: &str, bucket: &str, key: &str, expiry_secs: u32) -> StorageResult<String> {
        self.last_presign_expiry.store(expiry_secs, Ordering::SeqCst);
        Ok(format!(
            "memory://{}/{}?X-Amz-Method={}&X-Amz-Expires={}",
            bucket,
            urlencoding::encode(key),
            method,
            expiry_secs
        ))
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    fn kind(&self) -> StorageKind {
        StorageKind::Memory
    }

    async fn list_buckets(&self) -> StorageResult<Vec<String>> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool> {
        Ok(self.lock().contains_key(bucket))
    }

    async fn create_bucket(&self, bucket: &str) -> StorageResult<BucketCreation> {
        self.create_bucket_calls.fetch_add(1, Ordering::SeqCst);
        let mut buckets = self.lock();
        if buckets.contains_key(bucket) {
            return Ok(BucketCreation::AlreadyOwned);
        }
        buckets.insert(bucket.to_string(), MemoryBucket::default());
        Ok(BucketCreation::Created)
    }

    async fn put_bucket_cors(&self, bucket: &str, policy: &CorsPolicy) -> StorageResult<()> {
        if self.fail_cors.load(Ordering::SeqCst) {
            return Err(StorageError::Provider("HTTP 501: NotImplemented".to_string()));
        }
        let mut buckets = self.lock();
        let entry = buckets
            .get_mut(bucket)
            .ok_or_else(|| StorageError::BucketNotFound(bucket.to_string()))?;
        entry.cors = Some(policy.clone());
        Ok(())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> StorageResult<()> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StorageError::Provider("injected put failure".to_string()));
        }
        let mut buckets = self.lock();
        let entry = buckets
            .get_mut(bucket)
            .ok_or_else(|| StorageError::BucketNotFound(bucket.to_string()))?;
        entry.objects.insert(
            key.to_string(),
            StoredObject {
                data: Bytes::copy_from_slice(data),
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<Bytes> {
        self.lock()
            .get(bucket)
            .and_then(|b| b.objects.get(key))
            .map(|o| o.data.clone())
            .ok_or_else(|| StorageError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    async fn head_object(&self, bucket: &str, key: &str) -> StorageResult<Option<ObjectInfo>> {
        // A HEAD against a missing bucket is a body-less 404 on S3, which reads
        // the same as a missing key.
        Ok(self
            .lock()
            .get(bucket)
            .and_then(|b| b.objects.get(key))
            .map(|o| ObjectInfo {
                size: o.data.len() as u64,
                content_type: Some(o.content_type.clone()),
            }))
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> StorageResult<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StorageError::Provider("injected delete failure".to_string()));
        }
        // S3 semantics: deleting a missing key succeeds.
        if let Some(entry) = self.lock().get_mut(bucket) {
            entry.objects.remove(key);
        }
        Ok(())
    }

    async fn presign_put(&self, bucket: &str, key: &str, expiry_secs: u32) -> StorageResult<String> {
        self.presign("PUT", bucket, key, expiry_secs)
    }

    async fn presign_get(&self, bucket: &str, key: &str, expiry_secs: u32) -> StorageResult<String> {
        self.presign("GET", bucket, key, expiry_secs)
    }
}
