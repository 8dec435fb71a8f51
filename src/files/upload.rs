//! Upload flows.
//!
//! Presigned: the browser gets one signed PUT URL per file, uploads directly to
//! the provider and then reports back so the records can be written.
//!
//! Server-mediated: bytes come through this process and the record is written
//! only after the provider accepted the object.

use bytes::Bytes;
use futures::future::try_join_all;
use tracing::{info, warn};

use super::require_bucket;
use crate::models::{
    AppState, DirectUploadResponse, MessageResponse, NewFile, PresignedUploadRequest, PresignedUrlDescriptor,
    SaveInfoRequest, StoredFileInfo,
};
use crate::storage::{bucket::check_bucket_name, content_type_for, ensure_bucket, generate_storage_key, StorageError};
use crate::types::{AppError, AppResult};

/// One file received by the server-mediated flow.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub original_name: String,
    pub data: Bytes,
}

fn invalid_bucket(err: StorageError) -> AppError {
    match err {
        StorageError::InvalidBucketName { reason, .. } => {
            AppError::InvalidRequest(format!("Invalid bucket name: {}", reason))
        }
        other => AppError::from(other),
    }
}

/// Issue one presigned PUT URL per requested file.
///
/// The bucket is ensured once per request before anything is signed. URLs come
/// back in request order.
pub async fn request_upload_urls(
    state: &AppState,
    request: &PresignedUploadRequest,
) -> AppResult<Vec<PresignedUrlDescriptor>> {
    if request.files.is_empty() {
        return Err(AppError::InvalidRequest("No files to upload".to_string()));
    }
    let bucket = require_bucket(Some(&request.bucket_name))?;
    check_bucket_name(bucket).map_err(invalid_bucket)?;
    if let Some(empty) = request.files.iter().find(|f| f.file_size <= 0) {
        return Err(AppError::InvalidRequest(format!(
            "File {} is empty",
            empty.original_file_name
        )));
    }

    ensure_bucket(state.storage.as_ref(), bucket, &state.cors)
        .await
        .map_err(|e| AppError::storage("Failed to prepare storage bucket", e))?;

    let expiry = state.config.uploads.presigned_url_expiry_secs;
    let descriptors = try_join_all(request.files.iter().map(|file| async move {
        let key = generate_storage_key(&file.original_file_name);
        let url = state.storage.presign_put(bucket, &key, expiry).await?;
        Ok::<_, StorageError>(PresignedUrlDescriptor {
            file_name_in_bucket: key,
            original_file_name: file.original_file_name.clone(),
            file_size: file.file_size,
            url,
        })
    }))
    .await
    .map_err(|e| AppError::storage("Failed to create presigned URLs", e))?;

    info!("Issued {} upload URLs for bucket {}", descriptors.len(), bucket);
    Ok(descriptors)
}

/// Record files the browser reports as uploaded, all in one batch.
///
/// With upload verification enabled each object is probed first and the size
/// the provider reports is recorded instead of the client's claim.
pub async fn save_uploaded(state: &AppState, request: &SaveInfoRequest) -> AppResult<MessageResponse> {
    if request.presigned_urls.is_empty() {
        return Err(AppError::InvalidRequest("No files to save".to_string()));
    }
    let bucket = require_bucket(Some(&request.bucket_name))?;

    let mut records = Vec::with_capacity(request.presigned_urls.len());
    for file in &request.presigned_urls {
        let size = if state.config.uploads.verify_uploads {
            let info = state
                .storage
                .head_object(bucket, &file.file_name_in_bucket)
                .await
                .map_err(|e| AppError::storage("Failed to verify upload", e))?
                .ok_or_else(|| {
                    AppError::InvalidRequest(format!(
                        "File {} was not found in storage; upload it before saving",
                        file.original_file_name
                    ))
                })?;
            let actual = i64::try_from(info.size)
                .map_err(|_| AppError::Internal(format!("object size {} out of range", info.size)))?;
            if actual != file.file_size {
                warn!(
                    "Size mismatch for {}: client reported {}, storage has {}",
                    file.file_name_in_bucket, file.file_size, actual
                );
            }
            actual
        } else {
            file.file_size
        };

        records.push(NewFile {
            bucket: bucket.to_string(),
            file_name: file.file_name_in_bucket.clone(),
            original_name: file.original_file_name.clone(),
            size,
        });
    }

    let saved = state.metadata.create_files(&records).await?;
    info!("Saved {} file records for bucket {}", saved.len(), bucket);
    Ok(MessageResponse::new("Files saved successfully"))
}

/// Store files sent through the server, recording each only after its write
/// succeeded.
///
/// Empty files and bad bucket names are rejected before any call is made. The
/// bucket is then ensured once. A key that already exists is a conflict, never
/// an overwrite.
pub async fn upload_direct(
    state: &AppState,
    bucket: Option<&str>,
    files: Vec<IncomingFile>,
) -> AppResult<DirectUploadResponse> {
    let bucket = require_bucket(bucket)?;
    check_bucket_name(bucket).map_err(invalid_bucket)?;
    if files.is_empty() {
        return Err(AppError::InvalidRequest("No files provided".to_string()));
    }
    if let Some(empty) = files.iter().find(|f| f.data.is_empty()) {
        return Err(AppError::storage(
            format!("File {} is empty", empty.original_name),
            StorageError::EmptyObject,
        ));
    }

    ensure_bucket(state.storage.as_ref(), bucket, &state.cors)
        .await
        .map_err(|e| AppError::storage("Failed to prepare storage bucket", e))?;

    let mut stored = Vec::with_capacity(files.len());
    for file in files {
        let key = generate_storage_key(&file.original_name);

        if state.storage.head_object(bucket, &key).await?.is_some() {
            return Err(AppError::storage(
                "File already exists",
                StorageError::ObjectExists {
                    bucket: bucket.to_string(),
                    key,
                },
            ));
        }

        state
            .storage
            .put_object(bucket, &key, &file.data, &content_type_for(&file.original_name))
            .await
            .map_err(|e| AppError::storage(format!("Failed to upload {}", file.original_name), e))?;

        let record = state
            .metadata
            .create_file(&NewFile {
                bucket: bucket.to_string(),
                file_name: key,
                original_name: file.original_name,
                size: file.data.len() as i64,
            })
            .await
            .map_err(|e| {
                warn!("Object stored but its record was not written: {}", e);
                e
            })?;

        stored.push(StoredFileInfo {
            file_name: record.file_name,
            original_name: record.original_name,
            size: record.size,
            id: record.id,
        });
    }

    info!("Stored {} files in bucket {}", stored.len(), bucket);
    Ok(DirectUploadResponse {
        status: "success".to_string(),
        message: "Files uploaded successfully".to_string(),
        files: stored,
    })
}
