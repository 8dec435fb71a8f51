//! Downloads, either by presigned GET URL or proxied through the server.

use bytes::Bytes;
use tracing::{debug, info};

use crate::models::{AppState, FileRecord};
use crate::storage::{content_type_for, StorageError};
use crate::types::{AppError, AppResult};

/// A file read back from storage, ready to be sent as an attachment.
#[derive(Debug, Clone)]
pub struct Download {
    pub original_name: String,
    pub content_type: String,
    pub data: Bytes,
}

async fn find_record(state: &AppState, id: &str) -> AppResult<FileRecord> {
    if id.trim().is_empty() {
        return Err(AppError::InvalidRequest("Missing or invalid id".to_string()));
    }
    state
        .metadata
        .find_file(id)
        .await?
        .ok_or_else(|| AppError::NotFound("File not found".to_string()))
}

/// Signed GET URL for one stored file.
pub async fn presigned_download_url(state: &AppState, id: &str) -> AppResult<String> {
    let file = find_record(state, id).await?;
    let url = state
        .storage
        .presign_get(&file.bucket, &file.file_name, state.config.uploads.presigned_url_expiry_secs)
        .await
        .map_err(|e| AppError::storage("Failed to create download URL", e))?;

    debug!("Issued download URL for {}", file.file_name);
    Ok(url)
}

/// Read a file through the server.
///
/// A missing record and a missing object are both 404 but carry different
/// messages; any other storage failure is a 500.
pub async fn fetch_for_download(state: &AppState, id: &str) -> AppResult<Download> {
    let file = find_record(state, id).await?;
    let data = state
        .storage
        .get_object(&file.bucket, &file.file_name)
        .await
        .map_err(|e| match e {
            StorageError::ObjectNotFound { .. } => AppError::NotFound("File not found in storage".to_string()),
            other => AppError::storage("Error reading file", other),
        })?;

    info!("Serving {} ({} bytes)", file.original_name, data.len());
    Ok(Download {
        content_type: content_type_for(&file.original_name),
        original_name: file.original_name,
        data,
    })
}

/// `Content-Disposition` value that forces a download under `filename`.
///
/// Quotes, backslashes and control characters are stripped from the plain
/// parameter; anything non-ASCII is also sent RFC 5987 encoded.
pub fn content_disposition_header(filename: &str) -> String {
    let needs_encoding = !filename.is_ascii() || filename.chars().any(|c| c.is_control() || c == '"' || c == '\\');
    if !needs_encoding {
        return format!("attachment; filename=\"{}\"", filename);
    }

    let sanitized: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '"' | '\\' => '_',
            _ => c,
        })
        .collect();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        sanitized,
        urlencoding::encode(filename)
    )
}
