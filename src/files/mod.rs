//! File orchestration: uploads, downloads, deletes and listing.
//!
//! Object storage and the metadata store fail independently. Every flow
//! orders its writes so that a partial failure leaves an orphaned object
//! rather than a record that points at nothing.

pub mod delete;
pub mod download;
pub mod upload;

use crate::models::{AppState, FileSummary};
use crate::types::{AppError, AppResult};

pub use delete::delete_file;
pub use download::{content_disposition_header, fetch_for_download, presigned_download_url, Download};
pub use upload::{request_upload_urls, save_uploaded, upload_direct, IncomingFile};

pub(crate) fn require_bucket(bucket: Option<&str>) -> AppResult<&str> {
    match bucket.map(str::trim) {
        Some(name) if !name.is_empty() => Ok(name),
        _ => Err(AppError::InvalidRequest("Bucket name is required".to_string())),
    }
}

/// Most recent files of one bucket, newest first.
pub async fn list_recent(state: &AppState, bucket: Option<&str>) -> AppResult<Vec<FileSummary>> {
    let bucket = require_bucket(bucket)?;
    let files = state
        .metadata
        .list_files(bucket, state.config.uploads.file_list_limit)
        .await?;
    Ok(files.into_iter().map(FileSummary::from).collect())
}
