use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{info, warn};

use crate::files::{self, IncomingFile};
use crate::models::{
    AppState, DirectUploadResponse, FileSummary, ListFilesQuery, MessageResponse, PresignedUploadRequest,
    PresignedUrlDescriptor, SaveInfoRequest,
};
use crate::types::{AppError, AppResult};

pub fn router(state: AppState) -> Router {
    let upload_limit = state.config.uploads.max_upload_bytes;

    Router::new()
        .route("/api/files", get(list_files))
        .route("/api/files/upload/presignedUrl", post(request_upload_urls))
        .route("/api/files/upload/saveInfo", post(save_info))
        .route(
            "/api/files/upload/smallFiles",
            post(upload_small_files).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/files/download/presignedUrl/{id}", get(download_url))
        .route("/api/files/download/smallFiles/{id}", get(download_small_file))
        .route("/api/files/delete/{id}", delete(delete_file))
        .with_state(state)
}

async fn list_files(
    State(state): State<AppState>,
    Query(query): Query<ListFilesQuery>,
) -> AppResult<Json<Vec<FileSummary>>> {
    let files = files::list_recent(&state, query.bucket.as_deref()).await?;
    Ok(Json(files))
}

async fn request_upload_urls(
    State(state): State<AppState>,
    Json(request): Json<PresignedUploadRequest>,
) -> AppResult<Json<Vec<PresignedUrlDescriptor>>> {
    info!("Presigned upload requested for {} files", request.files.len());
    Ok(Json(files::request_upload_urls(&state, &request).await?))
}

async fn save_info(
    State(state): State<AppState>,
    Json(request): Json<SaveInfoRequest>,
) -> AppResult<Json<MessageResponse>> {
    Ok(Json(files::save_uploaded(&state, &request).await?))
}

/// Multipart body: one or more `files` parts plus a `bucketName` text part.
/// `?bucket=` is accepted as well.
async fn upload_small_files(
    State(state): State<AppState>,
    Query(query): Query<ListFilesQuery>,
    mut multipart: Multipart,
) -> AppResult<Json<DirectUploadResponse>> {
    let mut bucket = query.bucket;
    let mut incoming = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        warn!("Failed to read multipart field: {}", e);
        AppError::InvalidRequest("Invalid multipart data".to_string())
    })? {
        let name = field.name().unwrap_or("").to_string();

        if name == "bucketName" {
            bucket = Some(field.text().await.map_err(|e| {
                warn!("Failed to read bucket name: {}", e);
                AppError::InvalidRequest("Invalid bucket name field".to_string())
            })?);
            continue;
        }

        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let data = field.bytes().await.map_err(|e| {
            warn!("Failed to read file content: {}", e);
            AppError::InvalidRequest(format!("Failed to read file {}", file_name))
        })?;
        incoming.push(IncomingFile {
            original_name: file_name,
            data,
        });
    }

    Ok(Json(files::upload_direct(&state, bucket.as_deref(), incoming).await?))
}

async fn download_url(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<String>> {
    Ok(Json(files::presigned_download_url(&state, &id).await?))
}

async fn download_small_file(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Response> {
    let download = files::fetch_for_download(&state, &id).await?;

    Ok((
        [
            (header::CONTENT_TYPE, download.content_type),
            (
                header::CONTENT_DISPOSITION,
                files::content_disposition_header(&download.original_name),
            ),
        ],
        download.data,
    )
        .into_response())
}

async fn delete_file(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<MessageResponse>> {
    Ok(Json(files::delete_file(&state, &id).await?))
}
