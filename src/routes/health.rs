use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use tracing::warn;

use crate::models::{AppState, BucketAccessStatus, HealthResponse, StorageStatusQuery, StorageStatusResponse};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/storage/status", get(storage_status))
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match state.metadata.ping().await {
        Ok(()) => "connected".to_string(),
        Err(e) => {
            warn!("Health check: database unreachable: {}", e);
            "disconnected".to_string()
        }
    };

    let status = if database == "connected" { "ok" } else { "degraded" };

    Json(HealthResponse {
        status: status.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        database,
        storage: state.storage.kind().to_string(),
    })
}

/// Which provider is active and whether it answers. Credentials are reported
/// only as present or absent.
async fn storage_status(
    State(state): State<AppState>,
    Query(query): Query<StorageStatusQuery>,
) -> Json<StorageStatusResponse> {
    let (connected, connection_error) = match state.storage.list_buckets().await {
        Ok(_) => (true, None),
        Err(e) => (false, Some(e.to_string())),
    };

    let bucket = match query.bucket.filter(|b| !b.trim().is_empty()) {
        Some(name) => Some(match state.storage.bucket_exists(&name).await {
            Ok(true) => BucketAccessStatus {
                name,
                accessible: true,
                error: None,
            },
            Ok(false) => BucketAccessStatus {
                name,
                accessible: false,
                error: Some("Bucket does not exist".to_string()),
            },
            Err(e) => BucketAccessStatus {
                name,
                accessible: false,
                error: Some(e.to_string()),
            },
        }),
        None => None,
    };

    Json(StorageStatusResponse {
        provider: state.storage.kind().to_string(),
        has_cloud_credentials: state.config.storage.cloud.is_some(),
        connected,
        connection_error,
        bucket,
    })
}
