use tracing::{error, info};

use crate::models::{AppState, MessageResponse};
use crate::types::{AppError, AppResult};

/// Remove a stored object and then its record.
///
/// If the object cannot be deleted the record stays. If the record cannot be
/// deleted afterwards the object is already gone; that is reported as a
/// success carrying a warning.
pub async fn delete_file(state: &AppState, id: &str) -> AppResult<MessageResponse> {
    if id.trim().is_empty() {
        return Err(AppError::InvalidRequest("Missing or invalid id".to_string()));
    }

    let file = state
        .metadata
        .find_file(id)
        .await?
        .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

    state
        .storage
        .delete_object(&file.bucket, &file.file_name)
        .await
        .map_err(|e| AppError::storage("Failed to delete file from storage", e))?;

    match state.metadata.delete_file(id).await {
        Ok(_) => {
            info!("Deleted {} from bucket {}", file.file_name, file.bucket);
            Ok(MessageResponse::new("File deleted successfully"))
        }
        Err(e) => {
            error!(
                "Object {}/{} deleted but record {} remains: {}",
                file.bucket, file.file_name, id, e
            );
            Ok(MessageResponse {
                message: "File deleted successfully".to_string(),
                warning: Some("File removed from storage but its record could not be deleted".to_string()),
            })
        }
    }
}
