//! Bucket access gate: password-protected buckets.
//!
//! A client may only address a bucket after presenting its password. Creation
//! provisions the provider-side bucket first and writes the record second, so
//! a record never points at a bucket that does not exist.

pub mod password;

use tracing::{info, warn};

use crate::models::{AppState, BucketInfo, BucketRecord, CreateBucketResponse, StorageSetupInfo};
use crate::storage::{bucket::check_bucket_name, ensure_bucket};
use crate::types::{AppError, AppResult};

pub use password::{hash_password, validate_password, verify_password, PasswordError, MIN_PASSWORD_LENGTH};

fn require_fields(bucket_name: &str, password: &str) -> AppResult<()> {
    if bucket_name.trim().is_empty() || password.is_empty() {
        return Err(AppError::InvalidRequest(
            "Bucket name and password are required".to_string(),
        ));
    }
    Ok(())
}

/// Check a bucket password.
///
/// Unknown buckets are `NotFound`, wrong passwords `Auth`.
pub async fn authenticate(state: &AppState, bucket_name: &str, password: &str) -> AppResult<BucketRecord> {
    require_fields(bucket_name, password)?;

    let bucket = state
        .metadata
        .find_bucket_by_name(bucket_name)
        .await?
        .ok_or_else(|| AppError::NotFound("Bucket not found".to_string()))?;

    verify_password(password, &bucket.password_hash).map_err(|e| {
        if matches!(e, PasswordError::VerificationFailed) {
            info!("Rejected password for bucket {}", bucket_name);
        }
        AppError::from(e)
    })?;

    info!("Authenticated access to bucket {}", bucket_name);
    Ok(bucket)
}

/// Provision a new password-protected bucket.
///
/// All validation happens before any network call. The storage bucket is
/// created (or adopted, if we already own it) before the record is inserted.
pub async fn create_bucket(state: &AppState, bucket_name: &str, password: &str) -> AppResult<CreateBucketResponse> {
    require_fields(bucket_name, password)?;
    check_bucket_name(bucket_name).map_err(|e| match e {
        crate::storage::StorageError::InvalidBucketName { reason, .. } => {
            AppError::InvalidRequest(format!("Invalid bucket name: {}", reason))
        }
        other => AppError::from(other),
    })?;
    validate_password(password)?;

    if state.metadata.find_bucket_by_name(bucket_name).await?.is_some() {
        return Err(AppError::Conflict("Bucket name already exists".to_string()));
    }

    let password_hash = hash_password(password)?;

    let setup = ensure_bucket(state.storage.as_ref(), bucket_name, &state.cors)
        .await
        .map_err(|e| {
            warn!("Storage setup failed for bucket {}: {}", bucket_name, e);
            AppError::storage("Failed to create storage bucket", e)
        })?;

    let record = state.metadata.create_bucket(bucket_name, &password_hash).await?;
    info!("Bucket {} registered ({})", record.name, setup.message);

    Ok(CreateBucketResponse {
        success: true,
        message: "Bucket created successfully".to_string(),
        bucket: BucketInfo {
            id: record.id,
            name: record.name,
            created_at: record.created_at,
        },
        storage: StorageSetupInfo {
            message: setup.message,
            cors_configured: setup.cors_configured,
            provider: state.storage.kind().to_string(),
        },
    })
}
