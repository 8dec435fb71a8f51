use axum::{extract::State, routing::post, Json, Router};
use validator::Validate;

use crate::access;
use crate::models::{AppState, AuthenticateResponse, BucketCredentials, CreateBucketResponse};
use crate::types::{AppError, AppResult};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/bucket/create", post(create_bucket))
        .route("/api/bucket/authenticate", post(authenticate))
        .with_state(state)
}

fn validate_credentials(credentials: &BucketCredentials) -> AppResult<()> {
    credentials.validate().map_err(|e| {
        let message = e
            .field_errors()
            .values()
            .flat_map(|errors| errors.iter())
            .find_map(|error| error.message.as_ref().map(|m| m.to_string()))
            .unwrap_or_else(|| "Bucket name and password are required".to_string());
        AppError::InvalidRequest(message)
    })
}

async fn create_bucket(
    State(state): State<AppState>,
    Json(credentials): Json<BucketCredentials>,
) -> AppResult<Json<CreateBucketResponse>> {
    validate_credentials(&credentials)?;
    let response = access::create_bucket(&state, &credentials.bucket_name, &credentials.password).await?;
    Ok(Json(response))
}

async fn authenticate(
    State(state): State<AppState>,
    Json(credentials): Json<BucketCredentials>,
) -> AppResult<Json<AuthenticateResponse>> {
    validate_credentials(&credentials)?;
    let bucket = access::authenticate(&state, &credentials.bucket_name, &credentials.password).await?;
    Ok(Json(AuthenticateResponse {
        message: "Authentication successful".to_string(),
        bucket_name: bucket.name,
    }))
}
