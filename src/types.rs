// Type definitions shared across layers

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::access::password::PasswordError;
use crate::storage::StorageError;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LLMRequest {
    pub model: String,
    pub messages: Vec<LLMMessage>,
}

/// Content part for multimodal messages (text, inline file data)
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "inline_data")]
    InlineData {
        /// Base64-encoded payload
        data: String,
        media_type: String, // e.g., "application/pdf", "image/png"
    },
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LLMMessage {
    pub role: String, // "user", "model"
    pub parts: Vec<ContentPart>,
}

impl LLMMessage {
    /// Create a user message carrying a question plus one base64-encoded file
    pub fn user_with_inline_data(
        text: impl Into<String>,
        data: impl Into<String>,
        media_type: impl Into<String>,
    ) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![
                ContentPart::Text { text: text.into() },
                ContentPart::InlineData {
                    data: data.into(),
                    media_type: media_type.into(),
                },
            ],
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LLMResponse {
    pub content: String,
    pub finish_reason: String,
    pub usage: TokenUsage,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{context}: {source}")]
    Storage {
        context: String,
        #[source]
        source: StorageError,
    },

    #[error("LLM API error: {0}")]
    LLMApi(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Wrap a storage failure with a message describing the attempted operation.
    pub fn storage(context: impl Into<String>, source: StorageError) -> Self {
        AppError::Storage {
            context: context.into(),
            source,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Storage { source, .. } => match source {
                StorageError::ObjectNotFound { .. } | StorageError::BucketNotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                StorageError::InvalidBucketName { .. } | StorageError::EmptyObject => {
                    StatusCode::BAD_REQUEST
                }
                StorageError::ObjectExists { .. } => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Database(_) | AppError::LLMApi(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::storage("Storage operation failed", err)
    }
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::TooShort | PasswordError::TooLong => {
                AppError::InvalidRequest(err.to_string())
            }
            PasswordError::VerificationFailed => AppError::Auth("Invalid password".to_string()),
            PasswordError::HashError(_) | PasswordError::InvalidHash => {
                AppError::Internal(err.to_string())
            }
        }
    }
}

/// JSON body returned for every failure.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            AppError::Storage { context, source } => ErrorBody {
                error: context.clone(),
                details: Some(source.to_string()),
                suggestion: source.hint().map(str::to_string),
            },
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                ErrorBody {
                    error: "Database operation failed".to_string(),
                    details: None,
                    suggestion: None,
                }
            }
            AppError::LLMApi(msg) => ErrorBody {
                error: "Failed to generate response".to_string(),
                details: Some(msg.clone()),
                suggestion: None,
            },
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ErrorBody {
                    error: "Internal server error".to_string(),
                    details: None,
                    suggestion: None,
                }
            }
            AppError::Auth(msg)
            | AppError::NotFound(msg)
            | AppError::InvalidRequest(msg)
            | AppError::Conflict(msg) => ErrorBody {
                error: msg.clone(),
                details: None,
                suggestion: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;
