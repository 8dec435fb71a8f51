//! Shared fixtures for unit tests.

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::*;
use crate::db::MemoryMetadataStore;
use crate::llm::LLMAdapter;
use crate::models::AppState;
use crate::storage::MemoryStorage;
use crate::types::{AppError, AppResult, ContentPart, LLMRequest, LLMResponse, TokenUsage};

pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            port: 3000,
            host: "127.0.0.1".to_string(),
            environment: Environment::Development,
            cors_allowed_origins: vec!["http://localhost:3000".to_string()],
            site_url: None,
        },
        database: DatabaseConfig {
            url: "postgres://localhost/bucketbox_test".to_string(),
            max_connections: 1,
            min_connections: 1,
        },
        storage: StorageConfig {
            cloud: None,
            local: LocalStorageConfig {
                endpoint: "localhost".to_string(),
                port: 9000,
                access_key: "minioadmin".to_string(),
                secret_key: "minioadmin".to_string(),
                use_ssl: false,
            },
        },
        llm: LLMConfig {
            gemini_api_key: "test-key".to_string(),
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_api_base: DEFAULT_GEMINI_API_BASE.to_string(),
        },
        uploads: UploadConfig {
            presigned_url_expiry_secs: DEFAULT_PRESIGNED_EXPIRY_SECS,
            max_upload_bytes: 1024 * 1024,
            verify_uploads: false,
            file_list_limit: 10,
        },
    }
}

/// Replies with `question|media_type|base64` of the first message.
pub struct EchoAdapter;

#[async_trait]
impl LLMAdapter for EchoAdapter {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        let content = request
            .messages
            .first()
            .map(|m| {
                m.parts
                    .iter()
                    .map(|p| match p {
                        ContentPart::Text { text } => text.clone(),
                        ContentPart::InlineData { data, media_type } => format!("{}|{}", media_type, data),
                    })
                    .collect::<Vec<_>>()
                    .join("|")
            })
            .unwrap_or_default();
        Ok(LLMResponse {
            content,
            finish_reason: "STOP".to_string(),
            usage: TokenUsage::default(),
        })
    }
}

pub struct FailingAdapter;

#[async_trait]
impl LLMAdapter for FailingAdapter {
    async fn create_chat_completion(&self, _request: &LLMRequest) -> AppResult<LLMResponse> {
        Err(AppError::LLMApi("Gemini API error (503): overloaded".to_string()))
    }
}

pub fn memory_state_with_llm(
    llm: Arc<dyn LLMAdapter>,
) -> (AppState, Arc<MemoryMetadataStore>, Arc<MemoryStorage>) {
    let metadata = Arc::new(MemoryMetadataStore::new());
    let storage = Arc::new(MemoryStorage::new());
    let state = AppState::new(test_config(), metadata.clone(), storage.clone(), llm);
    (state, metadata, storage)
}

pub fn memory_state() -> (AppState, Arc<MemoryMetadataStore>, Arc<MemoryStorage>) {
    memory_state_with_llm(Arc::new(EchoAdapter))
}
