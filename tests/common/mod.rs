#![allow(dead_code)]

use async_trait::async_trait;
use axum_test::TestServer;
use std::sync::Arc;

use bucketbox::config::*;
use bucketbox::db::MemoryMetadataStore;
use bucketbox::llm::LLMAdapter;
use bucketbox::storage::MemoryStorage;
use bucketbox::types::{AppResult, ContentPart, LLMRequest, LLMResponse, TokenUsage};
use bucketbox::{create_router, AppState};

pub const PASSWORD: &str = "s3cret!";

pub fn config() -> Config {
    Config {
        server: ServerConfig {
            port: 0,
            host: "127.0.0.1".to_string(),
            environment: Environment::Development,
            cors_allowed_origins: vec![],
            site_url: None,
        },
        database: DatabaseConfig {
            url: "postgres://unused".to_string(),
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

/// Answers with the media type and size of the attached file.
pub struct DescribeAdapter;

#[async_trait]
impl LLMAdapter for DescribeAdapter {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        let mut question = String::new();
        let mut attachment = String::new();
        if let Some(message) = request.messages.first() {
            for part in &message.parts {
                match part {
                    ContentPart::Text { text } => question = text.clone(),
                    ContentPart::InlineData { data, media_type } => {
                        attachment = format!("{} base64:{}", media_type, data)
                    }
                }
            }
        }
        Ok(LLMResponse {
            content: format!("{} -> {}", question, attachment),
            finish_reason: "STOP".to_string(),
            usage: TokenUsage::default(),
        })
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub storage: Arc<MemoryStorage>,
    pub metadata: Arc<MemoryMetadataStore>,
}

pub fn spawn_with(config: Config, llm: Arc<dyn LLMAdapter>) -> TestApp {
    let storage = Arc::new(MemoryStorage::new());
    let metadata = Arc::new(MemoryMetadataStore::new());
    let state = AppState::new(config, metadata.clone(), storage.clone(), llm);
    let server = TestServer::new(create_router(state)).expect("test server");
    TestApp {
        server,
        storage,
        metadata,
    }
}

pub fn spawn() -> TestApp {
    spawn_with(config(), Arc::new(DescribeAdapter))
}

impl TestApp {
    pub async fn create_bucket(&self, name: &str) {
        self.server
            .post("/api/bucket/create")
            .json(&serde_json::json!({ "bucketName": name, "password": PASSWORD }))
            .await
            .assert_status_ok();
    }
}
