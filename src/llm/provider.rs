use async_trait::async_trait;
use std::sync::Arc;

use crate::config::LLMConfig;
use crate::types::{AppResult, LLMRequest, LLMResponse};

#[async_trait]
pub trait LLMAdapter: Send + Sync {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse>;
}

/// Build the adapter configured for this process.
pub fn build_adapter(config: &LLMConfig) -> Arc<dyn LLMAdapter> {
    if config.gemini_api_key.is_empty() {
        tracing::warn!("GEMINI_API_KEY is not set; /api/llm/generate will fail");
    }
    Arc::new(crate::llm::google::GeminiAdapter::new(
        &config.gemini_api_key,
        &config.gemini_api_base,
    ))
}
