// Google Gemini adapter
// API Reference: https://ai.google.dev/api/generate-content

use crate::llm::provider::LLMAdapter;
use crate::types::{AppError, AppResult, ContentPart, LLMRequest, LLMResponse, TokenUsage};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub struct GeminiAdapter {
    client: Client,
    api_key: String,
    base_url: String,
}

// Request types for the generateContent endpoint
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiBlob,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiBlob {
    mime_type: String,
    data: String,
}

// Response types
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiResponseContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

#[derive(Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Deserialize)]
struct GeminiError {
    message: String,
    #[serde(default)]
    status: Option<String>,
}

impl GeminiAdapter {
    pub fn new(api_key: &str, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }

    fn convert_parts(parts: &[ContentPart]) -> Vec<GeminiPart> {
        parts
            .iter()
            .map(|part| match part {
                ContentPart::Text { text } => GeminiPart::Text { text: text.clone() },
                ContentPart::InlineData { data, media_type } => GeminiPart::InlineData {
                    inline_data: GeminiBlob {
                        mime_type: media_type.clone(),
                        data: data.clone(),
                    },
                },
            })
            .collect()
    }

    fn build_request(request: &LLMRequest) -> GeminiRequest {
        let contents = request
            .messages
            .iter()
            .map(|msg| GeminiContent {
                role: msg.role.clone(),
                parts: Self::convert_parts(&msg.parts),
            })
            .collect();

        GeminiRequest { contents }
    }
}

#[async_trait]
impl LLMAdapter for GeminiAdapter {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        if self.api_key.is_empty() {
            return Err(AppError::LLMApi("GEMINI_API_KEY is not configured".to_string()));
        }

        let response = self
            .client
            .post(self.endpoint(&request.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::build_request(request))
            .send()
            .await
            .map_err(|e| AppError::LLMApi(format!("Gemini request failed: {}", e)))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();

            if let Ok(error_response) = serde_json::from_str::<GeminiErrorResponse>(&error_text) {
                return Err(AppError::LLMApi(format!(
                    "Gemini API error ({}): {}{}",
                    status,
                    error_response.error.message,
                    error_response
                        .error
                        .status
                        .map(|s| format!(" [{}]", s))
                        .unwrap_or_default()
                )));
            }

            return Err(AppError::LLMApi(format!("Gemini API error ({}): {}", status, error_text)));
        }

        let gemini_response: GeminiResponse = response
            .json()
            .await
            .map_err(|e| AppError::LLMApi(format!("Failed to parse Gemini response: {}", e)))?;

        let candidate = gemini_response
            .candidates
            .first()
            .ok_or_else(|| AppError::LLMApi("Gemini returned no candidates".to_string()))?;

        let content: String = candidate
            .content
            .as_ref()
            .map(|c| c.parts.iter().filter_map(|p| p.text.as_deref()).collect())
            .unwrap_or_default();

        let usage = gemini_response.usage_metadata.unwrap_or_default();

        Ok(LLMResponse {
            content,
            finish_reason: candidate.finish_reason.clone().unwrap_or_else(|| "STOP".to_string()),
            usage: TokenUsage {
                prompt_tokens: usage.prompt_token_count,
                completion_tokens: usage.candidates_token_count,
                total_tokens: usage.total_token_count,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LLMMessage;
    use mockito::Matcher;

    fn request() -> LLMRequest {
        LLMRequest {
            model: "gemini-2.5-flash".to_string(),
            messages: vec![LLMMessage::user_with_inline_data(
                "Summarize this",
                "aGVsbG8=",
                "text/plain",
            )],
        }
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(GeminiAdapter::build_request(&request())).unwrap();
        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], "Summarize this");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "text/plain");
        assert_eq!(parts[1]["inlineData"]["data"], "aGVsbG8=");
        assert_eq!(body["contents"][0]["role"], "user");
        assert!(body.get("generationConfig").is_none());
    }

    #[tokio::test]
    async fn test_generate_content_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1beta/models/gemini-2.5-flash:generateContent")
            .match_header("x-goog-api-key", "test-key")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("Summarize this".to_string()),
                Matcher::Regex(r#""inlineData""#.to_string()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "candidates": [{
                        "content": {"parts": [{"text": "It says "}, {"text": "hello."}], "role": "model"},
                        "finishReason": "STOP"
                    }],
                    "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 4, "totalTokenCount": 16}
                }"#,
            )
            .create_async()
            .await;

        let adapter = GeminiAdapter::new("test-key", &server.url());
        let response = adapter.create_chat_completion(&request()).await.unwrap();

        assert_eq!(response.content, "It says hello.");
        assert_eq!(response.finish_reason, "STOP");
        assert_eq!(response.usage.total_tokens, 16);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_api_error_is_surfaced_with_detail() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1beta/models/gemini-2.5-flash:generateContent")
            .with_status(400)
            .with_body(r#"{"error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}}"#)
            .expect(1)
            .create_async()
            .await;

        let adapter = GeminiAdapter::new("bad-key", &server.url());
        let err = adapter.create_chat_completion(&request()).await.unwrap_err();

        match err {
            AppError::LLMApi(msg) => {
                assert!(msg.contains("API key not valid"));
                assert!(msg.contains("INVALID_ARGUMENT"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        // Not retried.
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_without_request() {
        let adapter = GeminiAdapter::new("", "http://127.0.0.1:9");
        assert!(matches!(
            adapter.create_chat_completion(&request()).await,
            Err(AppError::LLMApi(_))
        ));
    }
}
