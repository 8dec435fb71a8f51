//! Answer a question about one stored file by handing its bytes to the model.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::{debug, info};

use crate::models::{AppState, GenerateResponse};
use crate::storage::StorageError;
use crate::types::{AppError, AppResult, LLMMessage, LLMRequest};

/// Coarse content type sent alongside the file bytes.
pub fn infer_mime_type(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => "application/pdf",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Single request/response; failures are returned as-is, never retried.
pub async fn ask_about_file(state: &AppState, file_id: &str, question: &str) -> AppResult<GenerateResponse> {
    if file_id.trim().is_empty() || question.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "File ID and question are required".to_string(),
        ));
    }

    let file = state
        .metadata
        .find_file(file_id)
        .await?
        .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

    let bytes = state
        .storage
        .get_object(&file.bucket, &file.file_name)
        .await
        .map_err(|e| match e {
            StorageError::ObjectNotFound { .. } => AppError::NotFound("File not found in storage".to_string()),
            other => AppError::storage("Failed to read file from storage", other),
        })?;

    let mime_type = infer_mime_type(&file.original_name);
    debug!(
        "Sending {} ({}, {} bytes) to the model",
        file.original_name,
        mime_type,
        bytes.len()
    );

    let request = LLMRequest {
        model: state.config.llm.gemini_model.clone(),
        messages: vec![LLMMessage::user_with_inline_data(
            question,
            STANDARD.encode(&bytes),
            mime_type,
        )],
    };

    let response = state.llm.create_chat_completion(&request).await?;
    info!(
        "Model answered question about {} ({} tokens)",
        file.original_name, response.usage.total_tokens
    );

    Ok(GenerateResponse {
        response: response.content,
        file_name: file.original_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MetadataStore;
    use crate::models::NewFile;
    use crate::storage::ObjectStorage;
    use crate::test_support::{memory_state, memory_state_with_llm, FailingAdapter};
    use std::sync::Arc;

    #[test]
    fn test_infer_mime_type() {
        assert_eq!(infer_mime_type("paper.PDF"), "application/pdf");
        assert_eq!(infer_mime_type("photo.jpg"), "image/jpeg");
        assert_eq!(infer_mime_type("photo.jpeg"), "image/jpeg");
        assert_eq!(infer_mime_type("diagram.png"), "image/png");
        assert_eq!(infer_mime_type("notes.txt"), "text/plain");
        assert_eq!(infer_mime_type("sheet.xlsx"), "application/octet-stream");
        assert_eq!(infer_mime_type("README"), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_ask_about_file_sends_bytes_and_question() {
        let (state, metadata, storage) = memory_state();
        storage.create_bucket("docs").await.unwrap();
        storage.put_object("docs", "abcde-notes.txt", b"hello", "text/plain").await.unwrap();
        let record = metadata
            .create_file(&NewFile {
                bucket: "docs".to_string(),
                file_name: "abcde-notes.txt".to_string(),
                original_name: "notes.txt".to_string(),
                size: 5,
            })
            .await
            .unwrap();

        let answer = ask_about_file(&state, &record.id, "What does it say?").await.unwrap();
        assert_eq!(answer.file_name, "notes.txt");
        // The echo adapter reflects question, media type and payload.
        assert_eq!(answer.response, "What does it say?|text/plain|aGVsbG8=");
    }

    #[tokio::test]
    async fn test_missing_record_and_missing_object() {
        let (state, metadata, storage) = memory_state();
        let missing = ask_about_file(&state, "nope", "q").await;
        assert!(matches!(missing, Err(AppError::NotFound(msg)) if msg == "File not found"));

        storage.create_bucket("docs").await.unwrap();
        let record = metadata
            .create_file(&NewFile {
                bucket: "docs".to_string(),
                file_name: "abcde-gone.txt".to_string(),
                original_name: "gone.txt".to_string(),
                size: 1,
            })
            .await
            .unwrap();
        let gone = ask_about_file(&state, &record.id, "q").await;
        assert!(matches!(gone, Err(AppError::NotFound(msg)) if msg == "File not found in storage"));
    }

    #[tokio::test]
    async fn test_model_failure_is_surfaced() {
        let (state, metadata, storage) = memory_state_with_llm(Arc::new(FailingAdapter));
        storage.create_bucket("docs").await.unwrap();
        storage.put_object("docs", "k-a.pdf", b"%PDF", "application/pdf").await.unwrap();
        let record = metadata
            .create_file(&NewFile {
                bucket: "docs".to_string(),
                file_name: "k-a.pdf".to_string(),
                original_name: "a.pdf".to_string(),
                size: 4,
            })
            .await
            .unwrap();

        let result = ask_about_file(&state, &record.id, "q").await;
        assert!(matches!(result, Err(AppError::LLMApi(_))));
    }

    #[tokio::test]
    async fn test_requires_both_fields() {
        let (state, _, _) = memory_state();
        assert!(matches!(ask_about_file(&state, "", "q").await, Err(AppError::InvalidRequest(_))));
        assert!(matches!(ask_about_file(&state, "id", " ").await, Err(AppError::InvalidRequest(_))));
    }
}
