//! Tests for the flashcard generation orchestrator
//!
//! The OpenRouter client runs over a mocked transport and an in-memory
//! datastore, so every recorded row can be inspected.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use crate::error::{Result, ServiceError};
    use crate::flashcards::Source;
    use crate::generation::{GenerationConfig, GenerationService};
    use crate::services::openrouter::{
        MockChatTransport, OpenRouterClient, Role, TransportResponse, DEFAULT_MODEL,
    };
    use crate::storage::{
        Datastore, MemoryDatastore, Page, Query, Row, ERROR_LOGS_TABLE, GENERATIONS_TABLE,
    };
    use crate::util::text_hash;

    fn source_text() -> String {
        "Mitochondria are the powerhouse of the cell. ".repeat(30)
    }

    fn completion(content: &str) -> TransportResponse {
        TransportResponse::new(
            200,
            json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] })
                .to_string(),
        )
    }

    fn client(transport: MockChatTransport, max_retries: u32) -> Arc<OpenRouterClient> {
        Arc::new(
            OpenRouterClient::builder()
                .api_key("test-key")
                .max_retries(max_retries)
                .transport(Arc::new(transport))
                .build()
                .expect("Failed to build OpenRouter client"),
        )
    }

    fn service(client: Arc<OpenRouterClient>, store: Arc<dyn Datastore>) -> GenerationService {
        GenerationService::new(client, store, GenerationConfig::new("user-1")).unwrap()
    }

    async fn rows(store: &MemoryDatastore, table: &str) -> Vec<Row> {
        store.select(table, &Query::new()).await.unwrap().rows
    }

    /// Datastore whose error log table rejects every write
    struct BrokenErrorLog {
        inner: MemoryDatastore,
    }

    #[async_trait]
    impl Datastore for BrokenErrorLog {
        async fn insert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>> {
            if table == ERROR_LOGS_TABLE {
                return Err(ServiceError::database("error_logs is read-only"));
            }
            self.inner.insert(table, rows).await
        }

        async fn select(&self, table: &str, query: &Query) -> Result<Page> {
            self.inner.select(table, query).await
        }

        async fn update(&self, table: &str, query: &Query, patch: Row) -> Result<Vec<Row>> {
            self.inner.update(table, query, patch).await
        }

        async fn delete(&self, table: &str, query: &Query) -> Result<usize> {
            self.inner.delete(table, query).await
        }
    }

    #[tokio::test]
    async fn test_generate_flashcards_records_generation() {
        let text = source_text();
        let expected_user_message = format!("Generate flashcards from the following text:\n\n{}", text);

        let mut transport = MockChatTransport::new();
        transport
            .expect_post_chat_completion()
            .times(1)
            .withf(move |request| {
                request.model == DEFAULT_MODEL
                    && request.messages.len() == 2
                    && request.messages[0].role == Role::System
                    && request.messages[0].content.contains("flashcards")
                    && request.messages[1].content == expected_user_message
                    && request.parameters.temperature == 0.7
                    && request.parameters.top_p == 1.0
                    && request
                        .response_format
                        .as_ref()
                        .map(|f| f.json_schema["name"] == "flashcards")
                        .unwrap_or(false)
            })
            .returning(|_| {
                Ok(completion(
                    r#"{"flashcards":[{"front":"What is the powerhouse of the cell?","back":"Mitochondria"},{"front":"Q2","back":"A2"}]}"#,
                ))
            });

        let store = Arc::new(MemoryDatastore::new());
        let service = service(client(transport, 3), store.clone());

        let response = service.generate_flashcards(&text).await.unwrap();

        assert_eq!(response.generated_count, 2);
        assert_eq!(response.flashcards_proposals.len(), 2);
        assert_eq!(response.flashcards_proposals[0].back, "Mitochondria");
        assert!(response
            .flashcards_proposals
            .iter()
            .all(|p| p.source == Source::AiGenerated));

        let generations = rows(&store, GENERATIONS_TABLE).await;
        assert_eq!(generations.len(), 1);
        let row = &generations[0];
        assert_eq!(row["id"], response.generation_id);
        assert_eq!(row["user_id"], "user-1");
        assert_eq!(row["model"], DEFAULT_MODEL);
        assert_eq!(row["source_text_hash"], Value::from(text_hash(&text)));
        assert_eq!(row["source_text_length"], text.chars().count());
        assert_eq!(row["generated_count"], 2);
        assert!(row["generation_duration"].is_u64());

        assert!(rows(&store, ERROR_LOGS_TABLE).await.is_empty());
    }

    #[tokio::test]
    async fn test_reply_without_flashcards_is_logged() {
        let mut transport = MockChatTransport::new();
        transport
            .expect_post_chat_completion()
            .times(1)
            .returning(|_| Ok(completion(r#"{"cards":[]}"#)));

        let store = Arc::new(MemoryDatastore::new());
        let service = service(client(transport, 3), store.clone());
        let text = source_text();

        let result = service.generate_flashcards(&text).await;
        assert!(matches!(result, Err(ServiceError::InvalidGenerationResponse(_))));

        assert!(rows(&store, GENERATIONS_TABLE).await.is_empty());

        let logs = rows(&store, ERROR_LOGS_TABLE).await;
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0]["error_code"], "INVALID_GENERATION_RESPONSE");
        assert_eq!(logs[0]["user_id"], "user-1");
        assert_eq!(logs[0]["model"], DEFAULT_MODEL);
        assert_eq!(logs[0]["source_text_hash"], Value::from(text_hash(&text)));
        assert_eq!(logs[0]["source_text_length"], text.chars().count());
        assert!(logs[0]["error_message"].as_str().unwrap().contains("flashcards"));
    }

    #[tokio::test]
    async fn test_upstream_failure_is_logged() {
        let mut transport = MockChatTransport::new();
        transport
            .expect_post_chat_completion()
            .times(1)
            .returning(|_| Ok(TransportResponse::new(500, "Internal Server Error")));

        let store = Arc::new(MemoryDatastore::new());
        let service = service(client(transport, 1), store.clone());

        let result = service.generate_flashcards(&source_text()).await;
        assert!(matches!(
            result,
            Err(ServiceError::MaxRetriesExceeded { attempts: 1, .. })
        ));

        let logs = rows(&store, ERROR_LOGS_TABLE).await;
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0]["error_code"], "MAX_RETRIES_EXCEEDED");
    }

    #[tokio::test]
    async fn test_short_source_text_fails_before_any_call() {
        let mut transport = MockChatTransport::new();
        transport.expect_post_chat_completion().times(0);

        let store = Arc::new(MemoryDatastore::new());
        let service = service(client(transport, 3), store.clone());

        for text in ["", "   ", "too short"] {
            let result = service.generate_flashcards(text).await;
            assert!(matches!(result, Err(ServiceError::InvalidSourceText(_))));
        }

        let too_long = "x".repeat(10_001);
        assert!(matches!(
            service.generate_flashcards(&too_long).await,
            Err(ServiceError::InvalidSourceText(_))
        ));

        assert!(rows(&store, ERROR_LOGS_TABLE).await.is_empty());
    }

    #[tokio::test]
    async fn test_error_log_failure_keeps_original_error() {
        let mut transport = MockChatTransport::new();
        transport
            .expect_post_chat_completion()
            .times(1)
            .returning(|_| Ok(completion("not json at all")));

        let store = Arc::new(BrokenErrorLog {
            inner: MemoryDatastore::new(),
        });
        let service = service(client(transport, 3), store);

        let result = service.generate_flashcards(&source_text()).await;
        assert!(matches!(result, Err(ServiceError::InvalidGenerationResponse(_))));
    }

    #[test]
    fn test_user_id_is_required() {
        let client = client(MockChatTransport::new(), 3);
        let store: Arc<dyn Datastore> = Arc::new(MemoryDatastore::new());

        let result = GenerationService::new(client.clone(), store.clone(), GenerationConfig::new("  "));
        assert!(matches!(result, Err(ServiceError::Configuration(_))));

        let service = GenerationService::new(
            client,
            store,
            GenerationConfig::new("user-1").with_model("anthropic/claude-3-haiku"),
        )
        .unwrap();
        assert_eq!(service.config().model, "anthropic/claude-3-haiku");
    }
}
