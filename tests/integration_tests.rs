//! Integration tests for the colloquy library.
//!
//! The end-to-end tests run the chat loop against scripted services and an
//! on-disk history database.  The live tests require an API key in the
//! environment to run.

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use futures::StreamExt;
    use futures::stream;

    use colloquy::chat::{ChatSession, RecordingRenderer, ScriptedInput, SessionState};
    use colloquy::history::{HistoryStore, RECENT_CONVERSATIONS, RetryPolicy};
    use colloquy::{
        Client, CompletionRequest, CompletionService, Disposition, Error, EventStream, Failure,
        InferenceConfig, MessageParam, MessageRole, ModelCatalog, ModelInfo, ModelListParams,
        ModelListResponse, ModelSelector, ModelTarget, Reporter, Result, StreamEvent,
    };

    #[derive(Default)]
    struct ScriptedService {
        replies: Mutex<VecDeque<Vec<&'static str>>>,
        models: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl CompletionService for ScriptedService {
        async fn stream(&self, request: CompletionRequest) -> Result<EventStream> {
            self.models
                .lock()
                .unwrap()
                .push(request.target.model_id().to_string());
            let fragments = self.replies.lock().unwrap().pop_front().unwrap_or_default();
            let mut events: Vec<Result<StreamEvent>> = vec![Ok(StreamEvent::TurnStarted {
                role: MessageRole::Assistant,
            })];
            events.extend(fragments.into_iter().map(|f| Ok(StreamEvent::text(f))));
            Ok(Box::pin(stream::iter(events)))
        }
    }

    struct Catalog(Vec<ModelInfo>);

    impl Catalog {
        fn new(ids: &[&str]) -> Self {
            Self(
                ids.iter()
                    .map(|id| {
                        serde_json::from_value(serde_json::json!({
                            "id": id,
                            "created_at": "2025-01-01T00:00:00Z",
                            "display_name": id,
                            "type": "model",
                            "capabilities": {
                                "output_modalities": ["text"],
                                "response_streaming_supported": true
                            }
                        }))
                        .unwrap()
                    })
                    .collect(),
            )
        }
    }

    #[async_trait::async_trait]
    impl ModelCatalog for Catalog {
        async fn get_model(&self, model_id: &str) -> Result<ModelInfo> {
            self.0
                .iter()
                .find(|m| m.id == model_id)
                .cloned()
                .ok_or_else(|| Error::not_found(model_id, None, None))
        }

        async fn list_models(&self, _: Option<ModelListParams>) -> Result<ModelListResponse> {
            Ok(ModelListResponse::new(self.0.clone(), false, None, None))
        }
    }

    #[derive(Default)]
    struct CollectingReporter(Mutex<Vec<Failure>>);

    impl Reporter for CollectingReporter {
        fn report(&self, failure: &Failure) -> Disposition {
            self.0.lock().unwrap().push(failure.clone());
            Disposition::Continue
        }
    }

    #[tokio::test]
    async fn conversation_survives_restart_and_model_swap() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("history.db");
        let catalog: Arc<dyn ModelCatalog> = Arc::new(Catalog::new(&["chat-a", "chat-b"]));
        let reporter = Arc::new(CollectingReporter::default());

        // First process: two exchanges, switching models in between.
        let service = Arc::new(ScriptedService::default());
        service
            .replies
            .lock()
            .unwrap()
            .extend([vec!["Hi", " there"], vec!["Still", " here"]]);
        let selector = ModelSelector::resolve(catalog.clone(), "chat-a", None)
            .await
            .unwrap();
        let store = HistoryStore::open(&db_path, RetryPolicy::default())
            .await
            .unwrap();
        let mut session = ChatSession::new(
            service.clone(),
            selector,
            reporter.clone(),
            InferenceConfig::new(),
        )
        .with_store(store);
        let chat_id = session.chat_id().to_string();

        let mut input = ScriptedInput::new(["Hello\n", "\n", "/models\n", "2\n", "Again\n", "quit\n"]);
        let mut renderer = RecordingRenderer::new();
        session.run(&mut input, &mut renderer).await;

        assert_eq!(session.state(), SessionState::Terminated);
        assert_eq!(renderer.fragments(), vec!["Hi", " there", "Still", " here"]);
        assert_eq!(*service.models.lock().unwrap(), vec!["chat-a", "chat-b"]);
        assert_eq!(session.transcript().len(), 4);
        drop(session);

        // Second process: resume and check what was replayed.
        let service = Arc::new(ScriptedService::default());
        let selector = ModelSelector::resolve(catalog.clone(), "chat-a", None)
            .await
            .unwrap();
        let store = HistoryStore::open(&db_path, RetryPolicy::default())
            .await
            .unwrap();
        let mut session =
            ChatSession::new(service.clone(), selector, reporter.clone(), InferenceConfig::new())
                .with_store(store);
        assert_eq!(session.resume(chat_id.as_str()).await, 4);
        assert_eq!(
            session.transcript(),
            &[
                MessageParam::user("Hello"),
                MessageParam::assistant("Hi there"),
                MessageParam::user("Again"),
                MessageParam::assistant("Still here"),
            ]
        );
        let mut input = ScriptedInput::new(["/quit\n"]);
        session.run(&mut input, &mut RecordingRenderer::new()).await;
        assert!(service.models.lock().unwrap().is_empty());
        drop(session);

        let mut store = HistoryStore::open(&db_path, RetryPolicy::default())
            .await
            .unwrap();
        let summaries = store.list(RECENT_CONVERSATIONS).await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].chat_id, chat_id);
        assert_eq!(summaries[0].turn_count, 4);
        assert_eq!(summaries[0].latest.role, MessageRole::Assistant);
        assert!(reporter.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn opaque_reference_skips_catalog() {
        let catalog: Arc<dyn ModelCatalog> = Arc::new(Catalog::new(&[]));
        let selector = ModelSelector::resolve(catalog, "missing", Some("arn:profile/abc"))
            .await
            .unwrap();
        assert_eq!(selector.active(), &ModelTarget::reference("arn:profile/abc"));
    }

    #[tokio::test]
    async fn test_streaming_response() {
        // This test requires COLLOQUY_API_KEY to be set
        let api_key = std::env::var("COLLOQUY_API_KEY").ok();
        if api_key.is_none() {
            eprintln!("Skipping test: COLLOQUY_API_KEY not set");
            return;
        }

        let client = Client::new(api_key).expect("Failed to create client");
        let request = CompletionRequest::new(
            ModelTarget::catalog("claude-haiku-4-5"),
            vec![MessageParam::user("Count to 3")],
            InferenceConfig::new().with_max_tokens(20),
        );
        let mut events = client.stream(request).await.expect("stream should open");
        let mut text = String::new();
        while let Some(event) = events.next().await {
            if let StreamEvent::TextDelta { fragment } = event.expect("event should parse") {
                text.push_str(&fragment);
            }
        }
        assert!(!text.is_empty(), "expected some streamed text");
    }
}
