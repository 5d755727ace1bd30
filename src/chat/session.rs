//! Core chat session management.
//!
//! [`ChatSession`] owns the conversation: its id, the in-memory transcript
//! that seeds every request, the active model, and the history store.  It
//! reads lines, dispatches them, and reports every failure through the
//! injected [`Reporter`] before going back to waiting for input.

use std::sync::Arc;

use uuid::Uuid;

use crate::chat::commands::{Command, classify};
use crate::chat::input::{InputSource, read_turn_input};
use crate::error::Error;
use crate::history::{HistoryStore, Turn};
use crate::inference::InferenceConfig;
use crate::models::{ModelSelector, ModelTarget};
use crate::observability::{SESSION_TURN_FAILURES, SESSION_TURNS};
use crate::render::{Renderer, SessionEvent};
use crate::report::{Disposition, Failure, FailureKind, Reporter, Severity};
use crate::service::{CompletionRequest, CompletionService};
use crate::stream::{Interrupt, send_and_consume};
use crate::types::MessageParam;

const COMPONENT: &str = "chat_session";

/// Where the session is in its loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Constructed, loop not started.
    Idle,
    /// Waiting for the next line.
    AwaitingInput,
    /// Classifying and routing a line.
    Dispatching,
    /// Consuming the assistant's reply.
    AwaitingStreamedResponse,
    /// Writing the finished exchange to the store.
    Persisting,
    /// Done.  No further input is read.
    Terminated,
}

/// Whether the loop should keep reading input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Read the next line.
    Continue,
    /// Stop.
    Terminate,
}

impl From<Disposition> for Flow {
    fn from(disposition: Disposition) -> Self {
        match disposition {
            Disposition::Continue => Flow::Continue,
            Disposition::Terminate => Flow::Terminate,
        }
    }
}

/// A single interactive conversation.
pub struct ChatSession {
    service: Arc<dyn CompletionService>,
    selector: ModelSelector,
    reporter: Arc<dyn Reporter>,
    inference: InferenceConfig,
    store: Option<HistoryStore>,
    chat_id: String,
    transcript: Vec<MessageParam>,
    state: SessionState,
    notices: Vec<SessionEvent>,
    interrupt: Interrupt,
}

impl ChatSession {
    /// Creates an idle session for a fresh conversation.
    ///
    /// If both temperature and top-p are set, the conflict is reported once
    /// here and temperature is used for every request.
    pub fn new(
        service: Arc<dyn CompletionService>,
        selector: ModelSelector,
        reporter: Arc<dyn Reporter>,
        inference: InferenceConfig,
    ) -> Self {
        let mut session = Self {
            service,
            selector,
            reporter,
            inference,
            store: None,
            chat_id: Uuid::new_v4().to_string(),
            transcript: Vec::new(),
            state: SessionState::Idle,
            notices: Vec::new(),
            interrupt: Interrupt::new(),
        };
        if let Some(message) = inference.sampling_conflict() {
            let failure =
                Failure::warning(FailureKind::Validation, "sampling_conflict", message, COMPONENT);
            session.record(failure);
        }
        session
    }

    /// Persists every exchange to `store`.
    pub fn with_store(mut self, store: HistoryStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Lets `interrupt` stop responses while they stream.
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Continues the conversation `chat_id`.
    ///
    /// Prior turns are loaded from the store and become the transcript.
    /// Returns how many turns were replayed.  A store failure is reported and
    /// the session carries on with an empty transcript.
    pub async fn resume(&mut self, chat_id: impl Into<String>) -> usize {
        self.chat_id = chat_id.into();
        self.transcript.clear();
        let Some(store) = self.store.as_mut() else {
            return 0;
        };
        match store.get_turns(&self.chat_id).await {
            Ok(turns) => {
                self.transcript = seed_transcript(&turns);
                tracing::info!(
                    chat_id = %self.chat_id,
                    stored = turns.len(),
                    replayed = self.transcript.len(),
                    "resumed conversation"
                );
                self.transcript.len()
            }
            Err(err) => {
                let failure = Failure::from_error(&err, "get_turns", "history_store");
                self.record(failure);
                0
            }
        }
    }

    /// The conversation key.
    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    /// The turns every new request is seeded with.
    pub fn transcript(&self) -> &[MessageParam] {
        &self.transcript
    }

    /// Where the session is in its loop.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The model requests go to.
    pub fn active_model(&self) -> &ModelTarget {
        self.selector.active()
    }

    /// True when exchanges are being persisted.
    pub fn has_store(&self) -> bool {
        self.store.is_some()
    }

    /// Reads and dispatches lines until told to quit or the input ends.
    pub async fn run(&mut self, input: &mut dyn InputSource, renderer: &mut dyn Renderer) {
        self.flush_notices(renderer);
        while self.state != SessionState::Terminated {
            self.state = SessionState::AwaitingInput;
            let line = match read_turn_input(input) {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(err) => {
                    self.report(Failure::from_error(&err, "read_line", "input"), renderer);
                    break;
                }
            };
            if self.handle_line(&line, input, renderer).await == Flow::Terminate {
                break;
            }
        }
        self.state = SessionState::Terminated;
        tracing::info!(chat_id = %self.chat_id, "session ended");
    }

    /// Handles one raw input line.
    pub async fn handle_line(
        &mut self,
        line: &str,
        input: &mut dyn InputSource,
        renderer: &mut dyn Renderer,
    ) -> Flow {
        self.flush_notices(renderer);
        self.state = SessionState::Dispatching;
        let flow = match classify(line) {
            Command::Terminate => {
                self.state = SessionState::Terminated;
                return Flow::Terminate;
            }
            Command::BrowseModels => match self.selector.browse(input, renderer).await {
                Ok(_) => Flow::Continue,
                Err(err) => {
                    self.report(Failure::from_error(&err, "browse", "model_selector"), renderer)
                }
            },
            Command::OrdinaryTurn(text) if text.trim().is_empty() => Flow::Continue,
            Command::OrdinaryTurn(text) => self.send_turn(&text, renderer).await,
        };
        self.state = match flow {
            Flow::Continue => SessionState::AwaitingInput,
            Flow::Terminate => SessionState::Terminated,
        };
        flow
    }

    /// Runs one exchange: send `text`, stream the reply, persist both.
    ///
    /// A failed exchange is reported and dropped from the transcript; the
    /// session stays usable.
    pub async fn send_turn(&mut self, text: &str, renderer: &mut dyn Renderer) -> Flow {
        SESSION_TURNS.click();
        let previous_len = self.transcript.len();
        self.transcript.push(MessageParam::user(text));

        let target = self.selector.active().clone();
        let request = CompletionRequest::new(target.clone(), self.transcript.clone(), self.inference);

        self.state = SessionState::AwaitingStreamedResponse;
        let reply = match renderer.render(SessionEvent::TurnStarted {
            model: target.model_id().to_string(),
        }) {
            Ok(()) => {
                send_and_consume(self.service.as_ref(), request, renderer, &self.interrupt).await
            }
            Err(err) => Err(Error::render("could not display response", Some(err))),
        };
        if let Err(err) = renderer.render(SessionEvent::TurnFinished) {
            tracing::debug!(error = %err, "could not finish turn output");
        }

        let reply = match reply {
            Ok(reply) => reply,
            Err(err) => {
                SESSION_TURN_FAILURES.click();
                self.transcript.truncate(previous_len);
                let failure = Failure::from_error(&err, "send_turn", "completion_stream")
                    .with_metadata("model", target.model_id());
                return self.report(failure, renderer);
            }
        };
        self.transcript.push(MessageParam::assistant(reply.as_str()));

        self.state = SessionState::Persisting;
        let Some(store) = self.store.as_mut() else {
            return Flow::Continue;
        };
        match store.append_exchange(&self.chat_id, text, &reply).await {
            Ok((user_id, assistant_id)) => {
                let event = SessionEvent::TurnPersisted {
                    chat_id: self.chat_id.clone(),
                    user_id,
                    assistant_id,
                };
                if let Err(err) = renderer.render(event) {
                    tracing::debug!(error = %err, "could not render persistence notice");
                }
                Flow::Continue
            }
            Err(err) => {
                let failure = Failure::from_error(&err, "append_exchange", "history_store");
                self.report(failure, renderer)
            }
        }
    }

    /// Hands a failure to the reporter and shows its user-facing message.
    fn report(&mut self, failure: Failure, renderer: &mut dyn Renderer) -> Flow {
        let failure = failure.with_chat_id(self.chat_id.as_str());
        let event = notice_for(&failure);
        if let Err(err) = renderer.render(event) {
            tracing::debug!(error = %err, "could not render failure");
        }
        self.reporter.report(&failure).into()
    }

    /// Reports a failure now and shows it once a renderer is available.
    fn record(&mut self, failure: Failure) {
        let failure = failure.with_chat_id(self.chat_id.as_str());
        self.notices.push(notice_for(&failure));
        if self.reporter.report(&failure) == Disposition::Terminate {
            self.state = SessionState::Terminated;
        }
    }

    fn flush_notices(&mut self, renderer: &mut dyn Renderer) {
        for event in self.notices.drain(..) {
            if let Err(err) = renderer.render(event) {
                tracing::debug!(error = %err, "could not render notice");
            }
        }
    }
}

fn notice_for(failure: &Failure) -> SessionEvent {
    match failure.severity {
        Severity::Info => SessionEvent::Info(failure.user_message.clone()),
        Severity::Warning => SessionEvent::Warning(failure.user_message.clone()),
        Severity::Error | Severity::Critical => SessionEvent::Error(failure.user_message.clone()),
    }
}

/// Rebuilds a transcript from stored turns, oldest first.
fn seed_transcript(turns: &[Turn]) -> Vec<MessageParam> {
    turns.iter().map(Turn::to_message).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use futures::{StreamExt, stream};
    use rusqlite::Connection;

    use super::*;
    use crate::chat::input::ScriptedInput;
    use crate::error::Result;
    use crate::history::{NewTurn, RetryPolicy};
    use crate::render::RecordingRenderer;
    use crate::service::{EventStream, ModelCatalog};
    use crate::types::{MessageRole, ModelInfo, ModelListParams, ModelListResponse, StreamEvent};

    #[derive(Default)]
    struct FakeService {
        replies: Mutex<VecDeque<Vec<Result<StreamEvent>>>>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl FakeService {
        fn replying(replies: Vec<Vec<Result<StreamEvent>>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::default(),
            })
        }

        fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl CompletionService for FakeService {
        async fn stream(&self, request: CompletionRequest) -> Result<EventStream> {
            self.requests.lock().unwrap().push(request);
            let events = self.replies.lock().unwrap().pop_front().unwrap_or_default();
            Ok(Box::pin(stream::iter(events)))
        }
    }

    struct NoCatalog;

    #[async_trait::async_trait]
    impl ModelCatalog for NoCatalog {
        async fn get_model(&self, _: &str) -> Result<ModelInfo> {
            Err(Error::not_found("no catalog", None, None))
        }

        async fn list_models(&self, _: Option<ModelListParams>) -> Result<ModelListResponse> {
            Err(Error::not_found("no catalog", None, None))
        }
    }

    #[derive(Default)]
    struct RecordingReporter {
        failures: Mutex<Vec<Failure>>,
    }

    impl RecordingReporter {
        fn codes(&self) -> Vec<&'static str> {
            self.failures.lock().unwrap().iter().map(|f| f.code).collect()
        }
    }

    impl Reporter for RecordingReporter {
        fn report(&self, failure: &Failure) -> Disposition {
            self.failures.lock().unwrap().push(failure.clone());
            Disposition::Continue
        }
    }

    fn reply(fragments: &[&str]) -> Vec<Result<StreamEvent>> {
        let mut events = vec![Ok(StreamEvent::TurnStarted {
            role: MessageRole::Assistant,
        })];
        events.extend(fragments.iter().map(|f| Ok(StreamEvent::text(*f))));
        events.push(Ok(StreamEvent::unknown("message_stop")));
        events
    }

    fn session(
        service: Arc<FakeService>,
        target: ModelTarget,
        reporter: Arc<RecordingReporter>,
        inference: InferenceConfig,
    ) -> ChatSession {
        let selector = ModelSelector::new(Arc::new(NoCatalog), target);
        ChatSession::new(service, selector, reporter, inference)
    }

    async fn memory_store() -> HistoryStore {
        HistoryStore::open_in_memory(RetryPolicy::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn fresh_exchange_renders_and_persists() {
        let service = FakeService::replying(vec![reply(&["Hi", " there"])]);
        let reporter = Arc::new(RecordingReporter::default());
        let mut session = session(
            service.clone(),
            ModelTarget::catalog("chat-1"),
            reporter.clone(),
            InferenceConfig::new(),
        )
        .with_store(memory_store().await);
        assert_eq!(session.state(), SessionState::Idle);

        let mut input = ScriptedInput::new(["Hello\n"]);
        let mut renderer = RecordingRenderer::new();
        session.run(&mut input, &mut renderer).await;

        assert_eq!(renderer.fragments(), vec!["Hi", " there"]);
        assert_eq!(
            session.transcript(),
            &[MessageParam::user("Hello"), MessageParam::assistant("Hi there")]
        );
        assert_eq!(session.state(), SessionState::Terminated);
        assert!(reporter.codes().is_empty());

        let chat_id = session.chat_id().to_string();
        let turns = session.store.as_mut().unwrap().get_turns(&chat_id).await.unwrap();
        let rows: Vec<_> = turns.iter().map(|t| (t.role, t.text.as_str())).collect();
        assert_eq!(
            rows,
            vec![
                (MessageRole::User, "Hello"),
                (MessageRole::Assistant, "Hi there")
            ]
        );
        assert!(renderer.events().iter().any(|e| matches!(
            e,
            SessionEvent::TurnPersisted { chat_id: id, .. } if *id == chat_id
        )));
    }

    #[tokio::test]
    async fn resume_replays_then_quit_adds_nothing() {
        let mut store = memory_store().await;
        store
            .append(&NewTurn::new("abc", MessageRole::User, "earlier question"))
            .await
            .unwrap();
        store
            .append(&NewTurn::new("abc", MessageRole::Assistant, "earlier answer"))
            .await
            .unwrap();

        let service = FakeService::replying(vec![]);
        let reporter = Arc::new(RecordingReporter::default());
        let mut session = session(
            service.clone(),
            ModelTarget::catalog("chat-1"),
            reporter,
            InferenceConfig::new(),
        )
        .with_store(store);
        assert_eq!(session.resume("abc").await, 2);
        assert_eq!(
            session.transcript(),
            &[
                MessageParam::user("earlier question"),
                MessageParam::assistant("earlier answer")
            ]
        );

        let mut input = ScriptedInput::new(["/quit\n", "never read\n"]);
        let mut renderer = RecordingRenderer::new();
        session.run(&mut input, &mut renderer).await;

        assert_eq!(input.remaining(), 1);
        assert!(service.requests().is_empty());
        let turns = session.store.as_mut().unwrap().get_turns("abc").await.unwrap();
        assert_eq!(turns.len(), 2);
    }

    #[tokio::test]
    async fn quit_with_zero_turns() {
        for line in ["quit\n", "/quit\n"] {
            let service = FakeService::replying(vec![]);
            let mut session = session(
                service.clone(),
                ModelTarget::catalog("chat-1"),
                Arc::new(RecordingReporter::default()),
                InferenceConfig::new(),
            );
            let mut input = ScriptedInput::new([line]);
            let mut renderer = RecordingRenderer::new();
            let flow = session.handle_line(line, &mut input, &mut renderer).await;
            assert_eq!(flow, Flow::Terminate);
            assert_eq!(session.state(), SessionState::Terminated);
            assert!(service.requests().is_empty());
        }
    }

    #[tokio::test]
    async fn opaque_reference_used_for_every_request() {
        let service = FakeService::replying(vec![reply(&["a"]), reply(&["b"])]);
        let mut session = session(
            service.clone(),
            ModelTarget::reference("arn:profile/abc"),
            Arc::new(RecordingReporter::default()),
            InferenceConfig::new(),
        );
        let mut input = ScriptedInput::new(["one\n", "two\n"]);
        let mut renderer = RecordingRenderer::new();
        session.run(&mut input, &mut renderer).await;

        let requests = service.requests();
        assert_eq!(requests.len(), 2);
        assert!(
            requests
                .iter()
                .all(|r| r.to_params().model == "arn:profile/abc")
        );
        // The second request carries the first exchange.
        assert_eq!(requests[1].messages.len(), 3);
    }

    #[tokio::test]
    async fn failed_stream_is_discarded_and_loop_continues() {
        let service = FakeService::replying(vec![
            vec![
                Ok(StreamEvent::text("partial")),
                Err(Error::streaming("reset", None)),
            ],
            reply(&["ok"]),
        ]);
        let reporter = Arc::new(RecordingReporter::default());
        let mut session = session(
            service.clone(),
            ModelTarget::catalog("chat-1"),
            reporter.clone(),
            InferenceConfig::new(),
        )
        .with_store(memory_store().await);
        let mut input = ScriptedInput::new(["first\n", "second\n"]);
        let mut renderer = RecordingRenderer::new();
        session.run(&mut input, &mut renderer).await;

        assert_eq!(reporter.codes(), vec!["stream_interrupted"]);
        assert_eq!(renderer.errors().len(), 1);
        assert_eq!(
            session.transcript(),
            &[MessageParam::user("second"), MessageParam::assistant("ok")]
        );
        let chat_id = session.chat_id().to_string();
        let turns = session.store.as_mut().unwrap().get_turns(&chat_id).await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].text, "second");
    }

    #[tokio::test]
    async fn render_failure_discards_turn() {
        let service = FakeService::replying(vec![reply(&["one", "two"])]);
        let reporter = Arc::new(RecordingReporter::default());
        let mut session = session(
            service,
            ModelTarget::catalog("chat-1"),
            reporter.clone(),
            InferenceConfig::new(),
        );
        let mut renderer = RecordingRenderer::failing_after(1);
        let flow = session.send_turn("hi", &mut renderer).await;
        assert_eq!(flow, Flow::Continue);
        assert_eq!(reporter.codes(), vec!["render_failed"]);
        assert!(session.transcript().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_store_is_reported_and_loop_continues() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.db");
        let store = HistoryStore::open(&path, RetryPolicy::new(Duration::from_millis(10), 3))
            .await
            .unwrap();
        let locker = Connection::open(&path).unwrap();
        locker.execute_batch("BEGIN EXCLUSIVE").unwrap();

        let service = FakeService::replying(vec![reply(&["a"]), reply(&["b"])]);
        let reporter = Arc::new(RecordingReporter::default());
        let mut session = session(
            service.clone(),
            ModelTarget::catalog("chat-1"),
            reporter.clone(),
            InferenceConfig::new(),
        )
        .with_store(store);
        let mut input = ScriptedInput::new(["one\n", "two\n"]);
        let mut renderer = RecordingRenderer::new();
        session.run(&mut input, &mut renderer).await;

        assert_eq!(service.requests().len(), 2);
        assert_eq!(
            reporter.codes(),
            vec!["store_retries_exhausted", "store_retries_exhausted"]
        );
        let failures = reporter.failures.lock().unwrap();
        assert_eq!(failures[0].metadata.get("attempts").map(String::as_str), Some("3"));
        assert!(failures[0].recoverable);
        assert_eq!(failures[0].chat_id.as_deref(), Some(session.chat_id()));
        // The conversation itself carries on in memory.
        assert_eq!(session.transcript().len(), 4);
    }

    #[tokio::test]
    async fn sampling_conflict_reported_once() {
        let service = FakeService::replying(vec![reply(&["a"]), reply(&["b"])]);
        let reporter = Arc::new(RecordingReporter::default());
        let inference = InferenceConfig::new()
            .with_temperature(Some(0.3))
            .with_top_p(Some(0.9));
        let mut session = session(
            service.clone(),
            ModelTarget::catalog("chat-1"),
            reporter.clone(),
            inference,
        );
        let mut input = ScriptedInput::new(["one\n", "two\n"]);
        let mut renderer = RecordingRenderer::new();
        session.run(&mut input, &mut renderer).await;

        assert_eq!(reporter.codes(), vec!["sampling_conflict"]);
        assert_eq!(renderer.warnings().len(), 1);
        for request in service.requests() {
            let params = request.to_params();
            assert_eq!(params.temperature, Some(0.3));
            assert_eq!(params.top_p, None);
        }
    }

    #[tokio::test]
    async fn browse_failure_is_reported() {
        let service = FakeService::replying(vec![]);
        let reporter = Arc::new(RecordingReporter::default());
        let mut session = session(
            service,
            ModelTarget::catalog("chat-1"),
            reporter.clone(),
            InferenceConfig::new(),
        );
        let mut input = ScriptedInput::new(Vec::<String>::new());
        let mut renderer = RecordingRenderer::new();
        let flow = session.handle_line("/models\n", &mut input, &mut renderer).await;
        assert_eq!(flow, Flow::Continue);
        assert_eq!(session.state(), SessionState::AwaitingInput);
        assert_eq!(reporter.codes(), vec!["remote_service"]);
        assert_eq!(session.active_model(), &ModelTarget::catalog("chat-1"));
    }

    #[tokio::test]
    async fn rejected_reply_row_leaves_no_partial_exchange() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.db");
        let store = HistoryStore::open(&path, RetryPolicy::default())
            .await
            .unwrap();
        Connection::open(&path)
            .unwrap()
            .execute_batch(
                "CREATE TRIGGER reject_replies BEFORE INSERT ON chats
                 WHEN NEW.persona = 'Assistant'
                 BEGIN SELECT RAISE(ABORT, 'replies rejected'); END;",
            )
            .unwrap();

        let service = FakeService::replying(vec![reply(&["Hi"])]);
        let reporter = Arc::new(RecordingReporter::default());
        let mut session = session(
            service,
            ModelTarget::catalog("chat-1"),
            reporter.clone(),
            InferenceConfig::new(),
        )
        .with_store(store);
        let mut renderer = RecordingRenderer::new();
        let flow = session.send_turn("Hello", &mut renderer).await;
        assert_eq!(flow, Flow::Continue);
        assert_eq!(reporter.codes().len(), 1);
        assert_eq!(renderer.errors().len(), 1);

        let chat_id = session.chat_id().to_string();
        let rows = session.store.as_mut().unwrap().get_turns(&chat_id).await.unwrap();
        assert!(rows.is_empty());
        let replayed = session.resume(chat_id.as_str()).await;
        assert_eq!(replayed, rows.len());
    }

    struct HangingService;

    #[async_trait::async_trait]
    impl CompletionService for HangingService {
        async fn stream(&self, _: CompletionRequest) -> Result<EventStream> {
            Ok(Box::pin(
                stream::iter(vec![Ok(StreamEvent::text("thinking"))]).chain(stream::pending()),
            ))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn interrupt_abandons_hung_turn() {
        let interrupt = Interrupt::new();
        let reporter = Arc::new(RecordingReporter::default());
        let selector = ModelSelector::new(Arc::new(NoCatalog), ModelTarget::catalog("chat-1"));
        let mut session = ChatSession::new(
            Arc::new(HangingService),
            selector,
            reporter.clone(),
            InferenceConfig::new(),
        )
        .with_store(memory_store().await)
        .with_interrupt(interrupt.clone());

        let signal = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            interrupt.request()
        });
        let mut renderer = RecordingRenderer::new();
        let flow = session.send_turn("Hello", &mut renderer).await;

        assert!(signal.await.unwrap());
        assert_eq!(flow, Flow::Continue);
        assert_eq!(reporter.codes(), vec!["stream_interrupted"]);
        assert!(session.transcript().is_empty());
        let chat_id = session.chat_id().to_string();
        let rows = session.store.as_mut().unwrap().get_turns(&chat_id).await.unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn seeding_replays_every_row() {
        let at = time::OffsetDateTime::UNIX_EPOCH;
        let turn = |id, role, text: &str| Turn {
            id,
            chat_id: "c".to_string(),
            role,
            text: text.to_string(),
            created_at: at,
        };
        let turns = vec![
            turn(1, MessageRole::User, "q1"),
            turn(2, MessageRole::Assistant, "a1"),
            turn(3, MessageRole::User, "q2"),
            turn(4, MessageRole::Assistant, "a2"),
        ];
        assert_eq!(
            seed_transcript(&turns),
            vec![
                MessageParam::user("q1"),
                MessageParam::assistant("a1"),
                MessageParam::user("q2"),
                MessageParam::assistant("a2"),
            ]
        );
    }
}
