//! Streaming chat use case.
//!
//! [`StreamingChatClient`] owns one conversation: it appends turns, opens a
//! streaming request per user message, decodes the response incrementally and
//! keeps the assistant turn up to date as tokens arrive.
//!
//! # Exchange lifecycle
//!
//! ```text
//! send_message
//!   ├─ append user turn + streaming placeholder   (before any I/O)
//!   ├─ open_stream ──► chunk ──► SseDecoder ──► ChatEvent::classify
//!   │                     ▲                          │
//!   │                     └──────── next chunk ◄─────┘ (until Done / Error)
//!   └─ finalize: Completed | Failed | Cancelled
//! ```
//!
//! Only one exchange runs at a time; a second `send_message` while one is
//! streaming is rejected with [`ChatError::StreamInFlight`].

use crate::error::ChatError;
use crate::ports::chat_observer::{ChatObserver, NoChatObserver};
use crate::ports::chat_transport::{ChatRequest, ChatTransport};
use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger,
};
use futures::StreamExt;
use ragdesk_domain::util::preview;
use ragdesk_domain::{
    ChatEvent, ChatMode, Conversation, ConversationTurn, SessionIdUpdate, SseDecoder, SseRecord,
    StreamSession, TurnId,
};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How a finished exchange ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    /// Terminal record received (or the body ended cleanly).
    Completed { content: String },
    /// Transport, protocol or server error. The turn shows the error text.
    Failed(ChatError),
    /// Cancelled through [`StreamingChatClient::abort_stream`].
    Cancelled { content: String },
}

impl StreamOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, StreamOutcome::Completed { .. })
    }
}

struct ChatState {
    conversation: Conversation,
    session: StreamSession,
    mode: ChatMode,
    /// Present exactly while an exchange is in flight.
    in_flight: Option<CancellationToken>,
}

/// Client for one streaming conversation.
///
/// All state sits behind a single mutex that is only held for synchronous
/// updates, never across an `.await`, so snapshots taken from other tasks
/// always see whole tokens.
pub struct StreamingChatClient {
    transport: Arc<dyn ChatTransport>,
    state: Mutex<ChatState>,
    observer: Arc<dyn ChatObserver>,
    conversation_logger: Arc<dyn ConversationLogger>,
}

impl StreamingChatClient {
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            transport,
            state: Mutex::new(ChatState {
                conversation: Conversation::new(),
                session: StreamSession::new(),
                mode: ChatMode::default(),
                in_flight: None,
            }),
            observer: Arc::new(NoChatObserver),
            conversation_logger: Arc::new(NoConversationLogger),
        }
    }

    /// Set the mode used for requests.
    pub fn with_mode(self, mode: ChatMode) -> Self {
        self.state().mode = mode;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ChatObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.conversation_logger = logger;
        self
    }

    // ==================== Snapshots ====================

    pub fn turns(&self) -> Vec<ConversationTurn> {
        self.state().conversation.turns().to_vec()
    }

    /// True while an exchange is in flight.
    pub fn is_streaming(&self) -> bool {
        self.state().in_flight.is_some()
    }

    pub fn session_id(&self) -> Option<String> {
        self.state().session.session_id().map(str::to_string)
    }

    pub fn sources(&self) -> Vec<String> {
        self.state().session.sources().to_vec()
    }

    pub fn analytics(&self) -> Option<Value> {
        self.state().session.analytics().cloned()
    }

    pub fn mode(&self) -> ChatMode {
        self.state().mode
    }

    // ==================== Operations ====================

    /// Send a user message and stream the assistant's reply into the
    /// conversation.
    ///
    /// Failures and cancellation end up in the returned [`StreamOutcome`] and
    /// in the assistant turn; the only `Err` is [`ChatError::StreamInFlight`].
    pub async fn send_message(&self, content: &str) -> Result<StreamOutcome, ChatError> {
        let (turn_id, request, cancel) = {
            let mut state = self.state();
            if state.in_flight.is_some() {
                return Err(ChatError::StreamInFlight);
            }
            let turn_id = state
                .conversation
                .begin_exchange(content)
                .ok_or(ChatError::StreamInFlight)?;
            let cancel = CancellationToken::new();
            state.in_flight = Some(cancel.clone());
            let request = ChatRequest::new(
                content,
                state.mode,
                state.session.session_id().map(str::to_string),
            );
            (turn_id, request, cancel)
        };

        info!(
            "Sending message ({} mode, session {:?}): {}",
            request.mode,
            request.session_id,
            preview(content, 80)
        );
        if let Some(user_turn) = self.user_turn_before(turn_id) {
            self.observer.on_exchange_started(&user_turn);
        }

        let result = self.run_stream(turn_id, &request, &cancel).await;
        Ok(self.finalize(turn_id, &request, result))
    }

    /// Empty the turn list. The session id is kept; any in-flight stream is
    /// cancelled since its turn no longer exists.
    pub fn clear_messages(&self) {
        let mut state = self.state();
        if let Some(cancel) = &state.in_flight {
            cancel.cancel();
        }
        state.conversation.clear();
        debug!("Conversation cleared");
    }

    /// Cancel the in-flight request. No-op when nothing is streaming.
    pub fn abort_stream(&self) {
        if let Some(cancel) = &self.state().in_flight {
            info!("Aborting in-flight stream");
            cancel.cancel();
        }
    }

    /// Forget the backend session so the next message starts a new one.
    pub fn reset_session(&self) {
        self.state().session.reset();
        debug!("Stream session reset");
    }

    /// Switch mode: clears the conversation and starts a new backend session.
    pub fn switch_mode(&self, mode: ChatMode) -> Result<(), ChatError> {
        let mut state = self.state();
        if state.in_flight.is_some() {
            return Err(ChatError::StreamInFlight);
        }
        state.mode = mode;
        state.conversation.clear();
        state.session.reset();
        info!("Switched to {} mode", mode);
        Ok(())
    }

    /// Replace the conversation with a stored session's history and continue
    /// that backend session.
    pub fn restore(
        &self,
        session_id: &str,
        turns: Vec<ConversationTurn>,
    ) -> Result<(), ChatError> {
        let mut state = self.state();
        if state.in_flight.is_some() {
            return Err(ChatError::StreamInFlight);
        }
        state.conversation.clear();
        for turn in turns {
            state.conversation.push_restored(turn);
        }
        state.session = StreamSession::resumed(session_id);
        info!(
            "Restored session {} ({} turns)",
            session_id,
            state.conversation.len()
        );
        Ok(())
    }

    // ==================== Internals ====================

    fn state(&self) -> MutexGuard<'_, ChatState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn user_turn_before(&self, assistant: TurnId) -> Option<ConversationTurn> {
        let state = self.state();
        let turns = state.conversation.turns();
        let index = turns.iter().position(|t| t.id() == assistant)?;
        index.checked_sub(1).map(|i| turns[i].clone())
    }

    /// Read the response until a terminal record, the end of the body, an
    /// error or cancellation.
    async fn run_stream(
        &self,
        turn_id: TurnId,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<(), ChatError> {
        let mut body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ChatError::Cancelled),
            opened = self.transport.open_stream(request) => opened?,
        };

        let mut decoder = SseDecoder::new();
        loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ChatError::Cancelled),
                chunk = body.next() => chunk,
            };

            match chunk {
                Some(Ok(bytes)) => {
                    decoder.feed(&bytes);
                    while let Some(record) = decoder.next_record() {
                        if self.apply_record(turn_id, &record?)? {
                            return Ok(());
                        }
                    }
                }
                Some(Err(e)) => return Err(e.into()),
                None => {
                    if let Some(record) = decoder.finish() {
                        if self.apply_record(turn_id, &record?)? {
                            return Ok(());
                        }
                    }
                    warn!("Stream closed without a terminal record");
                    return Ok(());
                }
            }
        }
    }

    /// Apply one record. Returns `Ok(true)` once the response is complete.
    fn apply_record(&self, turn_id: TurnId, record: &SseRecord) -> Result<bool, ChatError> {
        let event = ChatEvent::classify(record)?;
        let terminal = event.is_terminal();
        match event {
            ChatEvent::Start {
                session_id,
                sources,
            } => {
                {
                    let mut state = self.state();
                    if let Some(id) = &session_id {
                        match state.session.offer_session_id(id) {
                            SessionIdUpdate::Captured => debug!("Session started: {}", id),
                            SessionIdUpdate::Unchanged => {}
                            SessionIdUpdate::Conflicting(other) => warn!(
                                "Ignoring session id {} (conversation uses {:?})",
                                other,
                                state.session.session_id()
                            ),
                        }
                    }
                    state.session.replace_sources(sources.clone());
                }
                self.observer
                    .on_stream_start(session_id.as_deref(), &sources);
            }
            ChatEvent::Token(chunk) => {
                let appended = self.state().conversation.append_token(turn_id, &chunk);
                if appended {
                    self.observer.on_token(&chunk);
                } else {
                    debug!("Dropping token for a turn that is no longer streaming");
                }
            }
            ChatEvent::Done {
                content,
                sources,
                analytics,
            } => {
                {
                    let mut state = self.state();
                    // Servers that skip token records still send the full text here.
                    let empty = state
                        .conversation
                        .get(turn_id)
                        .is_some_and(|t| t.content().is_empty());
                    if empty && !content.is_empty() {
                        state.conversation.append_token(turn_id, &content);
                    }
                    state.conversation.complete(turn_id);
                    if let Some(sources) = sources {
                        state.session.replace_sources(sources);
                    }
                    if analytics.is_some() {
                        state.session.replace_analytics(analytics.clone());
                    }
                }
                if let Some(analytics) = &analytics {
                    self.observer.on_analytics(analytics);
                }
            }
            ChatEvent::Error(message) => return Err(ChatError::Server(message)),
            ChatEvent::Unknown(value) => {
                debug!("Ignoring unrecognised stream record: {}", value);
            }
        }
        Ok(terminal)
    }

    fn finalize(
        &self,
        turn_id: TurnId,
        request: &ChatRequest,
        result: Result<(), ChatError>,
    ) -> StreamOutcome {
        let (outcome, turn, session_id, sources) = {
            let mut state = self.state();
            state.in_flight = None;
            let outcome = match result {
                Ok(()) => {
                    state.conversation.complete(turn_id);
                    let content = state
                        .conversation
                        .get(turn_id)
                        .map(|t| t.content().to_string())
                        .unwrap_or_default();
                    StreamOutcome::Completed { content }
                }
                Err(e) if e.is_cancelled() => {
                    let content = state
                        .conversation
                        .cancel(turn_id)
                        .map(|t| t.content().to_string())
                        .unwrap_or_default();
                    StreamOutcome::Cancelled { content }
                }
                Err(e) => {
                    state.conversation.fail(turn_id, &e.to_string());
                    StreamOutcome::Failed(e)
                }
            };
            (
                outcome,
                state.conversation.get(turn_id).cloned(),
                state.session.session_id().map(str::to_string),
                state.session.sources().to_vec(),
            )
        };

        match &outcome {
            StreamOutcome::Completed { content } => {
                info!("Response complete ({} bytes)", content.len());
                if let Some(turn) = &turn {
                    self.observer.on_complete(turn);
                }
            }
            StreamOutcome::Failed(e) => {
                warn!("Response failed: {}", e);
                self.observer.on_error(e);
            }
            StreamOutcome::Cancelled { content } => {
                info!("Response cancelled ({} bytes kept)", content.len());
                self.observer.on_cancelled(turn.as_ref());
            }
        }

        let (event_type, detail) = match &outcome {
            StreamOutcome::Completed { .. } => ("exchange_completed", None),
            StreamOutcome::Failed(e) => ("exchange_failed", Some(e.to_string())),
            StreamOutcome::Cancelled { .. } => ("exchange_cancelled", None),
        };
        self.conversation_logger.log(ConversationEvent::new(
            event_type,
            serde_json::json!({
                "mode": request.mode.as_str(),
                "session_id": session_id,
                "question": request.message,
                "answer": turn.as_ref().map(|t| t.content()),
                "sources": sources,
                "error": detail,
            }),
        ));

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::chat_transport::{ByteStream, TransportError};
    use async_trait::async_trait;
    use futures::channel::mpsc;
    use ragdesk_domain::{CANCELLED_MARKER, Role};
    use std::collections::VecDeque;
    use std::time::Duration;

    // ==================== Test doubles ====================

    /// Serves one scripted response per request.
    struct ScriptedTransport {
        responses: Mutex<VecDeque<Result<Vec<Vec<u8>>, TransportError>>>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<Result<Vec<Vec<u8>>, TransportError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<ChatRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatTransport for ScriptedTransport {
        async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream, TransportError> {
            self.requests.lock().unwrap().push(request.clone());
            let chunks = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("no scripted response left")?;
            Ok(futures::stream::iter(chunks.into_iter().map(Ok)).boxed())
        }
    }

    /// Hands out a live channel so tests control when bytes arrive.
    struct ChannelTransport {
        body: Mutex<Option<mpsc::UnboundedReceiver<Result<Vec<u8>, TransportError>>>>,
    }

    #[async_trait]
    impl ChatTransport for ChannelTransport {
        async fn open_stream(&self, _request: &ChatRequest) -> Result<ByteStream, TransportError> {
            let rx = self.body.lock().unwrap().take().expect("stream opened twice");
            Ok(rx.boxed())
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        events: Mutex<Vec<String>>,
    }

    impl RecordingObserver {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }

        fn push(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl ChatObserver for RecordingObserver {
        fn on_stream_start(&self, session_id: Option<&str>, sources: &[String]) {
            self.push(format!("start:{:?}:{}", session_id, sources.join(",")));
        }
        fn on_token(&self, chunk: &str) {
            self.push(format!("token:{}", chunk));
        }
        fn on_analytics(&self, analytics: &Value) {
            self.push(format!("analytics:{}", analytics));
        }
        fn on_complete(&self, turn: &ConversationTurn) {
            self.push(format!("complete:{}", turn.content()));
        }
        fn on_error(&self, error: &ChatError) {
            self.push(format!("error:{}", error));
        }
        fn on_cancelled(&self, _turn: Option<&ConversationTurn>) {
            self.push("cancelled".to_string());
        }
    }

    // ==================== Wire helpers ====================

    fn start(session_id: &str, sources: &[&str]) -> String {
        format!(
            "event: start\r\ndata: {}\r\n\r\n",
            serde_json::json!({"sources": sources, "session_id": session_id})
        )
    }

    fn token(content: &str) -> String {
        format!(
            "event: token\r\ndata: {}\r\n\r\n",
            serde_json::json!({"content": content})
        )
    }

    fn done(content: &str, sources: &[&str], analytics: Value) -> String {
        format!(
            "event: done\r\ndata: {}\r\n\r\n",
            serde_json::json!({"content": content, "sources": sources, "analytics": analytics})
        )
    }

    fn body(records: &[String]) -> Vec<Vec<u8>> {
        vec![records.concat().into_bytes()]
    }

    fn happy_body(session_id: &str, tokens: &[&str], sources: &[&str]) -> Vec<Vec<u8>> {
        let mut records = vec![start(session_id, sources)];
        records.extend(tokens.iter().map(|t| token(t)));
        records.push(done(&tokens.concat(), sources, Value::Null));
        body(&records)
    }

    fn streaming_count(client: &StreamingChatClient) -> usize {
        client.turns().iter().filter(|t| t.is_streaming()).count()
    }

    // ==================== Tests ====================

    #[tokio::test]
    async fn sequential_sends_alternate_user_and_assistant() {
        let transport = ScriptedTransport::new(vec![
            Ok(happy_body("s-1", &["one"], &[])),
            Ok(happy_body("s-1", &["two"], &[])),
            Ok(happy_body("s-1", &["three"], &[])),
        ]);
        let client = StreamingChatClient::new(transport.clone());

        for question in ["q1", "q2", "q3"] {
            let outcome = client.send_message(question).await.unwrap();
            assert!(outcome.is_completed());
        }

        let turns = client.turns();
        assert_eq!(turns.len(), 6);
        for (i, turn) in turns.iter().enumerate() {
            let expected = if i % 2 == 0 { Role::User } else { Role::Assistant };
            assert_eq!(turn.role(), expected);
            assert!(!turn.is_streaming());
        }
        assert_eq!(turns[0].content(), "q1");
        assert_eq!(turns[3].content(), "two");
        assert_eq!(turns[5].content(), "three");
        assert!(!client.is_streaming());
    }

    #[tokio::test]
    async fn records_after_done_are_not_read() {
        let transport = ScriptedTransport::new(vec![Ok(body(&[
            start("s-1", &[]),
            token("Hi"),
            done("Hi", &[], Value::Null),
            token(" again"),
            "data: not json\r\n\r\n".to_string(),
        ]))]);
        let client = StreamingChatClient::new(transport);

        let outcome = client.send_message("hello").await.unwrap();

        match outcome {
            StreamOutcome::Completed { content } => assert_eq!(content, "Hi"),
            other => panic!("expected completion, got {:?}", other),
        }
        assert_eq!(client.turns()[1].content(), "Hi");
    }

    #[tokio::test]
    async fn tokens_concatenate_regardless_of_chunking() {
        let wire = [
            start("s-1", &[]),
            token("A"),
            token("B"),
            token("C"),
            done("ABC", &[], Value::Null),
        ]
        .concat()
        .into_bytes();

        for chunk_size in [1, 2, 3, 7, 16, wire.len()] {
            let chunks: Vec<Vec<u8>> = wire.chunks(chunk_size).map(<[u8]>::to_vec).collect();
            let client = StreamingChatClient::new(ScriptedTransport::new(vec![Ok(chunks)]));

            let outcome = client.send_message("letters").await.unwrap();

            assert_eq!(
                outcome,
                StreamOutcome::Completed {
                    content: "ABC".to_string()
                },
                "chunk size {}",
                chunk_size
            );
            assert_eq!(client.turns()[1].content(), "ABC");
        }
    }

    #[tokio::test]
    async fn session_id_is_captured_then_reused() {
        let transport = ScriptedTransport::new(vec![
            Ok(happy_body("s-1", &["a"], &[])),
            Ok(happy_body("s-2", &["b"], &[])),
        ]);
        let client = StreamingChatClient::new(transport.clone()).with_mode(ChatMode::Analytics);

        client.send_message("first").await.unwrap();
        assert_eq!(client.session_id().as_deref(), Some("s-1"));

        client.send_message("second").await.unwrap();
        assert_eq!(client.session_id().as_deref(), Some("s-1"));

        let requests = transport.requests();
        assert_eq!(requests[0].session_id, None);
        assert_eq!(requests[1].session_id.as_deref(), Some("s-1"));
        assert_eq!(requests[1].mode, ChatMode::Analytics);
    }

    #[tokio::test]
    async fn clear_messages_keeps_session_and_reset_discards_it() {
        let transport = ScriptedTransport::new(vec![Ok(happy_body("s-1", &["a"], &["doc"]))]);
        let client = StreamingChatClient::new(transport);
        client.send_message("first").await.unwrap();

        client.clear_messages();
        assert!(client.turns().is_empty());
        assert_eq!(client.session_id().as_deref(), Some("s-1"));

        client.reset_session();
        assert_eq!(client.session_id(), None);
        assert!(client.sources().is_empty());
    }

    #[tokio::test]
    async fn http_500_finalizes_turn_with_error_text() {
        let transport = ScriptedTransport::new(vec![Err(TransportError::Status {
            status: 500,
            message: "Internal Server Error".to_string(),
        })]);
        let observer = Arc::new(RecordingObserver::default());
        let client = StreamingChatClient::new(transport).with_observer(observer.clone());

        let outcome = client.send_message("hello").await.unwrap();

        assert!(matches!(
            outcome,
            StreamOutcome::Failed(ChatError::Transport(TransportError::Status { status: 500, .. }))
        ));
        let assistant = &client.turns()[1];
        assert!(!assistant.is_streaming());
        assert!(assistant.content().contains("error"));
        assert!(assistant.content().contains("HTTP 500"));
        assert_eq!(observer.events().len(), 1);
        assert!(observer.events()[0].starts_with("error:"));
        assert!(!client.is_streaming());
    }

    #[tokio::test]
    async fn server_error_record_fails_the_exchange() {
        let wire = [
            start("s-1", &[]),
            token("par"),
            "event: error\r\ndata: {\"message\": \"retrieval failed\"}\r\n\r\n".to_string(),
        ];
        let client = StreamingChatClient::new(ScriptedTransport::new(vec![Ok(body(&wire))]));

        let outcome = client.send_message("q").await.unwrap();

        assert_eq!(
            outcome,
            StreamOutcome::Failed(ChatError::Server("retrieval failed".to_string()))
        );
        assert_eq!(
            client.turns()[1].content(),
            "Sorry, an error occurred: Server error: retrieval failed"
        );
    }

    #[tokio::test]
    async fn malformed_complete_line_is_fatal() {
        let wire = vec![start("s-1", &[]), "data: {\"content\": oops}\n\n".to_string()];
        let client = StreamingChatClient::new(ScriptedTransport::new(vec![Ok(body(&wire))]));

        let outcome = client.send_message("q").await.unwrap();

        assert!(matches!(outcome, StreamOutcome::Failed(ChatError::Protocol(_))));
        assert!(client.turns()[1].content().contains("error"));
    }

    #[tokio::test]
    async fn record_split_mid_json_is_not_an_error() {
        let record = token("Hello");
        let (head, tail) = record.as_bytes().split_at(record.len() / 2);
        let chunks = vec![
            start("s-1", &[]).into_bytes(),
            head.to_vec(),
            tail.to_vec(),
            done("Hello", &[], Value::Null).into_bytes(),
        ];
        let client = StreamingChatClient::new(ScriptedTransport::new(vec![Ok(chunks)]));

        let outcome = client.send_message("q").await.unwrap();
        assert_eq!(
            outcome,
            StreamOutcome::Completed {
                content: "Hello".to_string()
            }
        );
    }

    #[tokio::test]
    async fn body_ending_without_terminal_record_keeps_text() {
        // Last record has no trailing newline at all
        let chunks = vec![
            start("s-1", &[]).into_bytes(),
            token("partial").into_bytes(),
            b"data: {\"content\": \" tail\"}".to_vec(),
        ];
        let client = StreamingChatClient::new(ScriptedTransport::new(vec![Ok(chunks)]));

        let outcome = client.send_message("q").await.unwrap();

        assert_eq!(
            outcome,
            StreamOutcome::Completed {
                content: "partial tail".to_string()
            }
        );
        assert!(!client.turns()[1].is_streaming());
    }

    #[tokio::test]
    async fn done_content_used_when_no_tokens_arrived() {
        let wire = vec![start("s-1", &[]), done("Whole answer", &[], Value::Null)];
        let client = StreamingChatClient::new(ScriptedTransport::new(vec![Ok(body(&wire))]));

        client.send_message("q").await.unwrap();
        assert_eq!(client.turns()[1].content(), "Whole answer");
    }

    #[tokio::test]
    async fn sources_replace_and_analytics_published() {
        let transport = ScriptedTransport::new(vec![
            Ok(happy_body("s-1", &["x"], &["a", "b"])),
            Ok(body(&[
                start("s-1", &["c"]),
                token("y"),
                done("y", &["c"], serde_json::json!({"outages": 2})),
            ])),
        ]);
        let observer = Arc::new(RecordingObserver::default());
        let client = StreamingChatClient::new(transport).with_observer(observer.clone());

        client.send_message("first").await.unwrap();
        assert_eq!(client.sources(), vec!["a".to_string(), "b".to_string()]);

        client.send_message("second").await.unwrap();
        assert_eq!(client.sources(), vec!["c".to_string()]);
        assert_eq!(client.analytics(), Some(serde_json::json!({"outages": 2})));
        assert!(
            observer
                .events()
                .contains(&"analytics:{\"outages\":2}".to_string())
        );
    }

    #[tokio::test]
    async fn observer_sees_events_in_wire_order() {
        let transport = ScriptedTransport::new(vec![Ok(happy_body("s-1", &["He", "llo"], &["doc"]))]);
        let observer = Arc::new(RecordingObserver::default());
        let client = StreamingChatClient::new(transport).with_observer(observer.clone());

        client.send_message("q").await.unwrap();

        assert_eq!(
            observer.events(),
            vec![
                "start:Some(\"s-1\"):doc".to_string(),
                "token:He".to_string(),
                "token:llo".to_string(),
                "complete:Hello".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn abort_preserves_partial_output_without_error_callback() {
        let (tx, rx) = mpsc::unbounded();
        let transport = Arc::new(ChannelTransport {
            body: Mutex::new(Some(rx)),
        });
        let observer = Arc::new(RecordingObserver::default());
        let client = Arc::new(StreamingChatClient::new(transport).with_observer(observer.clone()));

        for record in [start("s-1", &[]), token("He"), token("llo")] {
            tx.unbounded_send(Ok(record.into_bytes())).unwrap();
        }

        let task = tokio::spawn({
            let client = client.clone();
            async move { client.send_message("greet me").await }
        });

        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let partial = client
                    .turns()
                    .get(1)
                    .is_some_and(|t| t.content() == "Hello");
                if partial {
                    break;
                }
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("tokens never arrived");

        assert_eq!(streaming_count(&client), 1);
        client.abort_stream();
        let outcome = task.await.unwrap().unwrap();

        assert_eq!(
            outcome,
            StreamOutcome::Cancelled {
                content: "Hello".to_string()
            }
        );
        let assistant = &client.turns()[1];
        assert_eq!(assistant.content(), "Hello");
        assert!(!assistant.is_streaming());
        assert_eq!(streaming_count(&client), 0);
        assert!(!observer.events().iter().any(|e| e.starts_with("error:")));
        assert!(observer.events().contains(&"cancelled".to_string()));

        // Aborting again with nothing in flight is a no-op
        client.abort_stream();
        drop(tx);
    }

    #[tokio::test]
    async fn abort_before_any_token_uses_marker() {
        let (tx, rx) = mpsc::unbounded::<Result<Vec<u8>, TransportError>>();
        let transport = Arc::new(ChannelTransport {
            body: Mutex::new(Some(rx)),
        });
        let client = Arc::new(StreamingChatClient::new(transport));

        let task = tokio::spawn({
            let client = client.clone();
            async move { client.send_message("slow question").await }
        });
        tokio::time::timeout(Duration::from_secs(5), async {
            while !client.is_streaming() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        client.abort_stream();
        let outcome = task.await.unwrap().unwrap();

        assert_eq!(
            outcome,
            StreamOutcome::Cancelled {
                content: CANCELLED_MARKER.to_string()
            }
        );
        drop(tx);
    }

    #[tokio::test]
    async fn second_send_while_streaming_is_rejected() {
        let (tx, rx) = mpsc::unbounded();
        let transport = Arc::new(ChannelTransport {
            body: Mutex::new(Some(rx)),
        });
        let client = Arc::new(StreamingChatClient::new(transport));

        let task = tokio::spawn({
            let client = client.clone();
            async move { client.send_message("first").await }
        });
        tokio::time::timeout(Duration::from_secs(5), async {
            while !client.is_streaming() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        assert_eq!(
            client.send_message("second").await,
            Err(ChatError::StreamInFlight)
        );
        assert_eq!(client.turns().len(), 2);
        assert_eq!(
            client.switch_mode(ChatMode::Actions),
            Err(ChatError::StreamInFlight)
        );

        let reply = [start("s-1", &[]), token("ok"), done("ok", &[], Value::Null)].concat();
        tx.unbounded_send(Ok(reply.into_bytes())).unwrap();
        let outcome = task.await.unwrap().unwrap();
        assert!(outcome.is_completed());
        assert_eq!(streaming_count(&client), 0);
    }

    #[tokio::test]
    async fn clear_while_streaming_cancels_the_exchange() {
        let (tx, rx) = mpsc::unbounded();
        let transport = Arc::new(ChannelTransport {
            body: Mutex::new(Some(rx)),
        });
        let client = Arc::new(StreamingChatClient::new(transport));
        tx.unbounded_send(Ok([start("s-1", &[]), token("par")].concat().into_bytes()))
            .unwrap();

        let task = tokio::spawn({
            let client = client.clone();
            async move { client.send_message("q").await }
        });
        tokio::time::timeout(Duration::from_secs(5), async {
            while client.session_id().is_none() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        client.clear_messages();
        let outcome = task.await.unwrap().unwrap();

        assert!(matches!(outcome, StreamOutcome::Cancelled { .. }));
        assert!(client.turns().is_empty());
        assert!(!client.is_streaming());
        assert_eq!(client.session_id().as_deref(), Some("s-1"));
        drop(tx);
    }

    #[tokio::test]
    async fn switch_mode_starts_a_new_conversation() {
        let transport = ScriptedTransport::new(vec![
            Ok(happy_body("s-1", &["a"], &["doc"])),
            Ok(happy_body("s-2", &["b"], &[])),
        ]);
        let client = StreamingChatClient::new(transport.clone());
        client.send_message("first").await.unwrap();

        client.switch_mode(ChatMode::Regulatory).unwrap();
        assert!(client.turns().is_empty());
        assert_eq!(client.session_id(), None);
        assert_eq!(client.mode(), ChatMode::Regulatory);

        client.send_message("second").await.unwrap();
        assert_eq!(client.session_id().as_deref(), Some("s-2"));
        let requests = transport.requests();
        assert_eq!(requests[1].session_id, None);
        assert_eq!(requests[1].mode, ChatMode::Regulatory);
    }

    #[tokio::test]
    async fn restore_continues_stored_session() {
        let transport = ScriptedTransport::new(vec![Ok(happy_body("s-7", &["more"], &[]))]);
        let client = StreamingChatClient::new(transport.clone());
        let history = vec![
            ConversationTurn::restored(Role::User, "old question", chrono::Utc::now()),
            ConversationTurn::restored(Role::Assistant, "old answer", chrono::Utc::now()),
        ];

        client.restore("s-7", history).unwrap();
        client.send_message("follow up").await.unwrap();

        assert_eq!(client.turns().len(), 4);
        assert_eq!(transport.requests()[0].session_id.as_deref(), Some("s-7"));
    }

    #[tokio::test]
    async fn finished_exchanges_are_logged() {
        struct CaptureLogger(Mutex<Vec<(String, Value)>>);
        impl ConversationLogger for CaptureLogger {
            fn log(&self, event: ConversationEvent) {
                self.0
                    .lock()
                    .unwrap()
                    .push((event.event_type.to_string(), event.payload));
            }
        }

        let transport = ScriptedTransport::new(vec![
            Ok(happy_body("s-1", &["fine"], &["doc"])),
            Err(TransportError::Connection("refused".to_string())),
        ]);
        let logger = Arc::new(CaptureLogger(Mutex::new(Vec::new())));
        let client = StreamingChatClient::new(transport).with_conversation_logger(logger.clone());

        client.send_message("one").await.unwrap();
        client.send_message("two").await.unwrap();

        let events = logger.0.lock().unwrap();
        assert_eq!(events[0].0, "exchange_completed");
        assert_eq!(events[0].1["answer"], "fine");
        assert_eq!(events[0].1["session_id"], "s-1");
        assert_eq!(events[1].0, "exchange_failed");
        assert_eq!(events[1].1["error"], "Connection error: refused");
    }
}
