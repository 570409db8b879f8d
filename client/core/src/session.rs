//! Stream Session
//!
//! Orchestrates one streaming exchange end-to-end: opens the transport,
//! drives the frame parser, applies the pause gate before every event, and
//! accumulates the draft until the session reaches one of its terminal
//! outcomes.
//!
//! # State machine
//!
//! ```text
//! Idle ──open──▶ Streaming ◀──resume──▶ Paused
//!                    │
//!                  done ──▶ Finalizing ──▶ Completed
//!                    │
//!                  error / transport failure ──▶ Failed
//!                    │
//!                  stop ──▶ Cancelled
//! ```
//!
//! The session runs on a spawned task and publishes progress through an
//! unbounded update channel; the controller applies those updates to the
//! conversation from its own thread of control. Exactly one session is live
//! per controller; starting a new one cancels the old one first.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::conversation::Message;
use crate::frame::{FrameParser, StreamEvent};
use crate::gate::{GateStatus, PauseGate};
use crate::transport::{ChatTransport, StreamRequest};

// ============================================================================
// Session Types
// ============================================================================

/// Lifecycle of a single streaming exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// The transport is being opened.
    Idle,
    /// Events are flowing and being applied.
    Streaming,
    /// The gate is closed; events are held, not applied.
    Paused,
    /// A terminal event arrived; the draft is being committed.
    Finalizing,
    /// The stream finished normally.
    Completed,
    /// The user stopped the exchange.
    Cancelled,
    /// The backend or transport failed.
    Failed,
}

impl SessionState {
    /// Whether the session has reached a terminal outcome.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

/// How a finished session leaves the exchange.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionOutcome {
    /// The stream finished normally; the draft becomes a committed message.
    Completed {
        /// The assistant message to commit.
        message: Message,
    },
    /// The user stopped the exchange; nothing is committed and any partial
    /// draft is discarded.
    Cancelled,
    /// The backend or transport failed; a system message is committed and
    /// any partial draft is discarded.
    Failed {
        /// The system message to commit.
        message: Message,
    },
}

impl SessionOutcome {
    /// Terminal state corresponding to this outcome.
    #[must_use]
    pub fn state(&self) -> SessionState {
        match self {
            Self::Completed { .. } => SessionState::Completed,
            Self::Cancelled => SessionState::Cancelled,
            Self::Failed { .. } => SessionState::Failed,
        }
    }

    /// The message to commit, if this outcome produces one.
    #[must_use]
    pub fn message(&self) -> Option<&Message> {
        match self {
            Self::Completed { message } | Self::Failed { message } => Some(message),
            Self::Cancelled => None,
        }
    }
}

/// Live updates published while a session runs.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionUpdate {
    /// The accumulated draft changed; carries the full draft text.
    Draft(String),
    /// The backend assigned a conversation identity. Published immediately,
    /// not deferred to completion, so the binding survives a later failure.
    ConversationAssigned {
        /// Server-assigned conversation identifier.
        conversation_id: String,
        /// Conversation title, when the backend provides one.
        title: Option<String>,
    },
    /// The session reached a terminal outcome.
    Finished(SessionOutcome),
}

/// Naming and copy used when committing messages.
#[derive(Clone, Debug)]
pub struct Persona {
    /// Agent name attributed to completed assistant responses.
    pub assistant_agent: String,
    /// Agent name attributed to error and greeting messages.
    pub system_agent: String,
    /// Copy committed when the transport fails.
    pub failure_text: String,
}

// ============================================================================
// Stream Session
// ============================================================================

/// Driver for one streaming exchange.
///
/// Created through [`StreamSession::spawn`], which returns the
/// [`SessionHandle`] the controller uses to observe and steer the exchange.
pub struct StreamSession {
    gate: Arc<PauseGate>,
    state: watch::Sender<SessionState>,
    updates: mpsc::UnboundedSender<SessionUpdate>,
    persona: Persona,
}

impl StreamSession {
    /// Open the transport and drive the exchange to a terminal outcome on a
    /// spawned task.
    #[must_use]
    pub fn spawn(
        transport: Arc<dyn ChatTransport>,
        request: StreamRequest,
        persona: Persona,
    ) -> SessionHandle {
        let gate = Arc::new(PauseGate::new());
        let (state_tx, state_rx) = watch::channel(SessionState::Idle);
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        let session = Self {
            gate: Arc::clone(&gate),
            state: state_tx,
            updates: update_tx,
            persona,
        };

        let task = tokio::spawn(async move {
            let outcome = session.drive(transport, request).await;
            let _ = session.state.send(outcome.state());
            let _ = session.updates.send(SessionUpdate::Finished(outcome));
        });

        SessionHandle {
            gate,
            state: state_rx,
            updates: update_rx,
            task,
        }
    }

    /// Run the event loop until a terminal outcome.
    async fn drive(
        &self,
        transport: Arc<dyn ChatTransport>,
        request: StreamRequest,
    ) -> SessionOutcome {
        let mut stream = match transport.open(&request).await {
            Ok(stream) => stream,
            Err(err) => {
                if self.gate.is_cancelled() {
                    return SessionOutcome::Cancelled;
                }
                tracing::warn!(%err, "failed to open response stream");
                return self.transport_failure();
            }
        };

        let _ = self.state.send(SessionState::Streaming);
        tracing::debug!(
            conversation_id = %request.conversation_id,
            "response stream opened"
        );

        let mut parser = FrameParser::new();
        let mut draft = String::new();

        loop {
            // Abandon a stalled read promptly when the user stops.
            let chunk = tokio::select! {
                chunk = stream.next() => chunk,
                () = self.gate.cancelled() => return SessionOutcome::Cancelled,
            };

            let bytes = match chunk {
                Some(Ok(bytes)) => bytes,
                Some(Err(err)) => {
                    if self.gate.is_cancelled() {
                        return SessionOutcome::Cancelled;
                    }
                    tracing::warn!(%err, "stream interrupted");
                    return self.transport_failure();
                }
                None => break,
            };

            for event in parser.push(&bytes) {
                if self.wait_gate().await == GateStatus::Cancelled {
                    return SessionOutcome::Cancelled;
                }

                match event {
                    StreamEvent::Metadata {
                        conversation_id,
                        title,
                    } => {
                        let _ = self.updates.send(SessionUpdate::ConversationAssigned {
                            conversation_id,
                            title,
                        });
                    }
                    StreamEvent::Content { text } => {
                        draft.push_str(&text);
                        let _ = self.updates.send(SessionUpdate::Draft(draft.clone()));
                    }
                    StreamEvent::Done => {
                        let _ = self.state.send(SessionState::Finalizing);
                        return SessionOutcome::Completed {
                            message: Message::bot(draft, self.persona.assistant_agent.clone()),
                        };
                    }
                    StreamEvent::Error { message } => {
                        tracing::warn!(error = %message, "backend signaled an error");
                        return SessionOutcome::Failed {
                            message: Message::bot(message, self.persona.system_agent.clone()),
                        };
                    }
                }
            }
        }

        // The transport closed without a terminal event.
        if self.gate.is_cancelled() {
            return SessionOutcome::Cancelled;
        }
        tracing::warn!("stream ended without a terminal event");
        self.transport_failure()
    }

    /// Build the generic failure outcome.
    fn transport_failure(&self) -> SessionOutcome {
        SessionOutcome::Failed {
            message: Message::bot(
                self.persona.failure_text.clone(),
                self.persona.system_agent.clone(),
            ),
        }
    }

    /// Await the gate before applying an event, tracking Paused/Streaming
    /// transitions for observers.
    async fn wait_gate(&self) -> GateStatus {
        if self.gate.is_paused() && !self.gate.is_cancelled() {
            let _ = self.state.send(SessionState::Paused);
        }
        let status = self.gate.wait_ready().await;
        if status == GateStatus::Ready {
            let _ = self.state.send(SessionState::Streaming);
        }
        status
    }
}

// ============================================================================
// Session Handle
// ============================================================================

/// The controller's handle to a live session: observe state, drain updates,
/// pause/resume/cancel, and tear down.
pub struct SessionHandle {
    gate: Arc<PauseGate>,
    state: watch::Receiver<SessionState>,
    updates: mpsc::UnboundedReceiver<SessionUpdate>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// Current session state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Whether the session has not yet reached a terminal outcome.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.state().is_terminal()
    }

    /// Close the gate. No-op once the session has ended.
    pub fn pause(&self) {
        if self.is_open() {
            self.gate.pause();
        }
    }

    /// Open the gate. No-op once the session has ended.
    pub fn resume(&self) {
        if self.is_open() {
            self.gate.resume();
        }
    }

    /// Request cancellation. Takes effect at the next event boundary or
    /// gate wakeup; no message is committed on cancel.
    pub fn cancel(&self) {
        self.gate.cancel();
    }

    /// Whether the gate is currently closed.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.gate.is_paused()
    }

    /// Drain one pending update without blocking.
    pub fn try_update(&mut self) -> Option<SessionUpdate> {
        self.updates.try_recv().ok()
    }

    /// Await the next update. Returns `None` once the session task is gone
    /// and the channel is drained.
    pub async fn next_update(&mut self) -> Option<SessionUpdate> {
        self.updates.recv().await
    }

    /// Cancel and wait for the session task to finish.
    ///
    /// Bounded by the gate re-check interval even when the transport has
    /// stalled. Pending updates stay readable after shutdown.
    pub async fn shutdown(&mut self) {
        self.gate.cancel();
        let _ = (&mut self.task).await;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    use crate::conversation::MessageRole;
    use crate::error::TransportError;
    use crate::transport::ChunkStream;

    fn test_persona() -> Persona {
        Persona {
            assistant_agent: "Assistant".to_string(),
            system_agent: "System".to_string(),
            failure_text: "Sorry, I encountered an error. Please try again.".to_string(),
        }
    }

    /// Transport that replays a fixed chunk list.
    struct StaticTransport {
        chunks: Vec<Vec<u8>>,
    }

    impl StaticTransport {
        fn from_events(events: &[&str]) -> Self {
            let wire: String = events.iter().map(|e| format!("data: {e}\n\n")).collect();
            Self {
                chunks: vec![wire.into_bytes()],
            }
        }
    }

    #[async_trait]
    impl ChatTransport for StaticTransport {
        async fn open(&self, _request: &StreamRequest) -> Result<ChunkStream, TransportError> {
            let chunks = self.chunks.clone();
            Ok(Box::pin(futures::stream::iter(chunks.into_iter().map(Ok))))
        }
    }

    /// Transport whose connection attempt always fails.
    struct FailingTransport;

    #[async_trait]
    impl ChatTransport for FailingTransport {
        async fn open(&self, _request: &StreamRequest) -> Result<ChunkStream, TransportError> {
            Err(TransportError::Connect("connection refused".to_string()))
        }
    }

    /// Transport that opens but never yields a chunk.
    struct StalledTransport;

    #[async_trait]
    impl ChatTransport for StalledTransport {
        async fn open(&self, _request: &StreamRequest) -> Result<ChunkStream, TransportError> {
            Ok(Box::pin(futures::stream::pending()))
        }
    }

    async fn run_to_outcome(mut handle: SessionHandle) -> (Vec<SessionUpdate>, SessionOutcome) {
        let mut updates = Vec::new();
        loop {
            match handle.next_update().await {
                Some(SessionUpdate::Finished(outcome)) => return (updates, outcome),
                Some(update) => updates.push(update),
                None => panic!("session ended without a terminal outcome"),
            }
        }
    }

    #[tokio::test]
    async fn test_happy_path_accumulates_draft() {
        let transport = Arc::new(StaticTransport::from_events(&[
            r#"{"type": "metadata", "conversation_id": "c1", "title": "Hi"}"#,
            r#"{"type": "content", "text": "Hel"}"#,
            r#"{"type": "content", "text": "lo"}"#,
            r#"{"type": "done"}"#,
        ]));

        let request = StreamRequest::new("hi", "user_1", None);
        let handle = StreamSession::spawn(transport, request, test_persona());
        let (updates, outcome) = run_to_outcome(handle).await;

        assert_eq!(
            updates[0],
            SessionUpdate::ConversationAssigned {
                conversation_id: "c1".to_string(),
                title: Some("Hi".to_string()),
            }
        );
        assert_eq!(updates[1], SessionUpdate::Draft("Hel".to_string()));
        assert_eq!(updates[2], SessionUpdate::Draft("Hello".to_string()));

        let message = outcome.message().expect("completed outcome has a message");
        assert_eq!(message.text, "Hello");
        assert_eq!(message.role, MessageRole::Bot);
        assert_eq!(message.agent.as_deref(), Some("Assistant"));
        assert_eq!(outcome.state(), SessionState::Completed);
    }

    #[tokio::test]
    async fn test_protocol_error_discards_partial_draft() {
        let transport = Arc::new(StaticTransport::from_events(&[
            r#"{"type": "content", "text": "partial"}"#,
            r#"{"type": "error", "message": "backend down"}"#,
        ]));

        let request = StreamRequest::new("hi", "user_1", None);
        let handle = StreamSession::spawn(transport, request, test_persona());
        let (_, outcome) = run_to_outcome(handle).await;

        let message = outcome.message().expect("failed outcome has a message");
        assert_eq!(message.text, "backend down");
        assert_eq!(message.agent.as_deref(), Some("System"));
        assert_eq!(outcome.state(), SessionState::Failed);
    }

    #[tokio::test]
    async fn test_open_failure_produces_generic_system_message() {
        let request = StreamRequest::new("hi", "user_1", None);
        let handle = StreamSession::spawn(Arc::new(FailingTransport), request, test_persona());
        let (updates, outcome) = run_to_outcome(handle).await;

        assert!(updates.is_empty(), "no events before the failure");
        let message = outcome.message().unwrap();
        assert_eq!(
            message.text,
            "Sorry, I encountered an error. Please try again."
        );
        assert_eq!(message.agent.as_deref(), Some("System"));
    }

    #[tokio::test]
    async fn test_stream_end_without_terminal_event_fails() {
        let transport = Arc::new(StaticTransport::from_events(&[
            r#"{"type": "content", "text": "cut off"}"#,
        ]));

        let request = StreamRequest::new("hi", "user_1", None);
        let handle = StreamSession::spawn(transport, request, test_persona());
        let (_, outcome) = run_to_outcome(handle).await;
        assert_eq!(outcome.state(), SessionState::Failed);
    }

    #[tokio::test]
    async fn test_cancel_on_stalled_transport_terminates_promptly() {
        let request = StreamRequest::new("hi", "user_1", None);
        let mut handle = StreamSession::spawn(Arc::new(StalledTransport), request, test_persona());

        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.cancel();

        let outcome = tokio::time::timeout(Duration::from_millis(500), async {
            loop {
                match handle.next_update().await {
                    Some(SessionUpdate::Finished(outcome)) => return outcome,
                    Some(_) => {}
                    None => panic!("channel closed without outcome"),
                }
            }
        })
        .await
        .expect("cancel must take effect within the gate interval");

        assert_eq!(outcome, SessionOutcome::Cancelled);
        assert!(outcome.message().is_none());
    }

    #[tokio::test]
    async fn test_shutdown_joins_task() {
        let request = StreamRequest::new("hi", "user_1", None);
        let mut handle = StreamSession::spawn(Arc::new(StalledTransport), request, test_persona());

        handle.shutdown().await;
        assert_eq!(handle.state(), SessionState::Cancelled);
    }
}
