//! Exchange Controller
//!
//! The single entry point the UI layer talks to. Owns the conversation
//! transcript and at most one live stream session, and enforces the exchange
//! discipline: user text is committed before the stream opens, the draft
//! stays provisional until a terminal event, and starting a new exchange
//! cancels the previous one first.
//!
//! The controller is single-threaded by construction; the session runs on
//! its own task and the controller applies its updates through [`poll`]
//! (non-blocking, for render loops) or [`pump`] (awaiting, for tests and
//! headless drivers).
//!
//! [`poll`]: ExchangeController::poll
//! [`pump`]: ExchangeController::pump

use std::sync::Arc;

use anyhow::Result;

use crate::api::{ApiClient, ConversationSummary};
use crate::config::ClientConfig;
use crate::conversation::{Conversation, ImageRef, Message};
use crate::session::{SessionHandle, SessionState, SessionUpdate, StreamSession};
use crate::transport::{ChatTransport, HttpTransport, StreamRequest};

/// Drives conversations against the assistant backend.
pub struct ExchangeController {
    conversation: Conversation,
    transport: Arc<dyn ChatTransport>,
    api: ApiClient,
    config: ClientConfig,
    active: Option<SessionHandle>,
    draft: Option<String>,
}

impl ExchangeController {
    /// Create a controller speaking HTTP to the configured backend, with a
    /// fresh greeted conversation.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        let transport = Arc::new(HttpTransport::new(
            config.base_url.clone(),
            config.request_timeout,
        ));
        Self::with_transport(config, transport)
    }

    /// Create a controller over an arbitrary transport.
    ///
    /// The seam tests use to script streams without a network.
    #[must_use]
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn ChatTransport>) -> Self {
        let api = ApiClient::new(config.base_url.clone(), config.request_timeout);
        let mut conversation = Conversation::new();
        conversation.reset(&config.greeting, &config.system_agent);

        Self {
            conversation,
            transport,
            api,
            config,
            active: None,
            draft: None,
        }
    }

    // ========================================================================
    // Exchange lifecycle
    // ========================================================================

    /// Send a user message and start streaming the response.
    ///
    /// Whitespace-only text is a no-op. A still-running exchange is cancelled
    /// first; its partial draft is discarded. The user message is committed
    /// to the transcript before the stream opens and stays committed even if
    /// the exchange fails.
    pub async fn send(&mut self, text: impl Into<String>, attachment: Option<ImageRef>) {
        let text = text.into();
        if text.trim().is_empty() {
            return;
        }

        self.teardown_active().await;
        self.conversation.append_user(text.clone(), attachment.clone());

        let mut request =
            StreamRequest::new(text, self.config.user_id.clone(), self.conversation.id());
        if let Some(attachment) = &attachment {
            request = request.with_attachment(attachment);
        }

        tracing::info!(conversation_id = %request.conversation_id, "starting exchange");
        self.active = Some(StreamSession::spawn(
            Arc::clone(&self.transport),
            request,
            self.config.persona(),
        ));
        self.draft = Some(String::new());
    }

    /// Replace the message at `index` and every later message with new user
    /// text, then resend.
    ///
    /// The discarded tail is gone permanently. Out-of-range indices and
    /// whitespace-only text are no-ops.
    pub async fn edit_and_resend(&mut self, index: usize, text: impl Into<String>) {
        let text = text.into();
        if index >= self.conversation.len() || text.trim().is_empty() {
            return;
        }

        self.teardown_active().await;
        self.conversation.truncate_to(index);
        self.send(text, None).await;
    }

    /// Suspend interpretation of the live stream. No-op without one.
    pub fn pause(&self) {
        if let Some(handle) = &self.active {
            handle.pause();
        }
    }

    /// Resume a paused stream. No-op without one.
    pub fn resume(&self) {
        if let Some(handle) = &self.active {
            handle.resume();
        }
    }

    /// Stop the live exchange. The partial draft is discarded and nothing is
    /// committed; the terminal update arrives through [`poll`]/[`pump`].
    ///
    /// [`poll`]: Self::poll
    /// [`pump`]: Self::pump
    pub fn stop(&self) {
        if let Some(handle) = &self.active {
            handle.cancel();
        }
    }

    // ========================================================================
    // Update application
    // ========================================================================

    /// Drain and apply every pending session update without blocking.
    ///
    /// Returns the applied updates so a render loop can react to them.
    pub fn poll(&mut self) -> Vec<SessionUpdate> {
        let mut updates = Vec::new();
        if let Some(handle) = self.active.as_mut() {
            while let Some(update) = handle.try_update() {
                updates.push(update);
            }
        }
        for update in &updates {
            self.apply(update.clone());
        }
        updates
    }

    /// Await, apply, and return the next session update.
    ///
    /// Returns `None` when no exchange is live.
    pub async fn pump(&mut self) -> Option<SessionUpdate> {
        let update = match self.active.as_mut() {
            Some(handle) => handle.next_update().await?,
            None => return None,
        };
        self.apply(update.clone());
        Some(update)
    }

    fn apply(&mut self, update: SessionUpdate) {
        match update {
            SessionUpdate::Draft(text) => {
                self.draft = Some(text);
            }
            SessionUpdate::ConversationAssigned {
                conversation_id,
                title,
            } => {
                if self.conversation.adopt_id(conversation_id) {
                    tracing::debug!("adopted backend conversation id");
                }
                if let Some(title) = title {
                    self.conversation.set_title(title);
                }
            }
            SessionUpdate::Finished(outcome) => {
                tracing::info!(state = ?outcome.state(), "exchange finished");
                if let Some(message) = outcome.message() {
                    self.conversation.push(message.clone());
                }
                self.active = None;
                self.draft = None;
            }
        }
    }

    /// Cancel the live session, wait for its task, and salvage identity
    /// adoption from its remaining updates. Drafts and outcome messages of a
    /// torn-down exchange are never committed.
    async fn teardown_active(&mut self) {
        let Some(mut handle) = self.active.take() else {
            return;
        };

        handle.shutdown().await;
        while let Some(update) = handle.try_update() {
            if let SessionUpdate::ConversationAssigned {
                conversation_id,
                title,
            } = update
            {
                self.conversation.adopt_id(conversation_id);
                if let Some(title) = title {
                    self.conversation.set_title(title);
                }
            }
        }
        self.draft = None;
    }

    // ========================================================================
    // Conversation management
    // ========================================================================

    /// Abandon the current conversation and start a fresh greeted one.
    ///
    /// Backend history of the abandoned conversation is untouched.
    pub async fn new_chat(&mut self) {
        self.teardown_active().await;
        self.conversation
            .reset(&self.config.greeting, &self.config.system_agent);
    }

    /// Replace the current conversation with one fetched from the backend.
    pub async fn load_conversation(&mut self, conversation_id: &str) -> Result<()> {
        let history = self.api.fetch_conversation(conversation_id).await?;
        self.teardown_active().await;

        let assistant = self.config.assistant_agent.clone();
        let messages = history
            .into_iter()
            .map(|entry| {
                if entry.role == "user" {
                    Message::user(entry.text)
                } else {
                    Message::bot(entry.text, assistant.clone())
                }
            })
            .collect();

        self.conversation.hydrate(conversation_id, messages);
        Ok(())
    }

    /// List this user's conversations.
    pub async fn list_conversations(&self) -> Result<Vec<ConversationSummary>> {
        self.api.list_conversations(&self.config.user_id).await
    }

    /// Delete a conversation on the backend. Deleting the one currently
    /// loaded also starts a fresh chat locally.
    pub async fn delete_conversation(&mut self, conversation_id: &str) -> Result<()> {
        self.api.delete_conversation(conversation_id).await?;
        if self.conversation.id() == Some(conversation_id) {
            self.new_chat().await;
        }
        Ok(())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// The current conversation transcript.
    #[must_use]
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// The provisional response text of the live exchange, if any.
    #[must_use]
    pub fn draft(&self) -> Option<&str> {
        self.draft.as_deref()
    }

    /// Whether an exchange is live.
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.active.is_some()
    }

    /// State of the live session, if any.
    #[must_use]
    pub fn session_state(&self) -> Option<SessionState> {
        self.active.as_ref().map(SessionHandle::state)
    }
}
