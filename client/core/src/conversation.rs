//! Conversation Transcript
//!
//! The ordered transcript of one conversation plus the operations the
//! exchange controller needs: appending, truncating for edit, and adopting
//! the server-assigned identity. All operations are synchronous and perform
//! no I/O; history persistence is owned by the backend.

use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// The local user.
    User,
    /// The assistant (or a system notice rendered in the bot column).
    Bot,
    /// Protocol-level system entry.
    System,
}

/// An opaque image payload forwarded to the backend.
///
/// The core never interprets the encoded data; it is produced once and sent
/// verbatim with the streaming request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    /// Base64 data URL (`data:<mime>;base64,...`).
    pub encoded_data: String,
    /// MIME type of the underlying image.
    pub mime_type: String,
}

impl ImageRef {
    /// Wrap an already-encoded payload.
    pub fn new(encoded_data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            encoded_data: encoded_data.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Encode raw image bytes as a base64 data URL.
    #[must_use]
    pub fn from_bytes(bytes: &[u8], mime_type: impl Into<String>) -> Self {
        use base64::Engine as _;

        let mime_type = mime_type.into();
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        Self {
            encoded_data: format!("data:{mime_type};base64,{encoded}"),
            mime_type,
        }
    }
}

/// A committed transcript entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Who authored the message.
    pub role: MessageRole,
    /// The message text.
    pub text: String,
    /// Display name of the responding agent, for bot messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    /// Image attached by the user, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<ImageRef>,
}

impl Message {
    /// Create a user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            text: text.into(),
            agent: None,
            attachment: None,
        }
    }

    /// Create a bot message attributed to an agent.
    pub fn bot(text: impl Into<String>, agent: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Bot,
            text: text.into(),
            agent: Some(agent.into()),
            attachment: None,
        }
    }

    /// Attach an image to the message.
    #[must_use]
    pub fn with_attachment(mut self, attachment: ImageRef) -> Self {
        self.attachment = Some(attachment);
        self
    }
}

/// The ordered transcript plus the backend-assigned identity.
///
/// `id` is absent until the backend assigns one during the first streamed
/// exchange; once present it never changes for this conversation's lifetime
/// in memory.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Conversation {
    /// Server-assigned conversation identifier, if persisted.
    id: Option<String>,
    /// Human-readable title, streamed alongside the id.
    title: Option<String>,
    /// The transcript, oldest first.
    messages: Vec<Message>,
}

impl Conversation {
    /// Create an empty, not-yet-persisted conversation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The server-assigned identifier, if one has been adopted.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// The streamed conversation title, if any.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// The transcript, oldest first.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of committed messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the transcript is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Append a user message, optionally with an attachment.
    pub fn append_user(&mut self, text: impl Into<String>, attachment: Option<ImageRef>) {
        let mut message = Message::user(text);
        message.attachment = attachment;
        self.messages.push(message);
    }

    /// Append a bot message attributed to an agent.
    pub fn append_bot(&mut self, text: impl Into<String>, agent: impl Into<String>) {
        self.messages.push(Message::bot(text, agent));
    }

    /// Append an already-built message.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Truncate the transcript to `[0, index)`.
    ///
    /// History at and after `index` is permanently discarded, not hidden.
    pub fn truncate_to(&mut self, index: usize) {
        self.messages.truncate(index);
    }

    /// Adopt the server-assigned identifier.
    ///
    /// The id transitions absent-to-present at most once; a second adoption
    /// is a no-op and returns `false`.
    pub fn adopt_id(&mut self, id: impl Into<String>) -> bool {
        if self.id.is_some() {
            return false;
        }
        self.id = Some(id.into());
        true
    }

    /// Record the streamed title.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    /// Reset to a fresh conversation seeded with a greeting.
    ///
    /// Clears the identity and transcript; the greeting is committed as a
    /// bot message from the system agent.
    pub fn reset(&mut self, greeting: &str, system_agent: &str) {
        self.id = None;
        self.title = None;
        self.messages.clear();
        self.messages.push(Message::bot(greeting, system_agent));
    }

    /// Replace the transcript with history fetched from the backend.
    pub fn hydrate(&mut self, id: impl Into<String>, messages: Vec<Message>) {
        self.id = Some(id.into());
        self.title = None;
        self.messages = messages;
    }
}
