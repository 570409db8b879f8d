//! Streaming Transport
//!
//! The seam between the session state machine and the network. A transport
//! opens one long-lived response stream per exchange and hands back an
//! iterator of raw byte chunks; everything below that (TLS, HTTP framing,
//! socket retries) is out of scope for the core.
//!
//! The trait exists so tests can drive a session from an in-memory scripted
//! stream while production uses the HTTP implementation.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::Serialize;

use crate::conversation::ImageRef;
use crate::error::TransportError;

/// Sentinel conversation id for a not-yet-persisted conversation.
pub const NEW_CONVERSATION: &str = "new";

/// Payload for opening a streaming exchange.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct StreamRequest {
    /// The user's query text.
    pub query: String,
    /// Attached image as a base64 data URL, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// MIME type of the attached image, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Identifier of the requesting user.
    pub user_id: String,
    /// Target conversation id, or [`NEW_CONVERSATION`].
    pub conversation_id: String,
}

impl StreamRequest {
    /// Build a request bound to a conversation id, or to a new conversation
    /// when `conversation_id` is `None`.
    pub fn new(
        query: impl Into<String>,
        user_id: impl Into<String>,
        conversation_id: Option<&str>,
    ) -> Self {
        Self {
            query: query.into(),
            image: None,
            mime_type: None,
            user_id: user_id.into(),
            conversation_id: conversation_id.unwrap_or(NEW_CONVERSATION).to_string(),
        }
    }

    /// Forward an attachment with the request.
    #[must_use]
    pub fn with_attachment(mut self, attachment: &ImageRef) -> Self {
        self.image = Some(attachment.encoded_data.clone());
        self.mime_type = Some(attachment.mime_type.clone());
        self
    }
}

/// Raw chunk stream off an open connection.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, TransportError>> + Send>>;

/// Opens a streaming exchange with the assistant backend.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Open the response stream for a request.
    ///
    /// Fails if the connection cannot be established or the backend answers
    /// with a non-success status.
    async fn open(&self, request: &StreamRequest) -> Result<ChunkStream, TransportError>;
}

/// HTTP transport speaking to the backend's `/chat/stream` endpoint.
#[derive(Clone)]
pub struct HttpTransport {
    /// Backend base address, without a trailing slash.
    base_url: String,
    /// HTTP client
    http_client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport for a backend base address.
    ///
    /// The timeout bounds the whole exchange, including streaming the body.
    #[must_use]
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    /// Streaming chat endpoint URL.
    fn stream_url(&self) -> String {
        format!("{}/chat/stream", self.base_url)
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn open(&self, request: &StreamRequest) -> Result<ChunkStream, TransportError> {
        let response = self
            .http_client
            .post(self.stream_url())
            .json(request)
            .send()
            .await
            .map_err(|err| TransportError::Connect(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status { status, body });
        }

        let stream = response.bytes_stream().map(|chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(|err| TransportError::Interrupted(err.to_string()))
        });

        Ok(Box::pin(stream))
    }
}
