//! RiteChat Core
//!
//! Backend-agnostic engine of a streaming chat client. The UI layer owns
//! pixels and input; this crate owns everything between the send box and the
//! wire: committing user messages, streaming the assistant's response event
//! by event, pausing and cancelling mid-stream, and keeping the transcript
//! consistent through failures.
//!
//! # Architecture
//!
//! ```text
//! UI layer
//!    │
//!    ▼
//! ExchangeController ──── owns ───▶ Conversation (transcript)
//!    │                              ApiClient (listing/history/delete)
//!    ▼
//! StreamSession (one per exchange, spawned task)
//!    │  ├── PauseGate   (cooperative pause/cancel)
//!    │  └── FrameParser (chunk-transparent event decoding)
//!    ▼
//! ChatTransport ──▶ HttpTransport ──▶ backend `/chat/stream`
//! ```
//!
//! The controller applies session updates on its own thread of control, so
//! the transcript never changes behind the UI's back. A stream's output is
//! provisional until its terminal event: a cancelled or failed exchange
//! commits no draft text.
//!
//! # Key types
//!
//! - [`ExchangeController`]: the facade the UI drives
//! - [`Conversation`] / [`Message`]: the committed transcript
//! - [`StreamSession`] / [`SessionUpdate`]: one live exchange
//! - [`ChatTransport`]: the network seam, mockable in tests

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod config;
pub mod controller;
pub mod conversation;
pub mod error;
pub mod frame;
pub mod gate;
pub mod session;
pub mod transport;

pub use api::{ApiClient, ConversationSummary, HistoryMessage};
pub use config::ClientConfig;
pub use controller::ExchangeController;
pub use conversation::{Conversation, ImageRef, Message, MessageRole};
pub use error::TransportError;
pub use frame::{FrameParser, StreamEvent};
pub use gate::{GateStatus, PauseGate, GATE_RECHECK_INTERVAL};
pub use session::{
    Persona, SessionHandle, SessionOutcome, SessionState, SessionUpdate, StreamSession,
};
pub use transport::{ChatTransport, ChunkStream, HttpTransport, StreamRequest, NEW_CONVERSATION};
