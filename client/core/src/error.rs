//! Error Taxonomy
//!
//! Failure classes for a streaming exchange and how they propagate:
//!
//! - A malformed event line is swallowed by the frame parser (logged, stream
//!   continues) and never surfaces as a type here.
//! - A server-signaled `error` event ends the session and becomes a committed
//!   system message; it is carried inside the session outcome, not an `Err`.
//! - A transport failure ([`TransportError`]) ends the session with a generic
//!   committed system message.
//! - An explicit stop is a normal termination, not an error.
//!
//! No exchange failure is fatal to the controller; it remains usable for the
//! next send.

use thiserror::Error;

/// Failure to open or read the streaming transport.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The connection could not be established.
    #[error("failed to reach backend: {0}")]
    Connect(String),

    /// The backend answered with a non-success status before streaming.
    #[error("backend returned {status}: {body}")]
    Status {
        /// HTTP status code returned by the backend.
        status: u16,
        /// Response body, if any was readable.
        body: String,
    },

    /// The connection dropped while the response was still streaming.
    #[error("stream interrupted: {0}")]
    Interrupted(String),
}
