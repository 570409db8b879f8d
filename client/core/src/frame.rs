//! Protocol Frame Parsing
//!
//! Turns the raw byte stream coming off an open `/chat/stream` connection
//! into typed [`StreamEvent`]s. The backend emits server-sent events: text
//! lines prefixed with `data: ` whose payload is a JSON object tagged by
//! `type`, separated by blank lines.
//!
//! Chunks arrive off the transport with no alignment to line boundaries, so
//! the parser keeps the trailing partial line (and any partial UTF-8
//! sequence inside it) between pushes. Splitting a fixed stream at any byte
//! boundary yields the identical event sequence.

use serde::Deserialize;

/// Prefix marking an event-bearing line. Everything else is framing.
const DATA_PREFIX: &str = "data: ";

/// A decoded wire event from the streaming response.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Conversation identity assigned by the backend, sent ahead of content
    /// on the first exchange of a new conversation.
    Metadata {
        /// Server-assigned conversation identifier.
        conversation_id: String,
        /// Human-readable conversation title, when the backend provides one.
        #[serde(default)]
        title: Option<String>,
    },
    /// A fragment of assistant output.
    Content {
        /// The text fragment to append to the draft.
        text: String,
    },
    /// The response finished normally.
    Done,
    /// The backend failed while producing the response.
    Error {
        /// Server-supplied error description.
        message: String,
    },
}

impl StreamEvent {
    /// Whether this event terminates the stream.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error { .. })
    }
}

/// Incremental decoder from transport chunks to [`StreamEvent`]s.
///
/// One parser serves exactly one streaming exchange; it is not restartable.
#[derive(Debug, Default)]
pub struct FrameParser {
    /// Bytes of the trailing partial line carried over from the last chunk.
    carry: Vec<u8>,
    /// Set once a terminal event has been produced.
    finished: bool,
}

impl FrameParser {
    /// Create a parser for a fresh stream.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a terminal event (`done` or `error`) has been observed.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Feed a chunk and collect every event it completes, in order.
    ///
    /// Data arriving after a terminal event is accepted and ignored.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        if self.finished {
            return events;
        }

        self.carry.extend_from_slice(chunk);

        while let Some(pos) = self.carry.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.carry.drain(..=pos).collect();
            if self.finished {
                continue;
            }
            if let Some(event) = parse_line(&line) {
                if event.is_terminal() {
                    self.finished = true;
                }
                events.push(event);
            }
        }

        if self.finished {
            self.carry.clear();
        }

        events
    }
}

/// Parse one complete line, or `None` if it carries no event.
///
/// Blank separators and lines without the data prefix are discarded
/// silently; a payload that fails to decode is dropped without ending the
/// stream.
fn parse_line(line: &[u8]) -> Option<StreamEvent> {
    let text = match std::str::from_utf8(line) {
        Ok(text) => text.trim(),
        Err(err) => {
            tracing::debug!(%err, "dropping non-UTF-8 event line");
            return None;
        }
    };

    let payload = text.strip_prefix(DATA_PREFIX)?;

    match serde_json::from_str(payload) {
        Ok(event) => Some(event),
        Err(err) => {
            tracing::debug!(%err, payload, "dropping malformed event line");
            None
        }
    }
}
