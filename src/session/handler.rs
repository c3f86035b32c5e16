//! Application-facing callback surface.

use std::fmt;

/// Receives delivered payloads and per-message failures.
///
/// `on_success` carries the learned conversation id, when known, so the
/// application can correlate without tracking it separately. All callbacks
/// run on the session worker task.
pub trait MessageHandler: Send + Sync {
    /// An inbound frame was accepted for delivery.
    fn on_success(&self, data: &str, conversation_id: Option<&str>);

    /// A frame failed to decode, or a send could not be completed.
    fn on_error(&self, message: &str);
}

/// Classification of generic session events.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EventKind {
    /// The channel opened.
    Connection,
    /// Informational message.
    Message,
    /// Transport failure or reconnect attempt.
    Error,
    /// The channel closed.
    Close,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::Connection => "connection",
            EventKind::Message => "message",
            EventKind::Error => "error",
            EventKind::Close => "close",
        };
        f.write_str(name)
    }
}

/// Optional fan-out callback for session lifecycle events.
pub type EventCallback = Box<dyn Fn(EventKind, &str) + Send + Sync>;
