//! Wire conventions shared with the chat backend.
//!
//! Outbound payloads travel in a `{"message": ...}` envelope. Two inbound
//! control conventions are recognized before a frame is forwarded: a
//! conversation-id assignment (`chatId:` prefix, or a `chatId` field in a
//! JSON object) and a conversation-end marker.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Prefix marking a plain-string conversation-id assignment frame.
pub const CONVERSATION_ID_PREFIX: &str = "chatId:";
/// Substring marking the end of the conversation.
pub const CONVERSATION_END_MARKER: &str = "conversationEnd";

/// Envelope wrapping every outbound payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutboundEnvelope {
    /// Application payload.
    pub message: String,
}

impl OutboundEnvelope {
    /// Wraps a payload and renders it as JSON.
    pub fn wrap(message: impl Into<String>) -> Result<String, serde_json::Error> {
        serde_json::to_string(&OutboundEnvelope {
            message: message.into(),
        })
    }
}

/// Result of classifying one inbound text frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// Pure control frame assigning the conversation id; consumed, not
    /// forwarded.
    ConversationIdAssignment(String),
    /// The server ended the conversation; the frame is not forwarded.
    ConversationEnd,
    /// Application payload to forward. `learned_conversation_id` is set when
    /// the frame is a JSON object carrying a previously unknown `chatId`;
    /// such frames are forwarded regardless.
    Payload {
        /// Conversation id extracted from a JSON `chatId` field, if any.
        learned_conversation_id: Option<String>,
    },
}

/// Classifies an inbound frame.
///
/// `conversation_id_known` suppresses id extraction once an id has been
/// learned: a known id is never overwritten, and late `chatId:` frames are
/// treated as ordinary payloads.
pub fn classify_frame(text: &str, conversation_id_known: bool) -> InboundFrame {
    if !conversation_id_known {
        if let Some(rest) = text.strip_prefix(CONVERSATION_ID_PREFIX) {
            let id = rest.trim();
            if !id.is_empty() {
                return InboundFrame::ConversationIdAssignment(id.to_string());
            }
        }
    }

    if text.contains(CONVERSATION_END_MARKER) {
        return InboundFrame::ConversationEnd;
    }

    let learned_conversation_id = if conversation_id_known {
        None
    } else {
        extract_json_conversation_id(text)
    };

    InboundFrame::Payload {
        learned_conversation_id,
    }
}

fn extract_json_conversation_id(text: &str) -> Option<String> {
    let value: Value = serde_json::from_str(text).ok()?;
    let id = value.get("chatId")?.as_str()?.trim();
    (!id.is_empty()).then(|| id.to_string())
}
