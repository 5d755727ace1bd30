use serde::{Deserialize, Serialize};

use crate::types::{ContentBlockDelta, MessageRole};

/// One event of a completion stream, as seen by the chat engine.
///
/// The service emits many event kinds; only the start of the assistant turn
/// and its text deltas matter here.  Everything else is carried as
/// [`StreamEvent::Unknown`] with the wire tag so consumers can log it and move
/// on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// The service started a turn for the given role.
    TurnStarted {
        /// Expected to be [`MessageRole::Assistant`].
        role: MessageRole,
    },

    /// A fragment of assistant text.
    TextDelta {
        /// The fragment, in arrival order.
        fragment: String,
    },

    /// An event kind the engine does not act on.
    Unknown {
        /// The wire tag of the event.
        tag: String,
    },
}

impl StreamEvent {
    /// Shorthand for a text fragment.
    pub fn text(fragment: impl Into<String>) -> Self {
        StreamEvent::TextDelta {
            fragment: fragment.into(),
        }
    }

    /// Shorthand for an unrecognized event.
    pub fn unknown(tag: impl Into<String>) -> Self {
        StreamEvent::Unknown { tag: tag.into() }
    }
}

/// Payload of a `message_start` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageStartEvent {
    /// The message being started.
    pub message: MessageStart,
}

/// The fields of the started message the engine reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageStart {
    /// Role of the author of the new message.
    pub role: MessageRole,
}

/// Payload of a `content_block_delta` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBlockDeltaEvent {
    /// Index of the content block the delta applies to.
    #[serde(default)]
    pub index: usize,

    /// The delta itself.
    pub delta: ContentBlockDelta,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{from_value, json};

    #[test]
    fn message_start_deserialization() {
        let json = json!({
            "type": "message_start",
            "message": {
                "id": "msg_012345",
                "content": [],
                "model": "claude-haiku-4-5",
                "role": "assistant",
                "type": "message",
                "usage": {"input_tokens": 50, "output_tokens": 1}
            }
        });

        let event: MessageStartEvent = from_value(json).unwrap();
        assert_eq!(event.message.role, MessageRole::Assistant);
    }

    #[test]
    fn content_block_delta_deserialization() {
        let json = json!({
            "type": "content_block_delta",
            "index": 0,
            "delta": {"type": "text_delta", "text": "Hello"}
        });

        let event: ContentBlockDeltaEvent = from_value(json).unwrap();
        assert_eq!(event.index, 0);
        assert!(matches!(event.delta, ContentBlockDelta::TextDelta(ref t) if t.text == "Hello"));
    }

    #[test]
    fn stream_event_shorthands() {
        assert_eq!(
            StreamEvent::text("Hi"),
            StreamEvent::TextDelta {
                fragment: "Hi".to_string()
            }
        );
        assert_eq!(
            StreamEvent::unknown("ping"),
            StreamEvent::Unknown {
                tag: "ping".to_string()
            }
        );
    }
}
