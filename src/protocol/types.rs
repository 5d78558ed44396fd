//! Chat Protocol Types

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::protocol::constants::*;

/// One decoded unit of traffic: an operation code plus its payload.
///
/// Wire shape is `{ "op": <integer>, "data": <object> }`. The payload stays
/// raw until the dispatch boundary decides what to do with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub op: u8,
    pub data: Value,
}

impl Envelope {
    /// Build a chat-message envelope.
    pub fn message(text: &str, author: &str) -> Self {
        Self {
            op: OP_MESSAGE,
            data: serde_json::json!({ "message": text, "author": author }),
        }
    }

    /// Classify the operation code.
    pub fn opcode(&self) -> Opcode {
        Opcode::from_code(self.op)
    }

    /// Decode the payload as a chat message.
    pub fn chat_payload(&self) -> Result<ChatMessage, serde_json::Error> {
        serde_json::from_value(self.data.clone())
    }

    /// Parse one raw text frame into an envelope.
    pub fn decode(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Serialize for the wire.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Known operation kinds, with an explicit fallthrough for codes this
/// build does not understand (peers on other versions keep working).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// A user sent a message to the room.
    Message,
    /// Unrecognized operation code; ignored at dispatch.
    Unknown(u8),
}

impl Opcode {
    /// Create from a wire code
    pub fn from_code(code: u8) -> Self {
        match code {
            OP_MESSAGE => Opcode::Message,
            other => Opcode::Unknown(other),
        }
    }

    /// Convert to the wire code
    pub fn code(&self) -> u8 {
        match self {
            Opcode::Message => OP_MESSAGE,
            Opcode::Unknown(code) => *code,
        }
    }
}

/// Payload of an `OP_MESSAGE` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub message: String,
    pub author: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_envelope_round_trip() {
        let envelope = Envelope::message("hi", "alice");
        let encoded = envelope.encode().unwrap();
        let decoded = Envelope::decode(&encoded).unwrap();
        assert_eq!(decoded, envelope);
        assert_eq!(decoded.opcode(), Opcode::Message);
    }

    #[test]
    fn wire_shape_matches_protocol() {
        let encoded = Envelope::message("hi", "alice").encode().unwrap();
        let value: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(value["op"], 0);
        assert_eq!(value["data"]["message"], "hi");
        assert_eq!(value["data"]["author"], "alice");
    }

    #[test]
    fn chat_payload_decodes() {
        let envelope = Envelope::message("hello there", "bob");
        let chat = envelope.chat_payload().unwrap();
        assert_eq!(chat.message, "hello there");
        assert_eq!(chat.author, "bob");
    }

    #[test]
    fn chat_payload_rejects_missing_fields() {
        let envelope = Envelope {
            op: OP_MESSAGE,
            data: serde_json::json!({ "message": "no author" }),
        };
        assert!(envelope.chat_payload().is_err());
    }

    #[test]
    fn unknown_opcode_is_classified_not_rejected() {
        let envelope = Envelope::decode(r#"{"op":99,"data":{}}"#).unwrap();
        assert_eq!(envelope.opcode(), Opcode::Unknown(99));
    }

    #[test]
    fn opcode_codes_are_symmetric() {
        assert_eq!(Opcode::from_code(0), Opcode::Message);
        assert_eq!(Opcode::Message.code(), 0);
        assert_eq!(Opcode::from_code(42).code(), 42);
    }

    #[test]
    fn decode_rejects_non_envelope_json() {
        assert!(Envelope::decode("[1,2,3]").is_err());
        assert!(Envelope::decode("not json").is_err());
        assert!(Envelope::decode(r#"{"data":{}}"#).is_err());
    }
}
