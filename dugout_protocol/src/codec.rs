// Decoding inbound lines and encoding outbound messages.
//
// Decoding happens in two passes so the three ways a line can be wrong stay
// distinguishable:
// 1. Parse as arbitrary JSON. Failure is `ProtocolError::Malformed`.
// 2. Read the `type` field and match it case-insensitively against
//    `ClientMessage::TYPES`. A missing or non-string type is `MissingType`;
//    anything else unrecognized is `UnknownType`.
// 3. Deserialize the now-canonical object into `ClientMessage`. A failure
//    here (unknown result code, wrong field type) is `InvalidField`.
//
// `ProtocolError::client_text` is what the offending session sees in its
// ERROR reply; the session stays connected in every case.

use serde_json::Value;
use thiserror::Error;

use crate::message::{ClientMessage, ServerMessage};

/// Why an inbound line could not become a `ClientMessage`.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed JSON: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("message has no `type` field")]
    MissingType,
    #[error("unknown message type `{0}`")]
    UnknownType(String),
    #[error("invalid {kind} message: {source}")]
    InvalidField {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ProtocolError {
    /// Text for the ERROR reply sent back to the originating session.
    pub fn client_text(&self) -> String {
        match self {
            ProtocolError::Malformed(_) => "Bad JSON".into(),
            ProtocolError::MissingType | ProtocolError::UnknownType(_) => "Unknown command".into(),
            ProtocolError::InvalidField { .. } => self.to_string(),
        }
    }
}

/// Decode one inbound message.
pub fn decode_client_message(bytes: &[u8]) -> Result<ClientMessage, ProtocolError> {
    let mut value: Value = serde_json::from_slice(bytes).map_err(ProtocolError::Malformed)?;

    let object = value.as_object_mut().ok_or(ProtocolError::MissingType)?;
    let kind = object
        .get("type")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingType)?
        .to_ascii_uppercase();
    if !ClientMessage::TYPES.contains(&kind.as_str()) {
        return Err(ProtocolError::UnknownType(kind));
    }
    object.insert("type".into(), Value::String(kind.clone()));

    serde_json::from_value(value).map_err(|source| ProtocolError::InvalidField { kind, source })
}

/// Encode an outbound message as a single JSON line body (no newline).
pub fn encode(msg: &ServerMessage) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(msg)
}
