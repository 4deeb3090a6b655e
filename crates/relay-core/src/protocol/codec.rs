//! JSON codec for relayed messages.
//!
//! Inbound frames may be text or binary; either way the payload must be a
//! single JSON object.  Outbound frames are always the compact JSON encoding
//! of the [`Message`], produced once per broadcast so every receiver gets
//! byte-identical text.

use serde_json::Value;
use thiserror::Error;

use crate::protocol::messages::Message;

/// Errors that can occur while decoding an inbound payload.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The payload is not valid JSON, or a field has the wrong JSON type.
    #[error("malformed message payload: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload is valid JSON but not an object (e.g. an array or `null`).
    #[error("message payload must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Decodes one [`Message`] from a raw frame payload.
///
/// # Errors
///
/// Returns [`DecodeError::Json`] for invalid JSON or wrongly typed fields and
/// [`DecodeError::NotAnObject`] when the top-level value is not an object.
///
/// # Examples
///
/// ```rust
/// use relay_core::protocol::decode_message;
///
/// let msg = decode_message(br#"{"message":"hi","column":"todo"}"#).unwrap();
/// assert_eq!(msg.message, "hi");
/// assert_eq!(msg.user.name, "");
/// ```
pub fn decode_message(payload: &[u8]) -> Result<Message, DecodeError> {
    // Parse to a `Value` first: serde would otherwise happily accept a JSON
    // array as a positional struct.
    let value: Value = serde_json::from_slice(payload)?;
    if !value.is_object() {
        return Err(DecodeError::NotAnObject(json_kind(&value)));
    }
    Ok(serde_json::from_value(value)?)
}

/// Encodes a [`Message`] into the JSON text sent to every receiver.
///
/// # Errors
///
/// Returns the underlying `serde_json` error if serialization fails.
pub fn encode_message(msg: &Message) -> Result<String, serde_json::Error> {
    serde_json::to_string(msg)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::messages::User;

    #[test]
    fn test_decode_object_payload() {
        let msg = decode_message(
            br#"{"user":{"name":"Al","email":"a@x.com"},"message":"hi","column":"todo"}"#,
        )
        .unwrap();
        assert_eq!(msg, Message::new(User::new("Al", "a@x.com"), "hi", "todo"));
    }

    #[test]
    fn test_decode_empty_object_yields_default_message() {
        let msg = decode_message(b"{}").unwrap();
        assert_eq!(msg, Message::default());
    }

    #[test]
    fn test_decode_rejects_array_payload() {
        let err = decode_message(br#"[{"name":"Al"},"hi","todo"]"#).unwrap_err();
        assert!(matches!(err, DecodeError::NotAnObject("an array")));
    }

    #[test]
    fn test_decode_rejects_null_payload() {
        let err = decode_message(b"null").unwrap_err();
        assert!(matches!(err, DecodeError::NotAnObject("null")));
    }

    #[test]
    fn test_decode_rejects_invalid_json() {
        let err = decode_message(b"{not json").unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)));
    }

    #[test]
    fn test_decode_rejects_empty_payload() {
        assert!(decode_message(b"").is_err());
    }

    #[test]
    fn test_decode_rejects_wrongly_typed_user() {
        let err = decode_message(br#"{"user":"Al"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)));
    }

    #[test]
    fn test_encode_preserves_opaque_column_verbatim() {
        // The column is passed through untouched, including unusual characters.
        let msg = Message::new(User::new("Al", "a@x.com"), "hi", "col:42/😀 \"quoted\"");

        let text = encode_message(&msg).unwrap();
        let decoded = decode_message(text.as_bytes()).unwrap();

        assert_eq!(decoded.column, "col:42/😀 \"quoted\"");
    }

    #[test]
    fn test_error_messages_are_human_readable() {
        let err = decode_message(b"42").unwrap_err();
        assert_eq!(
            err.to_string(),
            "message payload must be a JSON object, got a number"
        );
    }
}
