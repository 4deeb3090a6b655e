//! Message types relayed between clients.
//!
//! Every frame a client sends, and every frame the relay fans out, is one
//! [`Message`] encoded as a JSON object:
//!
//! ```json
//! {"user":{"name":"Al","email":"a@x.com"},"message":"hi","column":"todo"}
//! ```
//!
//! # Lenient field handling
//!
//! The relay performs no validation of its own.  Unknown fields are ignored,
//! and a field that is missing or `null` falls back to its empty default
//! (empty string, or a [`User`] with empty name and email).  A field with the
//! wrong JSON type (e.g. `"message": 5`) is still a decode error.

use serde::{Deserialize, Deserializer, Serialize};

/// Identity attached to a message.
///
/// Purely a payload field: names are not unique and nothing is persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Display name shown next to the message.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Email address.  Not validated.
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
}

/// The unit of transport.
///
/// Messages are immutable values: a handler creates one when a frame decodes
/// successfully, and the broadcast loop drops it once every registered
/// connection has been offered a copy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who sent the message.
    #[serde(default, deserialize_with = "null_as_default")]
    pub user: User,

    /// The message body.
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,

    /// Application-defined grouping tag, e.g. the board column a card lives in.
    ///
    /// Opaque to the relay: it is never interpreted, only passed through.
    #[serde(default, deserialize_with = "null_as_default")]
    pub column: String,
}

impl Message {
    /// Builds a message from its three parts.
    pub fn new(user: User, message: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            user,
            message: message.into(),
            column: column.into(),
        }
    }
}

impl User {
    /// Builds a user from a display name and email.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

/// Deserializes `null` as `T::default()` instead of failing.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_payload_deserializes_every_field() {
        // Arrange
        let json = r#"{"user":{"name":"Al","email":"a@x.com"},"message":"hi","column":"todo"}"#;

        // Act
        let msg: Message = serde_json::from_str(json).unwrap();

        // Assert
        assert_eq!(msg.user, User::new("Al", "a@x.com"));
        assert_eq!(msg.message, "hi");
        assert_eq!(msg.column, "todo");
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let msg: Message = serde_json::from_str(r#"{"message":"only body"}"#).unwrap();
        assert_eq!(msg.user, User::default());
        assert_eq!(msg.message, "only body");
        assert_eq!(msg.column, "");
    }

    #[test]
    fn test_missing_user_fields_default_to_empty() {
        let msg: Message = serde_json::from_str(r#"{"user":{"name":"Al"}}"#).unwrap();
        assert_eq!(msg.user.name, "Al");
        assert_eq!(msg.user.email, "");
    }

    #[test]
    fn test_null_fields_default_to_empty() {
        let msg: Message =
            serde_json::from_str(r#"{"user":null,"message":null,"column":"done"}"#).unwrap();
        assert_eq!(msg.user, User::default());
        assert_eq!(msg.message, "");
        assert_eq!(msg.column, "done");
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let json = r#"{"message":"hi","column":"todo","board":"b1","user":{"name":"Al","avatar":"x.png"}}"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.message, "hi");
        assert_eq!(msg.user.name, "Al");
    }

    #[test]
    fn test_wrong_field_type_is_rejected() {
        let result = serde_json::from_str::<Message>(r#"{"message":5}"#);
        assert!(result.is_err(), "a numeric body must not decode");
    }

    #[test]
    fn test_serialize_always_emits_all_fields() {
        // Empty fields are still written so every receiver sees the same shape.
        let json = serde_json::to_string(&Message::default()).unwrap();
        assert_eq!(
            json,
            r#"{"user":{"name":"","email":""},"message":"","column":""}"#
        );
    }
}
