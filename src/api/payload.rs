//! Chat Payload Analysis
//!
//! Reads just enough of an inbound chat completion body to size the prompt.

use serde::{Deserialize, Deserializer};

use crate::error::{GatewayError, Result};

/// Role whose content counts toward the prompt length
pub const USER_ROLE: &str = "user";

/// A message in a chat conversation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Message {
    /// Role: "system", "user", "assistant", or "tool"
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: String,

    /// Message content (string, array of parts, or absent)
    #[serde(default)]
    pub content: Option<MessageContent>,
}

/// Message content - can be a simple string or array of parts
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Simple string content
    Text(String),

    /// Array of content parts (for multimodal)
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Character count used for routing (byte length of the text)
    pub fn char_count(&self) -> usize {
        match self {
            MessageContent::Text(s) => s.len(),
            MessageContent::Parts(parts) => parts.iter().map(ContentPart::char_count).sum(),
        }
    }
}

/// A content part in a message
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ContentPart {
    /// Text content
    #[serde(rename = "text")]
    Text { text: String },

    /// Any non-text part (images, audio, files)
    #[serde(other)]
    Other,
}

impl ContentPart {
    fn char_count(&self) -> usize {
        match self {
            ContentPart::Text { text } => text.len(),
            ContentPart::Other => 0,
        }
    }
}

/// The part of a chat completion request the router looks at
///
/// Every other field (`model`, `temperature`, `tools`, ...) is ignored here
/// and reaches the backend untouched in the raw body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatPayload {
    /// Messages in the conversation, in the order received
    #[serde(default, deserialize_with = "null_as_default")]
    pub messages: Vec<Message>,
}

/// Treat an explicit `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl ChatPayload {
    /// Parse a raw request body
    ///
    /// A bare `null` body is an empty payload. A top-level array is
    /// malformed even though serde would fill the defaulted fields from it.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        if raw.iter().find(|b| !b.is_ascii_whitespace()) == Some(&b'[') {
            return Err(GatewayError::MalformedPayload(
                <serde_json::Error as serde::de::Error>::custom(
                    "expected a JSON object, found an array",
                ),
            ));
        }
        serde_json::from_slice::<Option<Self>>(raw)
            .map(Option::unwrap_or_default)
            .map_err(GatewayError::MalformedPayload)
    }

    /// Sum of the content lengths of all user messages
    pub fn prompt_length(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.role == USER_ROLE)
            .filter_map(|m| m.content.as_ref())
            .map(MessageContent::char_count)
            .sum()
    }
}

/// Size the prompt of a raw chat completion body
///
/// Fails with [`GatewayError::MalformedPayload`] when the body is not a chat
/// completion payload; nothing downstream may run in that case.
pub fn analyze(raw: &[u8]) -> Result<usize> {
    ChatPayload::parse(raw).map(|payload| payload.prompt_length())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_user_message() {
        let body = br#"{"messages":[{"role":"user","content":"hi"}]}"#;
        assert_eq!(analyze(body).unwrap(), 2);
    }

    #[test]
    fn test_only_user_messages_count() {
        let body = br#"{
            "model": "whatever",
            "messages": [
                {"role": "system", "content": "You are a very helpful assistant."},
                {"role": "user", "content": "hello"},
                {"role": "assistant", "content": "Hi there, how can I help?"},
                {"role": "user", "content": "world!"}
            ]
        }"#;
        assert_eq!(analyze(body).unwrap(), 11);
    }

    #[test]
    fn test_length_is_bytes() {
        // two bytes per character in UTF-8
        let body = r#"{"messages":[{"role":"user","content":"éé"}]}"#;
        assert_eq!(analyze(body.as_bytes()).unwrap(), 4);
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        assert_eq!(analyze(b"{}").unwrap(), 0);
        assert_eq!(analyze(br#"{"messages":[]}"#).unwrap(), 0);
        assert_eq!(analyze(br#"{"messages":[{"content":"no role"}]}"#).unwrap(), 0);
        assert_eq!(analyze(br#"{"messages":[{"role":"user"}]}"#).unwrap(), 0);
        assert_eq!(
            analyze(br#"{"messages":[{"role":"user","content":null}]}"#).unwrap(),
            0
        );
        assert_eq!(
            analyze(br#"{"messages":[{"role":"user","content":""}]}"#).unwrap(),
            0
        );
    }

    #[test]
    fn test_nulls_count_as_missing() {
        assert_eq!(analyze(b"null").unwrap(), 0);
        assert_eq!(analyze(br#"{"messages":null}"#).unwrap(), 0);
        assert_eq!(
            analyze(br#"{"messages":[{"role":null,"content":"ignored"}]}"#).unwrap(),
            0
        );
        assert_eq!(
            analyze(br#"{"messages":[{"role":null},{"role":"user","content":"abc"}]}"#).unwrap(),
            3
        );
    }

    #[test]
    fn test_content_parts() {
        let body = br#"{"messages":[{"role":"user","content":[
            {"type":"text","text":"describe "},
            {"type":"image_url","image_url":{"url":"https://example.com/cat.png"}},
            {"type":"text","text":"this"}
        ]}]}"#;
        assert_eq!(analyze(body).unwrap(), 13);
    }

    #[test]
    fn test_malformed_payloads() {
        for body in [
            &b""[..],
            b"not json",
            b"{\"messages\":",
            b"[]",
            b"{\"messages\":\"hi\"}",
            b"{\"messages\":[{\"role\":\"user\",\"content\":42}]}",
        ] {
            assert!(
                matches!(analyze(body), Err(GatewayError::MalformedPayload(_))),
                "expected malformed: {}",
                String::from_utf8_lossy(body)
            );
        }
    }
}
