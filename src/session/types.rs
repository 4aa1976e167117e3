//! Roles, content parts and conversation turns.
//!
//! Turns serialize in the Gemini wire shape (`{"role": "user", "parts": [...]}`),
//! so the same values are sent to the model and returned by the history API.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Role of a turn participant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// Base64 payload tagged with its MIME type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

/// A single content fragment inside a turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Encode raw bytes as an inline fragment.
    pub fn inline(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self::Inline {
            inline_data: InlineData {
                mime_type: mime_type.into(),
                data: STANDARD.encode(bytes),
            },
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            Self::Inline { .. } => None,
        }
    }
}

/// One message unit of a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Turn {
    pub fn new(role: Role, parts: Vec<Part>) -> Self {
        Self { role, parts }
    }

    pub fn user(parts: Vec<Part>) -> Self {
        Self::new(Role::User, parts)
    }

    pub fn user_text(text: impl Into<String>) -> Self {
        Self::user(vec![Part::text(text)])
    }

    pub fn model_text(text: impl Into<String>) -> Self {
        Self::new(Role::Model, vec![Part::text(text)])
    }
}

/// Ordered turns of one session, oldest first.
pub type Transcript = VecDeque<Turn>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serialization() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(serde_json::to_string(&Role::Model).unwrap(), "\"model\"");
    }

    #[test]
    fn text_turn_uses_gemini_shape() {
        let turn = Turn::user_text("Halo");
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"role": "user", "parts": [{"text": "Halo"}]})
        );
    }

    #[test]
    fn inline_part_is_base64_with_camel_case_keys() {
        let part = Part::inline("image/png", b"\x89PNG");
        let json = serde_json::to_value(&part).unwrap();
        assert_eq!(json["inlineData"]["mimeType"], "image/png");
        assert_eq!(json["inlineData"]["data"], "iVBORw==");
        assert!(part.as_text().is_none());
    }

    #[test]
    fn parts_deserialize_by_shape() {
        let text: Part = serde_json::from_str(r#"{"text": "hi"}"#).unwrap();
        assert_eq!(text.as_text(), Some("hi"));

        let inline: Part =
            serde_json::from_str(r#"{"inlineData": {"mimeType": "text/plain", "data": "aGk="}}"#)
                .unwrap();
        assert!(matches!(inline, Part::Inline { .. }));
    }
}
