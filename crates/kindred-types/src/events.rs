use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ChatMessage;

fn default_kind() -> String {
    "text".to_string()
}

/// Frame sent FROM client TO server on a chat connection.
/// The sender is always the connection's authenticated identity, never the payload.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundFrame {
    pub content: serde_json::Value,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
}

impl InboundFrame {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: serde_json::Value::String(content.into()),
            kind: default_kind(),
        }
    }
}

/// A chat message as delivered to clients. Replayed history carries
/// `isHistorical: true`; live traffic omits the field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatFrame {
    pub pair_code: String,
    pub sender_email: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub content: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_historical: Option<bool>,
}

impl ChatFrame {
    pub fn live(pair_code: &str, message: &ChatMessage) -> Self {
        Self {
            pair_code: pair_code.to_string(),
            sender_email: message.sender_email.clone(),
            kind: message.kind.clone(),
            content: message.content.clone(),
            timestamp: message.timestamp,
            is_historical: None,
        }
    }

    pub fn historical(pair_code: &str, message: &ChatMessage) -> Self {
        Self {
            is_historical: Some(true),
            ..Self::live(pair_code, message)
        }
    }

    pub fn is_historical(&self) -> bool {
        self.is_historical.unwrap_or(false)
    }
}

/// Everything the server writes to a chat connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerFrame {
    Chat(ChatFrame),
    /// Delivered only to the client whose inbound frame failed.
    Error { error: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbound_kind_defaults_to_text() {
        let frame: InboundFrame = serde_json::from_str(r#"{"content":"hi"}"#).unwrap();
        assert_eq!(frame.kind, "text");
        assert_eq!(frame.content, "hi");

        let frame: InboundFrame =
            serde_json::from_str(r#"{"content":{"url":"x"},"type":"image"}"#).unwrap();
        assert_eq!(frame.kind, "image");
    }

    #[test]
    fn inbound_requires_content() {
        assert!(serde_json::from_str::<InboundFrame>(r#"{"type":"text"}"#).is_err());
    }

    #[test]
    fn live_frame_omits_historical_flag() {
        let msg = ChatMessage {
            sender_email: "a@example.com".into(),
            kind: "text".into(),
            content: serde_json::json!("hi"),
            timestamp: Utc::now(),
        };

        let live = serde_json::to_value(ServerFrame::Chat(ChatFrame::live("ABC123", &msg))).unwrap();
        assert_eq!(live["pairCode"], "ABC123");
        assert_eq!(live["senderEmail"], "a@example.com");
        assert!(live.get("isHistorical").is_none());

        let past = serde_json::to_value(ChatFrame::historical("ABC123", &msg)).unwrap();
        assert_eq!(past["isHistorical"], true);
    }

    #[test]
    fn error_frame_shape() {
        let value = serde_json::to_value(ServerFrame::Error { error: "nope".into() }).unwrap();
        assert_eq!(value, serde_json::json!({ "error": "nope" }));
    }
}
