use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Relationship state shared by both accounts of a pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipStatus {
    #[default]
    Active,
    Break,
    PendingPatchup,
}

impl RelationshipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Break => "break",
            Self::PendingPatchup => "pending_patchup",
        }
    }
}

impl fmt::Display for RelationshipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown relationship status '{}'", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for RelationshipStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "break" => Ok(Self::Break),
            "pending_patchup" => Ok(Self::PendingPatchup),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A registered account. The email is the account's identity.
#[derive(Debug, Clone)]
pub struct Account {
    pub email: String,
    pub name: String,
    pub pin_hash: String,
    pub pair_code: Option<String>,
    pub paired_with: Option<String>,
    pub is_paired: bool,
    pub relationship_status: RelationshipStatus,
    pub breakup_reason: Option<String>,
    pub patch_requested: bool,
    pub created_at: DateTime<Utc>,
}

/// Why an account may not log in yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginBlock {
    NotPaired,
    OnBreak { reason: Option<String> },
}

impl Account {
    pub fn partner(&self) -> Option<&str> {
        self.paired_with.as_deref()
    }

    /// Login requires a completed pairing and a relationship that is not on a break.
    pub fn login_block(&self) -> Option<LoginBlock> {
        if !self.is_paired || self.paired_with.is_none() {
            return Some(LoginBlock::NotPaired);
        }
        if self.relationship_status == RelationshipStatus::Break {
            return Some(LoginBlock::OnBreak {
                reason: self.breakup_reason.clone(),
            });
        }
        None
    }
}

/// A persisted chat message. Timestamps are assigned by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub sender_email: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub content: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

/// One conversation per pairing code, messages in persisted order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub pair_code: String,
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub last_message_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub color: String,
    pub is_favorite: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM`
    pub time: String,
    pub priority: String,
    pub is_completed: bool,
    pub is_recurring: bool,
    pub recurring_type: Option<String>,
    pub created_by: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub id: Uuid,
    pub url: String,
    pub caption: String,
    pub uploaded_by: String,
    pub uploaded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> Account {
        Account {
            email: "a@example.com".into(),
            name: "Ana".into(),
            pin_hash: String::new(),
            pair_code: Some("ABC123".into()),
            paired_with: Some("b@example.com".into()),
            is_paired: true,
            relationship_status: RelationshipStatus::Active,
            breakup_reason: None,
            patch_requested: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            RelationshipStatus::Active,
            RelationshipStatus::Break,
            RelationshipStatus::PendingPatchup,
        ] {
            assert_eq!(status.as_str().parse::<RelationshipStatus>(), Ok(status));
        }
        assert!("broken".parse::<RelationshipStatus>().is_err());
    }

    #[test]
    fn unpaired_account_cannot_log_in() {
        let mut acc = account();
        acc.is_paired = false;
        assert_eq!(acc.login_block(), Some(LoginBlock::NotPaired));
    }

    #[test]
    fn break_blocks_login_with_reason() {
        let mut acc = account();
        acc.relationship_status = RelationshipStatus::Break;
        acc.breakup_reason = Some("need space".into());
        assert_eq!(
            acc.login_block(),
            Some(LoginBlock::OnBreak { reason: Some("need space".into()) })
        );

        acc.relationship_status = RelationshipStatus::PendingPatchup;
        assert_eq!(acc.login_block(), None);
    }

    #[test]
    fn message_uses_wire_names() {
        let msg = ChatMessage {
            sender_email: "a@example.com".into(),
            kind: "text".into(),
            content: serde_json::json!("hi"),
            timestamp: Utc::now(),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["senderEmail"], "a@example.com");
        assert_eq!(value["type"], "text");
        assert!(value.get("kind").is_none());
    }
}
