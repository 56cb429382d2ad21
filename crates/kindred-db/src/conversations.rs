use anyhow::Result;
use rusqlite::OptionalExtension;
use rusqlite::types::Type;

use kindred_types::models::{ChatMessage, Conversation};

use crate::{Database, format_ts, parse_ts};

impl Database {
    /// Append a message to the pair's conversation, creating the conversation
    /// on first use and refreshing its last-activity time. One transaction.
    pub fn append_message(&self, pair_code: &str, message: &ChatMessage) -> Result<()> {
        let content = serde_json::to_string(&message.content)?;
        let ts = format_ts(&message.timestamp);

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO conversations (pair_code, created_at, last_message_at)
                 VALUES (?1, ?2, ?2)
                 ON CONFLICT(pair_code) DO UPDATE SET last_message_at = excluded.last_message_at",
                (pair_code, &ts),
            )?;
            tx.execute(
                "INSERT INTO conversation_messages (pair_code, sender_email, kind, content, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (pair_code, &message.sender_email, &message.kind, &content, &ts),
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn find_conversation(&self, pair_code: &str) -> Result<Option<Conversation>> {
        self.with_conn(|conn| {
            let header: Option<(String, String)> = conn
                .query_row(
                    "SELECT created_at, last_message_at FROM conversations WHERE pair_code = ?1",
                    [pair_code],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            let Some((created_at, last_message_at)) = header else {
                return Ok(None);
            };

            let mut stmt = conn.prepare(
                "SELECT sender_email, kind, content, timestamp
                 FROM conversation_messages
                 WHERE pair_code = ?1
                 ORDER BY seq ASC",
            )?;
            let messages = stmt
                .query_map([pair_code], |row| {
                    let content: String = row.get(2)?;
                    let timestamp: String = row.get(3)?;
                    Ok(ChatMessage {
                        sender_email: row.get(0)?,
                        kind: row.get(1)?,
                        content: serde_json::from_str(&content).map_err(|e| {
                            rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e))
                        })?,
                        timestamp: parse_ts(3, &timestamp)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(Some(Conversation {
                pair_code: pair_code.to_string(),
                messages,
                created_at: parse_ts(0, &created_at)?,
                last_message_at: parse_ts(1, &last_message_at)?,
            }))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn message(sender: &str, text: &str, offset_secs: i64) -> ChatMessage {
        ChatMessage {
            sender_email: sender.into(),
            kind: "text".into(),
            content: serde_json::json!(text),
            timestamp: Utc::now() + Duration::seconds(offset_secs),
        }
    }

    #[test]
    fn absent_conversation_is_none() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.find_conversation("ABC123").unwrap().is_none());
    }

    #[test]
    fn first_append_creates_conversation() {
        let db = Database::open_in_memory().unwrap();
        let first = message("a@example.com", "hi", 0);
        db.append_message("ABC123", &first).unwrap();

        let conv = db.find_conversation("ABC123").unwrap().unwrap();
        assert_eq!(conv.messages, vec![first.clone()]);
        assert_eq!(conv.created_at, conv.last_message_at);
    }

    #[test]
    fn appends_keep_order_and_refresh_activity() {
        let db = Database::open_in_memory().unwrap();
        let msgs = vec![
            message("a@example.com", "one", 0),
            message("b@example.com", "two", 1),
            message("a@example.com", "three", 2),
        ];
        for m in &msgs {
            db.append_message("ABC123", m).unwrap();
        }
        db.append_message("OTHER1", &message("c@example.com", "elsewhere", 3))
            .unwrap();

        let conv = db.find_conversation("ABC123").unwrap().unwrap();
        assert_eq!(conv.messages, msgs);
        assert_eq!(conv.created_at, msgs[0].timestamp);
        assert_eq!(conv.last_message_at, msgs[2].timestamp);
    }

    #[test]
    fn structured_content_survives_storage() {
        let db = Database::open_in_memory().unwrap();
        let mut m = message("a@example.com", "", 0);
        m.kind = "image".into();
        m.content = serde_json::json!({ "url": "https://example.com/p.jpg", "w": 640 });
        db.append_message("ABC123", &m).unwrap();

        let conv = db.find_conversation("ABC123").unwrap().unwrap();
        assert_eq!(conv.messages[0].content["w"], 640);
    }
}
