use anyhow::Result;

use kindred_db::Database;
use kindred_types::models::{ChatMessage, Conversation};

/// Persistence the chat hub needs. Calls are blocking; the hub runs them
/// on the blocking pool.
pub trait ConversationStore: Send + Sync + 'static {
    fn find_conversation(&self, pair_code: &str) -> Result<Option<Conversation>>;

    /// Atomically append `message`, creating the conversation if needed and
    /// refreshing its last-activity time.
    fn append_message(&self, pair_code: &str, message: &ChatMessage) -> Result<()>;
}

impl ConversationStore for Database {
    fn find_conversation(&self, pair_code: &str) -> Result<Option<Conversation>> {
        Database::find_conversation(self, pair_code)
    }

    fn append_message(&self, pair_code: &str, message: &ChatMessage) -> Result<()> {
        Database::append_message(self, pair_code, message)
    }
}
