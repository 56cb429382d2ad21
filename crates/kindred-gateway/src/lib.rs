pub mod connection;
pub mod hub;
pub mod store;

pub use hub::{AdmissionError, ChatError, ChatHub, Membership};
pub use store::ConversationStore;
