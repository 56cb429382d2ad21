pub mod auth;
pub mod error;
pub mod gallery;
pub mod messages;
pub mod middleware;
pub mod notes;
pub mod pairing;
pub mod profile;
pub mod relationship;
pub mod reminders;
pub mod storage;

pub use auth::{AppState, AppStateInner};
pub use error::{ApiError, ApiResult};
pub use storage::BlobStore;
