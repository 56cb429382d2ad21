use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use kindred_auth::{Rejection, TOKEN_COOKIE, TokenVerifier, extract_token};
use kindred_types::events::{ChatFrame, InboundFrame, ServerFrame};
use kindred_types::models::ChatMessage;

use crate::store::ConversationStore;

#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("no credential in request")]
    MissingCredential,
    #[error("credential rejected: {0}")]
    Rejected(#[from] Rejection),
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("failed to persist message: {0}")]
    Persist(#[source] anyhow::Error),
    #[error("publish task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Live members of one pairing code's chat.
#[derive(Default)]
struct Group {
    members: HashMap<Uuid, mpsc::UnboundedSender<ServerFrame>>,
    /// Keeps timestamps non-decreasing within the conversation.
    last_timestamp: Option<DateTime<Utc>>,
}

/// A joined connection's handle on its group. Historical frames are already
/// queued on `frames` when `join` returns; live frames follow.
pub struct Membership {
    pub pair_code: String,
    pub identity: String,
    pub member_id: Uuid,
    pub frames: mpsc::UnboundedReceiver<ServerFrame>,
    /// Writes to this connection only (error replies).
    pub direct: mpsc::UnboundedSender<ServerFrame>,
}

/// Per-pair chat groups: admission, history replay, persist-then-fan-out.
#[derive(Clone)]
pub struct ChatHub {
    inner: Arc<HubInner>,
}

struct HubInner {
    store: Arc<dyn ConversationStore>,
    verifier: Arc<dyn TokenVerifier>,

    /// pairing code -> group. The outer lock only guards lookup and creation;
    /// all membership mutation and fan-out happens under the group's own lock.
    groups: RwLock<HashMap<String, Arc<Mutex<Group>>>>,
}

impl ChatHub {
    pub fn new(store: Arc<dyn ConversationStore>, verifier: Arc<dyn TokenVerifier>) -> Self {
        Self {
            inner: Arc::new(HubInner {
                store,
                verifier,
                groups: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Pull the token out of a raw cookie header and verify it.
    /// Returns the identity (account email) the token was issued to.
    pub fn authenticate(&self, cookie_header: Option<&str>) -> Result<String, AdmissionError> {
        let header = cookie_header.ok_or(AdmissionError::MissingCredential)?;
        let token = extract_token(header, TOKEN_COOKIE)
            .ok_or(AdmissionError::MissingCredential)?;
        let claims = self.inner.verifier.verify(token)?;
        Ok(claims.sub)
    }

    /// Register a connection in the pair's group and queue the stored history
    /// for it. Registration and replay happen under the group lock, so no live
    /// message can slip between the two.
    pub async fn join(&self, pair_code: &str, identity: String) -> Membership {
        let (tx, frames) = mpsc::unbounded_channel();
        let member_id = Uuid::new_v4();

        let handle = self.group(pair_code).await;
        let mut group = handle.lock().await;
        group.members.insert(member_id, tx.clone());
        let replayed = self.replay(pair_code, &tx).await;
        let members = group.members.len();
        drop(group);

        info!(
            "{} joined chat {} ({} members, {} replayed)",
            identity, pair_code, members, replayed
        );

        Membership {
            pair_code: pair_code.to_string(),
            identity,
            member_id,
            frames,
            direct: tx,
        }
    }

    /// Remove a member. Only the membership changes; stored messages are untouched.
    pub async fn leave(&self, pair_code: &str, member_id: Uuid) -> bool {
        let Some(handle) = self.existing_group(pair_code).await else {
            return false;
        };
        let removed = handle.lock().await.members.remove(&member_id).is_some();
        if removed {
            debug!("member {} left chat {}", member_id, pair_code);
        }
        removed
    }

    pub async fn member_count(&self, pair_code: &str) -> usize {
        match self.existing_group(pair_code).await {
            Some(handle) => handle.lock().await.members.len(),
            None => 0,
        }
    }

    pub async fn is_member(&self, pair_code: &str, member_id: Uuid) -> bool {
        match self.existing_group(pair_code).await {
            Some(handle) => handle.lock().await.members.contains_key(&member_id),
            None => false,
        }
    }

    /// Persist a message from `sender` and fan it out to every member of the
    /// group, sender included. Nothing is delivered unless the store accepted
    /// the message.
    ///
    /// The work runs on its own task: a caller that goes away mid-publish does
    /// not cancel persistence or delivery.
    pub async fn publish(
        &self,
        pair_code: &str,
        sender: &str,
        frame: InboundFrame,
    ) -> Result<ChatFrame, ChatError> {
        let hub = self.clone();
        let pair_code = pair_code.to_string();
        let sender = sender.to_string();

        tokio::spawn(async move { hub.persist_and_fan_out(&pair_code, sender, frame).await })
            .await?
    }

    async fn persist_and_fan_out(
        &self,
        pair_code: &str,
        sender: String,
        frame: InboundFrame,
    ) -> Result<ChatFrame, ChatError> {
        let handle = self.group(pair_code).await;

        // Held across persist and enqueue: broadcast order == persisted order.
        let mut group = handle.lock().await;

        let now = Utc::now();
        let timestamp = match group.last_timestamp {
            Some(last) if last > now => last,
            _ => now,
        };
        let message = ChatMessage {
            sender_email: sender,
            kind: frame.kind,
            content: frame.content,
            timestamp,
        };

        let store = self.inner.store.clone();
        let code = pair_code.to_string();
        let record = message.clone();
        tokio::task::spawn_blocking(move || store.append_message(&code, &record))
            .await
            .map_err(|e| ChatError::Persist(e.into()))?
            .map_err(ChatError::Persist)?;
        group.last_timestamp = Some(timestamp);

        let live = ChatFrame::live(pair_code, &message);
        group.members.retain(|member_id, tx| {
            let delivered = tx.send(ServerFrame::Chat(live.clone())).is_ok();
            if !delivered {
                debug!("dropping closed member {} from chat {}", member_id, pair_code);
            }
            delivered
        });
        debug!(
            "{} -> chat {} delivered to {} members",
            message.sender_email,
            pair_code,
            group.members.len()
        );

        Ok(live)
    }

    /// Best effort: a failed history read is logged and the connection simply
    /// starts with no history.
    async fn replay(&self, pair_code: &str, tx: &mpsc::UnboundedSender<ServerFrame>) -> usize {
        let store = self.inner.store.clone();
        let code = pair_code.to_string();

        let conversation =
            match tokio::task::spawn_blocking(move || store.find_conversation(&code)).await {
                Ok(Ok(Some(conversation))) => conversation,
                Ok(Ok(None)) => return 0,
                Ok(Err(e)) => {
                    warn!("history replay for chat {} failed: {}", pair_code, e);
                    return 0;
                }
                Err(e) => {
                    warn!("history replay task for chat {} failed: {}", pair_code, e);
                    return 0;
                }
            };

        let mut sent = 0;
        for message in &conversation.messages {
            let frame = ServerFrame::Chat(ChatFrame::historical(pair_code, message));
            if tx.send(frame).is_err() {
                break;
            }
            sent += 1;
        }
        sent
    }

    async fn existing_group(&self, pair_code: &str) -> Option<Arc<Mutex<Group>>> {
        self.inner.groups.read().await.get(pair_code).cloned()
    }

    /// Groups are created on first use and never pruned; a rejoin reuses them.
    async fn group(&self, pair_code: &str) -> Arc<Mutex<Group>> {
        if let Some(handle) = self.existing_group(pair_code).await {
            return handle;
        }
        self.inner
            .groups
            .write()
            .await
            .entry(pair_code.to_string())
            .or_default()
            .clone()
    }
}
