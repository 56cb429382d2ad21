use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tracing::{info, warn};

use kindred_types::events::{InboundFrame, ServerFrame};

use crate::hub::{ChatHub, Membership};

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Serve an admitted chat connection. The credential was already verified at
/// the HTTP upgrade layer, so this goes straight to joining the pair's group.
pub async fn handle_connection(
    socket: WebSocket,
    hub: ChatHub,
    pair_code: String,
    identity: String,
) {
    let Membership {
        pair_code,
        identity,
        member_id,
        mut frames,
        direct,
    } = hub.join(&pair_code, identity).await;

    let (mut sender, mut receiver) = socket.split();

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    // History first, then live frames and error replies, plus the heartbeat.
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                frame = frames.recv() => {
                    let Some(frame) = frame else { break };
                    let text = match serde_json::to_string(&frame) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!("Failed to encode chat frame: {}", e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    let hub_recv = hub.clone();
    let code_recv = pair_code.clone();
    let identity_recv = identity.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    let frame = match serde_json::from_str::<InboundFrame>(&text) {
                        Ok(frame) => frame,
                        Err(e) => {
                            let raw: String = text.chars().take(200).collect();
                            warn!(
                                "{} sent a bad frame on chat {}: {} -- raw: {}",
                                identity_recv, code_recv, e, raw
                            );
                            let _ = direct.send(ServerFrame::Error {
                                error: format!("Invalid message format: {e}"),
                            });
                            continue;
                        }
                    };

                    if let Err(e) = hub_recv.publish(&code_recv, &identity_recv, frame).await {
                        warn!("{} on chat {}: {}", identity_recv, code_recv, e);
                        let _ = direct.send(ServerFrame::Error {
                            error: "Failed to save message".to_string(),
                        });
                    }
                }
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    hub.leave(&pair_code, member_id).await;
    info!("{} disconnected from chat {}", identity, pair_code);
}
