use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, error, info, warn};

use tavern_db::Database;
use tavern_db::models::{ChannelRow, NewMessage};
use tavern_types::DEFAULT_PROFILE_PICTURE;
use tavern_types::events::{ChannelCommand, ChannelEvent, CommandError};

use crate::dispatcher::{Dispatcher, Outbound};

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Serve one socket attached to `channel` until it closes.
pub async fn handle_connection(
    socket: WebSocket,
    channel: ChannelRow,
    db: Arc<Database>,
    dispatcher: Dispatcher,
) {
    let (mut sender, mut receiver) = socket.split();
    let channel_id = channel.id;

    let subscription = dispatcher.join(channel_id).await;
    let conn_id = subscription.conn_id;
    let self_tx = subscription.tx;
    let mut outbound_rx = subscription.rx;

    info!("Connection {} joined channel {}", conn_id, channel_id);

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    // Writer: drains this connection's queue, with heartbeat
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                outbound = outbound_rx.recv() => {
                    let Some(outbound) = outbound else { break };

                    let text = match &outbound {
                        Outbound::Event(event) => serde_json::to_string(event),
                        Outbound::Error(err) => serde_json::to_string(err),
                    };
                    let text = match text {
                        Ok(text) => text,
                        Err(e) => {
                            error!("Failed to encode outbound frame: {}", e);
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
                            warn!(
                                "Heartbeat timeout (missed {} pongs), dropping connection",
                                missed_heartbeats
                            );
                            break;
                        }
                    }
                    if sender.send(Message::Ping(Default::default())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Reader: each text frame is a message to post in the channel
    let recv_dispatcher = dispatcher.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    let cmd = match serde_json::from_str::<ChannelCommand>(&text) {
                        Ok(cmd) => cmd,
                        Err(e) => {
                            debug!(
                                "Connection {} bad payload: {} -- raw: {}",
                                conn_id,
                                e,
                                text.chars().take(200).collect::<String>()
                            );
                            let _ = self_tx
                                .send(Outbound::Error(CommandError::new("Invalid payload")));
                            continue;
                        }
                    };

                    let db = db.clone();
                    let channel = channel.clone();
                    let stored = tokio::task::spawn_blocking(move || {
                        store_message(&db, &channel, cmd)
                    })
                    .await;

                    match stored {
                        Ok(Ok(event)) => {
                            recv_dispatcher.broadcast(channel_id, event).await;
                        }
                        Ok(Err(rejection)) => {
                            let _ = self_tx.send(Outbound::Error(rejection));
                        }
                        Err(e) => {
                            error!("spawn_blocking join error: {}", e);
                            break;
                        }
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

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    dispatcher.leave(channel_id, conn_id).await;
    info!("Connection {} left channel {}", conn_id, channel_id);
}

/// Persist a posted message and build the event announcing it.
/// Rejections are returned as the error frame for the sender.
pub fn store_message(
    db: &Database,
    channel: &ChannelRow,
    cmd: ChannelCommand,
) -> Result<ChannelEvent, CommandError> {
    let user = db
        .user_for_token(&cmd.token)
        .map_err(internal)?
        .ok_or_else(|| CommandError::new("Invalid token"))?;

    let (display_name, profile_picture) = if cmd.alternate_id == 0 {
        (user.display_name.clone(), user.profile_picture.clone())
    } else {
        let alternate = db
            .get_alternate(cmd.alternate_id)
            .map_err(internal)?
            .filter(|alt| alt.user_id == Some(user.id))
            .ok_or_else(|| CommandError::new("Alternate not found"))?;
        (alternate.name, alternate.icon)
    };

    let timestamp = chrono::Utc::now().naive_utc();
    let id = db
        .insert_message(&NewMessage {
            user_id: user.id,
            server_id: channel.server_id,
            channel_id: channel.id,
            content: &cmd.content,
            timestamp,
            is_action: cmd.is_action,
            alternate_id: cmd.alternate_id,
        })
        .map_err(internal)?;

    db.touch_user(user.id, timestamp).map_err(internal)?;

    Ok(ChannelEvent::New {
        id,
        user_id: user.id,
        username: user.username,
        display_name,
        content: cmd.content,
        timestamp,
        is_action: cmd.is_action,
        is_edited: false,
        profile_picture: profile_picture.unwrap_or_else(|| DEFAULT_PROFILE_PICTURE.to_string()),
    })
}

fn internal(e: anyhow::Error) -> CommandError {
    error!("Gateway storage error: {}", e);
    CommandError::new("Internal error")
}
