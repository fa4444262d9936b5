use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use tavern_types::events::{ChannelEvent, CommandError};

/// Frames queued for a single socket's writer task.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Event(ChannelEvent),
    Error(CommandError),
}

/// A connection's membership in one channel.
pub struct Subscription {
    pub conn_id: Uuid,
    /// Handle for queueing frames to this connection only.
    pub tx: mpsc::UnboundedSender<Outbound>,
    pub rx: mpsc::UnboundedReceiver<Outbound>,
}

/// Tracks the live sockets of every channel and fans events out to them.
#[derive(Clone, Default)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

#[derive(Default)]
struct DispatcherInner {
    /// channel_id -> (conn_id -> outbound queue)
    channels: RwLock<HashMap<i64, HashMap<Uuid, mpsc::UnboundedSender<Outbound>>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to a channel's set.
    pub async fn join(&self, channel_id: i64) -> Subscription {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();

        self.inner
            .channels
            .write()
            .await
            .entry(channel_id)
            .or_default()
            .insert(conn_id, tx.clone());

        Subscription { conn_id, tx, rx }
    }

    /// Remove a connection. The channel entry is dropped once empty.
    pub async fn leave(&self, channel_id: i64, conn_id: Uuid) {
        let mut channels = self.inner.channels.write().await;
        if let Some(conns) = channels.get_mut(&channel_id) {
            conns.remove(&conn_id);
            if conns.is_empty() {
                channels.remove(&channel_id);
            }
        }
    }

    /// Queue an event on every connection of the channel.
    /// Closed queues are skipped. Returns how many connections accepted it.
    pub async fn broadcast(&self, channel_id: i64, event: ChannelEvent) -> usize {
        let channels = self.inner.channels.read().await;
        let Some(conns) = channels.get(&channel_id) else {
            return 0;
        };

        conns
            .values()
            .filter(|tx| tx.send(Outbound::Event(event.clone())).is_ok())
            .count()
    }

    pub async fn connection_count(&self, channel_id: i64) -> usize {
        self.inner
            .channels
            .read()
            .await
            .get(&channel_id)
            .map_or(0, HashMap::len)
    }
}
