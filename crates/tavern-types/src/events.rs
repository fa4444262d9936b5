use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Events pushed to every socket subscribed to a channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum ChannelEvent {
    /// A message was posted over the socket
    New {
        id: i64,
        user_id: i64,
        username: String,
        display_name: String,
        content: String,
        timestamp: NaiveDateTime,
        is_action: bool,
        is_edited: bool,
        profile_picture: String,
    },

    /// A message's content was replaced
    Edit {
        id: i64,
        new_content: String,
        is_edited: bool,
    },

    /// A message was removed
    Delete { id: i64 },
}

/// A frame sent by a client on `/ws/{channel_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelCommand {
    pub token: String,
    pub content: String,
    #[serde(default)]
    pub alternate_id: i64,
    #[serde(default)]
    pub is_action: bool,
}

/// Reply sent only to the offending socket when a command is rejected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandError {
    pub error: String,
}

impl CommandError {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
