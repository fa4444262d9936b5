//! Database row types — these map directly to SQLite rows.
//! Distinct from tavern-types API models to keep the DB layer independent.

use chrono::NaiveDateTime;

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub password: String,
    pub profile_picture: Option<String>,
    pub last_active: Option<NaiveDateTime>,
    pub online: bool,
}

#[derive(Debug, Clone)]
pub struct AlternateRow {
    pub id: i64,
    pub user_id: Option<i64>,
    pub name: String,
    pub icon: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ServerRow {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct ChannelRow {
    pub id: i64,
    pub name: String,
    pub server_id: i64,
}

/// A channel message joined with its sender and, when spoken as an
/// alternate, that alternate's name and icon.
#[derive(Debug, Clone)]
pub struct MessageRow {
    pub id: i64,
    pub user_id: i64,
    pub channel_id: i64,
    pub content: String,
    pub timestamp: NaiveDateTime,
    pub is_action: bool,
    pub is_edited: bool,
    pub alternate_id: i64,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub profile_picture: Option<String>,
    pub alternate_name: Option<String>,
    pub alternate_icon: Option<String>,
}

pub struct NewMessage<'a> {
    pub user_id: i64,
    pub server_id: i64,
    pub channel_id: i64,
    pub content: &'a str,
    pub timestamp: NaiveDateTime,
    pub is_action: bool,
    pub alternate_id: i64,
}

#[derive(Debug, Clone)]
pub struct PrivateMessageRow {
    pub id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub content: String,
    pub timestamp: NaiveDateTime,
    pub is_edited: bool,
}

#[derive(Debug, Clone)]
pub struct PostRow {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub content: String,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}
