use crate::models::{
    AlternateRow, ChannelRow, MessageRow, NewMessage, PrivateMessageRow, ServerRow, UserRow,
};
use crate::{Database, OptionalExt};
use anyhow::Result;
use chrono::NaiveDateTime;
use rusqlite::{Connection, Row};

const USER_COLUMNS: &str =
    "id, username, display_name, password, profile_picture, last_active, online";

const MESSAGE_SELECT: &str =
    "SELECT m.id, m.user_id, m.channel_id, m.content, m.timestamp, m.is_action, m.is_edited,
            m.alternate_id, u.username, u.display_name, u.profile_picture, a.name, a.icon
     FROM messages m
     LEFT JOIN users u ON u.id = m.user_id
     LEFT JOIN alternate_profiles a ON m.alternate_id != 0 AND a.id = m.alternate_id";

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        username: &str,
        display_name: &str,
        password_hash: &str,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (username, display_name, password) VALUES (?1, ?2, ?3)",
                (username, display_name, password_hash),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1");
            conn.query_row(&sql, [username], user_from_row).optional()
        })
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    pub fn list_users(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Record activity: bumps `last_active` and marks the user online.
    pub fn touch_user(&self, id: i64, now: NaiveDateTime) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET last_active = ?1, online = 1 WHERE id = ?2",
                rusqlite::params![now, id],
            )?;
            Ok(())
        })
    }

    /// Update username and/or display name. `None` leaves a column untouched.
    pub fn update_profile(
        &self,
        id: i64,
        username: Option<&str>,
        display_name: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users
                 SET username = COALESCE(?1, username),
                     display_name = COALESCE(?2, display_name)
                 WHERE id = ?3",
                rusqlite::params![username, display_name, id],
            )?;
            Ok(())
        })
    }

    pub fn set_profile_picture(&self, id: i64, url: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET profile_picture = ?1 WHERE id = ?2",
                rusqlite::params![url, id],
            )?;
            Ok(())
        })
    }

    // -- Session tokens --

    pub fn create_token(&self, user_id: i64, token: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tokens (user_id, token) VALUES (?1, ?2)",
                rusqlite::params![user_id, token],
            )?;
            Ok(())
        })
    }

    /// Resolve a session token to its user.
    pub fn user_for_token(&self, token: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT u.id, u.username, u.display_name, u.password, u.profile_picture,
                        u.last_active, u.online
                 FROM users u
                 JOIN tokens t ON t.user_id = u.id
                 WHERE t.token = ?1",
                [token],
                user_from_row,
            )
            .optional()
        })
    }

    /// Delete a session token and mark its owner offline.
    /// Returns the owner's id, or `None` if the token was unknown.
    pub fn delete_token(&self, token: &str) -> Result<Option<i64>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let user_id: Option<i64> = tx
                .query_row("SELECT user_id FROM tokens WHERE token = ?1", [token], |row| {
                    row.get(0)
                })
                .optional()?;

            if let Some(user_id) = user_id {
                tx.execute("DELETE FROM tokens WHERE token = ?1", [token])?;
                tx.execute("UPDATE users SET online = 0 WHERE id = ?1", [user_id])?;
            }

            tx.commit()?;
            Ok(user_id)
        })
    }

    // -- Alternate profiles --

    /// Create an alternate unless the user already has `max` linked ones.
    /// Returns `None` when the limit is reached.
    pub fn create_alternate(
        &self,
        user_id: i64,
        name: &str,
        icon: Option<&str>,
        max: usize,
    ) -> Result<Option<i64>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let count: i64 = tx.query_row(
                "SELECT COUNT(*) FROM alternate_profiles WHERE user_id = ?1",
                [user_id],
                |row| row.get(0),
            )?;
            if count as usize >= max {
                return Ok(None);
            }

            tx.execute(
                "INSERT INTO alternate_profiles (user_id, name, icon) VALUES (?1, ?2, ?3)",
                rusqlite::params![user_id, name, icon],
            )?;
            let id = tx.last_insert_rowid();
            tx.commit()?;
            Ok(Some(id))
        })
    }

    pub fn get_alternate(&self, id: i64) -> Result<Option<AlternateRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, user_id, name, icon FROM alternate_profiles WHERE id = ?1",
                [id],
                alternate_from_row,
            )
            .optional()
        })
    }

    /// All alternates still linked to a user, ordered by id.
    pub fn list_linked_alternates(&self) -> Result<Vec<AlternateRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, name, icon FROM alternate_profiles
                 WHERE user_id IS NOT NULL ORDER BY id",
            )?;
            let rows = stmt
                .query_map([], alternate_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Detach an alternate from its owner. The row stays so old messages keep their persona.
    pub fn unlink_alternate(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("UPDATE alternate_profiles SET user_id = NULL WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    // -- Servers & channels --

    pub fn create_server(&self, name: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute("INSERT INTO servers (name) VALUES (?1)", [name])?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_server(&self, id: i64) -> Result<Option<ServerRow>> {
        self.with_conn(|conn| {
            conn.query_row("SELECT id, name FROM servers WHERE id = ?1", [id], |row| {
                Ok(ServerRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })
            .optional()
        })
    }

    pub fn list_servers(&self) -> Result<Vec<ServerRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name FROM servers ORDER BY id")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(ServerRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn create_channel(&self, server_id: i64, name: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO channels (name, server_id) VALUES (?1, ?2)",
                rusqlite::params![name, server_id],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_channel(&self, id: i64) -> Result<Option<ChannelRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, name, server_id FROM channels WHERE id = ?1",
                [id],
                channel_from_row,
            )
            .optional()
        })
    }

    pub fn list_channels(&self, server_id: i64) -> Result<Vec<ChannelRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, server_id FROM channels WHERE server_id = ?1 ORDER BY id",
            )?;
            let rows = stmt
                .query_map([server_id], channel_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Channel messages --

    pub fn insert_message(&self, msg: &NewMessage<'_>) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages
                    (user_id, server_id, channel_id, content, timestamp, is_action, alternate_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    msg.user_id,
                    msg.server_id,
                    msg.channel_id,
                    msg.content,
                    msg.timestamp,
                    msg.is_action,
                    msg.alternate_id
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Messages of a channel in ascending id order. With a `limit`, only the
    /// newest `limit` messages older than `before` are returned.
    pub fn get_messages(
        &self,
        channel_id: i64,
        before: Option<i64>,
        limit: Option<u32>,
    ) -> Result<Vec<MessageRow>> {
        // SQLite treats a negative LIMIT as "no limit"
        let limit = limit.map(i64::from).unwrap_or(-1);

        self.with_conn(|conn| {
            let sql = format!(
                "{MESSAGE_SELECT}
                 WHERE m.channel_id = ?1 AND (?2 IS NULL OR m.id < ?2)
                 ORDER BY m.id DESC
                 LIMIT ?3"
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt
                .query_map(rusqlite::params![channel_id, before, limit], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.reverse();
            Ok(rows)
        })
    }

    pub fn get_message(&self, id: i64) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!("{MESSAGE_SELECT} WHERE m.id = ?1");
            conn.query_row(&sql, [id], message_from_row).optional()
        })
    }

    /// Returns false when no message with this id belongs to `user_id`.
    pub fn edit_message(&self, id: i64, user_id: i64, content: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE messages SET content = ?1, is_edited = 1 WHERE id = ?2 AND user_id = ?3",
                rusqlite::params![content, id, user_id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_message(&self, id: i64, user_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM messages WHERE id = ?1 AND user_id = ?2",
                [id, user_id],
            )?;
            Ok(changed > 0)
        })
    }

    // -- Private messages --

    pub fn insert_private_message(
        &self,
        sender_id: i64,
        receiver_id: i64,
        content: &str,
        timestamp: NaiveDateTime,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO private_messages (sender_id, receiver_id, content, timestamp)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![sender_id, receiver_id, content, timestamp],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Both directions of the conversation between two users, oldest first.
    pub fn get_conversation(&self, user_a: i64, user_b: i64) -> Result<Vec<PrivateMessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, sender_id, receiver_id, content, timestamp, is_edited
                 FROM private_messages
                 WHERE (sender_id = ?1 AND receiver_id = ?2)
                    OR (sender_id = ?2 AND receiver_id = ?1)
                 ORDER BY id",
            )?;
            let rows = stmt
                .query_map([user_a, user_b], private_message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_private_message(&self, id: i64) -> Result<Option<PrivateMessageRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, sender_id, receiver_id, content, timestamp, is_edited
                 FROM private_messages WHERE id = ?1",
                [id],
                private_message_from_row,
            )
            .optional()
        })
    }

    pub fn edit_private_message(&self, id: i64, sender_id: i64, content: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE private_messages SET content = ?1, is_edited = 1
                 WHERE id = ?2 AND sender_id = ?3",
                rusqlite::params![content, id, sender_id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_private_message(&self, id: i64, sender_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM private_messages WHERE id = ?1 AND sender_id = ?2",
                [id, sender_id],
            )?;
            Ok(changed > 0)
        })
    }
}

fn query_user_by_id(conn: &Connection, id: i64) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    conn.query_row(&sql, [id], user_from_row).optional()
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        display_name: row.get(2)?,
        password: row.get(3)?,
        profile_picture: row.get(4)?,
        last_active: row.get(5)?,
        online: row.get(6)?,
    })
}

fn alternate_from_row(row: &Row<'_>) -> rusqlite::Result<AlternateRow> {
    Ok(AlternateRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        icon: row.get(3)?,
    })
}

fn channel_from_row(row: &Row<'_>) -> rusqlite::Result<ChannelRow> {
    Ok(ChannelRow {
        id: row.get(0)?,
        name: row.get(1)?,
        server_id: row.get(2)?,
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        channel_id: row.get(2)?,
        content: row.get(3)?,
        timestamp: row.get(4)?,
        is_action: row.get(5)?,
        is_edited: row.get(6)?,
        alternate_id: row.get(7)?,
        username: row.get(8)?,
        display_name: row.get(9)?,
        profile_picture: row.get(10)?,
        alternate_name: row.get(11)?,
        alternate_icon: row.get(12)?,
    })
}

fn private_message_from_row(row: &Row<'_>) -> rusqlite::Result<PrivateMessageRow> {
    Ok(PrivateMessageRow {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        receiver_id: row.get(2)?,
        content: row.get(3)?,
        timestamp: row.get(4)?,
        is_edited: row.get(5)?,
    })
}
