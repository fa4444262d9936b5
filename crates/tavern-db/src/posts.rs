use anyhow::Result;
use chrono::NaiveDateTime;
use rusqlite::Row;

use crate::models::PostRow;
use crate::{Database, OptionalExt};

const POST_SELECT: &str = "SELECT p.id, p.user_id, u.username, p.content, p.created_at, p.updated_at
     FROM posts p
     JOIN users u ON u.id = p.user_id";

impl Database {
    pub fn insert_post(&self, user_id: i64, content: &str, now: NaiveDateTime) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO posts (user_id, content, created_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![user_id, content, now],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// All posts, newest first.
    pub fn list_posts(&self) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let sql = format!("{POST_SELECT} ORDER BY p.id DESC");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], post_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_post(&self, id: i64) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            let sql = format!("{POST_SELECT} WHERE p.id = ?1");
            conn.query_row(&sql, [id], post_from_row).optional()
        })
    }

    /// Returns false when no post with this id belongs to `user_id`.
    pub fn update_post(
        &self,
        id: i64,
        user_id: i64,
        content: &str,
        now: NaiveDateTime,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE posts SET content = ?1, updated_at = ?2 WHERE id = ?3 AND user_id = ?4",
                rusqlite::params![content, now, id, user_id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_post(&self, id: i64, user_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let changed =
                conn.execute("DELETE FROM posts WHERE id = ?1 AND user_id = ?2", [id, user_id])?;
            Ok(changed > 0)
        })
    }
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        username: row.get(2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}
