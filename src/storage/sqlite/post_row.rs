//! Row conversion for `SQLite` post and user storage.
//!
//! Rows are read as primitive columns first and converted afterwards, so that
//! conversion failures surface as [`Error::OperationFailed`] instead of being
//! squeezed through `rusqlite::Error`.

use crate::models::{CANONICAL_DATE_FORMAT, ContentRecord, PostId, PostStatus, User, UserId};
use crate::{Error, Result};
use chrono::NaiveDateTime;

/// Columns selected for posts, in [`PostRow`] order.
pub const POST_COLUMNS: &str = "id, title, body, published_at, author_id, status";

/// Raw post row as stored.
#[derive(Debug)]
pub struct PostRow {
    /// Row ID.
    pub id: i64,
    /// Title.
    pub title: String,
    /// Body HTML.
    pub body: String,
    /// Timestamp in `YYYY-MM-DD HH:MM:SS`.
    pub published_at: String,
    /// Author row ID.
    pub author_id: i64,
    /// Status string (`publish`, `draft`).
    pub status: String,
}

impl PostRow {
    /// Reads a row selected with [`POST_COLUMNS`].
    pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            body: row.get(2)?,
            published_at: row.get(3)?,
            author_id: row.get(4)?,
            status: row.get(5)?,
        })
    }

    /// Converts into a [`ContentRecord`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] for a stored timestamp or status the
    /// store could not have written itself.
    pub fn into_record(self) -> Result<ContentRecord> {
        let published_at = NaiveDateTime::parse_from_str(&self.published_at, CANONICAL_DATE_FORMAT)
            .map_err(|e| Error::OperationFailed {
                operation: "decode_post_row".to_string(),
                cause: format!("post {}: bad published_at '{}': {e}", self.id, self.published_at),
            })?;
        let status = PostStatus::parse(&self.status).ok_or_else(|| Error::OperationFailed {
            operation: "decode_post_row".to_string(),
            cause: format!("post {}: unknown status '{}'", self.id, self.status),
        })?;

        Ok(ContentRecord {
            id: PostId::new(from_sql_id(self.id)?),
            title: self.title,
            body: self.body,
            published_at,
            author: UserId::new(from_sql_id(self.author_id)?),
            status,
        })
    }
}

/// Raw user row as stored.
#[derive(Debug)]
pub struct UserRow {
    /// Row ID.
    pub id: i64,
    /// Login.
    pub login: String,
    /// Display name.
    pub display_name: String,
}

impl UserRow {
    /// Reads a row selected as `id, login, display_name`.
    pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            login: row.get(1)?,
            display_name: row.get(2)?,
        })
    }

    /// Converts into a [`User`].
    pub fn into_user(self) -> Result<User> {
        Ok(User {
            id: UserId::new(from_sql_id(self.id)?),
            login: self.login,
            display_name: self.display_name,
        })
    }
}

/// Converts an `SQLite` rowid into an unsigned ID.
pub fn from_sql_id(id: i64) -> Result<u64> {
    u64::try_from(id).map_err(|_| Error::OperationFailed {
        operation: "decode_row_id".to_string(),
        cause: format!("negative row id {id}"),
    })
}

/// Converts an unsigned ID into an `SQLite` rowid.
pub fn to_sql_id(id: u64) -> Result<i64> {
    i64::try_from(id).map_err(|_| Error::InvalidInput(format!("id {id} out of range")))
}
