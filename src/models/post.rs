//! Post types and identifiers.

use super::UserId;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage format for post timestamps (`YYYY-MM-DD HH:MM:SS`).
pub const CANONICAL_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Store-assigned post identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(u64);

impl PostId {
    /// Creates a post ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for PostId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Publication status of a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    /// Publicly visible; the only status exported and the only one imports create.
    #[default]
    Published,
    /// Not yet published.
    Draft,
}

impl PostStatus {
    /// Returns the status as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Published => "publish",
            Self::Draft => "draft",
        }
    }

    /// Parses a stored status string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "publish" | "published" => Some(Self::Published),
            "draft" => Some(Self::Draft),
            _ => None,
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A post as held by the content store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRecord {
    /// Store-assigned identifier.
    pub id: PostId,
    /// Post title.
    pub title: String,
    /// Post body (HTML).
    pub body: String,
    /// Publication timestamp, store-local.
    pub published_at: NaiveDateTime,
    /// Author reference.
    pub author: UserId,
    /// Publication status.
    pub status: PostStatus,
}

impl ContentRecord {
    /// Returns the publication date in the store's native format.
    #[must_use]
    pub fn published_at_display(&self) -> String {
        self.published_at.format(CANONICAL_DATE_FORMAT).to_string()
    }

    /// Returns the keyset cursor positioned at this record.
    #[must_use]
    pub const fn cursor(&self) -> PageCursor {
        PageCursor {
            published_at: self.published_at,
            id: self.id,
        }
    }
}

/// A validated post waiting to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    /// Post title (non-empty, plain text).
    pub title: String,
    /// Sanitized body.
    pub body: String,
    /// Normalized publication timestamp.
    pub published_at: NaiveDateTime,
    /// Resolved author.
    pub author: UserId,
    /// Publication status.
    pub status: PostStatus,
}

impl NewPost {
    /// Creates a published post draft.
    #[must_use]
    pub fn published(
        title: impl Into<String>,
        body: impl Into<String>,
        published_at: NaiveDateTime,
        author: UserId,
    ) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            published_at,
            author,
            status: PostStatus::Published,
        }
    }

    /// Sets the status.
    #[must_use]
    pub const fn with_status(mut self, status: PostStatus) -> Self {
        self.status = status;
        self
    }
}

/// Keyset position for paging published posts newest first.
///
/// A page "after" a cursor holds records strictly older than it, ties on the
/// timestamp broken by descending ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    /// Timestamp of the last record seen.
    pub published_at: NaiveDateTime,
    /// ID of the last record seen.
    pub id: PostId,
}

impl PageCursor {
    /// Returns whether `record` sorts after this cursor in date-descending order.
    #[must_use]
    pub fn precedes(&self, record: &ContentRecord) -> bool {
        record.published_at < self.published_at
            || (record.published_at == self.published_at && record.id < self.id)
    }
}
