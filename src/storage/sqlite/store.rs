//! `SQLite`-backed content store and user directory.

use super::connection::{acquire_lock, configure_connection};
use super::post_row::{POST_COLUMNS, PostRow, UserRow, from_sql_id, to_sql_id};
use crate::models::{
    CANONICAL_DATE_FORMAT, ContentRecord, NewPost, PageCursor, PostId, PostStatus, User, UserId,
};
use crate::storage::traits::{ContentStore, UserDirectory};
use crate::{Error, Result};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::instrument;

/// `SQLite` store implementing both [`ContentStore`] and [`UserDirectory`].
///
/// # Concurrency Model
///
/// A single `Mutex<Connection>`; `rusqlite::Connection` is not `Sync`. Import
/// and export runs are request-scoped and do not overlap, so contention is not
/// a concern.
///
/// # Schema
///
/// - `users(id, login UNIQUE, display_name)`
/// - `posts(id, title, body, published_at TEXT, author_id -> users.id, status)`
///
/// `published_at` is stored in `YYYY-MM-DD HH:MM:SS`, which sorts correctly as
/// text.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl SqliteStore {
    /// Opens (creating if needed) a store at `db_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::OperationFailed {
                operation: "create_data_dir".to_string(),
                cause: format!("{}: {e}", parent.display()),
            })?;
        }
        let conn = Connection::open(&db_path).map_err(|e| Error::OperationFailed {
            operation: "open_sqlite".to_string(),
            cause: e.to_string(),
        })?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path: Some(db_path),
        };
        store.initialize()?;
        Ok(store)
    }

    /// Creates an in-memory store (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::OperationFailed {
            operation: "open_sqlite_in_memory".to_string(),
            cause: e.to_string(),
        })?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path: None,
        };
        store.initialize()?;
        Ok(store)
    }

    /// Returns the database path (None for in-memory).
    #[must_use]
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn initialize(&self) -> Result<()> {
        let conn = acquire_lock(&self.conn);
        configure_connection(&conn)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                login TEXT NOT NULL UNIQUE,
                display_name TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                body TEXT NOT NULL,
                published_at TEXT NOT NULL,
                author_id INTEGER NOT NULL REFERENCES users(id),
                status TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_posts_status_date
                ON posts(status, published_at DESC, id DESC);
            CREATE INDEX IF NOT EXISTS idx_users_display_name ON users(display_name);",
        )
        .map_err(|e| Error::OperationFailed {
            operation: "create_schema".to_string(),
            cause: e.to_string(),
        })
    }
}

fn query_failed(operation: &str, e: &rusqlite::Error) -> Error {
    Error::OperationFailed {
        operation: operation.to_string(),
        cause: e.to_string(),
    }
}

impl ContentStore for SqliteStore {
    #[instrument(skip(self, post), fields(title = %post.title))]
    fn insert(&self, post: &NewPost) -> Result<PostId> {
        let conn = acquire_lock(&self.conn);
        conn.execute(
            "INSERT INTO posts (title, body, published_at, author_id, status)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                post.title,
                post.body,
                post.published_at.format(CANONICAL_DATE_FORMAT).to_string(),
                to_sql_id(post.author.get())?,
                post.status.as_str(),
            ],
        )
        .map_err(|e| query_failed("insert_post", &e))?;

        Ok(PostId::new(from_sql_id(conn.last_insert_rowid())?))
    }

    fn get(&self, id: PostId) -> Result<Option<ContentRecord>> {
        let conn = acquire_lock(&self.conn);
        let row = conn
            .query_row(
                &format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?1"),
                params![to_sql_id(id.get())?],
                PostRow::from_row,
            )
            .optional()
            .map_err(|e| query_failed("get_post", &e))?;

        row.map(PostRow::into_record).transpose()
    }

    fn published_page(
        &self,
        after: Option<&PageCursor>,
        limit: usize,
    ) -> Result<Vec<ContentRecord>> {
        let conn = acquire_lock(&self.conn);
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let status = PostStatus::Published.as_str();

        let rows: Vec<PostRow> = match after {
            None => {
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT {POST_COLUMNS} FROM posts WHERE status = ?1
                         ORDER BY published_at DESC, id DESC LIMIT ?2"
                    ))
                    .map_err(|e| query_failed("prepare_published_page", &e))?;
                let rows: Vec<PostRow> = stmt
                    .query_map(params![status, limit], PostRow::from_row)
                    .and_then(Iterator::collect)
                    .map_err(|e| query_failed("published_page", &e))?;
                rows
            },
            Some(cursor) => {
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT {POST_COLUMNS} FROM posts WHERE status = ?1
                         AND (published_at < ?2 OR (published_at = ?2 AND id < ?3))
                         ORDER BY published_at DESC, id DESC LIMIT ?4"
                    ))
                    .map_err(|e| query_failed("prepare_published_page", &e))?;
                let rows: Vec<PostRow> = stmt
                    .query_map(
                        params![
                            status,
                            cursor.published_at.format(CANONICAL_DATE_FORMAT).to_string(),
                            to_sql_id(cursor.id.get())?,
                            limit
                        ],
                        PostRow::from_row,
                    )
                    .and_then(Iterator::collect)
                    .map_err(|e| query_failed("published_page", &e))?;
                rows
            },
        };

        rows.into_iter().map(PostRow::into_record).collect()
    }

    fn count_published(&self) -> Result<usize> {
        let conn = acquire_lock(&self.conn);
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM posts WHERE status = ?1",
                params![PostStatus::Published.as_str()],
                |row| row.get(0),
            )
            .map_err(|e| query_failed("count_published", &e))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

impl UserDirectory for SqliteStore {
    fn find_by_display_name(&self, name: &str) -> Result<Option<UserId>> {
        let conn = acquire_lock(&self.conn);
        let id: Option<i64> = conn
            .query_row(
                "SELECT id FROM users WHERE display_name = ?1 ORDER BY id LIMIT 1",
                params![name],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| query_failed("find_user_by_display_name", &e))?;
        id.map(|id| from_sql_id(id).map(UserId::new)).transpose()
    }

    fn find_by_login(&self, login: &str) -> Result<Option<UserId>> {
        let conn = acquire_lock(&self.conn);
        let id: Option<i64> = conn
            .query_row(
                "SELECT id FROM users WHERE login = ?1",
                params![login],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| query_failed("find_user_by_login", &e))?;
        id.map(|id| from_sql_id(id).map(UserId::new)).transpose()
    }

    fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let conn = acquire_lock(&self.conn);
        let row = conn
            .query_row(
                "SELECT id, login, display_name FROM users WHERE id = ?1",
                params![to_sql_id(id.get())?],
                UserRow::from_row,
            )
            .optional()
            .map_err(|e| query_failed("get_user", &e))?;
        row.map(UserRow::into_user).transpose()
    }

    fn add_user(&self, login: &str, display_name: &str) -> Result<User> {
        if login.trim().is_empty() {
            return Err(Error::InvalidInput("login cannot be empty".to_string()));
        }
        if self.find_by_login(login)?.is_some() {
            return Err(Error::InvalidInput(format!("login '{login}' already exists")));
        }

        let conn = acquire_lock(&self.conn);
        conn.execute(
            "INSERT INTO users (login, display_name) VALUES (?1, ?2)",
            params![login, display_name],
        )
        .map_err(|e| query_failed("insert_user", &e))?;

        Ok(User {
            id: UserId::new(from_sql_id(conn.last_insert_rowid())?),
            login: login.to_string(),
            display_name: display_name.to_string(),
        })
    }

    fn list_users(&self) -> Result<Vec<User>> {
        let conn = acquire_lock(&self.conn);
        let mut stmt = conn
            .prepare("SELECT id, login, display_name FROM users ORDER BY id")
            .map_err(|e| query_failed("prepare_list_users", &e))?;
        let rows: Vec<UserRow> = stmt
            .query_map([], UserRow::from_row)
            .and_then(Iterator::collect)
            .map_err(|e| query_failed("list_users", &e))?;
        rows.into_iter().map(UserRow::into_user).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use tempfile::TempDir;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 2, day)
            .and_then(|d| d.and_hms_opt(hour, 0, 0))
            .unwrap()
    }

    #[test]
    fn test_insert_and_get() {
        let store = SqliteStore::in_memory().unwrap();
        let author = store.add_user("editor", "The Editor").unwrap();

        let id = store
            .insert(&NewPost::published("Hello", "<p>World</p>", at(1, 10), author.id))
            .unwrap();
        let record = store.get(id).unwrap().unwrap();

        assert_eq!(record.title, "Hello");
        assert_eq!(record.body, "<p>World</p>");
        assert_eq!(record.published_at, at(1, 10));
        assert_eq!(record.author, author.id);
        assert_eq!(record.status, PostStatus::Published);
    }

    #[test]
    fn test_insert_with_unknown_author_fails() {
        let store = SqliteStore::in_memory().unwrap();
        let result = store.insert(&NewPost::published("Orphan", "", at(1, 10), UserId::new(42)));
        assert!(matches!(result, Err(Error::OperationFailed { .. })));
    }

    #[test]
    fn test_published_page_pagination() {
        let store = SqliteStore::in_memory().unwrap();
        let author = store.add_user("editor", "The Editor").unwrap().id;
        store.insert(&NewPost::published("a", "", at(1, 10), author)).unwrap();
        store.insert(&NewPost::published("b", "", at(3, 10), author)).unwrap();
        store.insert(&NewPost::published("c", "", at(3, 10), author)).unwrap();
        store
            .insert(&NewPost::published("d", "", at(4, 10), author).with_status(PostStatus::Draft))
            .unwrap();
        store.insert(&NewPost::published("e", "", at(2, 10), author)).unwrap();

        let first = store.published_page(None, 2).unwrap();
        let second = store.published_page(Some(&first[1].cursor()), 2).unwrap();
        let third = store.published_page(Some(&second[1].cursor()), 2).unwrap();

        let titles: Vec<&str> = first
            .iter()
            .chain(&second)
            .chain(&third)
            .map(|p| p.title.as_str())
            .collect();
        assert_eq!(titles, vec!["c", "b", "e", "a"]);
        assert_eq!(store.count_published().unwrap(), 4);
        assert!(store.has_published().unwrap());
    }

    #[test]
    fn test_user_directory() {
        let store = SqliteStore::in_memory().unwrap();
        let first = store.add_user("first", "Shared Name").unwrap();
        let _second = store.add_user("second", "Shared Name").unwrap();

        assert_eq!(store.find_by_display_name("Shared Name").unwrap(), Some(first.id));
        assert_eq!(store.find_by_login("second").unwrap().map(UserId::get), Some(2));
        assert_eq!(store.find_by_login("Second").unwrap(), None);
        assert!(store.add_user("first", "Dup").is_err());
        assert_eq!(store.list_users().unwrap().len(), 2);
    }

    #[test]
    fn test_file_store_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("posts.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            let author = store.add_user("editor", "Editor").unwrap().id;
            store.insert(&NewPost::published("kept", "", at(1, 1), author)).unwrap();
        }

        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.db_path(), Some(path.as_path()));
        assert_eq!(reopened.count_published().unwrap(), 1);
    }
}
