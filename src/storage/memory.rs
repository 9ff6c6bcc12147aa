//! In-memory content store and user directory.
//!
//! Used by tests and by embedders with their own persistence. Behaves like
//! [`super::SqliteStore`] including ordering and ID assignment, but nothing
//! survives the process.

use crate::models::{ContentRecord, NewPost, PageCursor, PostId, PostStatus, User, UserId};
use crate::storage::sqlite::acquire_lock;
use crate::storage::traits::{ContentStore, UserDirectory};
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
struct State {
    posts: BTreeMap<PostId, ContentRecord>,
    users: BTreeMap<UserId, User>,
    next_post_id: u64,
    next_user_id: u64,
}

/// Mutex-guarded in-memory store implementing both storage traits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every stored post, in ID order.
    #[must_use]
    pub fn all_posts(&self) -> Vec<ContentRecord> {
        acquire_lock(&self.state).posts.values().cloned().collect()
    }
}

impl ContentStore for MemoryStore {
    fn insert(&self, post: &NewPost) -> Result<PostId> {
        let mut state = acquire_lock(&self.state);
        state.next_post_id += 1;
        let id = PostId::new(state.next_post_id);
        state.posts.insert(
            id,
            ContentRecord {
                id,
                title: post.title.clone(),
                body: post.body.clone(),
                published_at: post.published_at,
                author: post.author,
                status: post.status,
            },
        );
        Ok(id)
    }

    fn get(&self, id: PostId) -> Result<Option<ContentRecord>> {
        Ok(acquire_lock(&self.state).posts.get(&id).cloned())
    }

    fn published_page(
        &self,
        after: Option<&PageCursor>,
        limit: usize,
    ) -> Result<Vec<ContentRecord>> {
        let state = acquire_lock(&self.state);
        let mut published: Vec<&ContentRecord> = state
            .posts
            .values()
            .filter(|p| p.status == PostStatus::Published)
            .filter(|p| after.is_none_or(|cursor| cursor.precedes(p)))
            .collect();
        published.sort_by(|a, b| {
            b.published_at
                .cmp(&a.published_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(published.into_iter().take(limit).cloned().collect())
    }

    fn count_published(&self) -> Result<usize> {
        Ok(acquire_lock(&self.state)
            .posts
            .values()
            .filter(|p| p.status == PostStatus::Published)
            .count())
    }
}

impl UserDirectory for MemoryStore {
    fn find_by_display_name(&self, name: &str) -> Result<Option<UserId>> {
        Ok(acquire_lock(&self.state)
            .users
            .values()
            .find(|u| u.display_name == name)
            .map(|u| u.id))
    }

    fn find_by_login(&self, login: &str) -> Result<Option<UserId>> {
        Ok(acquire_lock(&self.state)
            .users
            .values()
            .find(|u| u.login == login)
            .map(|u| u.id))
    }

    fn get_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(acquire_lock(&self.state).users.get(&id).cloned())
    }

    fn add_user(&self, login: &str, display_name: &str) -> Result<User> {
        if login.trim().is_empty() {
            return Err(Error::InvalidInput("login cannot be empty".to_string()));
        }
        let mut state = acquire_lock(&self.state);
        if state.users.values().any(|u| u.login == login) {
            return Err(Error::InvalidInput(format!("login '{login}' already exists")));
        }
        state.next_user_id += 1;
        let user = User {
            id: UserId::new(state.next_user_id),
            login: login.to_string(),
            display_name: display_name.to_string(),
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn list_users(&self) -> Result<Vec<User>> {
        Ok(acquire_lock(&self.state).users.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d)
            .and_then(|date| date.and_hms_opt(9, 30, 0))
            .unwrap()
    }

    #[test]
    fn test_insert_assigns_sequential_ids() {
        let store = MemoryStore::new();
        let author = store.add_user("admin", "Admin").unwrap().id;

        let a = store.insert(&NewPost::published("A", "", day(1), author)).unwrap();
        let b = store.insert(&NewPost::published("B", "", day(2), author)).unwrap();

        assert_eq!(a, PostId::new(1));
        assert_eq!(b, PostId::new(2));
        assert_eq!(store.get(b).unwrap().unwrap().title, "B");
    }

    #[test]
    fn test_published_page_orders_newest_first_and_skips_drafts() {
        let store = MemoryStore::new();
        let author = store.add_user("admin", "Admin").unwrap().id;
        store.insert(&NewPost::published("old", "", day(1), author)).unwrap();
        store.insert(&NewPost::published("new", "", day(3), author)).unwrap();
        store
            .insert(&NewPost::published("draft", "", day(5), author).with_status(PostStatus::Draft))
            .unwrap();
        store.insert(&NewPost::published("mid", "", day(2), author)).unwrap();

        let titles: Vec<String> = store
            .published_page(None, 10)
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(titles, vec!["new", "mid", "old"]);
        assert_eq!(store.count_published().unwrap(), 3);
    }

    #[test]
    fn test_published_page_continues_after_cursor() {
        let store = MemoryStore::new();
        let author = store.add_user("admin", "Admin").unwrap().id;
        for _ in 0..5 {
            store.insert(&NewPost::published("same day", "", day(1), author)).unwrap();
        }

        let first = store.published_page(None, 2).unwrap();
        let second = store.published_page(Some(&first[1].cursor()), 2).unwrap();
        let third = store.published_page(Some(&second[1].cursor()), 2).unwrap();

        let ids: Vec<u64> = first
            .iter()
            .chain(&second)
            .chain(&third)
            .map(|p| p.id.get())
            .collect();
        assert_eq!(ids, vec![5, 4, 3, 2, 1]);
    }

    #[test]
    fn test_user_lookups_are_exact() {
        let store = MemoryStore::new();
        let jane = store.add_user("jdoe", "Jane Doe").unwrap();

        assert_eq!(store.find_by_display_name("Jane Doe").unwrap(), Some(jane.id));
        assert_eq!(store.find_by_display_name("jane doe").unwrap(), None);
        assert_eq!(store.find_by_login("jdoe").unwrap(), Some(jane.id));
        assert_eq!(store.find_by_login("JDOE").unwrap(), None);
        assert_eq!(store.display_name(jane.id).unwrap().as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn test_duplicate_login_rejected() {
        let store = MemoryStore::new();
        store.add_user("jdoe", "Jane").unwrap();
        assert!(matches!(
            store.add_user("jdoe", "Someone Else"),
            Err(Error::InvalidInput(_))
        ));
    }
}
