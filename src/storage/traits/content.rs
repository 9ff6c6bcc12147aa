//! Content store trait.

use crate::Result;
use crate::models::{ContentRecord, NewPost, PageCursor, PostId};

/// Trait for the system of record holding posts.
///
/// Imports only ever create posts; nothing here updates or deletes. Methods
/// take `&self` so one store can be shared behind an `Arc` by the import and
/// export services; implementations use interior locking.
pub trait ContentStore: Send + Sync {
    /// Creates a post and returns its new identifier.
    ///
    /// Any identifier carried by the source data is ignored; the store always
    /// assigns a fresh one.
    fn insert(&self, post: &NewPost) -> Result<PostId>;

    /// Retrieves a post by ID.
    fn get(&self, id: PostId) -> Result<Option<ContentRecord>>;

    /// Returns up to `limit` published posts, newest first.
    ///
    /// With `after` set, only posts strictly after that cursor in
    /// date-descending, id-descending order are returned.
    fn published_page(&self, after: Option<&PageCursor>, limit: usize)
    -> Result<Vec<ContentRecord>>;

    /// Returns the number of published posts.
    fn count_published(&self) -> Result<usize>;

    /// Checks whether any post is published.
    fn has_published(&self) -> Result<bool> {
        Ok(!self.published_page(None, 1)?.is_empty())
    }
}
