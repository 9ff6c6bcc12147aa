//! Data models for postport.
//!
//! Posts move between the content store and CSV as [`ContentRecord`]s; new
//! posts enter the store as [`NewPost`]s. Users back author attribution.

mod post;
mod user;

pub use post::{CANONICAL_DATE_FORMAT, ContentRecord, NewPost, PageCursor, PostId, PostStatus};
pub use user::{User, UserId};
