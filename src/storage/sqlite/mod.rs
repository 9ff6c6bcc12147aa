//! `SQLite` content store.
//!
//! - [`connection`]: lock acquisition with poison recovery, pragma setup
//! - [`post_row`]: row conversion for posts and users
//! - [`store`]: the [`SqliteStore`] backend

mod connection;
mod post_row;
mod store;

pub use connection::{acquire_lock, configure_connection};
pub use post_row::{PostRow, UserRow};
pub use store::SqliteStore;
