//! Storage layer abstraction.
//!
//! Two boundaries, both owned by the host system in production:
//! - **Content store**: posts, created by import and read by export
//! - **User directory**: exact lookups by display name and login
//!
//! [`SqliteStore`] and [`MemoryStore`] implement both.

// Dropping the connection guard slightly earlier buys nothing here.
#![allow(clippy::significant_drop_tightening)]

pub mod memory;
pub mod sqlite;
pub mod traits;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{ContentStore, UserDirectory};
