//! Storage backend traits.

mod content;
mod users;

pub use content::ContentStore;
pub use users::UserDirectory;
