//! User directory trait.

use crate::Result;
use crate::models::{User, UserId};

/// Lookup primitives over the site's users.
///
/// All lookups are exact, case-sensitive string matches.
pub trait UserDirectory: Send + Sync {
    /// Finds a user whose display name equals `name`.
    ///
    /// When several users share a display name the one with the lowest ID wins.
    fn find_by_display_name(&self, name: &str) -> Result<Option<UserId>>;

    /// Finds the user with login `login`.
    fn find_by_login(&self, login: &str) -> Result<Option<UserId>>;

    /// Retrieves a user by ID.
    fn get_user(&self, id: UserId) -> Result<Option<User>>;

    /// Creates a user.
    ///
    /// Fails with [`crate::Error::InvalidInput`] when the login is taken.
    fn add_user(&self, login: &str, display_name: &str) -> Result<User>;

    /// Lists all users ordered by ID.
    fn list_users(&self) -> Result<Vec<User>>;

    /// Returns the display name for a user, if the user exists.
    fn display_name(&self, id: UserId) -> Result<Option<String>> {
        Ok(self.get_user(id)?.map(|u| u.display_name))
    }
}
