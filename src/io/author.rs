//! Author resolution for imported rows.

use crate::models::UserId;
use crate::storage::UserDirectory;
use tracing::warn;

/// How an author name was matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorMatch {
    /// Exact display name.
    DisplayName,
    /// Exact login.
    Login,
    /// No match; the operator was used.
    Fallback,
}

/// Maps author names to user identities.
///
/// Lookup order is display name, then login, then the fallback identity
/// (normally the operator running the import). Matching is exact and
/// case-sensitive. Resolution never fails: a directory error is logged and
/// treated as no match.
pub struct AuthorResolver<'a> {
    directory: &'a dyn UserDirectory,
    fallback: UserId,
}

impl<'a> AuthorResolver<'a> {
    /// Creates a resolver.
    #[must_use]
    pub fn new(directory: &'a dyn UserDirectory, fallback: UserId) -> Self {
        Self {
            directory,
            fallback,
        }
    }

    /// Resolves a name to a user.
    #[must_use]
    pub fn resolve(&self, name: &str) -> UserId {
        self.resolve_with_match(name).0
    }

    /// Resolves a name and reports which rule matched.
    #[must_use]
    pub fn resolve_with_match(&self, name: &str) -> (UserId, AuthorMatch) {
        if name.is_empty() {
            return (self.fallback, AuthorMatch::Fallback);
        }

        match self.directory.find_by_display_name(name) {
            Ok(Some(id)) => return (id, AuthorMatch::DisplayName),
            Ok(None) => {},
            Err(e) => warn!(author = name, error = %e, "Display name lookup failed"),
        }

        match self.directory.find_by_login(name) {
            Ok(Some(id)) => return (id, AuthorMatch::Login),
            Ok(None) => {},
            Err(e) => warn!(author = name, error = %e, "Login lookup failed"),
        }

        (self.fallback, AuthorMatch::Fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;
    use crate::storage::MemoryStore;
    use crate::{Error, Result};

    struct BrokenDirectory;

    impl UserDirectory for BrokenDirectory {
        fn find_by_display_name(&self, _name: &str) -> Result<Option<UserId>> {
            Err(Error::OperationFailed {
                operation: "find_by_display_name".to_string(),
                cause: "offline".to_string(),
            })
        }
        fn find_by_login(&self, _login: &str) -> Result<Option<UserId>> {
            Err(Error::OperationFailed {
                operation: "find_by_login".to_string(),
                cause: "offline".to_string(),
            })
        }
        fn get_user(&self, _id: UserId) -> Result<Option<User>> {
            Ok(None)
        }
        fn add_user(&self, _login: &str, _display_name: &str) -> Result<User> {
            Err(Error::InvalidInput("read-only".to_string()))
        }
        fn list_users(&self) -> Result<Vec<User>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_resolution_order() {
        let store = MemoryStore::new();
        let operator = store.add_user("admin", "Administrator").unwrap().id;
        let jane = store.add_user("jdoe", "Jane Doe").unwrap().id;
        // A login that collides with someone else's display name.
        let imposter = store.add_user("Jane Doe", "Imposter").unwrap().id;

        let resolver = AuthorResolver::new(&store, operator);
        assert_eq!(
            resolver.resolve_with_match("Jane Doe"),
            (jane, AuthorMatch::DisplayName)
        );
        assert_eq!(resolver.resolve_with_match("jdoe"), (jane, AuthorMatch::Login));
        assert_eq!(
            resolver.resolve_with_match("Imposter"),
            (imposter, AuthorMatch::DisplayName)
        );
        assert_eq!(
            resolver.resolve_with_match("nobody"),
            (operator, AuthorMatch::Fallback)
        );
    }

    #[test]
    fn test_match_is_case_sensitive() {
        let store = MemoryStore::new();
        let operator = store.add_user("admin", "Administrator").unwrap().id;
        store.add_user("jdoe", "Jane Doe").unwrap();

        let resolver = AuthorResolver::new(&store, operator);
        assert_eq!(resolver.resolve("JANE DOE"), operator);
        assert_eq!(resolver.resolve("JDoe"), operator);
    }

    #[test]
    fn test_empty_name_falls_back() {
        let store = MemoryStore::new();
        let operator = store.add_user("admin", "").unwrap().id;
        store.add_user("other", "").unwrap();

        let resolver = AuthorResolver::new(&store, operator);
        assert_eq!(resolver.resolve_with_match(""), (operator, AuthorMatch::Fallback));
    }

    #[test]
    fn test_directory_errors_fall_back() {
        let resolver = AuthorResolver::new(&BrokenDirectory, UserId::new(42));
        assert_eq!(resolver.resolve("Jane Doe"), UserId::new(42));
    }
}
