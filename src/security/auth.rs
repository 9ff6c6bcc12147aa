//! Operators, roles and capability checks.
//!
//! Every action names the capability it needs; [`authorize`] is the single
//! place that turns a missing capability into [`Error::Unauthorized`].
//!
//! | Role | Capabilities |
//! |------|--------------|
//! | `Administrator` | `ManageOptions`, `EditPosts`, `ReadPosts` |
//! | `Editor` | `EditPosts`, `ReadPosts` |
//! | `Subscriber` | `ReadPosts` |

use crate::models::{User, UserId};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A permission an action can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Site administration: export, import, license management.
    ManageOptions,
    /// Create and modify posts.
    EditPosts,
    /// Read published posts.
    ReadPosts,
}

impl Capability {
    /// Returns the capability name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ManageOptions => "manage_options",
            Self::EditPosts => "edit_posts",
            Self::ReadPosts => "read_posts",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Predefined capability sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Everything.
    Administrator,
    /// Content work, no site settings.
    Editor,
    /// Read-only.
    Subscriber,
}

impl Role {
    /// Returns the capabilities granted by this role.
    #[must_use]
    pub const fn capabilities(self) -> &'static [Capability] {
        match self {
            Self::Administrator => &[
                Capability::ManageOptions,
                Capability::EditPosts,
                Capability::ReadPosts,
            ],
            Self::Editor => &[Capability::EditPosts, Capability::ReadPosts],
            Self::Subscriber => &[Capability::ReadPosts],
        }
    }
}

/// The authenticated actor behind a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operator {
    user: User,
    capabilities: HashSet<Capability>,
}

impl Operator {
    /// Creates an operator with the capabilities of `role`.
    #[must_use]
    pub fn new(user: User, role: Role) -> Self {
        Self {
            user,
            capabilities: role.capabilities().iter().copied().collect(),
        }
    }

    /// Creates an operator with an explicit capability set.
    #[must_use]
    pub fn with_capabilities(user: User, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        Self {
            user,
            capabilities: capabilities.into_iter().collect(),
        }
    }

    /// The operator's user record.
    #[must_use]
    pub const fn user(&self) -> &User {
        &self.user
    }

    /// The operator's user ID.
    #[must_use]
    pub const fn id(&self) -> UserId {
        self.user.id
    }

    /// Returns whether the operator holds `capability`.
    #[must_use]
    pub fn can(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

/// Fails unless the operator holds `capability`.
///
/// # Errors
///
/// Returns [`Error::Unauthorized`] when the capability is missing.
pub fn authorize(operator: &Operator, capability: Capability) -> Result<()> {
    if operator.can(capability) {
        Ok(())
    } else {
        tracing::warn!(
            operator = %operator.user.login,
            capability = capability.as_str(),
            "Capability check failed"
        );
        Err(Error::Unauthorized(format!(
            "'{}' lacks the {capability} capability",
            operator.user.login
        )))
    }
}
