//! Security features.
//!
//! Capability checks and anti-forgery tokens. Both run before an action
//! touches a file or the store.

pub mod auth;
pub mod csrf;

pub use auth::{Capability, Operator, Role, authorize};
pub use csrf::{CsrfGuard, FORM_SECRET_ENV};
