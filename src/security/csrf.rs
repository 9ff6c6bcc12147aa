//! Anti-forgery tokens for state-changing actions.
//!
//! A token is `HMAC-SHA256(secret, "action|operator|tick")`, hex encoded.
//! Time is cut into ticks of half the token lifetime and a token verifies
//! during the tick it was issued in and the one after, so its effective life
//! is between one half and one full lifetime.

use crate::models::UserId;
use crate::{Error, Result, current_timestamp};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

/// Environment variable holding the signing secret.
pub const FORM_SECRET_ENV: &str = "POSTPORT_FORM_SECRET";

/// Default token lifetime: one day.
pub const DEFAULT_LIFETIME_SECS: u64 = 86_400;

/// Issues and verifies action tokens.
pub struct CsrfGuard {
    secret: SecretString,
    tick_secs: u64,
}

impl fmt::Debug for CsrfGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsrfGuard")
            .field("secret", &"[REDACTED]")
            .field("tick_secs", &self.tick_secs)
            .finish()
    }
}

impl CsrfGuard {
    /// Creates a guard with the default lifetime.
    #[must_use]
    pub fn new(secret: SecretString) -> Self {
        Self::with_lifetime(secret, DEFAULT_LIFETIME_SECS)
    }

    /// Creates a guard whose tokens live up to `lifetime_secs`.
    #[must_use]
    pub fn with_lifetime(secret: SecretString, lifetime_secs: u64) -> Self {
        Self {
            secret,
            tick_secs: (lifetime_secs / 2).max(1),
        }
    }

    /// Creates a guard from [`FORM_SECRET_ENV`], or with a random per-process
    /// secret when it is unset. Tokens from a random secret do not survive a
    /// restart.
    #[must_use]
    pub fn from_env() -> Self {
        let secret = std::env::var(FORM_SECRET_ENV)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| {
                tracing::debug!("{FORM_SECRET_ENV} unset, using a per-process form secret");
                uuid::Uuid::new_v4().simple().to_string()
            });
        Self::new(SecretString::from(secret))
    }

    /// Issues a token for `action` by `operator`, valid from now.
    ///
    /// # Errors
    ///
    /// Returns an error if the MAC cannot be keyed.
    pub fn issue(&self, action: &str, operator: UserId) -> Result<String> {
        self.issue_at(action, operator, current_timestamp())
    }

    /// Issues a token as of `now` (Unix seconds).
    ///
    /// # Errors
    ///
    /// Returns an error if the MAC cannot be keyed.
    pub fn issue_at(&self, action: &str, operator: UserId, now: u64) -> Result<String> {
        self.sign(action, operator, self.tick(now))
    }

    /// Verifies a token for `action` by `operator`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] when the token is absent, forged,
    /// issued for another action or operator, or expired.
    pub fn verify(&self, token: Option<&str>, action: &str, operator: UserId) -> Result<()> {
        self.verify_at(token, action, operator, current_timestamp())
    }

    /// Verifies a token as of `now` (Unix seconds).
    ///
    /// # Errors
    ///
    /// See [`CsrfGuard::verify`].
    pub fn verify_at(
        &self,
        token: Option<&str>,
        action: &str,
        operator: UserId,
        now: u64,
    ) -> Result<()> {
        let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) else {
            return Err(Error::Unauthorized(format!("missing token for '{action}'")));
        };

        let tick = self.tick(now);
        for candidate in [Some(tick), tick.checked_sub(1)].into_iter().flatten() {
            let expected = self.sign(action, operator, candidate)?;
            if constant_time_eq(expected.as_bytes(), token.as_bytes()) {
                return Ok(());
            }
        }

        tracing::warn!(action, operator = %operator, "Rejected anti-forgery token");
        Err(Error::Unauthorized(format!("invalid or expired token for '{action}'")))
    }

    const fn tick(&self, now: u64) -> u64 {
        now / self.tick_secs
    }

    fn sign(&self, action: &str, operator: UserId, tick: u64) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|e| Error::OperationFailed {
                operation: "sign_form_token".to_string(),
                cause: e.to_string(),
            })?;
        mac.update(format!("{action}|{operator}|{tick}").as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

/// Constant-time comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
