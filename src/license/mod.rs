//! License activation gate.
//!
//! A serial key is checked against a [`KeyValidator`] and the outcome kept in
//! an [`ActivationStore`]. When the installation requires a license, export
//! and import ask [`LicenseGate::require_active`] before doing anything.
//!
//! # Example
//!
//! ```rust,ignore
//! use postport::license::{LicenseGate, MemoryActivationStore, StaticKeyValidator};
//! use std::sync::Arc;
//!
//! let gate = LicenseGate::new(
//!     Arc::new(StaticKeyValidator::new(["KEY-1"])),
//!     Arc::new(MemoryActivationStore::new()),
//! );
//! gate.activate("KEY-1")?;
//! assert!(gate.is_activated()?);
//! ```

mod state;
mod validator;

pub use state::{ActivationState, ActivationStore, FileActivationStore, MemoryActivationStore};
pub use validator::{ACTIVE_STATUS, HttpKeyValidator, KeyValidator, KeyVerdict, StaticKeyValidator};

use crate::io::validation::sanitize_text;
use crate::{Error, Result, current_timestamp};
use std::sync::Arc;
use tracing::{info, warn};

/// Ties a key validator to persisted activation state.
#[derive(Clone)]
pub struct LicenseGate {
    validator: Arc<dyn KeyValidator>,
    store: Arc<dyn ActivationStore>,
}

impl LicenseGate {
    /// Creates a gate.
    #[must_use]
    pub fn new(validator: Arc<dyn KeyValidator>, store: Arc<dyn ActivationStore>) -> Self {
        Self { validator, store }
    }

    /// Validates and stores a serial key.
    ///
    /// The key is reduced to plain text first. An accepted key marks the
    /// installation active; a rejected key is remembered but leaves it
    /// inactive.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidInput`] if the key is blank
    /// - [`Error::LicenseRejected`] if the authority refused it
    /// - [`Error::OperationFailed`] if no verdict could be obtained; the stored
    ///   state is then left untouched
    pub fn activate(&self, serial_key: &str) -> Result<ActivationState> {
        let key = sanitize_text(serial_key);
        if key.is_empty() {
            return Err(Error::InvalidInput("serial key cannot be empty".to_string()));
        }

        let verdict = self.validator.validate(&key)?;
        if verdict.accepted {
            let state = ActivationState {
                serial_key: Some(key),
                activated: true,
                activated_at: Some(current_timestamp()),
            };
            self.store.save(&state)?;
            info!("License activated");
            metrics::counter!("postport_license_activations_total", "result" => "accepted")
                .increment(1);
            return Ok(state);
        }

        self.store.save(&ActivationState {
            serial_key: Some(key),
            activated: false,
            activated_at: None,
        })?;
        warn!(status = %verdict.status, "Serial key rejected");
        metrics::counter!("postport_license_activations_total", "result" => "rejected")
            .increment(1);
        Err(Error::LicenseRejected(verdict.message.unwrap_or_else(|| {
            format!("key status is '{}'", verdict.status)
        })))
    }

    /// Returns the stored activation flag.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be loaded.
    pub fn is_activated(&self) -> Result<bool> {
        Ok(self.store.load()?.activated)
    }

    /// Returns the stored state.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be loaded.
    pub fn status(&self) -> Result<ActivationState> {
        self.store.load()
    }

    /// Re-validates the stored key, deactivating when it is missing or no
    /// longer accepted. Returns the resulting activation flag.
    ///
    /// # Errors
    ///
    /// Returns an error if state cannot be loaded or saved, or if the
    /// authority cannot be reached (state is then left as it was).
    pub fn check_activation(&self) -> Result<bool> {
        let mut state = self.store.load()?;
        let Some(key) = state.serial_key.clone() else {
            if state.activated {
                state.activated = false;
                state.activated_at = None;
                self.store.save(&state)?;
            }
            return Ok(false);
        };

        let verdict = self.validator.validate(&key)?;
        if verdict.accepted == state.activated {
            return Ok(state.activated);
        }

        state.activated = verdict.accepted;
        state.activated_at = verdict.accepted.then(current_timestamp);
        self.store.save(&state)?;
        if verdict.accepted {
            info!("Stored serial key accepted, license re-activated");
        } else {
            warn!(status = %verdict.status, "Stored serial key no longer valid, license deactivated");
        }
        Ok(state.activated)
    }

    /// Forgets the stored key and activation.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be cleared.
    pub fn deactivate(&self) -> Result<()> {
        self.store.clear()?;
        info!("License deactivated");
        Ok(())
    }

    /// Fails unless the license is active.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotActivated`] when inactive, or a load error.
    pub fn require_active(&self) -> Result<()> {
        if self.is_activated()? {
            Ok(())
        } else {
            Err(Error::NotActivated(
                "enter a valid serial key to enable export and import".to_string(),
            ))
        }
    }
}

impl std::fmt::Debug for LicenseGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LicenseGate").finish_non_exhaustive()
    }
}
