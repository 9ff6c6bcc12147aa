//! Feature flags for optional functionality.

use serde::{Deserialize, Serialize};

/// Feature flags for controlling optional postport features.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    /// The license manager is installed. Without it, license actions report
    /// the feature as unavailable.
    #[serde(default)]
    pub license_manager: bool,
    /// Export and import refuse to run until a license is active. Has no
    /// effect unless `license_manager` is also set.
    #[serde(default)]
    pub require_license: bool,
}

impl FeatureFlags {
    /// Creates feature flags with all features disabled.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            license_manager: false,
            require_license: false,
        }
    }

    /// Creates feature flags with all features enabled.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            license_manager: true,
            require_license: true,
        }
    }

    /// Returns whether export and import must pass the license gate.
    #[must_use]
    pub const fn gate_enforced(&self) -> bool {
        self.license_manager && self.require_license
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_enforced_needs_both_flags() {
        assert!(!FeatureFlags::none().gate_enforced());
        assert!(FeatureFlags::all().gate_enforced());
        let only_required = FeatureFlags {
            license_manager: false,
            require_license: true,
        };
        assert!(!only_required.gate_enforced());
    }
}
