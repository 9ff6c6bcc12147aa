//! License activation form.

use super::{ActionContext, LICENSE_ACTION};
use crate::security::Operator;
use crate::{Error, Result};
use tracing::instrument;

/// Notice shown after an activation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseResponse {
    /// Whether the installation is now active.
    pub activated: bool,
    /// Message for the operator.
    pub notice: String,
}

/// Submits a serial key.
///
/// A blank or rejected key is an ordinary outcome with `activated == false`.
///
/// # Errors
///
/// - [`Error::Unauthorized`] on a missing capability or bad token
/// - [`Error::FeatureNotEnabled`] when no license manager is installed
/// - [`Error::OperationFailed`] when the key authority cannot be reached
#[instrument(skip_all, fields(operator = %operator.user().login))]
pub fn activate_license(
    context: &ActionContext,
    operator: &Operator,
    token: Option<&str>,
    serial_key: &str,
) -> Result<LicenseResponse> {
    context.authorize_request(operator, token, LICENSE_ACTION)?;
    let gate = context.license_gate()?;

    match gate.activate(serial_key) {
        Ok(_) => Ok(LicenseResponse {
            activated: true,
            notice: "License activated.".to_string(),
        }),
        Err(Error::LicenseRejected(reason)) => Ok(LicenseResponse {
            activated: false,
            notice: format!("Invalid or inactive serial key: {reason}"),
        }),
        Err(Error::InvalidInput(reason)) => Ok(LicenseResponse {
            activated: false,
            notice: format!("Activation failed: {reason}"),
        }),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::context;
    use super::*;
    use crate::license::{LicenseGate, MemoryActivationStore, StaticKeyValidator};
    use std::sync::Arc;

    fn licensed() -> (ActionContext, Operator) {
        let (context, _, admin) = context();
        let gate = LicenseGate::new(
            Arc::new(StaticKeyValidator::new(["GOOD"])),
            Arc::new(MemoryActivationStore::new()),
        );
        (context.with_license(gate).require_license(true), admin)
    }

    #[test]
    fn test_activation_opens_gate() {
        let (context, admin) = licensed();
        let token = context.issue_token(LICENSE_ACTION, &admin).unwrap();

        let response = activate_license(&context, &admin, Some(&token), "BAD").unwrap();
        assert!(!response.activated);
        assert!(context.check_license_gate().is_err());

        let response = activate_license(&context, &admin, Some(&token), "GOOD").unwrap();
        assert!(response.activated);
        assert!(context.check_license_gate().is_ok());
    }

    #[test]
    fn test_blank_key_is_a_notice() {
        let (context, admin) = licensed();
        let token = context.issue_token(LICENSE_ACTION, &admin).unwrap();
        let response = activate_license(&context, &admin, Some(&token), "   ").unwrap();
        assert!(!response.activated);
    }

    #[test]
    fn test_activation_needs_its_own_token() {
        let (context, admin) = licensed();
        let token = context
            .issue_token(super::super::EXPORT_ACTION, &admin)
            .unwrap();
        assert!(matches!(
            activate_license(&context, &admin, Some(&token), "GOOD"),
            Err(Error::Unauthorized(_))
        ));
    }

    #[test]
    fn test_without_license_manager() {
        let (context, _, admin) = context();
        let token = context.issue_token(LICENSE_ACTION, &admin).unwrap();
        assert!(matches!(
            activate_license(&context, &admin, Some(&token), "GOOD"),
            Err(Error::FeatureNotEnabled(_))
        ));
    }
}
