//! CSRF state issuance and validation for OAuth flows.

use rand::Rng;

use crate::error::{csrf_error, CsrfErrorKind, Error};

/// Issues and checks the one-time `state` value that binds a callback to its login.
///
/// The guard holds no storage: the issued value travels in a short-lived cookie and the
/// caller clears that cookie right after validation, whatever the outcome.
#[derive(Debug, Clone, Copy, Default)]
pub struct StateGuard;

impl StateGuard {
    /// Generate a cryptographically random state token (32 bytes, hex encoded).
    pub fn issue() -> String {
        let random_bytes: [u8; 32] = rand::thread_rng().gen();
        hex::encode(random_bytes)
    }

    /// Returns true only when both values are present, non-empty and identical.
    pub fn validate(issued: Option<&str>, returned: Option<&str>) -> bool {
        Self::verify(issued, returned).is_ok()
    }

    /// Check a returned state against the issued one.
    ///
    /// # Errors
    ///
    /// Returns a CSRF error naming which side was missing, or a mismatch.
    pub fn verify(issued: Option<&str>, returned: Option<&str>) -> Result<(), Error> {
        let issued = issued.filter(|s| !s.is_empty()).ok_or_else(|| {
            csrf_error(
                CsrfErrorKind::MissingIssuedState,
                "No state was issued for this login attempt",
            )
        })?;
        let returned = returned.filter(|s| !s.is_empty()).ok_or_else(|| {
            csrf_error(
                CsrfErrorKind::MissingReturnedState,
                "Callback did not return a state value",
            )
        })?;

        if issued != returned {
            return Err(csrf_error(
                CsrfErrorKind::StateMismatch,
                "Returned state does not match the issued state",
            ));
        }

        Ok(())
    }
}
