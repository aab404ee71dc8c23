//! Minimal identity of the signed-in user, kept in the session.

use log::*;
use serde::{Deserialize, Serialize};

use crate::error::{session_error, Error, SessionErrorKind};
use crate::session::Session;

const USER_SESSION_KEY: &str = "aad-user";

/// Identity returned by Azure AD on a successful code exchange.
///
/// Its presence in the session is the only signal that the user is authenticated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub user_id: String,
    pub given_name: String,
    pub family_name: String,
}

impl UserIdentity {
    pub fn new(
        user_id: impl Into<String>,
        given_name: impl Into<String>,
        family_name: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            given_name: given_name.into(),
            family_name: family_name.into(),
        }
    }

    /// Full name of the user as it exists within the Azure AD tenant.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.given_name, self.family_name)
            .trim()
            .to_string()
    }

    /// Load the current user from the session.
    pub async fn load<S: Session + ?Sized>(session: &S) -> Result<Option<Self>, Error> {
        match session.get(USER_SESSION_KEY).await? {
            Some(value) => {
                let user: Self = serde_json::from_value(value)
                    .map_err(|e| session_error(SessionErrorKind::Read, e))?;
                trace!("User loaded from session: {}", user.user_id);
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    /// Save this identity as the session's current user.
    pub async fn save<S: Session + ?Sized>(&self, session: &S) -> Result<(), Error> {
        debug!("Saving user to session: {}", self.user_id);
        let value =
            serde_json::to_value(self).map_err(|e| session_error(SessionErrorKind::Write, e))?;
        session.set(USER_SESSION_KEY, value).await
    }

    /// Indicates if the session belongs to an authenticated user.
    pub async fn is_authenticated<S: Session + ?Sized>(session: &S) -> Result<bool, Error> {
        Ok(Self::load(session).await?.is_some())
    }
}
