//! Session-backed credential store keyed by resource id.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use log::*;
use serde::{Deserialize, Serialize};

use crate::error::{session_error, Error, SessionErrorKind};
use crate::session::Session;

const SESSION_CREDS_KEY: &str = "resource-credentials";

/// Access and refresh tokens granted for one resource.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub resource_id: String,
    pub access_token: String,
    /// When the access token expires. Informational only, nothing is evicted.
    pub expiration: DateTime<Utc>,
    pub refresh_token: String,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("resource_id", &self.resource_id)
            .field("access_token", &"[REDACTED]")
            .field("expiration", &self.expiration)
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

type CredentialMap = BTreeMap<String, Credential>;

/// Mapping from resource id to [`Credential`], stored in a single session.
///
/// Holds at most one credential per resource: `put` replaces an existing entry for the
/// same resource.
pub struct CredentialStore<'s, S: Session + ?Sized> {
    session: &'s S,
}

impl<'s, S: Session + ?Sized> CredentialStore<'s, S> {
    pub fn new(session: &'s S) -> Self {
        Self { session }
    }

    /// Retrieve the credential stored for `resource_id`.
    pub async fn get(&self, resource_id: &str) -> Result<Option<Credential>, Error> {
        let mut credentials = self.load().await?;
        let credential = credentials.remove(resource_id);

        if credential.is_some() {
            trace!("Credential found in session for {resource_id}");
        } else {
            trace!("No credential found in session for {resource_id}");
        }
        Ok(credential)
    }

    /// Insert `credential`, replacing any entry with the same resource id.
    ///
    /// Returns the replaced credential, if there was one.
    pub async fn put(&self, credential: Credential) -> Result<Option<Credential>, Error> {
        let mut credentials = self.load().await?;
        debug!("Saving credential for {}", credential.resource_id);
        let previous = credentials.insert(credential.resource_id.clone(), credential);

        self.save(&credentials).await?;
        Ok(previous)
    }

    /// Drop the credential for `resource_id`, returning it.
    pub async fn remove(&self, resource_id: &str) -> Result<Option<Credential>, Error> {
        let mut credentials = self.load().await?;
        let removed = credentials.remove(resource_id);

        if removed.is_some() {
            debug!("Removing credential for {resource_id}");
            self.save(&credentials).await?;
        }
        Ok(removed)
    }

    /// Bearer token for `resource_id`, if one has been obtained in this session.
    pub async fn access_token(&self, resource_id: &str) -> Result<Option<String>, Error> {
        Ok(self
            .get(resource_id)
            .await?
            .map(|credential| credential.access_token))
    }

    async fn save(&self, credentials: &CredentialMap) -> Result<(), Error> {
        let value = serde_json::to_value(credentials)
            .map_err(|e| session_error(SessionErrorKind::Write, e))?;
        self.session.set(SESSION_CREDS_KEY, value).await
    }

    async fn load(&self) -> Result<CredentialMap, Error> {
        match self.session.get(SESSION_CREDS_KEY).await? {
            Some(value) => serde_json::from_value(value).map_err(|e| {
                warn!("Stored credentials could not be read: {e:?}");
                session_error(SessionErrorKind::Read, e)
            }),
            None => Ok(CredentialMap::new()),
        }
    }
}
