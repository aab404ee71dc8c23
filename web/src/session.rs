//! The sign-in session seam over `tower-sessions`.

use aad_auth::error::{session_error, Error, SessionErrorKind};
use async_trait::async_trait;
use serde_json::Value;

/// A request's `tower_sessions::Session` seen through the sign-in flow's session trait.
#[derive(Clone)]
pub(crate) struct TowerSession(tower_sessions::Session);

impl TowerSession {
    pub(crate) fn new(session: tower_sessions::Session) -> Self {
        Self(session)
    }

    /// Issue a new session id, keeping the data.
    pub(crate) async fn cycle_id(&self) -> Result<(), Error> {
        self.0
            .cycle_id()
            .await
            .map_err(|e| session_error(SessionErrorKind::Write, e))
    }
}

#[async_trait]
impl aad_auth::session::Session for TowerSession {
    async fn get(&self, key: &str) -> Result<Option<Value>, Error> {
        self.0
            .get::<Value>(key)
            .await
            .map_err(|e| session_error(SessionErrorKind::Read, e))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), Error> {
        self.0
            .insert(key, value)
            .await
            .map_err(|e| session_error(SessionErrorKind::Write, e))
    }

    // Flushing clears the in-memory data before touching the store.
    async fn destroy(&self) -> Result<(), Error> {
        self.0
            .flush()
            .await
            .map_err(|e| session_error(SessionErrorKind::Destroy, e))
    }
}
