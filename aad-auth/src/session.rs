//! Session seam used by the credential store, the identity record and the flow controller.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::Error;

/// Server-side storage for one user's session.
///
/// The backend decides how the session is keyed and persisted; requests for a single
/// session are expected to be serialized by that backend.
#[async_trait]
pub trait Session: Send + Sync {
    /// Read the value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<Value>, Error>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: Value) -> Result<(), Error>;

    /// Remove all session data and the session itself from the backend.
    async fn destroy(&self) -> Result<(), Error>;
}

/// In-process session, cloned handles share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemorySession {
    values: Arc<Mutex<HashMap<String, Value>>>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_empty(&self) -> bool {
        self.values.lock().await.is_empty()
    }
}

#[async_trait]
impl Session for MemorySession {
    async fn get(&self, key: &str) -> Result<Option<Value>, Error> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), Error> {
        self.values.lock().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn destroy(&self) -> Result<(), Error> {
        self.values.lock().await.clear();
        Ok(())
    }
}
