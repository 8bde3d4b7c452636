use flowdeck_runtime::SessionStore;
use flowdeck_types::{CheckpointId, Session, SessionId};

use crate::error::{Error, Result};

/// Read-side access to persisted sessions, split out of [`crate::Client`]
/// so `session list|show|export` never needs a live `Orchestrator` in
/// scope -- the same separation the teacher draws between its trace
/// store and its running collector.
pub struct SessionsClient<'a> {
    store: &'a SessionStore,
}

impl<'a> SessionsClient<'a> {
    pub(crate) fn new(store: &'a SessionStore) -> Self {
        Self { store }
    }

    /// All session ids known to the store, migrating any legacy
    /// directory-of-shards layout encountered along the way.
    pub fn list(&self) -> Result<Vec<SessionId>> {
        self.store.list().map_err(Error::from)
    }

    pub fn show(&self, id: SessionId) -> Result<Session> {
        self.store.load(id).map_err(|err| match err {
            flowdeck_runtime::Error::NotFound(msg) => Error::NotFound(msg),
            other => Error::Runtime(other),
        })
    }

    /// Serializes a session to pretty-printed JSON, for `session export`.
    pub fn export(&self, id: SessionId) -> Result<String> {
        let session = self.show(id)?;
        serde_json::to_string_pretty(&session)
            .map_err(|err| Error::InvalidInput(format!("session {id} could not be exported: {err}")))
    }

    pub fn restore_checkpoint(&self, id: SessionId, checkpoint: &CheckpointId) -> Result<Session> {
        let session = self.show(id)?;
        self.store
            .restore_checkpoint(&session, checkpoint)
            .map_err(|err| match err {
                flowdeck_runtime::Error::NotFound(msg) => Error::NotFound(msg),
                other => Error::Runtime(other),
            })
    }

    /// Creates a labelled checkpoint of `id` at its current step.
    pub async fn save_checkpoint(&self, id: SessionId, label: impl Into<String>) -> Result<CheckpointId> {
        let mut session = self.show(id)?;
        self.store.checkpoint(&mut session, label).await.map_err(Error::from)
    }

    pub fn list_checkpoints(&self, id: SessionId) -> Result<Vec<flowdeck_types::Checkpoint>> {
        Ok(self.show(id)?.checkpoints)
    }
}
