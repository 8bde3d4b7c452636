//! Session Store (spec §2, §4.9): the sole writer to persistent session
//! storage (spec §3 "Ownership"). Atomic writes (write-temp + rename)
//! and the single write-behind worker are grounded on the teacher's
//! own atomic-write discipline, generalised from TOML-config-sized
//! writes to whole-session writes; round-trip invariant `load(save(s))
//! ≡ s` (spec §4.9) is exercised in the tests below.

use std::path::{Path, PathBuf};

use flowdeck_types::{Checkpoint, CheckpointId, Session, SessionId, StepSeq};
use tokio::sync::{mpsc, oneshot};

use crate::error::{Error, Result};

const WRITE_RETRY_ATTEMPTS: u32 = 3;
const WRITE_CHANNEL_CAPACITY: usize = 64;

fn sessions_dir(root: &Path) -> PathBuf {
    root.join("sessions")
}

fn session_path(root: &Path, id: SessionId) -> PathBuf {
    sessions_dir(root).join(format!("{id}.json"))
}

/// One unit of work for the write-behind worker (spec §4.9, §9: "the one
/// background thread/task the design notes call out by name").
enum StoreCommand {
    Save { session: Box<Session>, ack: oneshot::Sender<Result<()>> },
}

/// The handle the rest of the runtime holds. Cloning is cheap (just the
/// channel sender); the worker task owns the actual file handle
/// discipline.
#[derive(Clone)]
pub struct SessionStore {
    root: PathBuf,
    commands: mpsc::Sender<StoreCommand>,
}

impl SessionStore {
    /// Spawns the write-behind worker and returns the store handle.
    /// Legacy layout migration (directory-of-shards -> single JSON file)
    /// happens lazily, per session, the first time that session is
    /// loaded -- not eagerly at startup.
    pub fn spawn(root: PathBuf) -> Self {
        let (tx, mut rx) = mpsc::channel::<StoreCommand>(WRITE_CHANNEL_CAPACITY);
        let worker_root = root.clone();

        tokio::spawn(async move {
            while let Some(command) = rx.recv().await {
                match command {
                    StoreCommand::Save { session, ack } => {
                        let result = write_session_with_retry(&worker_root, &session).await;
                        let _ = ack.send(result);
                    }
                }
            }
        });

        Self { root, commands: tx }
    }

    /// Enqueues a save and waits for the write-behind worker to
    /// acknowledge it (spec §4.1 ordering guarantee: "a StepCompleted
    /// event is never emitted before its step's writes ... have been
    /// acknowledged").
    pub async fn save(&self, session: &Session) -> Result<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.commands
            .send(StoreCommand::Save { session: Box::new(session.clone()), ack: ack_tx })
            .await
            .map_err(|_| Error::NotInitialized("session store worker has shut down".to_string()))?;

        ack_rx
            .await
            .map_err(|_| Error::NotInitialized("session store worker dropped the acknowledgement".to_string()))?
    }

    /// Reads a session by id, transparently migrating the legacy
    /// directory layout if that is what is on disk (spec §4.9, §6:
    /// "Legacy directory layout ... is readable but never written").
    pub fn load(&self, id: SessionId) -> Result<Session> {
        load_session(&self.root, id)
    }

    pub fn list(&self) -> Result<Vec<SessionId>> {
        let dir = sessions_dir(&self.root);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if let Ok(id) = stem.parse::<SessionId>() {
                    ids.push(id);
                }
            }
        }
        Ok(ids)
    }

    /// Creates a labelled checkpoint of `session` at its current step and
    /// appends it to the session's own checkpoint list (spec §3:
    /// "Checkpoints are named snapshots of the session at a specific
    /// step").
    pub async fn checkpoint(&self, session: &mut Session, label: impl Into<String>) -> Result<CheckpointId> {
        let id = CheckpointId::new(label);
        let last_step = session.steps.last().map(|step| step.seq).unwrap_or(StepSeq::FIRST);
        let checkpoint = Checkpoint {
            id: id.clone(),
            created_at: chrono::Utc::now(),
            step_range: (StepSeq::FIRST, last_step),
            snapshot: Box::new(session.clone()),
        };
        session.checkpoints.push(checkpoint);
        self.save(session).await?;
        Ok(id)
    }

    pub fn restore_checkpoint(&self, session: &Session, id: &CheckpointId) -> Result<Session> {
        session
            .checkpoints
            .iter()
            .find(|checkpoint| &checkpoint.id == id)
            .map(|checkpoint| (*checkpoint.snapshot).clone())
            .ok_or_else(|| Error::NotFound(format!("checkpoint '{id}' not found in session {}", session.id)))
    }
}

async fn write_session_with_retry(root: &Path, session: &Session) -> Result<()> {
    let path = session_path(root, session.id);
    let mut last_error = None;

    for _ in 0..WRITE_RETRY_ATTEMPTS {
        match write_session_atomic(&path, session) {
            Ok(()) => return Ok(()),
            Err(err) => last_error = Some(err),
        }
    }

    Err(Error::PersistentWriteFailure(
        last_error.map(|err| err.to_string()).unwrap_or_default(),
    ))
}

fn write_session_atomic(path: &Path, session: &Session) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(session)?;
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

fn load_session(root: &Path, id: SessionId) -> Result<Session> {
    let path = session_path(root, id);
    if path.exists() {
        let content = std::fs::read_to_string(&path)?;
        let session = serde_json::from_str(&content)?;
        return Ok(session);
    }

    let legacy_dir = sessions_dir(root).join(id.to_string());
    if legacy_dir.is_dir() {
        return migrate_legacy_session(root, &legacy_dir, id);
    }

    Err(Error::NotFound(format!("session {id} not found")))
}

/// Best-effort migration of the legacy `<id>/session.usf` shard layout
/// (spec §6, §9 Open Question iii: lossy where the legacy shard does not
/// map onto the current `Session` shape). The legacy directory is
/// renamed with a `migrated_` prefix rather than deleted, so a failed
/// migration never destroys the only copy of the data.
fn migrate_legacy_session(root: &Path, legacy_dir: &Path, id: SessionId) -> Result<Session> {
    let manifest_path = legacy_dir.join("session.usf");
    let content = std::fs::read_to_string(&manifest_path)?;
    let session: Session = serde_json::from_str(&content)
        .map_err(|err| Error::Config(format!("legacy session {id} did not parse: {err}")))?;

    write_session_atomic(&session_path(root, id), &session)?;

    let migrated_dir = legacy_dir.with_file_name(format!("migrated_{id}"));
    std::fs::rename(legacy_dir, migrated_dir)?;

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowdeck_types::{Intent, PlatformOrigin};
    use tempfile::TempDir;

    fn sample_session() -> Session {
        Session::new("add a function", PlatformOrigin::Cli, Intent::Coding)
    }

    #[tokio::test]
    async fn round_trips_a_freshly_created_session() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::spawn(dir.path().to_path_buf());
        let session = sample_session();

        store.save(&session).await.unwrap();
        let loaded = store.load(session.id).unwrap();

        assert_eq!(loaded.id, session.id);
        assert_eq!(loaded.task_description, session.task_description);
    }

    #[tokio::test]
    async fn listing_reflects_saved_sessions() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::spawn(dir.path().to_path_buf());
        let a = sample_session();
        let b = sample_session();

        store.save(&a).await.unwrap();
        store.save(&b).await.unwrap();

        let mut ids = store.list().unwrap();
        ids.sort_by_key(|id| id.to_string());
        let mut expected = vec![a.id, b.id];
        expected.sort_by_key(|id| id.to_string());
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn checkpoint_then_restore_returns_the_snapshot() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::spawn(dir.path().to_path_buf());
        let mut session = sample_session();

        let id = store.checkpoint(&mut session, "before-plan").await.unwrap();
        session.task_description = "changed after the checkpoint".to_string();

        let restored = store.restore_checkpoint(&session, &id).unwrap();
        assert_eq!(restored.task_description, "add a function");
    }

    #[test]
    fn loading_an_unknown_session_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::spawn(dir.path().to_path_buf());
        let err = store.load(SessionId::new()).unwrap_err();
        assert_eq!(err.code(), "E020");
    }

    #[tokio::test]
    async fn legacy_directory_layout_is_migrated_on_load() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::spawn(dir.path().to_path_buf());
        let session = sample_session();

        let legacy_dir = dir.path().join("sessions").join(session.id.to_string());
        std::fs::create_dir_all(&legacy_dir).unwrap();
        std::fs::write(
            legacy_dir.join("session.usf"),
            serde_json::to_string(&session).unwrap(),
        )
        .unwrap();

        let loaded = store.load(session.id).unwrap();
        assert_eq!(loaded.id, session.id);
        assert!(dir.path().join("sessions").join(format!("migrated_{}", session.id)).is_dir());
        assert!(dir.path().join("sessions").join(format!("{}.json", session.id)).exists());
    }
}
