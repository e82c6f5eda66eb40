//! Debate persistence: snapshot, store, and restore with integrity checks.
//!
//! A snapshot captures the whole session. Stores hand out UUID v4 session
//! ids; the file store keeps one pretty-printed JSON document per session.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::mention::DirectedQuestion;
use super::state::{DebatePhase, DebateSession, RoundRecord};
use crate::prd::PrdModel;

/// Error during persistence operations.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("session {id} not found")]
    NotFound { id: String },

    #[error("invalid session id {id:?}: expected a UUID")]
    InvalidId { id: String },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialize failed: {reason}")]
    SerializeFailed { reason: String },

    #[error("deserialize failed: {reason}")]
    DeserializeFailed { reason: String },

    #[error("version mismatch: expected at most {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("integrity check failed: {reason}")]
    IntegrityCheckFailed { reason: String },
}

/// Opaque session identifier (UUID v4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SessionId {
    type Err = PersistenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| PersistenceError::InvalidId { id: s.to_string() })
    }
}

/// Everything needed to reconstitute a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebateSnapshot {
    /// Schema version for forward compatibility.
    pub version: u32,
    pub topic: String,
    pub history: Vec<RoundRecord>,
    pub prd: PrdModel,
    pub round_counter: u32,
    #[serde(default)]
    pub user_followup: Option<DirectedQuestion>,
    #[serde(default)]
    pub phase: DebatePhase,
    pub created_at: DateTime<Utc>,
    pub saved_at: DateTime<Utc>,
}

impl DebateSnapshot {
    /// Current schema version.
    pub const CURRENT_VERSION: u32 = 1;

    pub fn from_session(session: &DebateSession) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            topic: session.topic.clone(),
            history: session.history.clone(),
            prd: session.prd.clone(),
            round_counter: session.round_counter,
            user_followup: session.user_followup.clone(),
            phase: session.phase,
            created_at: session.created_at,
            saved_at: Utc::now(),
        }
    }

    pub fn into_session(self) -> DebateSession {
        DebateSession {
            topic: self.topic,
            prd: self.prd,
            history: self.history,
            round_counter: self.round_counter,
            user_followup: self.user_followup,
            phase: self.phase,
            created_at: self.created_at,
        }
    }

    /// Serialize to a pretty JSON string.
    pub fn to_json(&self) -> Result<String, PersistenceError> {
        serde_json::to_string_pretty(self).map_err(|e| PersistenceError::SerializeFailed {
            reason: e.to_string(),
        })
    }

    /// Deserialize and validate. Missing PRD sections are repaired; a
    /// corrupted snapshot is rejected.
    pub fn from_json(json: &str) -> Result<Self, PersistenceError> {
        let snapshot: Self =
            serde_json::from_str(json).map_err(|e| PersistenceError::DeserializeFailed {
                reason: e.to_string(),
            })?;

        if snapshot.version > Self::CURRENT_VERSION {
            return Err(PersistenceError::VersionMismatch {
                expected: Self::CURRENT_VERSION,
                found: snapshot.version,
            });
        }

        match validate_snapshot(&snapshot) {
            IntegrityStatus::Valid => {}
            IntegrityStatus::Recoverable { warnings } => {
                for warning in &warnings {
                    tracing::warn!(topic = %snapshot.topic, %warning, "recoverable snapshot issue");
                }
            }
            IntegrityStatus::Corrupted { errors } => {
                return Err(PersistenceError::IntegrityCheckFailed {
                    reason: errors.join("; "),
                });
            }
        }

        Ok(snapshot)
    }
}

/// Integrity check result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityStatus {
    /// Snapshot is valid and can be resumed.
    Valid,
    /// Snapshot has minor issues but is recoverable.
    Recoverable { warnings: Vec<String> },
    /// Snapshot is corrupted and cannot be used.
    Corrupted { errors: Vec<String> },
}

impl IntegrityStatus {
    /// Whether resume is safe.
    pub fn can_resume(&self) -> bool {
        matches!(self, Self::Valid | Self::Recoverable { .. })
    }
}

/// Validate a snapshot before resuming it.
pub fn validate_snapshot(snapshot: &DebateSnapshot) -> IntegrityStatus {
    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    if snapshot.version > DebateSnapshot::CURRENT_VERSION {
        errors.push(format!(
            "version {} > current {}",
            snapshot.version,
            DebateSnapshot::CURRENT_VERSION
        ));
    }

    // Round numbers must strictly increase and never pass the counter.
    let mut previous = 0;
    for record in &snapshot.history {
        if record.round <= previous {
            errors.push(format!(
                "round {} recorded after round {}",
                record.round, previous
            ));
        }
        previous = record.round;
    }
    if previous > snapshot.round_counter {
        errors.push(format!(
            "history reaches round {} but round_counter is {}",
            previous, snapshot.round_counter
        ));
    }

    if snapshot.history.is_empty() && snapshot.round_counter > 0 {
        warnings.push(format!(
            "round_counter {} with empty history",
            snapshot.round_counter
        ));
    }

    for record in &snapshot.history {
        for turn in record.turns.iter().filter(|t| t.failed && t.agreed) {
            warnings.push(format!(
                "round {}: failed turn from {} marked as agreeing",
                record.round, turn.advisor
            ));
        }
    }

    if snapshot.topic.trim().is_empty() {
        warnings.push("empty topic".to_string());
    }

    if !errors.is_empty() {
        IntegrityStatus::Corrupted { errors }
    } else if !warnings.is_empty() {
        IntegrityStatus::Recoverable { warnings }
    } else {
        IntegrityStatus::Valid
    }
}

/// Durable storage for debate snapshots.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store under a fresh id.
    async fn save(&self, snapshot: &DebateSnapshot) -> Result<SessionId, PersistenceError>;

    /// Overwrite an existing session.
    async fn update(&self, id: &SessionId, snapshot: &DebateSnapshot)
        -> Result<(), PersistenceError>;

    async fn load(&self, id: &SessionId) -> Result<DebateSnapshot, PersistenceError>;

    /// All stored ids, sorted.
    async fn list(&self) -> Result<Vec<SessionId>, PersistenceError>;
}

/// One `<id>.json` file per session under a directory.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    root: PathBuf,
}

impl FileSessionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, id: &SessionId) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }

    async fn write(&self, id: &SessionId, snapshot: &DebateSnapshot) -> Result<(), PersistenceError> {
        let json = snapshot.to_json()?;
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| PersistenceError::Io {
                path: self.root.clone(),
                source,
            })?;

        let path = self.path_for(id);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|source| PersistenceError::Io {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|source| PersistenceError::Io {
                path: path.clone(),
                source,
            })?;

        tracing::debug!(session = %id, path = %path.display(), "session saved");
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn save(&self, snapshot: &DebateSnapshot) -> Result<SessionId, PersistenceError> {
        let id = SessionId::new();
        self.write(&id, snapshot).await?;
        Ok(id)
    }

    async fn update(
        &self,
        id: &SessionId,
        snapshot: &DebateSnapshot,
    ) -> Result<(), PersistenceError> {
        let path = self.path_for(id);
        let exists = tokio::fs::try_exists(&path)
            .await
            .map_err(|source| PersistenceError::Io {
                path: path.clone(),
                source,
            })?;
        if !exists {
            return Err(PersistenceError::NotFound { id: id.to_string() });
        }
        self.write(id, snapshot).await
    }

    async fn load(&self, id: &SessionId) -> Result<DebateSnapshot, PersistenceError> {
        let path = self.path_for(id);
        let json = match tokio::fs::read_to_string(&path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PersistenceError::NotFound { id: id.to_string() });
            }
            Err(source) => return Err(PersistenceError::Io { path, source }),
        };
        DebateSnapshot::from_json(&json)
    }

    async fn list(&self) -> Result<Vec<SessionId>, PersistenceError> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(PersistenceError::Io {
                    path: self.root.clone(),
                    source,
                })
            }
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|source| PersistenceError::Io {
                path: self.root.clone(),
                source,
            })?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<SessionId>().ok())
            {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}

/// In-process store; snapshots are kept as JSON so loads go through the
/// same validation as the file store.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<BTreeMap<SessionId, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn save(&self, snapshot: &DebateSnapshot) -> Result<SessionId, PersistenceError> {
        let id = SessionId::new();
        let json = snapshot.to_json()?;
        self.sessions.write().await.insert(id, json);
        Ok(id)
    }

    async fn update(
        &self,
        id: &SessionId,
        snapshot: &DebateSnapshot,
    ) -> Result<(), PersistenceError> {
        let json = snapshot.to_json()?;
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(id) {
            Some(stored) => {
                *stored = json;
                Ok(())
            }
            None => Err(PersistenceError::NotFound { id: id.to_string() }),
        }
    }

    async fn load(&self, id: &SessionId) -> Result<DebateSnapshot, PersistenceError> {
        let sessions = self.sessions.read().await;
        let json = sessions
            .get(id)
            .ok_or_else(|| PersistenceError::NotFound { id: id.to_string() })?;
        DebateSnapshot::from_json(json)
    }

    async fn list(&self) -> Result<Vec<SessionId>, PersistenceError> {
        Ok(self.sessions.read().await.keys().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debate::advisor::AdvisorId;
    use crate::debate::state::{AdvisorTurn, RoundKind};
    use crate::prd::Stance;

    fn record(round: u32) -> RoundRecord {
        RoundRecord {
            round,
            kind: RoundKind::Continuation,
            started_at: Utc::now(),
            duration_ms: 12,
            directed: None,
            agreement: false,
            turns: vec![AdvisorTurn {
                advisor: AdvisorId::Ux,
                text: "Design Notes: card layout".into(),
                failed: false,
                stance: Stance::Unstated,
                sections_changed: vec![],
                agreed: false,
            }],
        }
    }

    fn snapshot_with_rounds(rounds: &[u32], counter: u32) -> DebateSnapshot {
        let mut session = DebateSession::new("Team task planner");
        session.history = rounds.iter().map(|r| record(*r)).collect();
        session.round_counter = counter;
        DebateSnapshot::from_session(&session)
    }

    #[test]
    fn test_snapshot_json_round_trip() {
        let snapshot = snapshot_with_rounds(&[1, 2], 2);
        let json = snapshot.to_json().unwrap();
        let restored = DebateSnapshot::from_json(&json).unwrap();
        assert_eq!(restored, snapshot);
    }

    #[test]
    fn test_future_version_rejected() {
        let mut snapshot = snapshot_with_rounds(&[], 0);
        snapshot.version = DebateSnapshot::CURRENT_VERSION + 1;
        let json = serde_json::to_string(&snapshot).unwrap();
        let err = DebateSnapshot::from_json(&json).unwrap_err();
        assert!(matches!(err, PersistenceError::VersionMismatch { found: 2, .. }));
    }

    #[test]
    fn test_validate_detects_reordered_rounds() {
        let snapshot = snapshot_with_rounds(&[2, 1], 2);
        let status = validate_snapshot(&snapshot);
        assert!(!status.can_resume());
    }

    #[test]
    fn test_validate_detects_counter_behind_history() {
        let snapshot = snapshot_with_rounds(&[1, 2, 3], 2);
        assert!(matches!(
            validate_snapshot(&snapshot),
            IntegrityStatus::Corrupted { .. }
        ));
    }

    #[test]
    fn test_validate_counter_without_history_is_recoverable() {
        let snapshot = snapshot_with_rounds(&[], 3);
        let status = validate_snapshot(&snapshot);
        assert!(matches!(status, IntegrityStatus::Recoverable { .. }));
        assert!(status.can_resume());
    }

    #[test]
    fn test_missing_prd_sections_are_repaired_on_load() {
        let snapshot = snapshot_with_rounds(&[1], 1);
        let mut value = serde_json::to_value(&snapshot).unwrap();
        value["prd"] = serde_json::json!({ "objectives": ["Launch in Q3"] });
        let restored = DebateSnapshot::from_json(&value.to_string()).unwrap();
        assert_eq!(
            restored.prd.items(crate::prd::SectionKey::Objectives),
            ["Launch in Q3"]
        );
        assert_eq!(restored.prd.text(crate::prd::SectionKey::Overview), Some(""));
    }

    #[test]
    fn test_session_id_rejects_paths() {
        assert!("../etc/passwd".parse::<SessionId>().is_err());
        let id = SessionId::new();
        assert_eq!(id.to_string().parse::<SessionId>().unwrap(), id);
    }

    #[tokio::test]
    async fn test_memory_store_update_requires_existing() {
        let store = MemorySessionStore::new();
        let snapshot = snapshot_with_rounds(&[1], 1);
        let err = store.update(&SessionId::new(), &snapshot).await.unwrap_err();
        assert!(matches!(err, PersistenceError::NotFound { .. }));

        let id = store.save(&snapshot).await.unwrap();
        store.update(&id, &snapshot).await.unwrap();
        assert_eq!(store.list().await.unwrap(), vec![id]);
    }

    #[tokio::test]
    async fn test_file_store_missing_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path());
        let err = store.load(&SessionId::new()).await.unwrap_err();
        assert!(matches!(err, PersistenceError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_file_store_list_ignores_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path());
        let id = store.save(&snapshot_with_rounds(&[1], 1)).await.unwrap();
        std::fs::write(dir.path().join("notes.json"), "{}").unwrap();
        std::fs::write(dir.path().join("README.md"), "hi").unwrap();

        assert_eq!(store.list().await.unwrap(), vec![id]);
    }

    #[tokio::test]
    async fn test_file_store_list_without_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("not-created-yet"));
        assert!(store.list().await.unwrap().is_empty());
    }
}
