//! Persistence backend seam.
//!
//! Peers never ship full objects over the relay; an `object:added` or
//! `object:modified` frame carries only ids, and the receiver fetches the
//! snapshot from the backend. The backend is expected to be eventually
//! consistent with the relay stream — the core tolerates (and logs) fetch
//! misses rather than failing.
//!
//! [`MemStore`] is the in-memory reference implementation used by tests and
//! in-process deployments; a real deployment implements [`ObjectStore`] over
//! its own persistence.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use async_trait::async_trait;
use canvas::object::{BoardObject, ObjectId};
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Unique identifier for a session (board).
pub type SessionId = Uuid;

/// One persisted session: identity plus its objects in insertion order.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    /// Session id.
    pub id: SessionId,
    /// Display name.
    pub name: String,
    /// Objects in insertion order.
    pub objects: Vec<BoardObject>,
}

/// Full persisted state: every session plus which one is active.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    /// All sessions in creation order.
    pub sessions: Vec<SessionRecord>,
    /// The session marked active, if any.
    pub active: Option<SessionId>,
}

/// Error returned by [`ObjectStore`] operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The addressed session is not known to the backend.
    #[error("unknown session: {0}")]
    UnknownSession(SessionId),
    /// The addressed object is not in the addressed session.
    #[error("no object {object_id} in session {session_id}")]
    NotFound {
        /// Session that was addressed.
        session_id: SessionId,
        /// Object that was missing.
        object_id: ObjectId,
    },
    /// The backend could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence backend consumed by the controller.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch the full persisted state.
    async fn get_objects(&self) -> Result<Directory, StoreError>;

    /// Fetch one object snapshot by (session, object) id.
    async fn get_object(
        &self,
        session_id: SessionId,
        object_id: ObjectId,
    ) -> Result<Value, StoreError>;

    /// Persist a newly added object.
    async fn add_object(
        &self,
        session_id: SessionId,
        object: &BoardObject,
    ) -> Result<(), StoreError>;

    /// Persist a modified object (replace by id).
    async fn modify_object(
        &self,
        session_id: SessionId,
        object: &BoardObject,
    ) -> Result<(), StoreError>;

    /// Remove a persisted object.
    async fn remove_object(
        &self,
        session_id: SessionId,
        object_id: ObjectId,
    ) -> Result<(), StoreError>;
}

#[derive(Default)]
struct MemStoreState {
    sessions: Vec<SessionRecord>,
    active: Option<SessionId>,
}

impl MemStoreState {
    fn session_mut(&mut self, id: SessionId) -> Option<&mut SessionRecord> {
        self.sessions.iter_mut().find(|s| s.id == id)
    }
}

/// In-memory [`ObjectStore`].
///
/// Session records are managed through the inherent methods — in a real
/// deployment the relay hub mirrors `session:*` events into the backend the
/// same way.
#[derive(Default)]
pub struct MemStore {
    state: RwLock<MemStoreState>,
}

impl MemStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or rename a session record.
    pub async fn put_session(&self, id: SessionId, name: &str) {
        let mut state = self.state.write().await;
        match state.session_mut(id) {
            Some(record) => {
                record.name = name.to_owned();
            }
            None => {
                state
                    .sessions
                    .push(SessionRecord { id, name: name.to_owned(), objects: Vec::new() });
            }
        }
    }

    /// Drop a session record and everything in it.
    pub async fn remove_session(&self, id: SessionId) {
        let mut state = self.state.write().await;
        state.sessions.retain(|s| s.id != id);
        if state.active == Some(id) {
            state.active = None;
        }
    }

    /// Mark which session is active.
    pub async fn set_active(&self, id: Option<SessionId>) {
        self.state.write().await.active = id;
    }
}

#[async_trait]
impl ObjectStore for MemStore {
    async fn get_objects(&self) -> Result<Directory, StoreError> {
        let state = self.state.read().await;
        Ok(Directory { sessions: state.sessions.clone(), active: state.active })
    }

    async fn get_object(
        &self,
        session_id: SessionId,
        object_id: ObjectId,
    ) -> Result<Value, StoreError> {
        let state = self.state.read().await;
        let Some(record) = state.sessions.iter().find(|s| s.id == session_id) else {
            return Err(StoreError::UnknownSession(session_id));
        };
        record
            .objects
            .iter()
            .find(|o| o.id == object_id)
            .map(|o| serde_json::to_value(o).unwrap_or(Value::Null))
            .ok_or(StoreError::NotFound { session_id, object_id })
    }

    async fn add_object(
        &self,
        session_id: SessionId,
        object: &BoardObject,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if let Some(record) = state.session_mut(session_id) {
            match record.objects.iter_mut().find(|o| o.id == object.id) {
                Some(existing) => *existing = object.clone(),
                None => record.objects.push(object.clone()),
            }
            return Ok(());
        }
        // Sessions appear here lazily: the backend may learn about a board
        // from its first object.
        state.sessions.push(SessionRecord {
            id: session_id,
            name: String::new(),
            objects: vec![object.clone()],
        });
        Ok(())
    }

    async fn modify_object(
        &self,
        session_id: SessionId,
        object: &BoardObject,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let Some(record) = state.session_mut(session_id) else {
            return Err(StoreError::UnknownSession(session_id));
        };
        match record.objects.iter_mut().find(|o| o.id == object.id) {
            Some(existing) => {
                // Last write wins; no merge.
                *existing = object.clone();
                Ok(())
            }
            None => {
                // Tolerate modify-before-add arrival order.
                record.objects.push(object.clone());
                Ok(())
            }
        }
    }

    async fn remove_object(
        &self,
        session_id: SessionId,
        object_id: ObjectId,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let Some(record) = state.session_mut(session_id) else {
            return Err(StoreError::UnknownSession(session_id));
        };
        let before = record.objects.len();
        record.objects.retain(|o| o.id != object_id);
        if record.objects.len() == before {
            return Err(StoreError::NotFound { session_id, object_id });
        }
        Ok(())
    }
}
