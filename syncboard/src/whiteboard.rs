//! The whiteboard controller: session collection, relay protocol, and
//! remote-event application.
//!
//! DESIGN
//! ======
//! The controller owns the ordered set of sessions and enforces the
//! activation invariant (at most one active, only the active one awake).
//! Local edits flow session → controller → persistence backend → relay;
//! inbound frames flow relay → typed decode → dispatch → gated session
//! application. While a remote event is being applied the controller sits in
//! [`Phase::ReplayingRemote`], under which sessions insert silently — no
//! history, no re-broadcast — so a mirrored edit can never echo back out.
//!
//! ERROR HANDLING
//! ==============
//! Everything on the relay path degrades instead of failing: undecodable
//! frames, unknown session ids, and missed store fetches are logged and
//! dropped. A lost event leaves a peer briefly stale, which the periodic
//! `sync` full-resync repairs.

#[cfg(test)]
#[path = "whiteboard_test.rs"]
mod whiteboard_test;

use std::sync::Arc;
use std::time::Duration;

use canvas::object::{BoardObject, ObjectId, PartialBoardObject};
use canvas::surface::DrawableSurface;
use frames::Frame;
use frames::event::RelayEvent;
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::consts::{DEFAULT_SESSION_NAME, FlushConfig};
use crate::relay::RelayChannel;
use crate::session::{InteractionMode, Session, SessionChange, SessionEvent};
use crate::store::{ObjectStore, SessionId};

/// What the controller is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// No session active; only session management is possible.
    #[default]
    Idle,
    /// One session active and awaiting local input.
    ActiveLocal,
    /// A remote event is being applied; local recording and broadcast are
    /// suppressed.
    ReplayingRemote,
    /// A history navigation is in flight and about to be relayed.
    AwaitingHistoryNav,
}

/// Where an operation originated. Remote-originated operations are never
/// re-relayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Local,
    Remote,
}

/// Controller over a set of sessions, a relay channel, and a persistence
/// backend.
pub struct Whiteboard<S> {
    sessions: Vec<Session<S>>,
    relay: Arc<dyn RelayChannel>,
    store: Arc<dyn ObjectStore>,
    surface_factory: Box<dyn Fn() -> S + Send + Sync>,
    changes_tx: mpsc::UnboundedSender<SessionChange>,
    phase: Phase,
    mode: InteractionMode,
    client_id: Uuid,
}

impl<S: DrawableSurface> Whiteboard<S> {
    /// Create an empty controller. Returns the controller and the receiving
    /// half of the debounced change stream.
    pub fn new(
        relay: Arc<dyn RelayChannel>,
        store: Arc<dyn ObjectStore>,
        surface_factory: impl Fn() -> S + Send + Sync + 'static,
    ) -> (Self, mpsc::UnboundedReceiver<SessionChange>) {
        let (changes_tx, changes_rx) = mpsc::unbounded_channel();
        let wb = Self {
            sessions: Vec::new(),
            relay,
            store,
            surface_factory: Box::new(surface_factory),
            changes_tx,
            phase: Phase::Idle,
            mode: InteractionMode::default(),
            client_id: Uuid::new_v4(),
        };
        (wb, changes_rx)
    }

    // --- Queries ---

    /// All sessions in creation order.
    #[must_use]
    pub fn sessions(&self) -> &[Session<S>] {
        &self.sessions
    }

    /// Number of sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Look up a session by id.
    #[must_use]
    pub fn session(&self, id: SessionId) -> Option<&Session<S>> {
        self.sessions.iter().find(|s| s.id() == id)
    }

    /// The active session, if any.
    #[must_use]
    pub fn active_session(&self) -> Option<&Session<S>> {
        self.sessions.iter().find(|s| s.is_active())
    }

    /// Id of the active session, if any.
    #[must_use]
    pub fn active_session_id(&self) -> Option<SessionId> {
        self.active_session().map(Session::id)
    }

    /// Current controller phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// This client's identity, stamped on outbound frames.
    #[must_use]
    pub fn client_id(&self) -> Uuid {
        self.client_id
    }

    // --- Session management ---

    /// Create a session, activate it, and announce it to peers.
    pub fn create_session(&mut self, name: Option<&str>) -> SessionId {
        let name = name.unwrap_or(DEFAULT_SESSION_NAME);
        self.admit_session(None, name, Origin::Local)
    }

    /// Remove a session, activating a survivor when the active one goes.
    /// Returns `false` for unknown ids.
    pub fn remove_session(&mut self, id: SessionId) -> bool {
        self.remove_session_inner(id, Origin::Local)
    }

    /// Switch the displayed session. No-op when already active; `false` for
    /// unknown ids.
    pub fn set_active_session(&mut self, id: SessionId) -> bool {
        self.set_active_inner(id, Origin::Local)
    }

    /// Rename a session and announce the rename. Returns `false` for
    /// unknown ids.
    pub fn rename_session(&mut self, id: SessionId, name: &str) -> bool {
        let Some(session) = self.sessions.iter_mut().find(|s| s.id() == id) else {
            warn!(session = %id, "rename: unknown session");
            return false;
        };
        session.set_name(name);
        self.send(RelayEvent::SessionRename { session_id: id, name: name.to_owned() });
        true
    }

    fn admit_session(&mut self, id: Option<SessionId>, name: &str, origin: Origin) -> SessionId {
        let id = id.unwrap_or_else(Uuid::new_v4);
        if self.session(id).is_some() {
            warn!(session = %id, "create: session already present; dropped");
            return id;
        }

        let surface = (self.surface_factory)();
        let session = Session::new(id, name, surface, self.changes_tx.clone());
        self.sessions.push(session);
        info!(session = %id, name, origin = ?origin, "session created");

        if origin == Origin::Local {
            self.send(RelayEvent::SessionCreate { session_id: id, name: name.to_owned() });
        }
        // Creation implies activation on every peer; no separate active
        // event is relayed for it.
        self.activate_index(self.sessions.len() - 1);
        id
    }

    fn remove_session_inner(&mut self, id: SessionId, origin: Origin) -> bool {
        let Some(index) = self.sessions.iter().position(|s| s.id() == id) else {
            warn!(session = %id, "remove: unknown session; dropped");
            return false;
        };

        let mut session = self.sessions.remove(index);
        let was_active = session.is_active();
        session.dispose();
        drop(session);
        info!(session = %id, origin = ?origin, "session removed");

        if origin == Origin::Local {
            self.send(RelayEvent::SessionRemove { session_id: id });
        }
        if was_active && !self.sessions.is_empty() {
            // Each peer falls back on its own; the fallback is not relayed.
            self.activate_index(0);
        }
        self.phase = self.resting_phase();
        true
    }

    fn set_active_inner(&mut self, id: SessionId, origin: Origin) -> bool {
        let Some(index) = self.sessions.iter().position(|s| s.id() == id) else {
            warn!(session = %id, "activate: unknown session; dropped");
            return false;
        };
        if self.sessions[index].is_active() {
            return true;
        }

        self.activate_index(index);
        if origin == Origin::Local {
            self.send(RelayEvent::SessionActive { session_id: id });
        }
        true
    }

    /// Deactivate whatever is active, activate the indexed session, and
    /// re-arm the engaged interaction mode on it.
    fn activate_index(&mut self, index: usize) {
        for (i, session) in self.sessions.iter_mut().enumerate() {
            session.set_active(i == index);
        }
        self.sessions[index].set_mode(self.mode);
        self.phase = self.resting_phase();
    }

    // --- Interaction ---

    /// Engage an interaction mode on the active session.
    pub async fn set_mode(&mut self, mode: InteractionMode) {
        self.mode = mode;
        let Some(index) = self.active_index() else {
            return;
        };
        let sid = self.sessions[index].id();
        let event = self.sessions[index].set_mode(mode);
        self.forward_local(sid, event).await;
    }

    /// Begin a pointer gesture on the active session.
    pub async fn pointer_down(&mut self, x: f64, y: f64) {
        if !self.local_input_allowed() {
            return;
        }
        let Some(index) = self.active_index() else {
            return;
        };
        let sid = self.sessions[index].id();
        let event = self.sessions[index].pointer_down(x, y);
        self.forward_local(sid, event).await;
    }

    /// Continue a pointer gesture on the active session.
    pub fn pointer_move(&mut self, x: f64, y: f64) {
        if !self.local_input_allowed() {
            return;
        }
        if let Some(index) = self.active_index() {
            self.sessions[index].pointer_move(x, y);
        }
    }

    /// End a pointer gesture on the active session.
    pub async fn pointer_up(&mut self, x: f64, y: f64) -> Option<ObjectId> {
        if !self.local_input_allowed() {
            return None;
        }
        let index = self.active_index()?;
        let sid = self.sessions[index].id();
        let event = self.sessions[index].pointer_up(x, y);
        self.forward_local(sid, event).await
    }

    /// Append text to the active session's pending text entry.
    pub fn push_text(&mut self, text: &str) {
        if !self.local_input_allowed() {
            return;
        }
        if let Some(index) = self.active_index() {
            self.sessions[index].push_text(text);
        }
    }

    /// Commit the active session's pending text entry.
    pub async fn commit_text(&mut self) -> Option<ObjectId> {
        if !self.local_input_allowed() {
            return None;
        }
        let index = self.active_index()?;
        let sid = self.sessions[index].id();
        let event = self.sessions[index].commit_text();
        self.forward_local(sid, event).await
    }

    /// Add an object to the active session programmatically.
    pub async fn insert_object(&mut self, object: BoardObject) -> Option<ObjectId> {
        if !self.local_input_allowed() {
            return None;
        }
        let index = self.active_index()?;
        let sid = self.sessions[index].id();
        let event = self.sessions[index].insert_local(object);
        self.forward_local(sid, event).await
    }

    /// Transform an object on the active session by a sparse update.
    pub async fn transform_object(
        &mut self,
        id: &ObjectId,
        partial: &PartialBoardObject,
    ) -> bool {
        if !self.local_input_allowed() {
            return false;
        }
        let Some(index) = self.active_index() else {
            return false;
        };
        let sid = self.sessions[index].id();
        let event = self.sessions[index].transform_local(id, partial);
        self.forward_local(sid, event).await.is_some()
    }

    /// Delete an object from the active session.
    pub async fn delete_object(&mut self, id: &ObjectId) -> bool {
        if !self.local_input_allowed() {
            return false;
        }
        let Some(index) = self.active_index() else {
            return false;
        };
        let sid = self.sessions[index].id();
        let event = self.sessions[index].delete_local(id);
        self.forward_local(sid, event).await.is_some()
    }

    // --- History ---

    /// Undo on the active session and relay the navigation intent.
    pub fn undo(&mut self) -> bool {
        self.navigate_history(true)
    }

    /// Redo on the active session and relay the navigation intent.
    pub fn redo(&mut self) -> bool {
        self.navigate_history(false)
    }

    fn navigate_history(&mut self, backward: bool) -> bool {
        if !self.local_input_allowed() {
            return false;
        }
        let Some(index) = self.active_index() else {
            return false;
        };
        let sid = self.sessions[index].id();

        self.phase = Phase::AwaitingHistoryNav;
        let did = if backward { self.sessions[index].undo() } else { self.sessions[index].redo() };
        if did {
            // Direction relay: peers run their own logs, not ours.
            let event = if backward {
                RelayEvent::Undo { session_id: sid }
            } else {
                RelayEvent::Redo { session_id: sid }
            };
            self.send(event);
        }
        self.phase = self.resting_phase();
        did
    }

    // --- Remote dispatch ---

    /// Apply one inbound relay frame. Undecodable frames and unknown
    /// session references are dropped with a diagnostic.
    pub async fn on_relay_frame(&mut self, frame: Frame) {
        let event = match RelayEvent::from_frame(&frame) {
            Ok(event) => event,
            Err(e) => {
                warn!(event = %frame.event, error = %e, "relay: undecodable frame dropped");
                return;
            }
        };

        self.phase = Phase::ReplayingRemote;
        self.apply_remote(event).await;
        self.phase = self.resting_phase();
    }

    async fn apply_remote(&mut self, event: RelayEvent) {
        match event {
            RelayEvent::SessionCreate { session_id, name } => {
                self.admit_session(Some(session_id), &name, Origin::Remote);
            }
            RelayEvent::SessionActive { session_id } => {
                self.set_active_inner(session_id, Origin::Remote);
            }
            RelayEvent::SessionRemove { session_id } => {
                self.remove_session_inner(session_id, Origin::Remote);
            }
            RelayEvent::SessionRename { session_id, name } => {
                match self.sessions.iter_mut().find(|s| s.id() == session_id) {
                    Some(session) => session.set_name(name),
                    None => warn!(session = %session_id, "rename: unknown session; dropped"),
                }
            }
            RelayEvent::ObjectAdded { session_id, object_id } => {
                self.fetch_and_apply(session_id, object_id, false).await;
            }
            RelayEvent::ObjectModified { session_id, object_id } => {
                self.fetch_and_apply(session_id, object_id, true).await;
            }
            RelayEvent::ObjectRemoved { session_id, object_id } => {
                match self.index_of(session_id) {
                    Some(index) => {
                        self.sessions[index].remove_object(&object_id);
                    }
                    None => warn!(session = %session_id, "object:removed: unknown session; dropped"),
                }
            }
            RelayEvent::Undo { session_id } => match self.index_of(session_id) {
                Some(index) => {
                    self.sessions[index].undo();
                }
                None => warn!(session = %session_id, "undo: unknown session; dropped"),
            },
            RelayEvent::Redo { session_id } => match self.index_of(session_id) {
                Some(index) => {
                    self.sessions[index].redo();
                }
                None => warn!(session = %session_id, "redo: unknown session; dropped"),
            },
            RelayEvent::Sync => self.resync().await,
        }
    }

    /// Fetch-then-apply for remote object add/modify.
    async fn fetch_and_apply(&mut self, session_id: SessionId, object_id: ObjectId, modify: bool) {
        let Some(index) = self.index_of(session_id) else {
            warn!(session = %session_id, object = %object_id, "object event: unknown session; dropped");
            return;
        };

        let snapshot = match self.store.get_object(session_id, object_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                // The surface lags until the next sync; nothing else to do.
                warn!(session = %session_id, object = %object_id, error = %e, "object fetch failed");
                return;
            }
        };

        let session = &mut self.sessions[index];
        if modify {
            session.modify_object(&snapshot);
        } else {
            session.add_object(&snapshot, Some(object_id));
        }
    }

    /// Rebuild every session from the persistence backend.
    pub async fn resync(&mut self) {
        let directory = match self.store.get_objects().await {
            Ok(directory) => directory,
            Err(e) => {
                warn!(error = %e, "resync failed; keeping in-memory state");
                return;
            }
        };

        self.sessions.clear();
        for record in directory.sessions {
            let surface = (self.surface_factory)();
            let mut session =
                Session::new(record.id, record.name, surface, self.changes_tx.clone());
            session.load_objects(record.objects);
            self.sessions.push(session);
        }
        info!(sessions = self.sessions.len(), "resync complete");

        let active = directory
            .active
            .filter(|id| self.index_of(*id).is_some())
            .or_else(|| self.sessions.first().map(Session::id));
        if let Some(id) = active {
            if let Some(index) = self.index_of(id) {
                self.activate_index(index);
            }
        }
        self.phase = self.resting_phase();
    }

    /// Initial load: one session per persisted record.
    pub async fn load(&mut self) {
        self.resync().await;
    }

    // --- Change stream flushing ---

    /// Flush deferred change emissions on all sessions. Returns how many
    /// emissions happened.
    pub fn flush_changes(&mut self) -> usize {
        let mut flushed = 0;
        for session in &mut self.sessions {
            if session.flush_changes() {
                flushed += 1;
            }
        }
        flushed
    }

    // --- Internals ---

    async fn forward_local(
        &mut self,
        session_id: SessionId,
        event: Option<SessionEvent>,
    ) -> Option<ObjectId> {
        match event? {
            SessionEvent::Added(object) => {
                // Persist before announcing: peers fetch by id on receipt.
                if let Err(e) = self.store.add_object(session_id, &object).await {
                    warn!(session = %session_id, object = %object.id, error = %e, "persist add failed; relay skipped");
                    return Some(object.id);
                }
                self.send(RelayEvent::ObjectAdded { session_id, object_id: object.id });
                Some(object.id)
            }
            SessionEvent::Modified(object) => {
                if let Err(e) = self.store.modify_object(session_id, &object).await {
                    warn!(session = %session_id, object = %object.id, error = %e, "persist modify failed; relay skipped");
                    return Some(object.id);
                }
                self.send(RelayEvent::ObjectModified { session_id, object_id: object.id });
                Some(object.id)
            }
            SessionEvent::Removed(object_id) => {
                if let Err(e) = self.store.remove_object(session_id, object_id).await {
                    debug!(session = %session_id, object = %object_id, error = %e, "persist remove failed");
                }
                // Peers apply removals directly; relay regardless.
                self.send(RelayEvent::ObjectRemoved { session_id, object_id });
                Some(object_id)
            }
        }
    }

    fn send(&self, event: RelayEvent) {
        self.relay
            .send(event.to_frame().with_from(self.client_id.to_string()));
    }

    fn active_index(&self) -> Option<usize> {
        self.sessions.iter().position(Session::is_active)
    }

    fn index_of(&self, id: SessionId) -> Option<usize> {
        self.sessions.iter().position(|s| s.id() == id)
    }

    fn local_input_allowed(&self) -> bool {
        self.phase != Phase::ReplayingRemote
    }

    fn resting_phase(&self) -> Phase {
        if self.sessions.iter().any(Session::is_active) {
            Phase::ActiveLocal
        } else {
            Phase::Idle
        }
    }
}

/// Spawn the background task that flushes deferred change emissions at the
/// configured cadence. Returns a handle for shutdown.
pub fn spawn_flush_task<S>(whiteboard: Arc<RwLock<Whiteboard<S>>>) -> JoinHandle<()>
where
    S: DrawableSurface + Sync + 'static,
{
    let config = FlushConfig::from_env();
    tokio::spawn(async move {
        loop {
            whiteboard.write().await.flush_changes();
            tokio::time::sleep(Duration::from_millis(config.interval_ms)).await;
        }
    })
}
