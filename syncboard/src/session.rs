//! One whiteboard session: a drawing surface, its history, and the bridge
//! between user intent and structural surface changes.
//!
//! DESIGN
//! ======
//! All structural mutations funnel through three handlers
//! (`apply_add` / `apply_remove` / `apply_modified`). Each checks the
//! external-load gate first: changes applied on behalf of a remote peer are
//! inserted silently — no history entry, no outbound event, no change-stream
//! emission — which is what breaks the relay feedback loop. Locally
//! originated changes do the opposite: they assign ids, record history
//! (adds only), request a debounced snapshot emission, and hand a semantic
//! [`SessionEvent`] back to the controller for relaying.
//!
//! The change stream is coalesced: emissions for one session are at least
//! [`CHANGE_WINDOW`] apart, and requests landing inside the window are
//! deferred until the controller's flush pass.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use canvas::object::{BoardObject, ObjectId, ObjectKind, PartialBoardObject};
use canvas::surface::{DrawableSurface, decode_object};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::consts::{CHANGE_WINDOW, DEFAULT_FONT_SIZE, MIN_SHAPE_SIZE};
use crate::history::{HistoryAction, HistoryLog};
use crate::store::SessionId;

/// The active interaction mode. Exactly one is engaged at a time; switching
/// modes finalizes or discards any in-progress object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionMode {
    /// Pointer selection and dragging (default).
    #[default]
    Select,
    /// Freehand stroke drawing.
    FreeDraw,
    /// Drag out a shape of the given kind.
    Shape(ObjectKind),
    /// Text entry.
    Write,
}

/// Gate distinguishing locally originated mutations from ones applied on
/// behalf of a remote peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum LoadGate {
    /// Mutations are user intent: record, notify, emit.
    #[default]
    Local,
    /// Mutations mirror a remote peer: apply silently.
    External,
}

/// Semantic structural event handed to the controller for relaying.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A new object landed on the surface.
    Added(BoardObject),
    /// An existing object was replaced in place.
    Modified(BoardObject),
    /// An object left the surface.
    Removed(ObjectId),
}

/// Debounced serialized snapshot published on the change stream.
#[derive(Debug, Clone)]
pub struct SessionChange {
    /// Session the snapshot belongs to.
    pub session_id: SessionId,
    /// Full surface snapshot, as produced by the surface's `serialize`.
    pub snapshot: Value,
    /// Milliseconds since the Unix epoch at emission time.
    pub ts: i64,
}

/// In-progress gesture state between pointer-down and pointer-up.
#[derive(Debug, Clone)]
enum Pending {
    /// Freehand stroke being drawn.
    Stroke { points: Vec<(f64, f64)> },
    /// Shape being dragged out.
    Shape { kind: ObjectKind, origin: (f64, f64), corner: (f64, f64) },
    /// Existing object being dragged.
    Drag { id: ObjectId, last: (f64, f64), moved: bool },
    /// Text being composed.
    Text { x: f64, y: f64, buffer: String },
}

/// One whiteboard session owning one drawing surface and one history log.
pub struct Session<S> {
    id: SessionId,
    name: String,
    surface: S,
    history: HistoryLog,
    active: bool,
    awake: bool,
    mode: InteractionMode,
    gate: LoadGate,
    selection: Option<ObjectId>,
    pending: Option<Pending>,
    next_z: i64,
    dirty: bool,
    last_emit: Option<Instant>,
    changes_tx: mpsc::UnboundedSender<SessionChange>,
}

impl<S: DrawableSurface> Session<S> {
    /// Create an inactive session around an owned surface.
    pub fn new(
        id: SessionId,
        name: impl Into<String>,
        surface: S,
        changes_tx: mpsc::UnboundedSender<SessionChange>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            surface,
            history: HistoryLog::new(),
            active: false,
            awake: false,
            mode: InteractionMode::default(),
            gate: LoadGate::default(),
            selection: None,
            pending: None,
            next_z: 0,
            dirty: false,
            last_emit: None,
            changes_tx,
        }
    }

    // --- Identity and state ---

    /// Session id.
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the session.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Whether this is the displayed session.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether interaction handling is armed. Only the active session is
    /// awake.
    #[must_use]
    pub fn is_awake(&self) -> bool {
        self.awake
    }

    /// Current interaction mode.
    #[must_use]
    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    /// Currently selected object, if any.
    #[must_use]
    pub fn selection(&self) -> Option<ObjectId> {
        self.selection
    }

    /// The owned surface, read-only.
    #[must_use]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// The history log, read-only.
    #[must_use]
    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    /// Activate or deactivate. Activation arms interaction handling and
    /// redraws; deactivation disarms it and discards any in-progress
    /// gesture. Content is retained either way.
    pub fn set_active(&mut self, active: bool) {
        if self.active == active {
            return;
        }
        self.active = active;
        self.awake = active;
        if active {
            self.surface.render();
        } else if self.pending.take().is_some() {
            debug!(session = %self.id, "deactivate: in-progress gesture discarded");
        }
    }

    /// Switch interaction mode, finalizing pending text first. Returns the
    /// add event when a pending text was committed.
    pub fn set_mode(&mut self, mode: InteractionMode) -> Option<SessionEvent> {
        if self.mode == mode {
            return None;
        }
        let event = match self.pending.take() {
            Some(Pending::Text { x, y, buffer }) => self.finalize_text(x, y, &buffer),
            Some(_) => {
                debug!(session = %self.id, "mode switch: in-progress gesture discarded");
                None
            }
            None => None,
        };
        self.mode = mode;
        event
    }

    // --- Pointer interaction ---

    /// Begin a gesture. In write mode a click elsewhere commits the pending
    /// text first, and the returned event carries that commit.
    pub fn pointer_down(&mut self, x: f64, y: f64) -> Option<SessionEvent> {
        if !self.awake {
            debug!(session = %self.id, "pointer ignored: session not awake");
            return None;
        }

        let mut event = None;
        if let Some(Pending::Text { x: tx, y: ty, buffer }) = self.pending.take() {
            event = self.finalize_text(tx, ty, &buffer);
        }

        match self.mode {
            InteractionMode::Select => {
                self.selection = self.surface.hit_test(x, y);
                self.pending = self
                    .selection
                    .map(|id| Pending::Drag { id, last: (x, y), moved: false });
            }
            InteractionMode::FreeDraw => {
                self.pending = Some(Pending::Stroke { points: vec![(x, y)] });
            }
            InteractionMode::Shape(kind) => {
                self.pending = Some(Pending::Shape { kind, origin: (x, y), corner: (x, y) });
            }
            InteractionMode::Write => {
                self.pending = Some(Pending::Text { x, y, buffer: String::new() });
            }
        }
        event
    }

    /// Continue a gesture.
    pub fn pointer_move(&mut self, x: f64, y: f64) {
        if !self.awake {
            return;
        }
        match &mut self.pending {
            Some(Pending::Stroke { points }) => points.push((x, y)),
            Some(Pending::Shape { corner, .. }) => *corner = (x, y),
            Some(Pending::Drag { id, last, moved }) => {
                let (dx, dy) = (x - last.0, y - last.1);
                if let Some(obj) = self.surface.get_mut(id) {
                    obj.x += dx;
                    obj.y += dy;
                    *moved = true;
                }
                *last = (x, y);
            }
            Some(Pending::Text { .. }) | None => {}
        }
    }

    /// End a gesture, producing a structural event when it committed.
    pub fn pointer_up(&mut self, _x: f64, _y: f64) -> Option<SessionEvent> {
        if !self.awake {
            return None;
        }
        match self.pending.take() {
            Some(Pending::Stroke { points }) => self.finalize_stroke(&points),
            Some(Pending::Shape { kind, origin, corner }) => {
                self.finalize_shape(kind, origin, corner)
            }
            Some(Pending::Drag { id, moved, .. }) => {
                if !moved {
                    return None;
                }
                let Some(obj) = self.surface.get_mut(&id) else {
                    return None;
                };
                obj.version += 1;
                let snapshot = obj.clone();
                self.apply_modified(snapshot)
            }
            pending @ Some(Pending::Text { .. }) => {
                // Text commits on mode switch or the next pointer-down.
                self.pending = pending;
                None
            }
            None => None,
        }
    }

    /// Append text to the pending write-mode entry.
    pub fn push_text(&mut self, text: &str) {
        match &mut self.pending {
            Some(Pending::Text { buffer, .. }) => buffer.push_str(text),
            _ => debug!(session = %self.id, "push_text ignored: no text entry in progress"),
        }
    }

    /// Commit the pending write-mode entry, if any.
    pub fn commit_text(&mut self) -> Option<SessionEvent> {
        match self.pending.take() {
            Some(Pending::Text { x, y, buffer }) => self.finalize_text(x, y, &buffer),
            other => {
                self.pending = other;
                None
            }
        }
    }

    // --- Local programmatic operations ---

    /// Add an object as local user intent: assigns an id if needed, records
    /// history, requests a change emission, and returns the add event.
    pub fn insert_local(&mut self, object: BoardObject) -> Option<SessionEvent> {
        self.apply_add(object)
    }

    /// Transform an object in place by a sparse update. Missing targets and
    /// malformed patches are skipped with a diagnostic.
    pub fn transform_local(
        &mut self,
        id: &ObjectId,
        partial: &PartialBoardObject,
    ) -> Option<SessionEvent> {
        let Some(obj) = self.surface.get_mut(id) else {
            warn!(session = %self.id, object = %id, "transform: no object with target id");
            return None;
        };
        if !obj.apply(partial) {
            warn!(session = %self.id, object = %id, "transform: malformed props patch skipped");
            return None;
        }
        let snapshot = obj.clone();
        self.apply_modified(snapshot)
    }

    /// Delete an object as local user intent.
    pub fn delete_local(&mut self, id: &ObjectId) -> Option<SessionEvent> {
        self.apply_remove(id)
    }

    // --- Remote application (gated) ---

    /// Apply a remote add: decode the snapshot and insert it silently. The
    /// given id wins over the one embedded in the snapshot. Returns whether
    /// the object landed.
    pub fn add_object(&mut self, snapshot: &Value, id: Option<ObjectId>) -> bool {
        let mut object = match decode_object(snapshot) {
            Ok(obj) => obj,
            Err(e) => {
                warn!(session = %self.id, error = %e, "add_object: undecodable snapshot skipped");
                return false;
            }
        };
        if let Some(id) = id {
            object.id = id;
        }
        self.gate = LoadGate::External;
        self.apply_add(object);
        self.gate = LoadGate::Local;
        true
    }

    /// Apply a remote removal silently. Returns whether the object existed.
    pub fn remove_object(&mut self, id: &ObjectId) -> bool {
        let existed = self.surface.get(id).is_some();
        self.gate = LoadGate::External;
        self.apply_remove(id);
        self.gate = LoadGate::Local;
        existed
    }

    /// Apply a remote modification: replace-by-identity. The object is
    /// briefly absent from the surface between the removal and the re-add.
    /// Returns whether the replacement landed.
    pub fn modify_object(&mut self, snapshot: &Value) -> bool {
        let object = match decode_object(snapshot) {
            Ok(obj) => obj,
            Err(e) => {
                warn!(session = %self.id, error = %e, "modify_object: undecodable snapshot skipped");
                return false;
            }
        };
        if self.surface.get(&object.id).is_none() {
            warn!(session = %self.id, object = %object.id, "modify_object: no object with target id");
            return false;
        }

        self.gate = LoadGate::External;
        self.apply_remove(&object.id);
        self.apply_add(object);
        self.gate = LoadGate::Local;
        true
    }

    /// Bulk-load persisted objects, replacing surface content. Used on
    /// resync; never records history or emits changes.
    pub fn load_objects(&mut self, objects: Vec<BoardObject>) {
        self.gate = LoadGate::External;
        self.surface.clear();
        for object in objects {
            self.apply_add(object);
        }
        self.gate = LoadGate::Local;
        self.history.clear();
    }

    // --- History navigation ---

    /// Navigate history backward. Returns whether a step was taken.
    pub fn undo(&mut self) -> bool {
        let did = self.history.undo(&mut self.surface);
        if did {
            self.send_changes();
        }
        did
    }

    /// Navigate history forward. Returns whether a step was taken.
    pub fn redo(&mut self) -> bool {
        let did = self.history.redo(&mut self.surface);
        if did {
            self.send_changes();
        }
        did
    }

    /// Wipe the surface and the history log, emitting the cleared snapshot.
    pub fn clear(&mut self) {
        self.surface.clear();
        self.history.clear();
        self.selection = None;
        self.pending = None;
        self.send_changes();
    }

    /// Teardown for session destruction: wipe everything without emitting.
    /// The board is going away; nobody should persist its empty snapshot.
    pub fn dispose(&mut self) {
        self.surface.clear();
        self.history.clear();
        self.selection = None;
        self.pending = None;
        self.dirty = false;
    }

    // --- Change stream ---

    /// Request a snapshot emission. Emits immediately when the coalescing
    /// window is open; otherwise defers to the next flush pass.
    pub fn send_changes(&mut self) {
        let now = Instant::now();
        match self.last_emit {
            Some(last) if now.duration_since(last) < CHANGE_WINDOW => {
                self.dirty = true;
            }
            _ => self.emit_changes(now),
        }
    }

    /// Emit a deferred snapshot if one is due. Returns whether an emission
    /// happened.
    pub fn flush_changes(&mut self) -> bool {
        if !self.dirty {
            return false;
        }
        let now = Instant::now();
        if let Some(last) = self.last_emit {
            if now.duration_since(last) < CHANGE_WINDOW {
                return false;
            }
        }
        self.emit_changes(now);
        true
    }

    fn emit_changes(&mut self, now: Instant) {
        self.dirty = false;
        self.last_emit = Some(now);
        let change = SessionChange {
            session_id: self.id,
            snapshot: self.surface.serialize(),
            ts: frames::now_ms(),
        };
        if self.changes_tx.send(change).is_err() {
            debug!(session = %self.id, "change stream receiver gone; snapshot dropped");
        }
    }

    // --- Structural handlers ---

    /// The single add path. Gated first: external loads insert silently.
    fn apply_add(&mut self, mut object: BoardObject) -> Option<SessionEvent> {
        if self.gate == LoadGate::External {
            self.next_z = self.next_z.max(object.z_index + 1);
            self.surface.add(object);
            return None;
        }

        if object.needs_id() {
            object.id = Uuid::new_v4();
        }
        if object.z_index == 0 {
            object.z_index = self.next_z;
        }
        self.next_z = self.next_z.max(object.z_index + 1);

        self.surface.add(object.clone());
        self.history.push(HistoryAction::Add, object.clone());
        self.send_changes();
        Some(SessionEvent::Added(object))
    }

    /// The single removal path. Missing targets are skipped with a
    /// diagnostic; external removals produce no event.
    fn apply_remove(&mut self, id: &ObjectId) -> Option<SessionEvent> {
        let Some(removed) = self.surface.remove(id) else {
            warn!(session = %self.id, object = %id, "remove: no object with target id");
            return None;
        };
        if self.selection == Some(removed.id) {
            self.selection = None;
        }
        if self.gate == LoadGate::External {
            return None;
        }
        self.send_changes();
        Some(SessionEvent::Removed(removed.id))
    }

    /// The single modification path. The surface mutation already happened;
    /// this decides whether anyone hears about it.
    fn apply_modified(&mut self, object: BoardObject) -> Option<SessionEvent> {
        if self.gate == LoadGate::External {
            return None;
        }
        self.send_changes();
        Some(SessionEvent::Modified(object))
    }

    // --- Gesture finalization ---

    fn finalize_stroke(&mut self, points: &[(f64, f64)]) -> Option<SessionEvent> {
        if points.len() < 2 {
            return None;
        }
        let (min_x, max_x) = bounds(points.iter().map(|p| p.0));
        let (min_y, max_y) = bounds(points.iter().map(|p| p.1));

        let mut object =
            BoardObject::unassigned(ObjectKind::Path, min_x, min_y, max_x - min_x, max_y - min_y);
        object.props = json!({
            "points": points.iter().map(|(x, y)| json!([x, y])).collect::<Vec<_>>(),
        });
        self.apply_add(object)
    }

    fn finalize_shape(
        &mut self,
        kind: ObjectKind,
        origin: (f64, f64),
        corner: (f64, f64),
    ) -> Option<SessionEvent> {
        let width = (corner.0 - origin.0).abs();
        let height = (corner.1 - origin.1).abs();
        if width < MIN_SHAPE_SIZE || height < MIN_SHAPE_SIZE {
            debug!(session = %self.id, "shape too small; discarded");
            return None;
        }
        let x = origin.0.min(corner.0);
        let y = origin.1.min(corner.1);
        self.apply_add(BoardObject::unassigned(kind, x, y, width, height))
    }

    fn finalize_text(&mut self, x: f64, y: f64, buffer: &str) -> Option<SessionEvent> {
        if buffer.is_empty() {
            return None;
        }
        // Rough metrics; real extents come from the rendering backend.
        let width = buffer.chars().count() as f64 * DEFAULT_FONT_SIZE * 0.6;
        let height = DEFAULT_FONT_SIZE * 1.4;

        let mut object = BoardObject::unassigned(ObjectKind::Text, x, y, width, height);
        object.props = json!({ "text": buffer, "font_size": DEFAULT_FONT_SIZE });
        self.apply_add(object)
    }
}

fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), v| (min.min(v), max.max(v)))
}
