//! The drawing-surface contract and its in-memory implementation.
//!
//! The sync core never talks to a rendering backend directly; it drives a
//! [`DrawableSurface`]. [`MemSurface`] is the reference implementation: a
//! plain object store with draw-order iteration and hit-testing, no pixels.
//! A GPU- or DOM-backed surface implements the same trait and the core is
//! none the wiser.
//!
//! ERROR HANDLING
//! ==============
//! Enlivening is best-effort: individual objects that fail to decode are
//! skipped with a diagnostic, never aborting the rest of the snapshot. Only
//! a snapshot whose overall shape is wrong yields an error.

#[cfg(test)]
#[path = "surface_test.rs"]
mod surface_test;

use std::collections::HashMap;

use serde_json::{Value, json};
use tracing::warn;

use crate::object::{BoardObject, ObjectId};

/// Error returned when a serialized snapshot or object cannot be decoded.
#[derive(Debug, thiserror::Error)]
pub enum EnlivenError {
    /// The snapshot is not of the expected `{"objects": [...]}` shape.
    #[error("snapshot is not an object list")]
    BadShape,
    /// A single serialized object failed to decode.
    #[error("object failed to decode: {0}")]
    BadObject(#[from] serde_json::Error),
}

/// Decode one serialized object.
///
/// # Errors
///
/// Returns [`EnlivenError::BadObject`] when the value does not deserialize
/// as a [`BoardObject`].
pub fn decode_object(value: &Value) -> Result<BoardObject, EnlivenError> {
    Ok(serde_json::from_value(value.clone())?)
}

/// A 2D drawing surface the sync core can populate and query.
///
/// Implementations own their objects exclusively; the core never shares a
/// surface between sessions.
pub trait DrawableSurface: Send {
    /// Insert or replace an object. Same-id insertion overwrites.
    fn add(&mut self, object: BoardObject);

    /// Remove an object by id, returning it if it was present.
    fn remove(&mut self, id: &ObjectId) -> Option<BoardObject>;

    /// Return a reference to an object by id.
    fn get(&self, id: &ObjectId) -> Option<&BoardObject>;

    /// Return a mutable reference to an object by id.
    fn get_mut(&mut self, id: &ObjectId) -> Option<&mut BoardObject>;

    /// All objects in draw order: `(z_index, id)` ascending.
    fn objects(&self) -> Vec<&BoardObject>;

    /// Top-most object containing the given world-space point, if any.
    fn hit_test(&self, x: f64, y: f64) -> Option<ObjectId>;

    /// Serialize the full surface to a JSON snapshot.
    fn serialize(&self) -> Value;

    /// Rebuild the surface from a serialized snapshot, replacing current
    /// content. Returns the number of objects loaded; malformed entries are
    /// skipped with a diagnostic.
    ///
    /// # Errors
    ///
    /// Returns [`EnlivenError::BadShape`] when the snapshot is not an
    /// object-list envelope.
    fn enliven(&mut self, snapshot: &Value) -> Result<usize, EnlivenError>;

    /// Remove all objects.
    fn clear(&mut self);

    /// Redraw hook. Backends repaint here; model-only surfaces do nothing.
    fn render(&mut self) {}

    /// Number of objects on the surface.
    fn len(&self) -> usize;

    /// Whether the surface holds no objects.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory surface: the object store without a rendering backend.
#[derive(Default)]
pub struct MemSurface {
    objects: HashMap<ObjectId, BoardObject>,
}

impl MemSurface {
    /// Create an empty surface.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl DrawableSurface for MemSurface {
    fn add(&mut self, object: BoardObject) {
        self.objects.insert(object.id, object);
    }

    fn remove(&mut self, id: &ObjectId) -> Option<BoardObject> {
        self.objects.remove(id)
    }

    fn get(&self, id: &ObjectId) -> Option<&BoardObject> {
        self.objects.get(id)
    }

    fn get_mut(&mut self, id: &ObjectId) -> Option<&mut BoardObject> {
        self.objects.get_mut(id)
    }

    fn objects(&self) -> Vec<&BoardObject> {
        let mut objs: Vec<&BoardObject> = self.objects.values().collect();
        objs.sort_by(|a, b| a.z_index.cmp(&b.z_index).then_with(|| a.id.cmp(&b.id)));
        objs
    }

    fn hit_test(&self, x: f64, y: f64) -> Option<ObjectId> {
        // Draw order ascending; the last hit is the top-most.
        self.objects()
            .iter()
            .rev()
            .find(|o| o.contains(x, y))
            .map(|o| o.id)
    }

    fn serialize(&self) -> Value {
        json!({ "objects": self.objects() })
    }

    fn enliven(&mut self, snapshot: &Value) -> Result<usize, EnlivenError> {
        let Some(list) = snapshot.get("objects").and_then(|v| v.as_array()) else {
            return Err(EnlivenError::BadShape);
        };

        self.objects.clear();
        let mut loaded = 0;
        for entry in list {
            match decode_object(entry) {
                Ok(obj) => {
                    self.objects.insert(obj.id, obj);
                    loaded += 1;
                }
                Err(e) => {
                    warn!(error = %e, "enliven: skipping undecodable object");
                }
            }
        }
        Ok(loaded)
    }

    fn clear(&mut self) {
        self.objects.clear();
    }

    fn len(&self) -> usize {
        self.objects.len()
    }
}
