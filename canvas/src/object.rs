//! Board object types: what a whiteboard entry looks like in memory and on
//! the wire.
//!
//! `BoardObject` is the full record, `PartialBoardObject` a sparse update for
//! local transforms (move/resize/restyle), and `Props` a typed accessor over
//! the open-ended `props` JSON bag that holds per-kind styling (stroke color,
//! fill, freehand points, text content).

#[cfg(test)]
#[path = "object_test.rs"]
mod object_test;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a board object.
pub type ObjectId = Uuid;

/// The kind of a board object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    /// Freehand polyline stroke; points stored in `props`.
    Path,
    /// Axis-aligned rectangle.
    Rect,
    /// Ellipse inscribed within the bounding box.
    Ellipse,
    /// Straight line segment across the bounding box diagonal.
    Line,
    /// Text block anchored at the bounding-box origin.
    Text,
}

/// A board object as stored on a surface and in serialized snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardObject {
    /// Unique identifier; assigned client-side at creation, never reassigned.
    pub id: ObjectId,
    /// Shape or text type.
    pub kind: ObjectKind,
    /// Left edge of the bounding box in world coordinates.
    pub x: f64,
    /// Top edge of the bounding box in world coordinates.
    pub y: f64,
    /// Width of the bounding box in world coordinates.
    pub width: f64,
    /// Height of the bounding box in world coordinates.
    pub height: f64,
    /// Clockwise rotation in degrees around the bounding-box center.
    pub rotation: f64,
    /// Stacking order; lower values are drawn beneath higher values.
    pub z_index: i64,
    /// Open-ended per-kind properties (stroke, fill, points, text, etc.).
    pub props: serde_json::Value,
    /// Monotonically increasing edit counter; last write wins on conflict.
    pub version: i64,
}

impl BoardObject {
    /// Create an object with no id yet. The surface-owning session assigns
    /// one on insertion; [`Uuid::nil`] marks "not yet assigned".
    #[must_use]
    pub fn unassigned(kind: ObjectKind, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            id: Uuid::nil(),
            kind,
            x,
            y,
            width,
            height,
            rotation: 0.0,
            z_index: 0,
            props: serde_json::json!({}),
            version: 1,
        }
    }

    /// Whether this object still lacks an assigned id.
    #[must_use]
    pub fn needs_id(&self) -> bool {
        self.id.is_nil()
    }

    /// Apply a sparse update in place. Props keys merge; a null value
    /// deletes the key. Returns `false` when a `props` patch is present but
    /// not an object.
    pub fn apply(&mut self, partial: &PartialBoardObject) -> bool {
        if let Some(x) = partial.x {
            self.x = x;
        }
        if let Some(y) = partial.y {
            self.y = y;
        }
        if let Some(w) = partial.width {
            self.width = w;
        }
        if let Some(h) = partial.height {
            self.height = h;
        }
        if let Some(r) = partial.rotation {
            self.rotation = r;
        }
        if let Some(z) = partial.z_index {
            self.z_index = z;
        }
        if let Some(ref props) = partial.props {
            let Some(incoming) = props.as_object() else {
                return false;
            };

            if !self.props.is_object() {
                self.props = serde_json::json!({});
            }

            if let Some(existing) = self.props.as_object_mut() {
                for (k, v) in incoming {
                    if v.is_null() {
                        existing.remove(k);
                    } else {
                        existing.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        self.version += 1;
        true
    }

    /// Whether a world-space point falls inside the bounding box.
    ///
    /// Rotation is ignored; hit-testing against the axis-aligned box is
    /// accurate enough for selection.
    #[must_use]
    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px <= self.x + self.width && py >= self.y && py <= self.y + self.height
    }
}

/// Sparse update for a board object. Only present fields are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartialBoardObject {
    /// New x position, if being updated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    /// New y position, if being updated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    /// New width, if being updated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    /// New height, if being updated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    /// New rotation in degrees, if being updated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    /// New z-index, if being updated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i64>,
    /// Props keys to merge or remove (null values delete keys).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub props: Option<serde_json::Value>,
}

/// Typed access to common props fields from a `BoardObject.props` value.
pub struct Props<'a> {
    value: &'a serde_json::Value,
}

impl<'a> Props<'a> {
    /// Wrap a reference to a `props` JSON value for typed access.
    #[must_use]
    pub fn new(value: &'a serde_json::Value) -> Self {
        Self { value }
    }

    /// Fill color as a CSS color string. Defaults to `"transparent"`.
    #[must_use]
    pub fn fill(&self) -> &str {
        self.value
            .get("fill")
            .and_then(|v| v.as_str())
            .unwrap_or("transparent")
    }

    /// Stroke color as a CSS color string. Defaults to `"#000000"`.
    #[must_use]
    pub fn stroke(&self) -> &str {
        self.value
            .get("stroke")
            .and_then(|v| v.as_str())
            .unwrap_or("#000000")
    }

    /// Stroke width in world units. Defaults to `2.0`.
    #[must_use]
    pub fn stroke_width(&self) -> f64 {
        self.value
            .get("stroke_width")
            .and_then(serde_json::Value::as_f64)
            .unwrap_or(2.0)
    }

    /// Text content for text objects. Empty string when absent.
    #[must_use]
    pub fn text(&self) -> &str {
        self.value
            .get("text")
            .and_then(|v| v.as_str())
            .unwrap_or("")
    }

    /// Font size in world units for text objects, if set.
    #[must_use]
    pub fn font_size(&self) -> Option<f64> {
        self.value
            .get("font_size")
            .and_then(serde_json::Value::as_f64)
    }

    /// Freehand stroke points as `(x, y)` pairs. Empty when absent or when
    /// any entry is malformed.
    #[must_use]
    pub fn points(&self) -> Vec<(f64, f64)> {
        let Some(list) = self.value.get("points").and_then(|v| v.as_array()) else {
            return Vec::new();
        };

        let mut out = Vec::with_capacity(list.len());
        for entry in list {
            let Some(pair) = entry.as_array() else {
                return Vec::new();
            };
            let (Some(x), Some(y)) = (
                pair.first().and_then(serde_json::Value::as_f64),
                pair.get(1).and_then(serde_json::Value::as_f64),
            ) else {
                return Vec::new();
            };
            out.push((x, y));
        }
        out
    }
}
