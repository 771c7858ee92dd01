//! Typed relay event vocabulary.
//!
//! Every frame on the wire maps to exactly one [`RelayEvent`] variant with a
//! strictly-typed payload. Decoding happens once, at the transport boundary:
//! a malformed frame yields a [`ProtocolError`] there and never reaches the
//! dispatch layer as loose JSON.

#[cfg(test)]
#[path = "event_test.rs"]
mod tests;

use serde_json::{Value, json};
use uuid::Uuid;

use crate::Frame;

/// Error produced when a [`Frame`] cannot be interpreted as a [`RelayEvent`].
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The frame's event name is not part of the vocabulary.
    #[error("unknown relay event: {0}")]
    UnknownEvent(String),
    /// The frame lacks a session context required by its event type.
    #[error("event {0} requires a session id")]
    MissingSession(&'static str),
    /// A required payload field is absent or of the wrong type.
    #[error("event {event} is missing field `{field}`")]
    MissingField {
        /// Event name of the offending frame.
        event: &'static str,
        /// Payload field that was absent or mistyped.
        field: &'static str,
    },
    /// An id field could not be parsed as a UUID.
    #[error("event {event} carries an invalid id in `{field}`")]
    BadId {
        /// Event name of the offending frame.
        event: &'static str,
        /// Payload or envelope field holding the bad id.
        field: &'static str,
    },
}

/// One relay event, decoded from a [`Frame`].
///
/// Session and object references are stable ids, never positional indexes —
/// positions diverge between peers under concurrent add/remove.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    /// A peer created a new session (board tab).
    SessionCreate {
        /// Id of the new session, shared by all peers.
        session_id: Uuid,
        /// Display name of the new session.
        name: String,
    },
    /// A peer switched its displayed session.
    SessionActive {
        /// Id of the newly active session.
        session_id: Uuid,
    },
    /// A peer removed a session.
    SessionRemove {
        /// Id of the removed session.
        session_id: Uuid,
    },
    /// A peer renamed a session.
    SessionRename {
        /// Id of the renamed session.
        session_id: Uuid,
        /// New display name.
        name: String,
    },
    /// An object was added; receivers fetch the snapshot by id and apply.
    ObjectAdded {
        /// Session the object belongs to.
        session_id: Uuid,
        /// Id of the added object.
        object_id: Uuid,
    },
    /// An object was modified; same fetch-then-apply pattern as add.
    ObjectModified {
        /// Session the object belongs to.
        session_id: Uuid,
        /// Id of the modified object.
        object_id: Uuid,
    },
    /// An object was removed; applied directly, no fetch needed.
    ObjectRemoved {
        /// Session the object belonged to.
        session_id: Uuid,
        /// Id of the removed object.
        object_id: Uuid,
    },
    /// A peer navigated its history backward; receivers do the same.
    Undo {
        /// Session whose history was navigated.
        session_id: Uuid,
    },
    /// A peer navigated its history forward; receivers do the same.
    Redo {
        /// Session whose history was navigated.
        session_id: Uuid,
    },
    /// Full resync request: rebuild all sessions from persisted state.
    Sync,
}

impl RelayEvent {
    /// Wire name of this event.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::SessionCreate { .. } => "session:create",
            Self::SessionActive { .. } => "session:active",
            Self::SessionRemove { .. } => "session:remove",
            Self::SessionRename { .. } => "session:rename",
            Self::ObjectAdded { .. } => "object:added",
            Self::ObjectModified { .. } => "object:modified",
            Self::ObjectRemoved { .. } => "object:removed",
            Self::Undo { .. } => "undo",
            Self::Redo { .. } => "redo",
            Self::Sync => "sync",
        }
    }

    /// Session this event addresses, if any.
    #[must_use]
    pub fn session_id(&self) -> Option<Uuid> {
        match self {
            Self::SessionCreate { session_id, .. }
            | Self::SessionActive { session_id }
            | Self::SessionRemove { session_id }
            | Self::SessionRename { session_id, .. }
            | Self::ObjectAdded { session_id, .. }
            | Self::ObjectModified { session_id, .. }
            | Self::ObjectRemoved { session_id, .. }
            | Self::Undo { session_id }
            | Self::Redo { session_id } => Some(*session_id),
            Self::Sync => None,
        }
    }

    /// Encode this event as an outbound [`Frame`].
    #[must_use]
    pub fn to_frame(&self) -> Frame {
        let data = match self {
            Self::SessionCreate { name, .. } | Self::SessionRename { name, .. } => {
                json!({ "name": name })
            }
            Self::ObjectAdded { object_id, .. }
            | Self::ObjectModified { object_id, .. }
            | Self::ObjectRemoved { object_id, .. } => {
                json!({ "object_id": object_id.to_string() })
            }
            _ => json!({}),
        };

        let frame = Frame::new(self.name(), data);
        match self.session_id() {
            Some(sid) => frame.with_session_id(sid.to_string()),
            None => frame,
        }
    }

    /// Decode a [`Frame`] into a typed event.
    ///
    /// # Errors
    ///
    /// Returns a [`ProtocolError`] when the event name is unknown, a
    /// required session or payload field is missing, or an id fails to
    /// parse as a UUID.
    pub fn from_frame(frame: &Frame) -> Result<Self, ProtocolError> {
        match frame.event.as_str() {
            "session:create" => Ok(Self::SessionCreate {
                session_id: envelope_session(frame, "session:create")?,
                name: data_str(frame, "session:create", "name")?,
            }),
            "session:active" => Ok(Self::SessionActive {
                session_id: envelope_session(frame, "session:active")?,
            }),
            "session:remove" => Ok(Self::SessionRemove {
                session_id: envelope_session(frame, "session:remove")?,
            }),
            "session:rename" => Ok(Self::SessionRename {
                session_id: envelope_session(frame, "session:rename")?,
                name: data_str(frame, "session:rename", "name")?,
            }),
            "object:added" => Ok(Self::ObjectAdded {
                session_id: envelope_session(frame, "object:added")?,
                object_id: data_id(frame, "object:added", "object_id")?,
            }),
            "object:modified" => Ok(Self::ObjectModified {
                session_id: envelope_session(frame, "object:modified")?,
                object_id: data_id(frame, "object:modified", "object_id")?,
            }),
            "object:removed" => Ok(Self::ObjectRemoved {
                session_id: envelope_session(frame, "object:removed")?,
                object_id: data_id(frame, "object:removed", "object_id")?,
            }),
            "undo" => Ok(Self::Undo { session_id: envelope_session(frame, "undo")? }),
            "redo" => Ok(Self::Redo { session_id: envelope_session(frame, "redo")? }),
            "sync" => Ok(Self::Sync),
            other => Err(ProtocolError::UnknownEvent(other.to_string())),
        }
    }
}

fn envelope_session(frame: &Frame, event: &'static str) -> Result<Uuid, ProtocolError> {
    let Some(raw) = frame.session_id.as_deref() else {
        return Err(ProtocolError::MissingSession(event));
    };
    raw.parse()
        .map_err(|_| ProtocolError::BadId { event, field: "session_id" })
}

fn data_str(frame: &Frame, event: &'static str, field: &'static str) -> Result<String, ProtocolError> {
    frame
        .data
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or(ProtocolError::MissingField { event, field })
}

fn data_id(frame: &Frame, event: &'static str, field: &'static str) -> Result<Uuid, ProtocolError> {
    let raw = data_str(frame, event, field)?;
    raw.parse().map_err(|_| ProtocolError::BadId { event, field })
}
