use serde_json::json;
use uuid::Uuid;

use super::*;

fn sid() -> Uuid {
    Uuid::parse_str("00000000-0000-0000-0000-0000000000aa").unwrap()
}

fn oid() -> Uuid {
    Uuid::parse_str("00000000-0000-0000-0000-0000000000bb").unwrap()
}

// =============================================================
// Event round-trips through frames
// =============================================================

#[test]
fn roundtrip_all_variants() {
    let cases = vec![
        RelayEvent::SessionCreate { session_id: sid(), name: "Lesson 1".into() },
        RelayEvent::SessionActive { session_id: sid() },
        RelayEvent::SessionRemove { session_id: sid() },
        RelayEvent::SessionRename { session_id: sid(), name: "Renamed".into() },
        RelayEvent::ObjectAdded { session_id: sid(), object_id: oid() },
        RelayEvent::ObjectModified { session_id: sid(), object_id: oid() },
        RelayEvent::ObjectRemoved { session_id: sid(), object_id: oid() },
        RelayEvent::Undo { session_id: sid() },
        RelayEvent::Redo { session_id: sid() },
        RelayEvent::Sync,
    ];

    for event in cases {
        let frame = event.to_frame();
        assert_eq!(frame.event, event.name());
        let back = RelayEvent::from_frame(&frame).unwrap();
        assert_eq!(back, event);
    }
}

#[test]
fn roundtrip_through_wire_bytes() {
    let event = RelayEvent::ObjectModified { session_id: sid(), object_id: oid() };
    let bytes = crate::encode_frame(&event.to_frame());
    let frame = crate::decode_frame(&bytes).unwrap();
    assert_eq!(RelayEvent::from_frame(&frame).unwrap(), event);
}

// =============================================================
// Envelope shape
// =============================================================

#[test]
fn session_events_carry_session_in_envelope() {
    let frame = RelayEvent::SessionActive { session_id: sid() }.to_frame();
    assert_eq!(frame.session_id.as_deref(), Some(sid().to_string().as_str()));
    assert_eq!(frame.data, json!({}));
}

#[test]
fn object_events_carry_object_in_payload() {
    let frame = RelayEvent::ObjectRemoved { session_id: sid(), object_id: oid() }.to_frame();
    assert_eq!(frame.data["object_id"], oid().to_string());
}

#[test]
fn sync_has_no_session() {
    let frame = RelayEvent::Sync.to_frame();
    assert!(frame.session_id.is_none());
    assert_eq!(RelayEvent::Sync.session_id(), None);
}

#[test]
fn active_addresses_by_id_not_position() {
    // The wire form must never carry a positional index; positions diverge
    // between peers under concurrent removal.
    let frame = RelayEvent::SessionActive { session_id: sid() }.to_frame();
    assert!(frame.data.get("index").is_none());
    assert!(frame.session_id.is_some());
}

// =============================================================
// Decode failures
// =============================================================

#[test]
fn unknown_event_rejected() {
    let frame = Frame::new("object:exploded", json!({}));
    let err = RelayEvent::from_frame(&frame).unwrap_err();
    assert!(matches!(err, ProtocolError::UnknownEvent(ref name) if name == "object:exploded"));
}

#[test]
fn missing_session_rejected() {
    let frame = Frame::new("undo", json!({}));
    assert!(matches!(
        RelayEvent::from_frame(&frame),
        Err(ProtocolError::MissingSession("undo"))
    ));
}

#[test]
fn bad_session_id_rejected() {
    let frame = Frame::new("redo", json!({})).with_session_id("not-a-uuid");
    assert!(matches!(
        RelayEvent::from_frame(&frame),
        Err(ProtocolError::BadId { field: "session_id", .. })
    ));
}

#[test]
fn missing_object_id_rejected() {
    let frame = Frame::new("object:added", json!({})).with_session_id(sid().to_string());
    assert!(matches!(
        RelayEvent::from_frame(&frame),
        Err(ProtocolError::MissingField { field: "object_id", .. })
    ));
}

#[test]
fn mistyped_object_id_rejected() {
    let frame =
        Frame::new("object:added", json!({"object_id": 42})).with_session_id(sid().to_string());
    assert!(matches!(
        RelayEvent::from_frame(&frame),
        Err(ProtocolError::MissingField { field: "object_id", .. })
    ));
}

#[test]
fn unparseable_object_id_rejected() {
    let frame = Frame::new("object:removed", json!({"object_id": "zzz"}))
        .with_session_id(sid().to_string());
    assert!(matches!(
        RelayEvent::from_frame(&frame),
        Err(ProtocolError::BadId { field: "object_id", .. })
    ));
}

#[test]
fn missing_name_rejected() {
    let frame = Frame::new("session:create", json!({})).with_session_id(sid().to_string());
    assert!(matches!(
        RelayEvent::from_frame(&frame),
        Err(ProtocolError::MissingField { field: "name", .. })
    ));
}

#[test]
fn error_display_is_descriptive() {
    let err = ProtocolError::MissingField { event: "session:create", field: "name" };
    assert_eq!(err.to_string(), "event session:create is missing field `name`");
}
