use serde_json::json;
use uuid::Uuid;

use super::*;

// =============================================================
// Frame construction
// =============================================================

#[test]
fn new_sets_fresh_id_and_timestamp() {
    let frame = Frame::new("object:added", json!({}));
    assert!(Uuid::parse_str(&frame.id).is_ok());
    assert!(frame.ts > 0);
    assert!(frame.session_id.is_none());
    assert!(frame.from.is_none());
    assert_eq!(frame.event, "object:added");
}

#[test]
fn builders_attach_context() {
    let sid = Uuid::new_v4().to_string();
    let frame = Frame::new("undo", json!({}))
        .with_session_id(sid.clone())
        .with_from("client-7");
    assert_eq!(frame.session_id.as_deref(), Some(sid.as_str()));
    assert_eq!(frame.from.as_deref(), Some("client-7"));
}

#[test]
fn prefix_extraction() {
    let frame = Frame::new("session:create", json!({}));
    assert_eq!(frame.prefix(), "session");

    let frame = Frame::new("sync", json!({}));
    assert_eq!(frame.prefix(), "sync");
}

// =============================================================
// Protobuf round-trips
// =============================================================

#[test]
fn roundtrip_minimal_frame() {
    let frame = Frame::new("sync", json!({}));
    let bytes = encode_frame(&frame);
    let back = decode_frame(&bytes).unwrap();
    assert_eq!(back, frame);
}

#[test]
fn roundtrip_full_envelope() {
    let frame = Frame::new("object:added", json!({"object_id": "abc"}))
        .with_session_id("11111111-2222-3333-4444-555555555555")
        .with_from("peer-1");
    let bytes = encode_frame(&frame);
    let back = decode_frame(&bytes).unwrap();
    assert_eq!(back, frame);
}

#[test]
fn roundtrip_nested_payload() {
    let frame = Frame::new(
        "object:added",
        json!({
            "object": {
                "kind": "rect",
                "x": 10.5,
                "points": [[0.0, 0.0], [3.0, 4.0]],
                "selected": false,
                "label": null
            }
        }),
    );
    let bytes = encode_frame(&frame);
    let back = decode_frame(&bytes).unwrap();
    assert_eq!(back.data, frame.data);
}

#[test]
fn roundtrip_preserves_unicode_strings() {
    let frame = Frame::new("session:rename", json!({"name": "τάξη α' — φυσική"}));
    let back = decode_frame(&encode_frame(&frame)).unwrap();
    assert_eq!(back.data["name"], "τάξη α' — φυσική");
}

#[test]
fn decode_garbage_is_error() {
    let result = decode_frame(&[0xff, 0xfe, 0x01, 0x99, 0x42]);
    assert!(matches!(result, Err(CodecError::Decode(_))));
}

#[test]
fn decode_missing_data_defaults_to_empty_object() {
    // A frame whose payload was never set decodes to `{}`, not null.
    let wire = WireFrame {
        id: "f1".into(),
        ts: 1,
        session_id: None,
        from: None,
        event: "sync".into(),
        data: None,
    };
    let mut bytes = Vec::new();
    prost::Message::encode(&wire, &mut bytes).unwrap();

    let frame = decode_frame(&bytes).unwrap();
    assert_eq!(frame.data, json!({}));
}

// =============================================================
// now_ms
// =============================================================

#[test]
fn now_ms_is_monotonic_enough() {
    let a = now_ms();
    let b = now_ms();
    assert!(b >= a);
    // Sanity: later than 2020-01-01.
    assert!(a > 1_577_836_800_000);
}
