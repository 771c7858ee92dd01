#![allow(clippy::float_cmp)]

use serde_json::json;
use uuid::Uuid;

use super::*;

fn make_object(kind: ObjectKind, z: i64) -> BoardObject {
    BoardObject {
        id: Uuid::new_v4(),
        kind,
        x: 0.0,
        y: 0.0,
        width: 100.0,
        height: 80.0,
        rotation: 0.0,
        z_index: z,
        props: json!({}),
        version: 1,
    }
}

// =============================================================
// ObjectKind serde
// =============================================================

#[test]
fn kind_serde_all_variants() {
    let cases = [
        (ObjectKind::Path, "\"path\""),
        (ObjectKind::Rect, "\"rect\""),
        (ObjectKind::Ellipse, "\"ellipse\""),
        (ObjectKind::Line, "\"line\""),
        (ObjectKind::Text, "\"text\""),
    ];
    for (kind, expected) in cases {
        assert_eq!(serde_json::to_string(&kind).unwrap(), expected);
        let back: ObjectKind = serde_json::from_str(expected).unwrap();
        assert_eq!(back, kind);
    }
}

#[test]
fn kind_deserialize_invalid_rejects() {
    assert!(serde_json::from_str::<ObjectKind>("\"hexagon\"").is_err());
}

// =============================================================
// BoardObject construction and serde
// =============================================================

#[test]
fn unassigned_starts_with_nil_id() {
    let obj = BoardObject::unassigned(ObjectKind::Rect, 1.0, 2.0, 30.0, 40.0);
    assert!(obj.needs_id());
    assert_eq!(obj.x, 1.0);
    assert_eq!(obj.y, 2.0);
    assert_eq!(obj.width, 30.0);
    assert_eq!(obj.height, 40.0);
    assert_eq!(obj.version, 1);
    assert_eq!(obj.props, json!({}));
}

#[test]
fn assigned_object_does_not_need_id() {
    let obj = make_object(ObjectKind::Ellipse, 0);
    assert!(!obj.needs_id());
}

#[test]
fn board_object_serde_roundtrip() {
    let mut obj = make_object(ObjectKind::Text, 3);
    obj.props = json!({"text": "hello", "font_size": 18.0});
    let serialized = serde_json::to_string(&obj).unwrap();
    let back: BoardObject = serde_json::from_str(&serialized).unwrap();
    assert_eq!(back, obj);
}

#[test]
fn kind_serializes_lowercase() {
    let obj = make_object(ObjectKind::Path, 0);
    let serialized = serde_json::to_string(&obj).unwrap();
    assert!(serialized.contains("\"path\""));
    assert!(!serialized.contains("\"Path\""));
}

// =============================================================
// apply (sparse updates)
// =============================================================

#[test]
fn apply_geometry_fields() {
    let mut obj = make_object(ObjectKind::Rect, 0);
    let ok = obj.apply(&PartialBoardObject {
        x: Some(50.0),
        y: Some(60.0),
        width: Some(200.0),
        height: Some(150.0),
        rotation: Some(45.0),
        z_index: Some(7),
        ..Default::default()
    });
    assert!(ok);
    assert_eq!(obj.x, 50.0);
    assert_eq!(obj.y, 60.0);
    assert_eq!(obj.width, 200.0);
    assert_eq!(obj.height, 150.0);
    assert_eq!(obj.rotation, 45.0);
    assert_eq!(obj.z_index, 7);
}

#[test]
fn apply_bumps_version() {
    let mut obj = make_object(ObjectKind::Rect, 0);
    obj.apply(&PartialBoardObject { x: Some(1.0), ..Default::default() });
    assert_eq!(obj.version, 2);
    obj.apply(&PartialBoardObject::default());
    assert_eq!(obj.version, 3);
}

#[test]
fn apply_empty_changes_nothing_else() {
    let mut obj = make_object(ObjectKind::Rect, 0);
    obj.apply(&PartialBoardObject::default());
    assert_eq!(obj.x, 0.0);
    assert_eq!(obj.width, 100.0);
}

#[test]
fn apply_props_merges_and_null_deletes() {
    let mut obj = make_object(ObjectKind::Rect, 0);
    obj.props = json!({"fill": "#FF0000", "stroke": "#000", "text": "old"});

    obj.apply(&PartialBoardObject {
        props: Some(json!({
            "fill": "#00FF00",
            "stroke": null,
            "font_size": 14.0
        })),
        ..Default::default()
    });

    assert_eq!(obj.props["fill"], "#00FF00");
    assert!(obj.props.get("stroke").is_none());
    assert_eq!(obj.props["text"], "old");
    assert_eq!(obj.props["font_size"], 14.0);
}

#[test]
fn apply_props_initializes_non_object_props() {
    let mut obj = make_object(ObjectKind::Rect, 0);
    obj.props = json!(null);
    assert!(obj.apply(&PartialBoardObject {
        props: Some(json!({"fill": "#123"})),
        ..Default::default()
    }));
    assert_eq!(obj.props["fill"], "#123");
}

#[test]
fn apply_non_object_props_patch_returns_false() {
    let mut obj = make_object(ObjectKind::Rect, 0);
    assert!(!obj.apply(&PartialBoardObject { props: Some(json!(42)), ..Default::default() }));
}

#[test]
fn partial_skips_none_fields_in_serialization() {
    let p = PartialBoardObject { x: Some(10.0), ..Default::default() };
    let serialized = serde_json::to_string(&p).unwrap();
    assert!(serialized.contains("\"x\""));
    assert!(!serialized.contains("\"y\""));
    assert!(!serialized.contains("\"props\""));
}

// =============================================================
// contains
// =============================================================

#[test]
fn contains_inside_and_edges() {
    let obj = make_object(ObjectKind::Rect, 0);
    assert!(obj.contains(50.0, 40.0));
    assert!(obj.contains(0.0, 0.0));
    assert!(obj.contains(100.0, 80.0));
}

#[test]
fn contains_outside() {
    let obj = make_object(ObjectKind::Rect, 0);
    assert!(!obj.contains(-0.1, 40.0));
    assert!(!obj.contains(50.0, 80.1));
}

// =============================================================
// Props
// =============================================================

#[test]
fn props_defaults_on_empty_bag() {
    let value = json!({});
    let p = Props::new(&value);
    assert_eq!(p.fill(), "transparent");
    assert_eq!(p.stroke(), "#000000");
    assert_eq!(p.stroke_width(), 2.0);
    assert_eq!(p.text(), "");
    assert_eq!(p.font_size(), None);
    assert!(p.points().is_empty());
}

#[test]
fn props_reads_all_values() {
    let value = json!({
        "fill": "#AABBCC",
        "stroke": "#112233",
        "stroke_width": 3.5,
        "text": "Body",
        "font_size": 22.0,
        "points": [[0.0, 0.0], [3.0, 4.0]]
    });
    let p = Props::new(&value);
    assert_eq!(p.fill(), "#AABBCC");
    assert_eq!(p.stroke(), "#112233");
    assert_eq!(p.stroke_width(), 3.5);
    assert_eq!(p.text(), "Body");
    assert_eq!(p.font_size(), Some(22.0));
    assert_eq!(p.points(), vec![(0.0, 0.0), (3.0, 4.0)]);
}

#[test]
fn props_wrong_type_uses_default() {
    let value = json!({"fill": 42, "stroke_width": "thick"});
    let p = Props::new(&value);
    assert_eq!(p.fill(), "transparent");
    assert_eq!(p.stroke_width(), 2.0);
}

#[test]
fn props_integer_coerces_to_float() {
    let value = json!({"stroke_width": 2, "font_size": 24});
    let p = Props::new(&value);
    assert_eq!(p.stroke_width(), 2.0);
    assert_eq!(p.font_size(), Some(24.0));
}

#[test]
fn props_malformed_points_yield_empty() {
    let value = json!({"points": [[0.0, 1.0], ["a", "b"]]});
    assert!(Props::new(&value).points().is_empty());

    let value = json!({"points": "not-a-list"});
    assert!(Props::new(&value).points().is_empty());

    let value = json!({"points": [[1.0]]});
    assert!(Props::new(&value).points().is_empty());
}
