#![allow(clippy::float_cmp)]

use serde_json::json;
use uuid::Uuid;

use super::*;
use crate::object::ObjectKind;

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

fn make_object_at(x: f64, y: f64, w: f64, h: f64, z: i64) -> BoardObject {
    let mut obj = make_object(ObjectKind::Rect, z);
    obj.x = x;
    obj.y = y;
    obj.width = w;
    obj.height = h;
    obj
}

// =============================================================
// add / get / remove
// =============================================================

#[test]
fn new_surface_is_empty() {
    let surface = MemSurface::new();
    assert!(surface.is_empty());
    assert_eq!(surface.len(), 0);
}

#[test]
fn add_and_get() {
    let mut surface = MemSurface::new();
    let obj = make_object(ObjectKind::Rect, 0);
    let id = obj.id;
    surface.add(obj);
    assert_eq!(surface.len(), 1);
    assert_eq!(surface.get(&id).unwrap().id, id);
}

#[test]
fn add_same_id_overwrites() {
    let mut surface = MemSurface::new();
    let mut obj = make_object(ObjectKind::Rect, 0);
    let id = obj.id;
    surface.add(obj.clone());
    obj.x = 999.0;
    surface.add(obj);
    assert_eq!(surface.len(), 1);
    assert_eq!(surface.get(&id).unwrap().x, 999.0);
}

#[test]
fn remove_returns_object() {
    let mut surface = MemSurface::new();
    let obj = make_object(ObjectKind::Rect, 0);
    let id = obj.id;
    surface.add(obj);
    let removed = surface.remove(&id);
    assert_eq!(removed.unwrap().id, id);
    assert!(surface.is_empty());
}

#[test]
fn remove_missing_returns_none() {
    let mut surface = MemSurface::new();
    assert!(surface.remove(&Uuid::new_v4()).is_none());
}

#[test]
fn get_mut_allows_in_place_edit() {
    let mut surface = MemSurface::new();
    let obj = make_object(ObjectKind::Rect, 0);
    let id = obj.id;
    surface.add(obj);
    surface.get_mut(&id).unwrap().x = 42.0;
    assert_eq!(surface.get(&id).unwrap().x, 42.0);
}

#[test]
fn clear_removes_everything() {
    let mut surface = MemSurface::new();
    surface.add(make_object(ObjectKind::Rect, 0));
    surface.add(make_object(ObjectKind::Ellipse, 1));
    surface.clear();
    assert!(surface.is_empty());
}

// =============================================================
// draw order
// =============================================================

#[test]
fn objects_sorted_by_z_then_id() {
    let mut surface = MemSurface::new();
    surface.add(make_object(ObjectKind::Rect, 3));
    surface.add(make_object(ObjectKind::Ellipse, 1));
    surface.add(make_object(ObjectKind::Line, 2));

    let sorted = surface.objects();
    assert_eq!(sorted[0].z_index, 1);
    assert_eq!(sorted[1].z_index, 2);
    assert_eq!(sorted[2].z_index, 3);
}

#[test]
fn objects_tiebreak_by_id() {
    let mut surface = MemSurface::new();
    let id_low = Uuid::parse_str("00000000-0000-0000-0000-000000000001").unwrap();
    let id_high = Uuid::parse_str("ffffffff-ffff-ffff-ffff-ffffffffffff").unwrap();

    let mut a = make_object(ObjectKind::Rect, 1);
    a.id = id_high;
    let mut b = make_object(ObjectKind::Rect, 1);
    b.id = id_low;

    surface.add(a);
    surface.add(b);

    let sorted = surface.objects();
    assert_eq!(sorted[0].id, id_low);
    assert_eq!(sorted[1].id, id_high);
}

// =============================================================
// hit-testing
// =============================================================

#[test]
fn hit_test_misses_empty_space() {
    let mut surface = MemSurface::new();
    surface.add(make_object_at(10.0, 10.0, 20.0, 20.0, 0));
    assert!(surface.hit_test(500.0, 500.0).is_none());
}

#[test]
fn hit_test_finds_containing_object() {
    let mut surface = MemSurface::new();
    let obj = make_object_at(10.0, 10.0, 20.0, 20.0, 0);
    let id = obj.id;
    surface.add(obj);
    assert_eq!(surface.hit_test(15.0, 15.0), Some(id));
}

#[test]
fn hit_test_prefers_top_most() {
    let mut surface = MemSurface::new();
    let below = make_object_at(0.0, 0.0, 100.0, 100.0, 1);
    let above = make_object_at(0.0, 0.0, 100.0, 100.0, 2);
    let above_id = above.id;
    surface.add(below);
    surface.add(above);
    assert_eq!(surface.hit_test(50.0, 50.0), Some(above_id));
}

// =============================================================
// serialize / enliven
// =============================================================

#[test]
fn serialize_roundtrips_through_enliven() {
    let mut surface = MemSurface::new();
    let a = make_object(ObjectKind::Rect, 1);
    let b = make_object(ObjectKind::Text, 2);
    let (a_id, b_id) = (a.id, b.id);
    surface.add(a);
    surface.add(b);

    let snapshot = surface.serialize();

    let mut restored = MemSurface::new();
    let loaded = restored.enliven(&snapshot).unwrap();
    assert_eq!(loaded, 2);
    assert!(restored.get(&a_id).is_some());
    assert!(restored.get(&b_id).is_some());
}

#[test]
fn serialize_lists_objects_in_draw_order() {
    let mut surface = MemSurface::new();
    surface.add(make_object(ObjectKind::Rect, 2));
    surface.add(make_object(ObjectKind::Rect, 1));

    let snapshot = surface.serialize();
    let list = snapshot["objects"].as_array().unwrap();
    assert_eq!(list[0]["z_index"], 1);
    assert_eq!(list[1]["z_index"], 2);
}

#[test]
fn enliven_replaces_existing_content() {
    let mut surface = MemSurface::new();
    let stale = make_object(ObjectKind::Rect, 0);
    let stale_id = stale.id;
    surface.add(stale);

    let fresh = make_object(ObjectKind::Ellipse, 0);
    let fresh_id = fresh.id;
    let snapshot = json!({ "objects": [fresh] });

    surface.enliven(&snapshot).unwrap();
    assert!(surface.get(&stale_id).is_none());
    assert!(surface.get(&fresh_id).is_some());
    assert_eq!(surface.len(), 1);
}

#[test]
fn enliven_skips_undecodable_entries() {
    let good = make_object(ObjectKind::Rect, 0);
    let good_id = good.id;
    let snapshot = json!({ "objects": [good, {"kind": "rect"}, 42] });

    let mut surface = MemSurface::new();
    let loaded = surface.enliven(&snapshot).unwrap();
    assert_eq!(loaded, 1);
    assert_eq!(surface.len(), 1);
    assert!(surface.get(&good_id).is_some());
}

#[test]
fn enliven_bad_shape_is_error_and_preserves_content() {
    let mut surface = MemSurface::new();
    let obj = make_object(ObjectKind::Rect, 0);
    let id = obj.id;
    surface.add(obj);

    assert!(matches!(surface.enliven(&json!("nope")), Err(EnlivenError::BadShape)));
    assert!(matches!(surface.enliven(&json!({"items": []})), Err(EnlivenError::BadShape)));
    assert!(surface.get(&id).is_some());
}

#[test]
fn enliven_empty_list_clears() {
    let mut surface = MemSurface::new();
    surface.add(make_object(ObjectKind::Rect, 0));
    let loaded = surface.enliven(&json!({"objects": []})).unwrap();
    assert_eq!(loaded, 0);
    assert!(surface.is_empty());
}

// =============================================================
// decode_object
// =============================================================

#[test]
fn decode_object_accepts_full_record() {
    let obj = make_object(ObjectKind::Line, 5);
    let value = serde_json::to_value(&obj).unwrap();
    let back = decode_object(&value).unwrap();
    assert_eq!(back, obj);
}

#[test]
fn decode_object_rejects_partial_record() {
    let result = decode_object(&json!({"kind": "rect", "x": 1.0}));
    assert!(matches!(result, Err(EnlivenError::BadObject(_))));
}

#[test]
fn render_is_a_noop_for_mem_surface() {
    let mut surface = MemSurface::new();
    surface.add(make_object(ObjectKind::Rect, 0));
    surface.render();
    assert_eq!(surface.len(), 1);
}
