//! Drawing-surface model for the collaborative whiteboard core.
//!
//! This crate defines what lives on a whiteboard — [`object::BoardObject`]
//! and friends — and the [`surface::DrawableSurface`] contract the sync core
//! draws against. The contract covers add/remove, draw-order iteration,
//! hit-testing, JSON serialization, and enlivening a surface back from a
//! serialized snapshot. [`surface::MemSurface`] is the in-memory reference
//! implementation; rendering backends implement the same trait and plug in
//! underneath the core unchanged.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`object`] | Board object types, sparse updates, typed props access |
//! | [`surface`] | The `DrawableSurface` trait and `MemSurface` |

pub mod object;
pub mod surface;
