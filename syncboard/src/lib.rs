//! Real-time collaborative whiteboard synchronization core.
//!
//! A client-side library keeping multiple participants' drawing surfaces
//! consistent through a relay channel: each peer applies its own edits
//! optimistically, announces them as id-carrying events, and mirrors the
//! events it receives — fetching object snapshots from a shared persistence
//! backend — without ever echoing a mirrored edit back out. Undo/redo is a
//! per-session linear log whose navigation intent (not its operations) is
//! relayed, and a `sync` event rebuilds everything from persisted state.
//!
//! Synchronization is best-effort and eventually consistent: no vector
//! clocks, no operational transforms. Concurrent edits to one object resolve
//! last-write-wins; events referencing missing targets degrade to logged
//! no-ops.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`whiteboard`] | Controller: session set, relay dispatch, flush task |
//! | [`session`] | One board: surface bridge, modes, change stream |
//! | [`history`] | Linear undo/redo log |
//! | [`relay`] | Outbound relay channel seam |
//! | [`store`] | Persistence backend seam |
//! | [`consts`] | Tuning constants and env overrides |

pub mod consts;
pub mod history;
pub mod relay;
pub mod session;
pub mod store;
pub mod whiteboard;

pub use history::{HistoryAction, HistoryEntry, HistoryLog};
pub use relay::{ChannelRelay, RelayChannel};
pub use session::{InteractionMode, Session, SessionChange, SessionEvent};
pub use store::{Directory, MemStore, ObjectStore, SessionId, SessionRecord, StoreError};
pub use whiteboard::{Phase, Whiteboard, spawn_flush_task};
