//! poolkeeper-state — the slot registry for the pool keeper.
//!
//! Holds every registered worker slot (location, capacity, current load)
//! and persists the full set as a single JSON document.
//!
//! # Architecture
//!
//! The [`SlotRegistry`] is `Clone` + `Send` + `Sync` (backed by
//! `Arc<RwLock<SlotTable>>`) and is passed explicitly to whoever needs it;
//! there is no process-wide instance. Durable storage is a
//! [`SnapshotStore`], which rewrites the document atomically on every
//! mutation.

pub mod error;
pub mod registry;
pub mod store;
pub mod types;

pub use error::{StateError, StateResult};
pub use registry::{Removal, SlotRegistry};
pub use store::{SlotTable, SnapshotStore};
pub use types::*;
