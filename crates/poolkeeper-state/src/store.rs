//! SnapshotStore — durable JSON snapshot of the slot table.
//!
//! The whole table is one JSON document keyed by stringified slot id.
//! Every write replaces the document wholesale: the new contents go to a
//! temporary file in the same directory, are synced, and then renamed over
//! the old file, so a concurrent reader sees either the previous or the new
//! document and never a truncated one.

use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{StateError, StateResult};
use crate::types::{Slot, SlotId};

/// In-memory slot table, ordered by id (which is also registration order).
pub type SlotTable = BTreeMap<SlotId, Slot>;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Where the slot table is persisted. `None` keeps everything in memory.
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    path: Option<PathBuf>,
}

impl SnapshotStore {
    /// Persist to the JSON document at `path`.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// No durable storage (for testing and previews).
    pub fn in_memory() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Read the persisted table. A missing file yields an empty table.
    pub fn load(&self) -> StateResult<SlotTable> {
        let Some(path) = &self.path else {
            return Ok(SlotTable::new());
        };

        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(?path, "no pool snapshot yet, starting empty");
                return Ok(SlotTable::new());
            }
            Err(e) => return Err(StateError::Load(format!("{}: {e}", path.display()))),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(SlotTable::new());
        }

        let table: SlotTable = serde_json::from_slice(&bytes).map_err(map_err!(Deserialize))?;
        debug!(?path, slots = table.len(), "pool snapshot loaded");
        Ok(table)
    }

    /// Atomically replace the persisted table with `table`.
    pub fn persist(&self, table: &SlotTable) -> StateResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let json = serde_json::to_vec_pretty(table).map_err(map_err!(Serialize))?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(map_err!(Persist))?;
        tmp.write_all(&json).map_err(map_err!(Persist))?;
        tmp.write_all(b"\n").map_err(map_err!(Persist))?;
        tmp.as_file().sync_all().map_err(map_err!(Persist))?;
        tmp.persist(path).map_err(|e| StateError::Persist(e.error.to_string()))?;

        debug!(?path, slots = table.len(), "pool snapshot written");
        Ok(())
    }
}
