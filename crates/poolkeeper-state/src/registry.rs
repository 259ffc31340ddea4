//! SlotRegistry — the shared, persisted set of worker slots.
//!
//! The registry owns every [`Slot`] record. Readers take a shared lock;
//! every mutation runs its whole read-decide-mutate-persist sequence under
//! the exclusive lock, so writers are serialized and the snapshot on disk
//! always reflects one complete mutation.
//!
//! When a snapshot write fails the in-memory table keeps the mutation and
//! stays authoritative for this process. Disk is stale until the next
//! successful write.

use std::path::Path;
use std::sync::{Arc, RwLock};

use tracing::{debug, error, info};

use crate::error::{StateError, StateResult};
use crate::store::{SlotTable, SnapshotStore};
use crate::types::{NewSlot, Slot, SlotId, SlotRecord};

/// Outcome of removing a slot by location. Not finding one is a normal result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Removal {
    Removed(SlotRecord),
    NotFound,
}

/// Thread-safe slot registry. Clones share the same table.
#[derive(Clone)]
pub struct SlotRegistry {
    table: Arc<RwLock<SlotTable>>,
    store: SnapshotStore,
}

impl SlotRegistry {
    /// Open the registry persisted at `path`, creating an empty one if absent.
    pub fn open(path: &Path) -> StateResult<Self> {
        let store = SnapshotStore::file(path);
        let table = store.load()?;
        info!(?path, slots = table.len(), "slot registry opened");
        Ok(Self {
            table: Arc::new(RwLock::new(table)),
            store,
        })
    }

    /// Create an empty registry without durable storage.
    pub fn in_memory() -> Self {
        Self::with_slots(std::iter::empty())
    }

    /// Create an in-memory registry pre-populated with the given slots.
    pub fn with_slots(slots: impl IntoIterator<Item = (SlotId, Slot)>) -> Self {
        Self {
            table: Arc::new(RwLock::new(slots.into_iter().collect())),
            store: SnapshotStore::in_memory(),
        }
    }

    // ── Reads ──────────────────────────────────────────────────────

    /// Look up a slot by id.
    pub fn get(&self, id: SlotId) -> StateResult<Slot> {
        self.read(|table| table.get(&id).cloned())
            .ok_or_else(|| StateError::NotFound(format!("slot {id}")))
    }

    /// Snapshot of every slot, in registry order.
    pub fn list(&self) -> Vec<SlotRecord> {
        self.read(|table| {
            table
                .iter()
                .map(|(&id, slot)| SlotRecord {
                    id,
                    slot: slot.clone(),
                })
                .collect()
        })
    }

    /// Copy of the raw id → slot table.
    pub fn snapshot(&self) -> SlotTable {
        self.read(|table| table.clone())
    }

    pub fn len(&self) -> usize {
        self.read(|table| table.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `f` against the table under the shared lock.
    pub fn read<R>(&self, f: impl FnOnce(&SlotTable) -> R) -> R {
        let table = self.table.read().expect("slot table lock");
        f(&table)
    }

    // ── Writes ─────────────────────────────────────────────────────

    /// Register a new slot with zero load and persist it.
    pub fn add(&self, new: NewSlot) -> StateResult<SlotRecord> {
        new.validate()?;
        self.update(|table| -> StateResult<SlotRecord> {
            let id = next_id(table)?;
            let slot = new.into_slot();
            table.insert(id, slot.clone());
            info!(
                slot = id,
                hostname = %slot.hostname,
                port = slot.port,
                maxload = slot.maxload,
                "slot registered"
            );
            Ok(SlotRecord { id, slot })
        })
    }

    /// Remove the first slot (in registry order) at `hostname`/`datadir`.
    pub fn remove_by_location(&self, hostname: &str, datadir: &str) -> StateResult<Removal> {
        self.mutate(|table| -> StateResult<(Removal, bool)> {
            let found = table
                .iter()
                .find(|(_, slot)| slot.is_at(hostname, datadir))
                .map(|(&id, _)| id);

            let Some(id) = found else {
                debug!(hostname, datadir, "no slot at location");
                return Ok((Removal::NotFound, false));
            };

            let Some(slot) = table.remove(&id) else {
                return Ok((Removal::NotFound, false));
            };
            info!(slot = id, hostname, datadir, "slot removed");
            Ok((Removal::Removed(SlotRecord { id, slot }), true))
        })
    }

    /// Apply `f` under the exclusive lock and persist the result.
    ///
    /// `f` must leave the table untouched when it returns an error.
    pub fn update<R, E>(&self, f: impl FnOnce(&mut SlotTable) -> Result<R, E>) -> Result<R, E>
    where
        E: From<StateError>,
    {
        self.mutate(|table| f(table).map(|r| (r, true)))
    }

    /// Like [`update`](Self::update), but `f` reports whether it changed
    /// anything; unchanged tables are not rewritten.
    pub fn mutate<R, E>(
        &self,
        f: impl FnOnce(&mut SlotTable) -> Result<(R, bool), E>,
    ) -> Result<R, E>
    where
        E: From<StateError>,
    {
        let mut table = self.table.write().expect("slot table lock");
        let (result, dirty) = f(&mut table)?;
        if dirty {
            self.store.persist(&table).map_err(|e| {
                error!(error = %e, "slot registry diverged from its snapshot");
                E::from(e)
            })?;
        }
        Ok(result)
    }

    /// Rewrite the snapshot from the current in-memory table.
    pub fn persist(&self) -> StateResult<()> {
        let table = self.table.read().expect("slot table lock");
        self.store.persist(&table)
    }

    /// Replace the in-memory table with the persisted snapshot.
    pub fn reload(&self) -> StateResult<()> {
        let loaded = self.store.load()?;
        let mut table = self.table.write().expect("slot table lock");
        *table = loaded;
        Ok(())
    }
}

/// Next unused id: one past the highest id currently in the table.
fn next_id(table: &SlotTable) -> StateResult<SlotId> {
    match table.keys().next_back() {
        None => Ok(1),
        Some(&max) => max
            .checked_add(1)
            .ok_or_else(|| StateError::Validation("slot id space exhausted".into())),
    }
}
