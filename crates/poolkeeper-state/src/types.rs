//! Domain types for the pool keeper slot registry.
//!
//! A [`Slot`] is one reusable database-worker capacity unit. Slots are
//! persisted as a JSON object keyed by the stringified slot id, so the
//! id itself is not part of the stored record.

use serde::{Deserialize, Serialize};

use crate::error::{StateError, StateResult};

/// Unique identifier for a slot, assigned at registration.
pub type SlotId = u32;

/// Content index reserved for the coordinator of a cluster.
pub const COORDINATOR_CONTENT: i32 = -1;

// ── Slot ──────────────────────────────────────────────────────────

/// Persisted record of a registered worker slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Slot {
    pub hostname: String,
    pub port: u16,
    /// Data directory of the worker's database instance on `hostname`.
    pub datadir: String,
    /// Advisory capacity ceiling. Always positive.
    pub maxload: u32,
    /// Number of executor assignments currently charged to this slot.
    pub load: u32,
}

impl Slot {
    /// Current `load / maxload` ratio.
    pub fn load_factor(&self) -> f64 {
        ratio(self.load, self.maxload)
    }

    /// Whether this slot lives at the given location.
    pub fn is_at(&self, hostname: &str, datadir: &str) -> bool {
        self.hostname == hostname && self.datadir == datadir
    }
}

/// `load / maxload`, treating a zero ceiling as fully saturated.
pub fn ratio(load: u32, maxload: u32) -> f64 {
    if maxload == 0 {
        return f64::INFINITY;
    }
    f64::from(load) / f64::from(maxload)
}

/// A slot together with its registry id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlotRecord {
    pub id: SlotId,
    #[serde(flatten)]
    pub slot: Slot,
}

// ── Registration ──────────────────────────────────────────────────

/// Location and capacity of a slot about to be registered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewSlot {
    pub hostname: String,
    pub port: u16,
    pub datadir: String,
    pub maxload: u32,
}

impl NewSlot {
    /// Reject registrations with empty locations or a zero ceiling.
    pub fn validate(&self) -> StateResult<()> {
        if self.hostname.trim().is_empty() {
            return Err(StateError::Validation("hostname must not be empty".into()));
        }
        if self.datadir.trim().is_empty() {
            return Err(StateError::Validation("datadir must not be empty".into()));
        }
        if self.maxload == 0 {
            return Err(StateError::Validation("maxload must be positive".into()));
        }
        Ok(())
    }

    /// Build the initial record with zero load.
    pub fn into_slot(self) -> Slot {
        Slot {
            hostname: self.hostname,
            port: self.port,
            datadir: self.datadir,
            maxload: self.maxload,
            load: 0,
        }
    }
}

// ── Cluster views ─────────────────────────────────────────────────

/// A slot as seen by a cluster member: location, position, and load at
/// the time it was resolved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlotView {
    pub id: SlotId,
    /// Position in the cluster; executors count from 0, the coordinator is -1.
    pub content: i32,
    pub port: u16,
    pub hostname: String,
    pub datadir: String,
    pub load: u32,
}

impl SlotView {
    pub fn new(id: SlotId, content: i32, slot: &Slot) -> Self {
        Self {
            id,
            content,
            port: slot.port,
            hostname: slot.hostname.clone(),
            datadir: slot.datadir.clone(),
            load: slot.load,
        }
    }

    pub fn is_coordinator(&self) -> bool {
        self.content == COORDINATOR_CONTENT
    }
}
