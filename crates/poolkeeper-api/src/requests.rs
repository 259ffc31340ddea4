//! Request schemas for the boundary operations.
//!
//! Every payload is decoded into an explicit struct; missing fields and
//! fields the schema does not know are rejected before any state is read.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use poolkeeper_placement::{ClusterRequest, ExecutorRef};
use poolkeeper_state::{NewSlot, SlotId};

use crate::error::ApiResult;

/// Decode a JSON payload into a request schema.
pub fn parse<T: DeserializeOwned>(payload: serde_json::Value) -> ApiResult<T> {
    Ok(serde_json::from_value(payload)?)
}

/// A direct reference to a registered slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SlotRef {
    pub id: SlotId,
}

/// Body of `add_slot`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddSlotRequest {
    pub hostname: String,
    pub port: u16,
    pub datadir: String,
    pub maxload: u32,
}

impl From<AddSlotRequest> for NewSlot {
    fn from(req: AddSlotRequest) -> Self {
        NewSlot {
            hostname: req.hostname,
            port: req.port,
            datadir: req.datadir,
            maxload: req.maxload,
        }
    }
}

/// Body of `remove_slot_by_location`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoveSlotRequest {
    pub hostname: String,
    pub datadir: String,
}

/// Body of `allocate_cluster`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AllocateClusterRequest {
    pub coordinator: SlotRef,
    pub executors: Vec<ExecutorRef>,
    /// Charge executor load; `false` previews the assignment.
    pub load: bool,
}

impl From<AllocateClusterRequest> for ClusterRequest {
    fn from(req: AllocateClusterRequest) -> Self {
        ClusterRequest {
            coordinator: req.coordinator.id,
            executors: req.executors,
            consider_load: req.load,
        }
    }
}

/// Body of `release_cluster`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReleaseClusterRequest {
    pub coordinator: SlotRef,
    pub executors: Vec<SlotRef>,
}

impl ReleaseClusterRequest {
    pub fn executor_ids(&self) -> Vec<SlotId> {
        self.executors.iter().map(|e| e.id).collect()
    }
}
