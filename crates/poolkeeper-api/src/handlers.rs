//! Boundary operation handlers.
//!
//! Each handler validates its request, goes through the registry or the
//! allocator, and returns a serializable payload. [`PoolApi::dispatch`]
//! wraps the same handlers for transports that only carry an operation
//! name and a JSON body.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use poolkeeper_placement::{AllocationPolicy, ClusterAllocator, ClusterRequest};
use poolkeeper_state::{Removal, SlotId, SlotRecord, SlotRegistry, SlotTable, SlotView};

use crate::error::{ApiError, ApiResult};
use crate::requests::{
    AddSlotRequest, AllocateClusterRequest, ReleaseClusterRequest, RemoveSlotRequest, SlotRef,
    parse,
};

/// Response wrapper for consistent reply format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

/// A status code plus an enveloped JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub body: ApiResponse<Value>,
}

impl Reply {
    fn ok(status: u16, data: impl Serialize) -> ApiResult<Self> {
        let data = serde_json::to_value(data)
            .map_err(|e| ApiError::Internal(format!("failed to encode reply: {e}")))?;
        Ok(Self {
            status,
            body: ApiResponse::ok(data),
        })
    }

    fn error(e: &ApiError) -> Self {
        Self {
            status: e.status_code(),
            body: ApiResponse::err(e.to_string()),
        }
    }
}

/// Outcome of `remove_slot_by_location`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalReply {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removed: Option<SlotRecord>,
}

/// Names of the boundary operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ListSlots,
    GetSlot,
    AddSlot,
    RemoveSlot,
    AllocateCluster,
    ReleaseCluster,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::ListSlots,
        Operation::GetSlot,
        Operation::AddSlot,
        Operation::RemoveSlot,
        Operation::AllocateCluster,
        Operation::ReleaseCluster,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Operation::ListSlots => "list-slots",
            Operation::GetSlot => "get-slot",
            Operation::AddSlot => "add-slot",
            Operation::RemoveSlot => "remove-slot",
            Operation::AllocateCluster => "allocate-cluster",
            Operation::ReleaseCluster => "release-cluster",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.name() == s)
            .ok_or_else(|| ApiError::BadRequest(format!("unknown operation: {s}")))
    }
}

/// The pool keeper's boundary: one owned allocator over one registry.
#[derive(Clone)]
pub struct PoolApi {
    allocator: ClusterAllocator,
}

impl PoolApi {
    pub fn new(registry: SlotRegistry) -> Self {
        Self::with_policy(registry, AllocationPolicy::default())
    }

    pub fn with_policy(registry: SlotRegistry, policy: AllocationPolicy) -> Self {
        Self {
            allocator: ClusterAllocator::with_policy(registry, policy),
        }
    }

    pub fn registry(&self) -> &SlotRegistry {
        self.allocator.registry()
    }

    pub fn allocator(&self) -> &ClusterAllocator {
        &self.allocator
    }

    // ── Slots ──────────────────────────────────────────────────────

    /// Every slot keyed by id.
    pub fn list_slots(&self) -> SlotTable {
        self.registry().snapshot()
    }

    pub fn get_slot(&self, id: SlotId) -> ApiResult<SlotRecord> {
        let slot = self.registry().get(id)?;
        Ok(SlotRecord { id, slot })
    }

    /// Register a slot; the reply carries its id and zero load.
    pub fn add_slot(&self, req: AddSlotRequest) -> ApiResult<SlotRecord> {
        Ok(self.registry().add(req.into())?)
    }

    /// Remove the slot at a location. Not finding one is not an error.
    pub fn remove_slot_by_location(&self, req: &RemoveSlotRequest) -> ApiResult<RemovalReply> {
        let reply = match self
            .registry()
            .remove_by_location(&req.hostname, &req.datadir)?
        {
            Removal::Removed(record) => RemovalReply {
                message: "slot removed".to_string(),
                removed: Some(record),
            },
            Removal::NotFound => RemovalReply {
                message: "slot not found".to_string(),
                removed: None,
            },
        };
        Ok(reply)
    }

    // ── Clusters ───────────────────────────────────────────────────

    /// Resolve a cluster; executors in content order, coordinator last.
    pub fn allocate_cluster(&self, req: AllocateClusterRequest) -> ApiResult<Vec<SlotView>> {
        let req: ClusterRequest = req.into();
        let assignment = self.allocator.allocate(&req)?;
        debug!(
            strategy = ?assignment.strategy,
            load_factor = assignment.load_factor,
            "allocation reply"
        );
        Ok(assignment.members)
    }

    /// Return a cluster's executors to the pool.
    pub fn release_cluster(&self, req: &ReleaseClusterRequest) -> ApiResult<Vec<SlotRecord>> {
        Ok(self
            .allocator
            .release(&req.executor_ids(), req.coordinator.id)?)
    }

    // ── Dispatch ───────────────────────────────────────────────────

    /// Run an operation from its name and JSON payload.
    pub fn dispatch(&self, op: Operation, payload: Value) -> Reply {
        info!(operation = %op, "handling request");
        let reply = self.route(op, payload);
        reply.unwrap_or_else(|e| {
            debug!(operation = %op, status = e.status_code(), error = %e, "request failed");
            Reply::error(&e)
        })
    }

    fn route(&self, op: Operation, payload: Value) -> ApiResult<Reply> {
        match op {
            Operation::ListSlots => Reply::ok(200, self.list_slots()),
            Operation::GetSlot => {
                let slot: SlotRef = parse(payload)?;
                Reply::ok(200, self.get_slot(slot.id)?)
            }
            Operation::AddSlot => Reply::ok(201, self.add_slot(parse(payload)?)?),
            Operation::RemoveSlot => {
                let req: RemoveSlotRequest = parse(payload)?;
                Reply::ok(200, self.remove_slot_by_location(&req)?)
            }
            Operation::AllocateCluster => Reply::ok(200, self.allocate_cluster(parse(payload)?)?),
            Operation::ReleaseCluster => {
                let req: ReleaseClusterRequest = parse(payload)?;
                Reply::ok(200, self.release_cluster(&req)?)
            }
        }
    }
}
