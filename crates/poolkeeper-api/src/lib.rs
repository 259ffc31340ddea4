//! poolkeeper-api — boundary operations for the pool keeper.
//!
//! Transport-agnostic handlers over an injected [`SlotRegistry`]: each
//! operation takes a validated request and returns a serializable payload,
//! or an [`ApiError`] with the status a transport should report.
//!
//! # Operations
//!
//! | Operation | Request | Reply |
//! |---|---|---|
//! | `list-slots` | — | `{id: slot}` |
//! | `get-slot` | `{id}` | slot with id, or 404 |
//! | `add-slot` | `{hostname, port, datadir, maxload}` | 201, slot with id and `load: 0` |
//! | `remove-slot` | `{hostname, datadir}` | `{message}` (not found is not an error) |
//! | `allocate-cluster` | `{coordinator: {id}, executors: [{id?}], load}` | ordered slot views |
//! | `release-cluster` | `{coordinator: {id}, executors: [{id}]}` | post-release slots |
//!
//! [`SlotRegistry`]: poolkeeper_state::SlotRegistry

pub mod error;
pub mod handlers;
pub mod requests;

pub use error::{ApiError, ApiResult};
pub use handlers::{ApiResponse, Operation, PoolApi, RemovalReply, Reply};
pub use requests::{
    AddSlotRequest, AllocateClusterRequest, ReleaseClusterRequest, RemoveSlotRequest, SlotRef,
};
