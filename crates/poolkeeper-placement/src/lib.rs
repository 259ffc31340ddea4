//! poolkeeper-placement — cluster allocation over the slot registry.
//!
//! This crate decides which worker slots back a cluster's executors and
//! keeps the registry's load counters in step with those decisions. It does
//! NOT provision anything on the worker hosts; callers act on the returned
//! assignment.
//!
//! # Components
//!
//! - **`selector`** — Least-loaded top-k selection and load-factor math
//! - **`allocator`** — Named-slot and least-loaded strategies, fallback, release

pub mod allocator;
pub mod error;
pub mod selector;

pub use allocator::{
    AllocationPolicy, ClusterAllocator, ClusterAssignment, ClusterRequest, DEFAULT_FALLBACK_RATIO,
    ExecutorRef, Strategy,
};
pub use error::{AllocationError, AllocationResult};
pub use selector::{lowest_load, prefer_fallback, projected_load_factor};
