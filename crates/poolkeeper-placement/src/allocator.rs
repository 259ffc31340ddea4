//! Cluster allocator — turns cluster requests into slot assignments.
//!
//! Given a coordinator and a list of executor references, the allocator:
//! 1. Picks executor slots, either the ones named in the request or the
//!    least-loaded slots in the registry
//! 2. Falls back from named slots to least-loaded ones when the named set
//!    is badly overloaded
//! 3. Charges one unit of load per executor (unless previewing) and
//!    appends the coordinator, which is never charged
//!
//! Every decision is made and committed under the registry's write lock.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use poolkeeper_state::{COORDINATOR_CONTENT, SlotId, SlotRecord, SlotRegistry, SlotTable, SlotView};

use crate::error::{AllocationError, AllocationResult};
use crate::selector::{lowest_load, prefer_fallback, projected_load_factor};

/// Default ratio by which a named selection's load factor must exceed the
/// fallback's before the named slots are abandoned.
pub const DEFAULT_FALLBACK_RATIO: f64 = 1.8;

/// Reference to an executor slot. `None` lets the allocator choose.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutorRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<SlotId>,
}

impl ExecutorRef {
    pub fn named(id: SlotId) -> Self {
        Self { id: Some(id) }
    }

    pub fn any() -> Self {
        Self { id: None }
    }
}

/// A request for one coordinator plus a set of executors.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterRequest {
    pub coordinator: SlotId,
    pub executors: Vec<ExecutorRef>,
    /// Charge executor load. `false` previews the assignment without
    /// touching any counter.
    pub consider_load: bool,
}

impl ClusterRequest {
    /// Request `count` executors chosen by load.
    pub fn anonymous(coordinator: SlotId, count: usize, consider_load: bool) -> Self {
        Self {
            coordinator,
            executors: vec![ExecutorRef::any(); count],
            consider_load,
        }
    }

    fn named_ids(&self) -> impl Iterator<Item = SlotId> + '_ {
        self.executors.iter().filter_map(|e| e.id)
    }

    fn has_named(&self) -> bool {
        self.named_ids().next().is_some()
    }
}

/// Which selection produced an assignment's executors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Slots named in the request (anonymous entries filled by load).
    Named,
    /// Least-loaded slots, because no slot was named.
    LowestLoad,
    /// Least-loaded slots, replacing an overloaded named selection.
    Fallback,
}

/// Resolved cluster: executors in content order, then the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterAssignment {
    pub strategy: Strategy,
    /// Worst `load / maxload` across the chosen executors.
    pub load_factor: f64,
    pub members: Vec<SlotView>,
}

impl ClusterAssignment {
    pub fn executors(&self) -> impl Iterator<Item = &SlotView> {
        self.members.iter().filter(|m| !m.is_coordinator())
    }

    pub fn coordinator(&self) -> Option<&SlotView> {
        self.members.iter().find(|m| m.is_coordinator())
    }
}

/// Tunables for executor selection.
#[derive(Debug, Clone)]
pub struct AllocationPolicy {
    pub fallback_ratio: f64,
}

impl Default for AllocationPolicy {
    fn default() -> Self {
        Self {
            fallback_ratio: DEFAULT_FALLBACK_RATIO,
        }
    }
}

/// Executor ids chosen for a request, before any load is charged.
#[derive(Debug, Clone)]
struct Selection {
    strategy: Strategy,
    slots: Vec<SlotId>,
    load_factor: f64,
}

/// Allocates and releases clusters against a shared slot registry.
#[derive(Clone)]
pub struct ClusterAllocator {
    registry: SlotRegistry,
    policy: AllocationPolicy,
}

impl ClusterAllocator {
    pub fn new(registry: SlotRegistry) -> Self {
        Self::with_policy(registry, AllocationPolicy::default())
    }

    pub fn with_policy(registry: SlotRegistry, policy: AllocationPolicy) -> Self {
        Self { registry, policy }
    }

    pub fn registry(&self) -> &SlotRegistry {
        &self.registry
    }

    pub fn policy(&self) -> &AllocationPolicy {
        &self.policy
    }

    /// Resolve a cluster request, charging executor load when requested.
    pub fn allocate(&self, req: &ClusterRequest) -> AllocationResult<ClusterAssignment> {
        validate(req)?;

        let assignment = if req.consider_load {
            self.registry.update(|table| -> AllocationResult<ClusterAssignment> {
                let selection = self.select(table, req)?;
                Ok(commit(table, selection, req.coordinator))
            })?
        } else {
            self.registry
                .read(|table| -> AllocationResult<ClusterAssignment> {
                    let selection = self.select(table, req)?;
                    Ok(observe(table, selection, req.coordinator))
                })?
        };

        info!(
            coordinator = req.coordinator,
            executors = assignment.members.len().saturating_sub(1),
            strategy = ?assignment.strategy,
            load_factor = assignment.load_factor,
            charged = req.consider_load,
            "cluster allocated"
        );
        Ok(assignment)
    }

    /// Resolve a cluster request without charging any load.
    pub fn preview(&self, req: &ClusterRequest) -> AllocationResult<ClusterAssignment> {
        let dry = ClusterRequest {
            consider_load: false,
            ..req.clone()
        };
        self.allocate(&dry)
    }

    /// Return executor slots to the pool, one unit of load each.
    ///
    /// All ids (executors and coordinator) are checked before anything is
    /// changed. A slot already at zero load stays at zero.
    pub fn release(
        &self,
        executors: &[SlotId],
        coordinator: SlotId,
    ) -> AllocationResult<Vec<SlotRecord>> {
        if executors.is_empty() {
            return Err(AllocationError::Validation(
                "at least one executor is required".into(),
            ));
        }

        let released = self
            .registry
            .mutate(|table| -> AllocationResult<(Vec<SlotRecord>, bool)> {
                ensure_known(table, executors.iter().copied().chain([coordinator]))?;

                let mut released = Vec::with_capacity(executors.len());
                for &id in executors {
                    let Some(slot) = table.get_mut(&id) else { continue };
                    if slot.load == 0 {
                        warn!(slot = id, "release without outstanding load, keeping load at zero");
                    } else {
                        slot.load -= 1;
                    }
                    released.push(SlotRecord {
                        id,
                        slot: slot.clone(),
                    });
                }
                let dirty = !released.is_empty();
                Ok((released, dirty))
            })?;

        info!(coordinator, executors = released.len(), "cluster released");
        Ok(released)
    }

    /// Choose executor slots for `req` without mutating the table.
    fn select(&self, table: &SlotTable, req: &ClusterRequest) -> AllocationResult<Selection> {
        ensure_known(table, req.named_ids().chain([req.coordinator]))?;

        let k = req.executors.len();

        if !req.has_named() {
            let slots = lowest_load(table, k, &HashSet::new());
            warn_if_short(k, slots.len());
            let load_factor = projected_load_factor(table, &slots, req.consider_load);
            return Ok(Selection {
                strategy: Strategy::LowestLoad,
                slots,
                load_factor,
            });
        }

        let named = named_selection(table, req);
        let named_factor = projected_load_factor(table, &named, req.consider_load);
        debug!(slots = ?named, load_factor = named_factor, "named selection");

        if named_factor > 1.0 {
            let fallback = lowest_load(table, k, &HashSet::new());
            let fallback_factor = projected_load_factor(table, &fallback, req.consider_load);
            debug!(slots = ?fallback, load_factor = fallback_factor, "fallback selection");

            if fallback.len() == k
                && prefer_fallback(named_factor, fallback_factor, self.policy.fallback_ratio)
            {
                info!(
                    named_load_factor = named_factor,
                    fallback_load_factor = fallback_factor,
                    "named slots overloaded, using least-loaded slots"
                );
                return Ok(Selection {
                    strategy: Strategy::Fallback,
                    slots: fallback,
                    load_factor: fallback_factor,
                });
            }
        }

        Ok(Selection {
            strategy: Strategy::Named,
            slots: named,
            load_factor: named_factor,
        })
    }
}

fn validate(req: &ClusterRequest) -> AllocationResult<()> {
    if req.executors.is_empty() {
        return Err(AllocationError::Validation(
            "at least one executor is required".into(),
        ));
    }
    check_executor_count(req.executors.len())
}

/// Executor content indices are `i32`; larger clusters cannot be numbered.
fn check_executor_count(count: usize) -> AllocationResult<()> {
    if i32::try_from(count).is_err() {
        return Err(AllocationError::Validation(format!(
            "{count} executors exceed the maximum of {}",
            i32::MAX
        )));
    }
    Ok(())
}

fn ensure_known(table: &SlotTable, ids: impl IntoIterator<Item = SlotId>) -> AllocationResult<()> {
    for id in ids {
        if !table.contains_key(&id) {
            return Err(AllocationError::SlotNotFound(id));
        }
    }
    Ok(())
}

/// Named ids in request order; anonymous entries take the least-loaded
/// slots that were not named anywhere in the request.
fn named_selection(table: &SlotTable, req: &ClusterRequest) -> Vec<SlotId> {
    let named: HashSet<SlotId> = req.named_ids().collect();
    let anonymous = req.executors.iter().filter(|e| e.id.is_none()).count();

    let mut fill = lowest_load(table, anonymous, &named).into_iter();
    let slots: Vec<SlotId> = req
        .executors
        .iter()
        .filter_map(|e| e.id.or_else(|| fill.next()))
        .collect();
    warn_if_short(req.executors.len(), slots.len());
    slots
}

fn warn_if_short(wanted: usize, got: usize) {
    if got < wanted {
        warn!(wanted, got, "not enough slots in the pool for every executor");
    }
}

/// Charge one unit of load per executor and build the member list.
fn commit(table: &mut SlotTable, selection: Selection, coordinator: SlotId) -> ClusterAssignment {
    let mut members = Vec::with_capacity(selection.slots.len() + 1);
    for (&id, content) in selection.slots.iter().zip(0_i32..) {
        let Some(slot) = table.get_mut(&id) else { continue };
        slot.load = slot.load.saturating_add(1);
        members.push(SlotView::new(id, content, slot));
    }
    finish(table, selection, coordinator, members)
}

/// Build the member list from current loads.
fn observe(table: &SlotTable, selection: Selection, coordinator: SlotId) -> ClusterAssignment {
    let members = selection
        .slots
        .iter()
        .zip(0_i32..)
        .filter_map(|(id, content)| {
            table
                .get(id)
                .map(|slot| SlotView::new(*id, content, slot))
        })
        .collect();
    finish(table, selection, coordinator, members)
}

fn finish(
    table: &SlotTable,
    selection: Selection,
    coordinator: SlotId,
    mut members: Vec<SlotView>,
) -> ClusterAssignment {
    if let Some(slot) = table.get(&coordinator) {
        members.push(SlotView::new(coordinator, COORDINATOR_CONTENT, slot));
    }
    ClusterAssignment {
        strategy: selection.strategy,
        load_factor: selection.load_factor,
        members,
    }
}
