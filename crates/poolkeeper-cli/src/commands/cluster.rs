use poolkeeper_api::{AllocateClusterRequest, ReleaseClusterRequest, SlotRef};
use poolkeeper_placement::ExecutorRef;

use super::{Options, api_failure, print_json};

/// Named executors first, in the order given, then `count` anonymous ones.
fn executor_refs(named: &[u32], count: usize) -> Vec<ExecutorRef> {
    named
        .iter()
        .map(|&id| ExecutorRef::named(id))
        .chain(std::iter::repeat_n(ExecutorRef::any(), count))
        .collect()
}

pub fn allocate(
    opts: &Options,
    coordinator: u32,
    named: &[u32],
    count: usize,
    dry_run: bool,
) -> anyhow::Result<()> {
    let api = opts.open()?;
    let members = api
        .allocate_cluster(AllocateClusterRequest {
            coordinator: SlotRef { id: coordinator },
            executors: executor_refs(named, count),
            load: !dry_run,
        })
        .map_err(api_failure)?;
    print_json(&members)
}

pub fn release(opts: &Options, coordinator: u32, executors: &[u32]) -> anyhow::Result<()> {
    let api = opts.open()?;
    let released = api
        .release_cluster(&ReleaseClusterRequest {
            coordinator: SlotRef { id: coordinator },
            executors: executors.iter().map(|&id| SlotRef { id }).collect(),
        })
        .map_err(api_failure)?;
    print_json(&released)
}
