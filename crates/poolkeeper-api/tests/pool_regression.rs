//! Pool keeper regression tests.
//!
//! Drives the boundary operations against an on-disk registry: persistence
//! across restarts, the allocate/release round trip, and concurrent
//! callers sharing one registry.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use poolkeeper_api::*;
use poolkeeper_state::{SlotRegistry, SlotTable, SlotView};
use serde_json::json;

fn open_api(path: &Path) -> PoolApi {
    PoolApi::new(SlotRegistry::open(path).unwrap())
}

fn add_slots(api: &PoolApi, loads_and_caps: &[u32]) {
    for (i, &maxload) in loads_and_caps.iter().enumerate() {
        let reply = api.dispatch(
            Operation::AddSlot,
            json!({
                "hostname": "gpadmin",
                "port": 7002 + i,
                "datadir": format!("/home/gpadmin/datadirs/vmpool/dbfast{}", i + 1),
                "maxload": maxload,
            }),
        );
        assert_eq!(reply.status, 201);
    }
}

fn loads(api: &PoolApi) -> Vec<u32> {
    api.list_slots().values().map(|s| s.load).collect()
}

#[test]
fn registry_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pooldata.json");

    {
        let api = open_api(&path);
        add_slots(&api, &[10, 10, 10]);
        let reply = api.dispatch(
            Operation::AllocateCluster,
            json!({"coordinator": {"id": 3}, "executors": [{"id": 1}, {"id": 2}], "load": true}),
        );
        assert_eq!(reply.status, 200);
    }

    let api = open_api(&path);
    assert_eq!(loads(&api), vec![1, 1, 0]);

    // The next id continues after the persisted ones.
    add_slots(&api, &[4]);
    assert!(api.list_slots().contains_key(&4));
}

#[test]
fn persisted_document_matches_layout() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pooldata.json");
    let api = open_api(&path);
    add_slots(&api, &[8]);

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(
        raw,
        json!({
            "1": {
                "hostname": "gpadmin",
                "port": 7002,
                "datadir": "/home/gpadmin/datadirs/vmpool/dbfast1",
                "maxload": 8,
                "load": 0
            }
        })
    );
}

#[test]
fn lowest_load_scenario_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pooldata.json");
    std::fs::write(
        &path,
        r#"{
            "1": {"hostname": "h", "port": 7001, "datadir": "/d1", "maxload": 10, "load": 5},
            "2": {"hostname": "h", "port": 7002, "datadir": "/d2", "maxload": 10, "load": 1},
            "3": {"hostname": "h", "port": 7003, "datadir": "/d3", "maxload": 10, "load": 8}
        }"#,
    )
    .unwrap();
    let api = open_api(&path);

    let views = api
        .allocate_cluster(AllocateClusterRequest {
            coordinator: SlotRef { id: 3 },
            executors: vec![Default::default(); 2],
            load: true,
        })
        .unwrap();

    let summary: Vec<_> = views.iter().map(|v| (v.id, v.content, v.load)).collect();
    assert_eq!(summary, vec![(2, 0, 2), (1, 1, 6), (3, -1, 8)]);

    let on_disk: SlotTable = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(on_disk[&1].load, 6);
    assert_eq!(on_disk[&2].load, 2);
    assert_eq!(on_disk[&3].load, 8);
}

#[test]
fn allocate_release_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let api = open_api(&dir.path().join("pooldata.json"));
    add_slots(&api, &[4, 4, 4, 4, 4]);

    // Skew the pool first.
    api.dispatch(
        Operation::AllocateCluster,
        json!({"coordinator": {"id": 1}, "executors": [{"id": 2}, {"id": 2}, {"id": 5}], "load": true}),
    );
    let before = loads(&api);

    let reply = api.dispatch(
        Operation::AllocateCluster,
        json!({"coordinator": {"id": 1}, "executors": [{}, {}, {"id": 2}], "load": true}),
    );
    assert_eq!(reply.status, 200);
    let views: Vec<SlotView> = serde_json::from_value(reply.body.data.unwrap()).unwrap();
    let executors: Vec<_> = views
        .iter()
        .filter(|v| !v.is_coordinator())
        .map(|v| json!({"id": v.id}))
        .collect();

    let reply = api.dispatch(
        Operation::ReleaseCluster,
        json!({"coordinator": {"id": 1}, "executors": executors}),
    );
    assert_eq!(reply.status, 200);
    assert_eq!(loads(&api), before);
}

#[test]
fn dry_run_does_not_rewrite_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pooldata.json");
    let api = open_api(&path);
    add_slots(&api, &[4, 4]);
    let before = std::fs::read_to_string(&path).unwrap();

    let reply = api.dispatch(
        Operation::AllocateCluster,
        json!({"coordinator": {"id": 1}, "executors": [{}, {}], "load": false}),
    );
    assert_eq!(reply.status, 200);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
}

/// Make every later snapshot write fail: the rename target becomes a directory.
fn block_snapshot(path: &Path) {
    if path.exists() {
        std::fs::remove_file(path).unwrap();
    }
    std::fs::create_dir(path).unwrap();
}

#[test]
fn failed_snapshot_write_reports_500_and_keeps_new_slot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pooldata.json");
    let api = open_api(&path);
    block_snapshot(&path);

    let reply = api.dispatch(
        Operation::AddSlot,
        json!({"hostname": "gpadmin", "port": 7002, "datadir": "/data/dbfast1", "maxload": 4}),
    );

    assert_eq!(reply.status, 500);
    assert!(!reply.body.success);
    assert!(reply.body.error.unwrap().contains("persist"));
    assert_eq!(api.registry().len(), 1);
    assert_eq!(api.get_slot(1).unwrap().slot.load, 0);
}

#[test]
fn failed_snapshot_write_keeps_charged_loads_in_memory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pooldata.json");
    let api = open_api(&path);
    add_slots(&api, &[4, 4, 4]);
    block_snapshot(&path);

    let reply = api.dispatch(
        Operation::AllocateCluster,
        json!({"coordinator": {"id": 3}, "executors": [{"id": 1}, {"id": 2}], "load": true}),
    );

    assert_eq!(reply.status, 500);
    assert!(!reply.body.success);
    assert!(reply.body.data.is_none());
    assert_eq!(loads(&api), vec![1, 1, 0]);

    // Once the snapshot is writable again the next mutation catches disk up.
    std::fs::remove_dir(&path).unwrap();
    let reply = api.dispatch(
        Operation::ReleaseCluster,
        json!({"coordinator": {"id": 3}, "executors": [{"id": 1}]}),
    );
    assert_eq!(reply.status, 200);
    let on_disk: SlotTable =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(on_disk.values().map(|s| s.load).collect::<Vec<_>>(), vec![0, 1, 0]);
}

#[test]
fn concurrent_clusters_leave_consistent_loads() {
    let dir = tempfile::tempdir().unwrap();
    let api = open_api(&dir.path().join("pooldata.json"));
    add_slots(&api, &[100; 6]);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let api = api.clone();
            thread::spawn(move || {
                for _ in 0..20 {
                    let views = api
                        .allocate_cluster(AllocateClusterRequest {
                            coordinator: SlotRef { id: 1 },
                            executors: vec![Default::default(); 3],
                            load: true,
                        })
                        .unwrap();
                    let release = ReleaseClusterRequest {
                        coordinator: SlotRef { id: 1 },
                        executors: views
                            .iter()
                            .filter(|v| !v.is_coordinator())
                            .map(|v| SlotRef { id: v.id })
                            .collect(),
                    };
                    api.release_cluster(&release).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(loads(&api), vec![0; 6]);
}

#[test]
fn readers_never_see_a_torn_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pooldata.json");
    let api = open_api(&path);
    add_slots(&api, &[50; 8]);

    let done = Arc::new(AtomicBool::new(false));
    let reader = {
        let done = done.clone();
        let path = path.clone();
        thread::spawn(move || {
            let mut reads = 0;
            loop {
                let text = std::fs::read_to_string(&path).unwrap();
                let table: SlotTable = serde_json::from_str(&text).unwrap();
                assert_eq!(table.len(), 8);
                reads += 1;
                if done.load(Ordering::Relaxed) {
                    break reads;
                }
            }
        })
    };

    for _ in 0..50 {
        api.dispatch(
            Operation::AllocateCluster,
            json!({"coordinator": {"id": 1}, "executors": [{}, {}], "load": true}),
        );
    }
    done.store(true, Ordering::Relaxed);

    assert!(reader.join().unwrap() > 0);
}
