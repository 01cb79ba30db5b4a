//! Integration tests for concurrent recording
//!
//! Many pipeline workers share one tracker through an `Arc`. These tests
//! drive it from parallel tasks and check that no update is lost and that
//! the live snapshot ends on the final ledger state.

use std::collections::BTreeSet;
use std::sync::Arc;

use tempfile::TempDir;
use toonledger_cost::{
    read_live, CallDescriptor, CallStatus, CostTracker, PricingTable, SessionInfo, TrackerConfig,
};

const WORKERS: usize = 16;
const CALLS_PER_WORKER: usize = 25;

fn pricing() -> PricingTable {
    PricingTable::builder()
        .flat("kontext", 0.04)
        .per_megapixel("flash", 0.005)
        .tiered("flux-2-pro", 0.03, 0.015)
        .build()
}

fn call(worker: usize, i: usize) -> CallDescriptor {
    let work_item = format!("w{worker}_p{i}");
    match i % 5 {
        0 => CallDescriptor::failed("flash", work_item, "content filter"),
        1 => CallDescriptor::success("kontext", work_item).with_phase("character_generation"),
        2 => CallDescriptor::success("flux-2-pro", work_item)
            .with_dimensions(2048, 2048)
            .with_phase("background_generation"),
        3 => CallDescriptor::retried("kontext", work_item, "timeout"),
        _ => CallDescriptor::success("flash", work_item)
            .with_dimensions(1024, 1440)
            .with_batch(worker % 2 == 0)
            .with_phase("panel_generation"),
    }
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_records_are_not_lost() {
    let tracker = Arc::new(CostTracker::in_memory(
        SessionInfo::new(Some("concurrent".to_string()), 100.0),
        pricing(),
    ));

    let handles: Vec<_> = (0..WORKERS)
        .map(|worker| {
            let tracker = Arc::clone(&tracker);
            tokio::spawn(async move {
                for i in 0..CALLS_PER_WORKER {
                    tracker.record(call(worker, i)).await;
                }
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap();
    }

    let expected = WORKERS * CALLS_PER_WORKER;
    let ledger = tracker.ledger_snapshot().await;
    assert_eq!(ledger.len(), expected);

    let sequences: BTreeSet<u64> = ledger.records().iter().map(|r| r.sequence).collect();
    assert_eq!(sequences.len(), expected);
    assert_eq!(sequences.iter().next_back().copied(), Some(expected as u64));

    let work_items: BTreeSet<&str> = ledger
        .records()
        .iter()
        .map(|r| r.work_item_id.as_str())
        .collect();
    assert_eq!(work_items.len(), expected);

    assert_eq!(ledger.total_cost(), ledger.resum());

    let summary = tracker.raw_summary().await;
    assert_eq!(summary.total_calls, expected as u64);
    assert_eq!(summary.total_cost_usd, ledger.total_cost());
    assert_eq!(
        summary.by_status.success + summary.by_status.failed + summary.by_status.retried,
        expected as u64
    );
    assert!(ledger
        .records()
        .iter()
        .filter(|r| r.status != CallStatus::Success)
        .all(|r| r.cost_usd == 0.0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_live_snapshot_reflects_final_state() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("reports").join("live_cost.json");
    let mut config = TrackerConfig::default()
        .with_session_id("snapshot-race")
        .with_budget(20.0)
        .with_snapshot_path(&path);
    config.pricing.models.clear();
    let tracker = Arc::new(CostTracker::new(config));

    let handles: Vec<_> = (0..WORKERS)
        .map(|worker| {
            let tracker = Arc::clone(&tracker);
            tokio::spawn(async move {
                for i in 0..CALLS_PER_WORKER {
                    tracker
                        .record(CallDescriptor::success(
                            "unpriced-model",
                            format!("w{worker}_{i}"),
                        ))
                        .await;
                }
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap();
    }

    let expected = (WORKERS * CALLS_PER_WORKER) as u64;
    let snapshot = read_live(&path).await.unwrap();
    assert_eq!(snapshot.session_id, "snapshot-race");
    assert_eq!(snapshot.total_calls, expected);
    assert_eq!(snapshot.by_model["unpriced-model"].count, expected);
    assert_eq!(tracker.snapshot_failures(), 0);

    // Every call used the fallback price
    let summary = tracker.summary().await;
    assert_eq!(summary.total_cost_usd, snapshot.total_cost_usd);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_trackers_sharing_snapshot_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("live_cost.json");
    let tracker_for = |session: &str| {
        let mut config = TrackerConfig::default()
            .with_session_id(session)
            .with_snapshot_path(&path);
        config.pricing.models.clear();
        Arc::new(CostTracker::new(config))
    };
    // A replaced tracker still held by workers writes alongside the new one
    let trackers = [tracker_for("old-run"), tracker_for("new-run")];

    let handles: Vec<_> = trackers
        .iter()
        .flat_map(|tracker| {
            (0..WORKERS / 2).map(move |worker| {
                let tracker = Arc::clone(tracker);
                tokio::spawn(async move {
                    for i in 0..CALLS_PER_WORKER {
                        tracker
                            .record(CallDescriptor::success("shared", format!("w{worker}_{i}")))
                            .await;
                    }
                })
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap();
    }

    for tracker in &trackers {
        assert_eq!(
            tracker.snapshot_failures(),
            0,
            "{:?}",
            tracker.last_snapshot_error()
        );
    }

    // Each tracker's final write covers its whole ledger, whichever landed last
    let expected = (WORKERS / 2 * CALLS_PER_WORKER) as u64;
    let snapshot = read_live(&path).await.unwrap();
    assert!(["old-run", "new-run"].contains(&snapshot.session_id.as_str()));
    assert_eq!(snapshot.total_calls, expected);

    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .filter(|name| name != "live_cost.json")
        .collect();
    assert!(
        leftovers.is_empty(),
        "temp files left behind: {leftovers:?}"
    );
}
