//! Concurrent workers sharing one tracker.
//!
//! Each test spawns provider workers on a multi-threaded runtime and lines
//! them up on a barrier so their calls race.

use std::sync::Arc;

use tokio::sync::Barrier;

use agentmerge_core::conflict::ConflictKind;
use agentmerge_core::errors::OwnershipError;
use agentmerge_core::models::ListFilter;
use agentmerge_core::{FileOperation, TrackOptions, Tracker};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn lock_is_mutually_exclusive() {
    const WORKERS: usize = 16;
    let tracker = Arc::new(Tracker::new());
    let barrier = Arc::new(Barrier::new(WORKERS));

    let mut handles = Vec::new();
    for i in 0..WORKERS {
        let tracker = Arc::clone(&tracker);
        let barrier = Arc::clone(&barrier);
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            tracker.lock_file("shared.rs", &format!("p{}", i))
        }));
    }

    let mut granted = 0;
    let mut denied = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => granted += 1,
            Err(OwnershipError::Locked { .. }) => denied += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(granted, 1);
    assert_eq!(denied, WORKERS - 1);
    assert!(tracker.is_locked("shared.rs"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_all_contend() {
    const WORKERS: usize = 8;
    let tracker = Arc::new(Tracker::new());
    let barrier = Arc::new(Barrier::new(WORKERS));

    let mut handles = Vec::new();
    for i in 0..WORKERS {
        let tracker = Arc::clone(&tracker);
        let barrier = Arc::clone(&barrier);
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            tracker.track_file_operation(
                &format!("p{}", i),
                "lib/x.ex",
                FileOperation::create(format!("defmodule X{} do\nend\n", i)),
                TrackOptions::default(),
            )
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let conflicts = tracker.list_conflicts();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].kind, ConflictKind::FileLevel);
    assert_eq!(conflicts[0].providers.len(), WORKERS);

    // Exactly one owner; every other writer is a contributor.
    let owner = tracker.get_owner("lib/x.ex").unwrap();
    let contributors = tracker.get_contributors("lib/x.ex");
    assert_eq!(contributors.len(), WORKERS - 1);
    assert!(!contributors.contains(&owner));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn history_ids_are_unique_and_ordered_per_path() {
    const WORKERS: usize = 6;
    const OPS: usize = 25;
    let tracker = Arc::new(Tracker::new());

    let mut handles = Vec::new();
    for w in 0..WORKERS {
        let tracker = Arc::clone(&tracker);
        handles.push(tokio::spawn(async move {
            let provider = format!("p{}", w);
            for n in 0..OPS {
                let path = format!("src/file_{}.rs", n % 3);
                tracker.track_file_operation(
                    &provider,
                    &path,
                    FileOperation::modify(String::new(), format!("{}-{}", provider, n)),
                    TrackOptions::default(),
                );
                tokio::task::yield_now().await;
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let stats = tracker.get_stats();
    assert_eq!(stats.total_operations, WORKERS * OPS);
    assert_eq!(stats.files_tracked, 3);

    let mut all_ids = Vec::new();
    for status in tracker.list_files(&ListFilter::default()) {
        let history = tracker.get_file_history(&status.path);
        assert!(history.windows(2).all(|w| w[0].id > w[1].id));
        assert!(history.windows(2).all(|w| w[0].recorded_at > w[1].recorded_at));
        assert_eq!(
            tracker.get_current_version(&status.path),
            history[0].result_content().map(str::to_string)
        );
        all_ids.extend(history.iter().map(|r| r.id));
    }
    all_ids.sort_unstable();
    all_ids.dedup();
    assert_eq!(all_ids.len(), WORKERS * OPS);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn readers_see_whole_records_while_writers_run() {
    let tracker = Arc::new(Tracker::new());
    tracker.track_file_operation(
        "p0",
        "hot.py",
        FileOperation::create("0\n"),
        TrackOptions::default(),
    );

    let writer = {
        let tracker = Arc::clone(&tracker);
        tokio::spawn(async move {
            for n in 1..200 {
                tracker.track_file_operation(
                    "p1",
                    "hot.py",
                    FileOperation::modify(format!("{}\n", n - 1), format!("{}\n", n)),
                    TrackOptions::default(),
                );
                tokio::task::yield_now().await;
            }
        })
    };

    let reader = {
        let tracker = Arc::clone(&tracker);
        tokio::spawn(async move {
            for _ in 0..200 {
                let status = tracker.get_file_status("hot.py").unwrap();
                let history = tracker.get_file_history("hot.py");
                assert!(history.len() >= status.operations);
                tokio::task::yield_now().await;
            }
        })
    };

    writer.await.unwrap();
    reader.await.unwrap();
    assert_eq!(tracker.get_file_history("hot.py").len(), 200);
    assert_eq!(tracker.get_current_version("hot.py").as_deref(), Some("199\n"));
}
