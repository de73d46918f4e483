//! Concurrency behaviour: parallel fan-out and overlapping resolutions

mod helpers;

use helpers::{FakeSource, Harness};
use mrp_resolver::{MediaEntry, MediaKind, ResolutionStatus};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[tokio::test]
async fn test_sources_are_queried_in_parallel() {
    let delay = Duration::from_millis(150);
    let mut harness = Harness::new();
    for (id, rank) in [("pexels", 1), ("unsplash", 2), ("pixabay", 3)] {
        harness = harness.source(Arc::new(
            FakeSource::new(id, rank).page(1, &[id]).delayed(delay),
        ));
    }
    let resolver = harness.build();
    let entry = MediaEntry::new("cat", "", MediaKind::Image).into_shared();

    let start = Instant::now();
    let result = resolver.resolve(&entry, None).await;
    let elapsed = start.elapsed();

    assert_eq!(result.primary().unwrap().url, "pexels");
    assert!(
        elapsed < Duration::from_millis(400),
        "sources ran sequentially: {:?}",
        elapsed
    );
}

#[tokio::test]
async fn test_overlapping_resolutions_last_writer_wins() {
    let source = Arc::new(
        FakeSource::new("pexels", 1)
            .page(1, &["a", "b"])
            .delayed(Duration::from_millis(50)),
    );
    let resolver = Harness::new().source(source).build();
    let entry = MediaEntry::new("cat", "", MediaKind::Image).into_shared();

    let (first, second) = tokio::join!(resolver.resolve(&entry, None), resolver.resolve(&entry, None));

    // Both started from the same snapshot, so both picked "a"
    assert!(first.applied);
    assert!(second.applied);
    assert_eq!(first.primary().unwrap().url, "a");
    assert_eq!(second.primary().unwrap().url, "a");

    let guard = entry.read().await;
    assert_eq!(guard.state.generation, 2);
    assert_eq!(guard.state.status, ResolutionStatus::Completed);
    assert_eq!(guard.state.used_urls.len(), 1);
    assert!(guard.state.history.is_empty());
}

#[tokio::test]
async fn test_stale_result_discarded_when_configured() {
    let source = Arc::new(
        FakeSource::new("pexels", 1)
            .page(1, &["a", "b"])
            .delayed(Duration::from_millis(50)),
    );
    let resolver = Harness::new().source(source).discard_stale().build();
    let entry = MediaEntry::new("cat", "", MediaKind::Image).into_shared();

    let (first, second) = tokio::join!(resolver.resolve(&entry, None), resolver.resolve(&entry, None));

    assert!(!first.applied);
    assert!(second.applied);

    let guard = entry.read().await;
    assert_eq!(guard.state.generation, 2);
    assert_eq!(guard.state.status, ResolutionStatus::Completed);
    assert_eq!(guard.state.primary.as_ref().unwrap().url, "a");
}

#[tokio::test]
async fn test_batch_runs_entries_concurrently() {
    let source = Arc::new(
        FakeSource::new("pexels", 1)
            .page(1, &["a"])
            .delayed(Duration::from_millis(150)),
    );
    let resolver = Harness::new().source(source.clone()).build();
    let entries: Vec<_> = (0..5)
        .map(|i| MediaEntry::new(format!("word{}", i), "", MediaKind::Image).into_shared())
        .collect();

    let start = Instant::now();
    let results = resolver.resolve_batch(&entries, None).await;
    let elapsed = start.elapsed();

    assert_eq!(results.len(), 5);
    assert!(results.iter().all(|r| r.applied && !r.placeholder));
    assert_eq!(source.call_count(), 5);
    assert!(elapsed < Duration::from_millis(500), "batch ran sequentially: {:?}", elapsed);
}
