// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use super::*;

#[test]
fn finish_keeps_arrival_order() {
    let collector = ResultCollector::new();
    collector.report_acquired(ResourceTarget::new("b", "second"));
    collector.report_acquired(ResourceTarget::new("a", "first"));
    collector.report_abandoned(ResourceTarget::new("c", ""), "target rejected (404)");

    let summary = collector.finish(false);
    assert_eq!(summary.acquired_ids(), vec!["b", "a"]);
    assert_eq!(summary.abandoned.len(), 1);
    assert_eq!(summary.abandoned[0].reason, "target rejected (404)");
    assert!(!summary.cancelled);
}

#[test]
fn reports_after_finish_are_ignored() {
    let collector = ResultCollector::new();
    collector.report_acquired(ResourceTarget::new("a", ""));
    let summary = collector.finish(true);
    collector.report_acquired(ResourceTarget::new("late", ""));

    assert_eq!(summary.acquired_ids(), vec!["a"]);
    assert!(summary.cancelled);
    assert_eq!(collector.acquired_count(), 0);
}

#[test]
fn concurrent_reports_are_all_kept() {
    let collector = Arc::new(ResultCollector::new());
    let handles: Vec<_> = (0..16)
        .map(|i| {
            let c = Arc::clone(&collector);
            std::thread::spawn(move || c.report_acquired(ResourceTarget::new(format!("s{i}"), "")))
        })
        .collect();
    for h in handles {
        let _ = h.join();
    }

    let mut ids: Vec<String> =
        collector.finish(false).acquired.into_iter().map(|t| t.id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 16);
}

#[test]
fn summary_serializes_without_empty_abandoned() -> anyhow::Result<()> {
    let collector = ResultCollector::new();
    collector.report_acquired(ResourceTarget::new("202301", "CS101"));
    let json = serde_json::to_value(collector.finish(false))?;

    assert_eq!(json["acquired"][0]["id"], "202301");
    assert_eq!(json["acquired"][0]["label"], "CS101");
    assert!(json.get("abandoned").is_none());
    assert_eq!(json["cancelled"], false);
    Ok(())
}

#[test]
fn accepted_reports_are_announced_in_order() {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let collector = ResultCollector::with_progress(tx);
    collector.report_acquired(ResourceTarget::new("a", "音乐鉴赏"));
    collector.report_abandoned(ResourceTarget::new("b", ""), "target rejected (404)");
    collector.finish(false);
    collector.report_acquired(ResourceTarget::new("late", ""));

    assert_eq!(rx.try_recv().ok(), Some(Progress::Acquired(ResourceTarget::new("a", "音乐鉴赏"))));
    match rx.try_recv().ok() {
        Some(Progress::Abandoned(a)) => assert_eq!(a.target.id, "b"),
        other => panic!("expected abandonment, got {other:?}"),
    }
    assert!(rx.try_recv().is_err());
}
