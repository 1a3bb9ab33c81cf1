//! End-to-end scenarios against the full `Cyre` engine: protections,
//! multi-handler dispatch, scheduling, intra-links, and branches.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use cyre::Cyre;
use cyre_core::test_utils::VirtualClock;
use cyre_core::{
    handler_fn, handler_try, ChannelConfig, CollectResults, ErrorStrategy, ExecutionOperator,
    HandlerResult, Repeat,
};
use serde_json::json;

#[tokio::test]
async fn single_handler_dispatches_and_updates_payload_store() {
    let engine = Cyre::new();
    let id = engine.action(ChannelConfig::new("echo")).unwrap();
    engine.on(id.as_str(), handler_fn(|payload| payload)).unwrap();

    let response = engine.call(id.as_str(), Some(json!("hi"))).await;
    assert!(response.ok);
    assert_eq!(response.payload, Some(json!("hi")));
    assert_eq!(engine.get(id.as_str()), Some(json!("hi")));
}

#[tokio::test]
async fn throttle_admits_first_call_then_drops_until_window_elapses() {
    let clock = VirtualClock::new();
    let engine = Cyre::with_clock(Arc::new(clock.clone()));
    let counter = Arc::new(AtomicUsize::new(0));

    let id = engine.action(ChannelConfig::new("t").throttle(100)).unwrap();
    let counter_for_handler = Arc::clone(&counter);
    engine
        .on(
            id.as_str(),
            handler_fn(move |payload| {
                counter_for_handler.fetch_add(1, Ordering::SeqCst);
                payload
            }),
        )
        .unwrap();

    assert!(engine.call(id.as_str(), Some(json!(0))).await.ok);

    clock.advance(10);
    assert!(!engine.call(id.as_str(), Some(json!(1))).await.ok);

    clock.advance(50); // t = 60
    assert!(!engine.call(id.as_str(), Some(json!(2))).await.ok);

    clock.advance(50); // t = 110
    assert!(engine.call(id.as_str(), Some(json!(3))).await.ok);

    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn debounce_coalesces_rapid_calls_into_one_dispatch_with_last_payload() {
    let clock = VirtualClock::new();
    let engine = Cyre::with_clock(Arc::new(clock.clone()));
    let counter = Arc::new(AtomicUsize::new(0));
    let last_seen = Arc::new(Mutex::new(None));

    let id = engine.action(ChannelConfig::new("d").debounce(200)).unwrap();
    let counter_for_handler = Arc::clone(&counter);
    let last_seen_for_handler = Arc::clone(&last_seen);
    engine
        .on(
            id.as_str(),
            handler_fn(move |payload| {
                counter_for_handler.fetch_add(1, Ordering::SeqCst);
                *last_seen_for_handler.lock().unwrap() = Some(payload.clone());
                payload
            }),
        )
        .unwrap();

    for v in 1..=5 {
        let response = engine.call(id.as_str(), Some(json!(v))).await;
        assert!(!response.ok);
        clock.advance(50);
        tokio::time::advance(std::time::Duration::from_millis(50)).await;
    }

    clock.advance(250);
    tokio::time::advance(std::time::Duration::from_millis(250)).await;
    tokio::task::yield_now().await;
    tokio::task::yield_now().await;

    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(*last_seen.lock().unwrap(), Some(json!(5)));
}

#[tokio::test]
async fn detect_changes_skips_structurally_equal_payload() {
    let engine = Cyre::new();
    let counter = Arc::new(AtomicUsize::new(0));
    let id = engine
        .action(ChannelConfig::new("c").detect_changes(true))
        .unwrap();
    let counter_for_handler = Arc::clone(&counter);
    engine
        .on(
            id.as_str(),
            handler_fn(move |payload| {
                counter_for_handler.fetch_add(1, Ordering::SeqCst);
                payload
            }),
        )
        .unwrap();

    assert!(engine.call(id.as_str(), Some(json!({"v": 1}))).await.ok);
    assert!(!engine.call(id.as_str(), Some(json!({"v": 1}))).await.ok);
    assert!(engine.call(id.as_str(), Some(json!({"v": 2}))).await.ok);

    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn parallel_continue_reports_partial_failure() {
    let engine = Cyre::new();
    let id = engine
        .action(ChannelConfig::new("p").error_strategy(ErrorStrategy::Continue))
        .unwrap();

    engine.on(id.as_str(), handler_fn(|payload| payload)).unwrap();
    engine
        .on(id.as_str(), handler_try(|_payload| Err("boom".to_string())))
        .unwrap();
    engine.on(id.as_str(), handler_fn(|payload| payload)).unwrap();

    let response = engine.call(id.as_str(), Some(json!(1))).await;
    assert!(response.ok);
    let metadata = response.metadata.unwrap();
    assert_eq!(metadata.successful_handlers, Some(2));
    assert_eq!(metadata.failed_handlers, Some(1));
}

#[tokio::test]
async fn waterfall_threads_output_into_next_handler() {
    let engine = Cyre::new();
    let id = engine
        .action(
            ChannelConfig::new("w")
                .dispatch(ExecutionOperator::Waterfall)
                .collect_results(CollectResults::Last),
        )
        .unwrap();

    engine
        .on(id.as_str(), handler_fn(|payload| json!(payload.as_i64().unwrap() + 1)))
        .unwrap();
    engine
        .on(id.as_str(), handler_fn(|payload| json!(payload.as_i64().unwrap() * 2)))
        .unwrap();
    engine
        .on(id.as_str(), handler_fn(|payload| json!(payload.as_i64().unwrap() - 3)))
        .unwrap();

    let response = engine.call(id.as_str(), Some(json!(5))).await;
    assert!(response.ok);
    assert_eq!(response.payload, Some(json!(9)));
}

#[tokio::test(start_paused = true)]
async fn repeat_count_schedules_exact_executions() {
    let clock = VirtualClock::new();
    let engine = Cyre::with_clock(Arc::new(clock));
    let counter = Arc::new(AtomicUsize::new(0));

    let id = engine
        .action(ChannelConfig::new("r").schedule(0, 50, Repeat::Times(3)))
        .unwrap();
    let counter_for_handler = Arc::clone(&counter);
    engine
        .on(
            id.as_str(),
            handler_fn(move |payload| {
                counter_for_handler.fetch_add(1, Ordering::SeqCst);
                payload
            }),
        )
        .unwrap();

    tokio::task::yield_now().await;
    for _ in 0..6 {
        tokio::time::advance(std::time::Duration::from_millis(50)).await;
        tokio::task::yield_now().await;
    }

    assert_eq!(counter.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn intra_link_dispatches_chained_channel_after_parent_returns() {
    let engine = Cyre::new();
    let b_id = engine.action(ChannelConfig::new("b")).unwrap();
    let a_id = engine.action(ChannelConfig::new("a")).unwrap();

    let b_seen = Arc::new(Mutex::new(None));
    let b_seen_for_handler = Arc::clone(&b_seen);
    engine
        .on(
            b_id.as_str(),
            handler_fn(move |payload| {
                *b_seen_for_handler.lock().unwrap() = Some(payload.clone());
                payload
            }),
        )
        .unwrap();

    let chain_target = b_id.clone();
    engine
        .on(
            a_id.as_str(),
            handler_try(move |_payload| {
                Ok(HandlerResult::Chain {
                    id: chain_target.clone(),
                    payload: json!(42),
                })
            }),
        )
        .unwrap();

    let response = engine.call(a_id.as_str(), Some(json!(1))).await;
    assert!(response.ok);
    assert_eq!(*b_seen.lock().unwrap(), Some(json!(42)));
}

#[tokio::test]
async fn single_handler_forces_single_execution_operator() {
    let engine = Cyre::new();
    let id = engine
        .action(ChannelConfig::new("s").dispatch(ExecutionOperator::Parallel))
        .unwrap();
    engine.on(id.as_str(), handler_fn(|payload| payload)).unwrap();

    let response = engine.call(id.as_str(), Some(json!(1))).await;
    let metadata = response.metadata.unwrap();
    assert_eq!(metadata.execution_operator, Some(ExecutionOperator::Single));
}

#[tokio::test]
async fn branch_call_cannot_reach_outside_its_path() {
    let engine = Cyre::new();
    let root_id = engine.action(ChannelConfig::new("root_channel")).unwrap();
    engine.on(root_id.as_str(), handler_fn(|payload| payload)).unwrap();

    let child = engine.branch().branch("child");
    let response = child.call("root_channel", None).await;
    assert!(!response.ok);
}

#[tokio::test]
async fn branch_cascade_destroy_removes_descendant_channels() {
    let engine = Cyre::new();
    let company = engine.branch().branch("company");
    let engineering = company.branch("engineering");
    let frontend = engineering.branch("frontend");

    let id = frontend.action(ChannelConfig::new("status")).unwrap();
    assert_eq!(id.as_str(), "company/engineering/frontend/status");
    frontend.on("status", handler_fn(|payload| payload)).unwrap();

    let before = frontend.call("status", Some(json!("up"))).await;
    assert!(before.ok);

    company.destroy().await;

    let after = engine
        .call("company/engineering/frontend/status", None)
        .await;
    assert!(!after.ok);
}
