//! Workspace-level proof of composability: a single `Cyre` engine wired
//! up the way an application actually would, exercising branches,
//! metrics, the sensor bus, and shutdown together rather than any one
//! module in isolation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use cyre::Cyre;
use cyre_core::{handler_fn, ChannelConfig, RecordingSink};
use serde_json::json;

#[tokio::test]
async fn application_wiring_across_branches_with_sensor_recording() {
    let engine = Cyre::new();
    engine.init();

    let sink = Arc::new(RecordingSink::new());
    engine.sensor().subscribe(sink.clone());

    let orders = engine.branch().branch("orders");
    let placed = Arc::new(AtomicUsize::new(0));
    let placed_for_handler = Arc::clone(&placed);

    let id = orders
        .action(ChannelConfig::new("placed").required(true))
        .unwrap();
    orders
        .on(
            "placed",
            handler_fn(move |payload| {
                placed_for_handler.fetch_add(1, Ordering::SeqCst);
                payload
            }),
        )
        .unwrap();

    let rejected = orders.call("placed", None).await;
    assert!(!rejected.ok);

    let accepted = orders.call("placed", Some(json!({"sku": "abc", "qty": 2}))).await;
    assert!(accepted.ok);
    assert_eq!(placed.load(Ordering::SeqCst), 1);

    let metrics = engine.get_metrics(id.as_str()).unwrap();
    assert_eq!(metrics.execution_count, 1);

    assert!(!sink.events().is_empty());

    engine.shutdown();
    let after_shutdown = orders.call("placed", Some(json!({"sku": "abc", "qty": 1}))).await;
    assert!(!after_shutdown.ok);
}
