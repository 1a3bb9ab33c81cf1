use cyre_core::{
    handler_fn, handler_try, CollectResults, DurationMs, ErrorStrategy, ExecutionOperator,
    HandlerResult,
};
use cyre_dispatch::{dispatch, DispatchRequest};
use serde_json::json;

fn request(
    handlers: Vec<cyre_core::Handler>,
    declared: ExecutionOperator,
) -> DispatchRequest {
    DispatchRequest {
        channel_id: "test".into(),
        payload: json!({ "n": 1 }),
        handlers,
        declared_operator: declared,
        error_strategy: ErrorStrategy::FailFast,
        collect_results: CollectResults::All,
        dispatch_timeout: None,
    }
}

#[tokio::test]
async fn single_handler_forces_single_operator() {
    let req = request(
        vec![handler_fn(|p| p)],
        ExecutionOperator::Parallel,
    );
    let outcome = dispatch(req).await;
    assert!(outcome.response.ok);
    assert_eq!(
        outcome.response.metadata.unwrap().execution_operator,
        Some(ExecutionOperator::Single)
    );
}

#[tokio::test]
async fn no_handlers_is_no_subscriber() {
    let req = request(vec![], ExecutionOperator::Single);
    let outcome = dispatch(req).await;
    assert!(!outcome.response.ok);
    assert_eq!(outcome.response.message, "no subscriber for test");
}

#[tokio::test]
async fn parallel_all_collects_every_outcome() {
    let mut req = request(
        vec![handler_fn(|_| json!("a")), handler_fn(|_| json!("b"))],
        ExecutionOperator::Parallel,
    );
    req.collect_results = CollectResults::All;
    let outcome = dispatch(req).await;
    assert!(outcome.response.ok);
    let payload = outcome.response.payload.unwrap();
    assert_eq!(payload.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn parallel_continue_succeeds_with_partial_failure() {
    let mut req = request(
        vec![
            handler_try(|_| Err("boom".to_string())),
            handler_fn(|_| json!("ok")),
        ],
        ExecutionOperator::Parallel,
    );
    req.error_strategy = ErrorStrategy::Continue;
    req.collect_results = CollectResults::Last;
    let outcome = dispatch(req).await;
    assert!(outcome.response.ok);
    assert_eq!(outcome.response.payload.unwrap(), json!("ok"));
}

#[tokio::test]
async fn parallel_fail_fast_fails_on_any_rejection() {
    let mut req = request(
        vec![
            handler_try(|_| Err("boom".to_string())),
            handler_fn(|_| json!("ok")),
        ],
        ExecutionOperator::Parallel,
    );
    req.error_strategy = ErrorStrategy::FailFast;
    let outcome = dispatch(req).await;
    assert!(!outcome.response.ok);
    assert_eq!(outcome.response.error, Some(true));
}

#[tokio::test]
async fn sequential_collects_last() {
    let mut req = request(
        vec![handler_fn(|_| json!(1)), handler_fn(|_| json!(2))],
        ExecutionOperator::Sequential,
    );
    req.collect_results = CollectResults::Last;
    let outcome = dispatch(req).await;
    assert_eq!(outcome.response.payload.unwrap(), json!(2));
}

#[tokio::test]
async fn waterfall_threads_output_into_next_handler() {
    let req = request(
        vec![
            handler_fn(|p| json!(p["n"].as_i64().unwrap() + 1)),
            handler_fn(|p| json!(p.as_i64().unwrap() * 10)),
        ],
        ExecutionOperator::Waterfall,
    );
    let outcome = dispatch(req).await;
    assert!(outcome.response.ok);
    assert_eq!(outcome.response.payload.unwrap(), json!(20));
}

#[tokio::test]
async fn race_returns_first_settled() {
    let req = request(
        vec![handler_fn(|_| json!("winner"))],
        ExecutionOperator::Race,
    );
    let outcome = dispatch(req).await;
    assert!(outcome.response.ok);
}

#[tokio::test]
async fn dispatch_timeout_yields_dispatch_timeout_tag() {
    let mut req = request(
        vec![cyre_core::handler_async(|_| async {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            Ok(HandlerResult::Value(json!("late")))
        })],
        ExecutionOperator::Parallel,
    );
    req.handlers.push(handler_fn(|_| json!("also-late")));
    req.dispatch_timeout = Some(DurationMs::from_millis(5));
    let outcome = dispatch(req).await;
    assert!(!outcome.response.ok);
    assert_eq!(outcome.response.message, "dispatch timed out");
}

#[tokio::test]
async fn chain_result_produces_intra_link() {
    let req = request(
        vec![cyre_core::handler_try(|_| {
            Ok(HandlerResult::Chain {
                id: cyre_core::ChannelId::new("next"),
                payload: json!({ "step": 2 }),
            })
        })],
        ExecutionOperator::Single,
    );
    let outcome = dispatch(req).await;
    assert!(outcome.response.ok);
    assert_eq!(outcome.intra_links.len(), 1);
    assert_eq!(outcome.intra_links[0].id, cyre_core::ChannelId::new("next"));
}

#[tokio::test]
async fn every_handlers_chain_is_collected_in_order() {
    let mut req = request(
        vec![
            handler_try(|_| {
                Ok(HandlerResult::Chain {
                    id: cyre_core::ChannelId::new("a"),
                    payload: json!({ "from": "h1" }),
                })
            }),
            handler_try(|_| {
                Ok(HandlerResult::Chain {
                    id: cyre_core::ChannelId::new("b"),
                    payload: json!({ "from": "h2" }),
                })
            }),
        ],
        ExecutionOperator::Sequential,
    );
    req.error_strategy = ErrorStrategy::Continue;
    let outcome = dispatch(req).await;
    assert!(outcome.response.ok);
    assert_eq!(outcome.intra_links.len(), 2);
    assert_eq!(outcome.intra_links[0].id, cyre_core::ChannelId::new("a"));
    assert_eq!(outcome.intra_links[1].id, cyre_core::ChannelId::new("b"));
}
