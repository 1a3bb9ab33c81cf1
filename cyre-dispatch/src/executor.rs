//! The dispatch executor: derives an execution operator from the
//! handler count and declared strategy, then runs the handlers and
//! aggregates their outcomes into one [`Response`].
//!
//! `parallel` and `race` spawn one task per handler and join the
//! handles, generalizing `LocalOrch::dispatch_many`'s "N agents,
//! fixed fan-out-and-join" to cover `collect_results`/`error_strategy`
//! and early-exit-on-first-settlement. A dropped, un-awaited
//! `JoinHandle` does not abort its task — it keeps running detached,
//! which is exactly the "cooperative cancellation only" behavior
//! wanted on timeout or race loss.

use std::time::Instant;

use cyre_core::{
    CollectResults, ErrorStrategy, ErrorTag, ExecutionOperator, Handler, HandlerOutcome,
    HandlerResult, IntraLink, Response, ResponseMetadata,
};
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::request::{DispatchOutcome, DispatchRequest};

/// One handler's settled outcome, tagged with its registration index so
/// aggregation can recover list order after out-of-order settlement.
struct Record {
    index: usize,
    outcome: HandlerOutcome,
}

fn spawn_one(handler: Handler, payload: Value) -> JoinHandle<HandlerOutcome> {
    tokio::spawn(async move { handler(payload).await })
}

fn outcome_payload(outcome: &HandlerOutcome) -> Option<Value> {
    match outcome {
        Ok(HandlerResult::Value(v)) => Some(v.clone()),
        Ok(HandlerResult::Chain { payload, .. }) => Some(payload.clone()),
        Err(_) => None,
    }
}

fn outcome_chain(outcome: &HandlerOutcome) -> Option<IntraLink> {
    match outcome {
        Ok(HandlerResult::Chain { id, payload }) => Some(IntraLink {
            id: id.clone(),
            payload: Some(payload.clone()),
        }),
        _ => None,
    }
}

/// Run one dispatch to completion.
pub async fn dispatch(request: DispatchRequest) -> DispatchOutcome {
    let started = Instant::now();
    let handler_count = request.handlers.len();

    if handler_count == 0 {
        return DispatchOutcome {
            response: Response::from_tag(
                ErrorTag::NoSubscriber,
                format!("no subscriber for {}", request.channel_id),
            ),
            intra_links: Vec::new(),
        };
    }

    let operator = if handler_count == 1 {
        ExecutionOperator::Single
    } else {
        request.declared_operator
    };

    let timeout = request.dispatch_timeout.map(|d| d.to_std()).or({
        match operator {
            ExecutionOperator::Race => Some(std::time::Duration::from_secs(5)),
            ExecutionOperator::Waterfall => Some(std::time::Duration::from_secs(15)),
            _ => None,
        }
    });

    let run = run_operator(operator, request.payload, request.handlers, request.error_strategy);

    let (records, timed_out) = match timeout {
        Some(d) => match tokio::time::timeout(d, run).await {
            Ok(records) => (records, false),
            Err(_) => (Vec::new(), true),
        },
        None => {
            let records = run.await;
            (records, false)
        }
    };

    let elapsed_ms = started.elapsed().as_millis() as u64;

    if timed_out {
        let response = Response::from_tag(ErrorTag::DispatchTimeout, "dispatch timed out").with_metadata(
            ResponseMetadata {
                execution_operator: Some(operator),
                handler_count,
                execution_time_ms: elapsed_ms,
                has_timeout: true,
                strategy: Some(request.declared_operator),
                collect_results: Some(request.collect_results),
                successful_handlers: None,
                failed_handlers: None,
                intra_links: Vec::new(),
            },
        );
        return DispatchOutcome {
            response,
            intra_links: Vec::new(),
        };
    }

    aggregate(
        operator,
        request.error_strategy,
        request.collect_results,
        records,
        handler_count,
        elapsed_ms,
        timeout.is_some(),
        request.declared_operator,
    )
}

/// Run the handlers per the derived operator's concurrency shape.
/// Returns every settled record, in handler registration order.
async fn run_operator(
    operator: ExecutionOperator,
    payload: Value,
    handlers: Vec<Handler>,
    error_strategy: ErrorStrategy,
) -> Vec<Record> {
    match operator {
        ExecutionOperator::Single => {
            let handler = handlers.into_iter().next().expect("handler_count == 1");
            let outcome = handler(payload).await;
            vec![Record { index: 0, outcome }]
        }
        ExecutionOperator::Parallel => run_parallel(payload, handlers, error_strategy).await,
        ExecutionOperator::Sequential => run_sequential(payload, handlers, error_strategy).await,
        ExecutionOperator::Race => run_race(payload, handlers).await,
        ExecutionOperator::Waterfall => run_waterfall(payload, handlers).await,
    }
}

async fn run_parallel(
    payload: Value,
    handlers: Vec<Handler>,
    error_strategy: ErrorStrategy,
) -> Vec<Record> {
    let mut pending: FuturesUnordered<_> = handlers
        .into_iter()
        .enumerate()
        .map(|(index, handler)| {
            let handle = spawn_one(handler, payload.clone());
            async move {
                let outcome = handle
                    .await
                    .unwrap_or_else(|e| Err(format!("handler panicked: {e}")));
                Record { index, outcome }
            }
        })
        .collect();

    let mut records = Vec::new();
    while let Some(record) = pending.next().await {
        let failed = record.outcome.is_err();
        records.push(record);
        if failed && error_strategy == ErrorStrategy::FailFast {
            break;
        }
    }
    records.sort_by_key(|r| r.index);
    records
}

async fn run_sequential(
    payload: Value,
    handlers: Vec<Handler>,
    error_strategy: ErrorStrategy,
) -> Vec<Record> {
    let mut records = Vec::with_capacity(handlers.len());
    for (index, handler) in handlers.into_iter().enumerate() {
        let outcome = handler(payload.clone()).await;
        let failed = outcome.is_err();
        records.push(Record { index, outcome });
        if failed && error_strategy == ErrorStrategy::FailFast {
            break;
        }
    }
    records
}

async fn run_race(payload: Value, handlers: Vec<Handler>) -> Vec<Record> {
    let mut pending: FuturesUnordered<_> = handlers
        .into_iter()
        .enumerate()
        .map(|(index, handler)| {
            let handle = spawn_one(handler, payload.clone());
            async move {
                let outcome = handle
                    .await
                    .unwrap_or_else(|e| Err(format!("handler panicked: {e}")));
                Record { index, outcome }
            }
        })
        .collect();

    match pending.next().await {
        Some(record) => vec![record],
        None => Vec::new(),
    }
}

async fn run_waterfall(payload: Value, handlers: Vec<Handler>) -> Vec<Record> {
    let mut records = Vec::with_capacity(handlers.len());
    let mut current = payload;
    for (index, handler) in handlers.into_iter().enumerate() {
        let outcome = handler(current.clone()).await;
        let failed = outcome.is_err();
        if let Some(next) = outcome_payload(&outcome) {
            current = next;
        }
        records.push(Record { index, outcome });
        if failed {
            break;
        }
    }
    records
}

#[allow(clippy::too_many_arguments)]
fn aggregate(
    operator: ExecutionOperator,
    error_strategy: ErrorStrategy,
    collect_results: CollectResults,
    records: Vec<Record>,
    handler_count: usize,
    elapsed_ms: u64,
    has_timeout: bool,
    declared: ExecutionOperator,
) -> DispatchOutcome {
    let successful = records.iter().filter(|r| r.outcome.is_ok()).count();
    let failed = records.len() - successful;

    // Records are already in registration/index order (parallel sorts
    // by index after settling; the other operators build in order), so
    // a chain from every handler lands in the queue in that order too.
    let intra_links: Vec<IntraLink> = records
        .iter()
        .filter_map(|r| outcome_chain(&r.outcome))
        .collect();

    let metadata = ResponseMetadata {
        execution_operator: Some(operator),
        handler_count,
        execution_time_ms: elapsed_ms,
        has_timeout,
        strategy: Some(declared),
        collect_results: Some(collect_results),
        successful_handlers: Some(successful),
        failed_handlers: Some(failed),
        intra_links: intra_links.clone(),
    };

    let succeeds = match error_strategy {
        ErrorStrategy::FailFast => failed == 0 && successful == records.len(),
        ErrorStrategy::Continue => successful > 0,
    };

    let response = if !succeeds {
        let message = records
            .iter()
            .find_map(|r| r.outcome.as_ref().err())
            .cloned()
            .unwrap_or_else(|| "handler error".to_string());
        Response::from_tag(ErrorTag::HandlerError, message)
    } else {
        let payload = collect_payload(collect_results, &records);
        Response::ok(payload, "ok")
    }
    .with_metadata(metadata);

    DispatchOutcome { response, intra_links }
}

fn collect_payload(strategy: CollectResults, records: &[Record]) -> Option<Value> {
    match strategy {
        CollectResults::First => records.iter().find_map(|r| outcome_payload(&r.outcome)),
        CollectResults::Last => records.iter().rev().find_map(|r| outcome_payload(&r.outcome)),
        CollectResults::All => {
            let values: Vec<Value> = records
                .iter()
                .map(|r| match &r.outcome {
                    Ok(_) => serde_json::json!({ "ok": true, "payload": outcome_payload(&r.outcome) }),
                    Err(message) => serde_json::json!({ "ok": false, "error": message }),
                })
                .collect();
            Some(Value::Array(values))
        }
    }
}
