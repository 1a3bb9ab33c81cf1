//! Handler closures and the explicit sum-of-outcomes they return.
//!
//! Rather than inspecting an arbitrary return shape to decide whether a
//! handler wants to chain into another channel, a handler returns one
//! of exactly two variants.

use futures::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;

use crate::id::ChannelId;

/// What a handler produced.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerResult {
    /// A plain value, dispatched back to the caller as the response payload.
    Value(Value),
    /// A chain/intra-link: call `id` with `payload` after the current
    /// dispatch unwinds (see [`crate::handler::HandlerResult`] ordering
    /// guarantees in the dispatch executor).
    Chain { id: ChannelId, payload: Value },
}

/// What a handler invocation resolves to: success with a [`HandlerResult`],
/// or an error message (the handler "threw").
pub type HandlerOutcome = Result<HandlerResult, String>;

/// A registered subscriber. Boxed to erase the concrete closure type;
/// `Arc` so the handler registry can compare identity (`Arc::ptr_eq`) to
/// reject exact duplicate registrations without requiring `PartialEq` on
/// the closure itself.
pub type Handler = Arc<dyn Fn(Value) -> BoxFuture<'static, HandlerOutcome> + Send + Sync>;

/// Wrap a plain synchronous closure `Fn(Value) -> Value` as a [`Handler`]
/// that always succeeds with [`HandlerResult::Value`]. Convenience for
/// the common case of a handler that can't fail and never chains.
pub fn handler_fn<F>(f: F) -> Handler
where
    F: Fn(Value) -> Value + Send + Sync + 'static,
{
    Arc::new(move |payload| {
        let value = f(payload);
        Box::pin(async move { Ok(HandlerResult::Value(value)) })
    })
}

/// Wrap a closure returning a [`HandlerOutcome`] directly as a [`Handler`],
/// for handlers that may fail or chain.
pub fn handler_try<F>(f: F) -> Handler
where
    F: Fn(Value) -> HandlerOutcome + Send + Sync + 'static,
{
    Arc::new(move |payload| {
        let outcome = f(payload);
        Box::pin(async move { outcome })
    })
}

/// Wrap an async closure as a [`Handler`].
pub fn handler_async<F, Fut>(f: F) -> Handler
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = HandlerOutcome> + Send + 'static,
{
    Arc::new(move |payload| Box::pin(f(payload)))
}
