//! # cyre-dispatch — the dispatch executor
//!
//! Takes a channel's payload, registered handlers, and declared
//! strategy, derives the actual [`cyre_core::ExecutionOperator`] (always
//! `single` when exactly one handler is registered, regardless of what
//! was declared), runs the handlers, and aggregates their outcomes into
//! one [`cyre_core::Response`].
//!
//! Owns no registry state — the engine builds a [`DispatchRequest`] from
//! its channel/handler registries and hands it here.

#![deny(missing_docs)]

mod executor;
mod request;

pub use executor::dispatch;
pub use request::{DispatchOutcome, DispatchRequest};
