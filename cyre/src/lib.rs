//! # cyre — an in-process reactive action bus
//!
//! A channel registers a protection pipeline and a set of handlers under
//! an id; `call` runs the admitted payload through that pipeline,
//! schedules or dispatches it, and hands back a uniform [`Response`].
//!
//! This crate is the facade composing `cyre-core`'s data model over
//! `cyre-pipeline` (protections), `cyre-dispatch` (multi-handler
//! execution), `cyre-timekeeper` (scheduled channels), and
//! `cyre-breathing` (stress-adaptive admission).

#![deny(missing_docs)]

mod branch;
mod debounce;
mod engine;
mod handlers;
mod registry;
mod store;

pub use branch::Branch;
pub use engine::Cyre;
pub use store::Metrics;

/// Commonly used types re-exported for convenience.
pub mod prelude {
    pub use crate::{Branch, Cyre, Metrics};
    pub use cyre_core::{
        handler_async, handler_fn, handler_try, ChannelConfig, CollectResults, ErrorStrategy,
        ErrorTag, ExecutionOperator, Handler, HandlerOutcome, HandlerResult, Priority,
        RecordingSink, Repeat, Response,
    };
}
