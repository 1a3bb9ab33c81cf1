//! # cyre-core — data model and protocol traits for the Cyre action bus
//!
//! This crate defines the vocabulary every other `cyre-*` crate builds
//! on: the channel configuration and its talents, the handler closure
//! type and its explicit chain outcome, the response envelope and error
//! taxonomy, the sensor event bus, and the injectable clock capability.
//!
//! It deliberately contains no registries, no scheduling loop, and no
//! dispatch logic — those are protocol *implementations*, owned by
//! `cyre-pipeline`, `cyre-dispatch`, `cyre-timekeeper`, `cyre-breathing`,
//! and composed by the `cyre` facade crate.

#![deny(missing_docs)]

pub mod channel;
pub mod clock;
pub mod duration;
pub mod error;
pub mod handler;
pub mod id;
pub mod response;
pub mod sensor;

#[cfg(feature = "test-utils")]
pub use clock::test_utils;

pub use channel::{
    ChannelConfig, CollectResults, ConditionFn, ErrorStrategy, ExecutionOperator, Priority,
    Repeat, TalentFn,
};
pub use clock::{Clock, ClockHandle, SystemClock};
pub use duration::DurationMs;
pub use error::{DispatchError, EngineError, HandlerError, RegistryError, TimeKeeperError};
pub use handler::{handler_async, handler_fn, handler_try, Handler, HandlerOutcome, HandlerResult};
pub use id::{BranchId, ChannelId};
pub use response::{ErrorTag, IntraLink, Response, ResponseMetadata};
pub use sensor::{RecordingSink, SensorBus, SensorEvent, SensorEventType, SensorSink};
