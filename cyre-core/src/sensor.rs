//! The sensor/log bus — a typed, structured event stream distinct from
//! `tracing` diagnostics.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex};

use crate::channel::Priority;

/// The kind of event recorded on the sensor bus.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorEventType {
    /// A `call` was admitted to the protection pipeline.
    Call,
    /// A dispatch was handed to the execution operator.
    Dispatch,
    /// A single handler invocation completed.
    Execution,
    /// A call was dropped by the throttle talent.
    Throttle,
    /// A call was deferred by the debounce talent.
    Debounce,
    /// A call was terminated by a non-error talent (condition, no-change).
    Skip,
    /// A call was rejected by `block=true`.
    Blocked,
    /// A genuine fault (selector/transform/handler error, timeout).
    Error,
    /// A dispatch completed successfully.
    Success,
    /// General informational event.
    Info,
    /// A warning-level event (e.g. breathing entering recovery).
    Warning,
    /// A critical event (e.g. breathing at critical depth).
    Critical,
}

/// One event published on the sensor bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorEvent {
    /// Unique id for this event occurrence.
    pub id: u64,
    /// Milliseconds since the engine's clock epoch.
    pub timestamp: u64,
    /// The channel this event concerns, if any.
    pub action_id: Option<String>,
    /// The kind of event.
    pub event_type: SensorEventType,
    /// Human-readable message.
    pub message: Option<String>,
    /// Structured extra data.
    pub metadata: Option<Value>,
    /// Priority of the channel this event concerns, if any.
    pub priority: Option<Priority>,
}

/// A consumer of the sensor bus. Implementations must not block the
/// caller — a sink backed by an async channel should use a bounded,
/// non-blocking send and drop events under backpressure rather than
/// awaiting.
pub trait SensorSink: Send + Sync {
    /// Record one event. Must return promptly.
    fn record(&self, event: &SensorEvent);
}

/// In-process fan-out of sensor events to zero or more registered sinks.
pub struct SensorBus {
    sinks: Mutex<Vec<Arc<dyn SensorSink>>>,
    next_id: std::sync::atomic::AtomicU64,
}

impl SensorBus {
    /// Create an empty sensor bus.
    pub fn new() -> Self {
        Self {
            sinks: Mutex::new(Vec::new()),
            next_id: std::sync::atomic::AtomicU64::new(0),
        }
    }

    /// Register a sink. Sinks are never unregistered; build a fresh bus
    /// per engine if a test needs isolation.
    pub fn subscribe(&self, sink: Arc<dyn SensorSink>) {
        self.sinks.lock().unwrap().push(sink);
    }

    /// Publish an event to every registered sink.
    pub fn emit(
        &self,
        action_id: Option<String>,
        event_type: SensorEventType,
        timestamp_ms: u64,
        message: Option<String>,
        metadata: Option<Value>,
        priority: Option<Priority>,
    ) {
        let id = self
            .next_id
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let event = SensorEvent {
            id,
            timestamp: timestamp_ms,
            action_id,
            event_type,
            message,
            metadata,
            priority,
        };
        for sink in self.sinks.lock().unwrap().iter() {
            sink.record(&event);
        }
    }
}

impl Default for SensorBus {
    fn default() -> Self {
        Self::new()
    }
}

/// A sink that collects every event into memory, for tests and for
/// small in-process dashboards.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SensorEvent>>,
}

impl RecordingSink {
    /// Create an empty recording sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot every event recorded so far, in emission order.
    pub fn events(&self) -> Vec<SensorEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl SensorSink for RecordingSink {
    fn record(&self, event: &SensorEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
