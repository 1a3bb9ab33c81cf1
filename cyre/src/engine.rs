//! The public engine surface: registers channels and handlers, runs the
//! full call pipeline (protections, debounce/throttle, dispatch,
//! intra-link draining), and owns scheduling and stress sampling for
//! every channel it registers.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use serde_json::Value;

use cyre_breathing::BreathingController;
use cyre_core::{
    ChannelConfig, ChannelId, Clock, ClockHandle, DurationMs, EngineError, Handler, HandlerError,
    IntraLink, Repeat, Response, SensorBus, SensorEventType, SystemClock,
};
use cyre_pipeline::{PipelineResult, TalentContext};
use cyre_timekeeper::TimeKeeper;

use crate::branch::Branch;
use crate::debounce::DebounceBurst;
use crate::handlers::HandlerRegistry;
use crate::registry::{ChannelEntry, ChannelRegistry};
use crate::store::{Metrics, PayloadStore};

struct Inner {
    channels: ChannelRegistry,
    handlers: HandlerRegistry,
    payloads: PayloadStore,
    timekeeper: TimeKeeper,
    breathing: BreathingController,
    sensor: SensorBus,
    clock: ClockHandle,
    intra_queue: Mutex<VecDeque<IntraLink>>,
    offline: AtomicBool,
}

/// The action bus. Cheap to clone — every clone shares the same
/// registries, scheduler, and breathing controller.
#[derive(Clone)]
pub struct Cyre(Arc<Inner>);

impl Cyre {
    /// Build a new engine backed by the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock::new()))
    }

    /// Build a new engine backed by an injectable clock (see
    /// `cyre_core::clock::test_utils::VirtualClock` for deterministic tests).
    pub fn with_clock(clock: ClockHandle) -> Self {
        Self(Arc::new(Inner {
            channels: ChannelRegistry::new(),
            handlers: HandlerRegistry::new(),
            payloads: PayloadStore::new(),
            timekeeper: TimeKeeper::new(),
            breathing: BreathingController::new(),
            sensor: SensorBus::new(),
            clock,
            intra_queue: Mutex::new(VecDeque::new()),
            offline: AtomicBool::new(false),
        }))
    }

    /// Start the breathing sampler. Idempotent.
    pub fn init(&self) -> &Self {
        self.0.breathing.start();
        self
    }

    /// The sensor bus every channel's events are published to.
    pub fn sensor(&self) -> &SensorBus {
        &self.0.sensor
    }

    /// Open the root branch (path prefix `""`).
    pub fn branch(&self) -> Branch {
        Branch::new(self.clone(), String::new())
    }

    /// Register a root channel.
    pub fn action(&self, config: ChannelConfig) -> Result<ChannelId, EngineError> {
        self.action_under("", config)
    }

    pub(crate) fn action_under(
        &self,
        prefix: &str,
        config: ChannelConfig,
    ) -> Result<ChannelId, EngineError> {
        if self.0.offline.load(Ordering::SeqCst) {
            return Err(EngineError::Offline);
        }
        if !self.0.breathing.can_register(self.0.channels.is_locked()) {
            return Err(EngineError::Locked);
        }

        let full_id = config.full_id(prefix);
        let seed_payload = config.payload.clone();
        let delay = config.delay;
        let interval = config.interval;
        let repeat = config.repeat;

        let entry = self.0.channels.register(full_id.clone(), config)?;

        if let Some(payload) = seed_payload {
            self.0.payloads.seed(full_id.clone(), payload);
        }

        if let Some(interval) = interval {
            self.schedule(Arc::clone(&entry), delay.unwrap_or(DurationMs::ZERO), interval, repeat.unwrap_or(Repeat::Forever))?;
        }

        Ok(full_id)
    }

    fn schedule(
        &self,
        entry: Arc<ChannelEntry>,
        delay: DurationMs,
        interval: DurationMs,
        repeat: Repeat,
    ) -> Result<(), EngineError> {
        let id = entry.id.to_string();

        let engine = self.clone();
        let tick_id = id.clone();
        let tick: cyre_timekeeper::TickFn = Arc::new(move || {
            let engine = engine.clone();
            let id = tick_id.clone();
            Box::pin(async move {
                let response = engine.call(&id, None).await;
                if response.error == Some(true) {
                    Err(response.message)
                } else {
                    Ok(())
                }
            }) as BoxFuture<'static, Result<(), String>>
        });

        let breathing = self.clone();
        let stress: cyre_timekeeper::StressFn = Arc::new(move || breathing.0.breathing.state().stress);

        self.0
            .timekeeper
            .keep(id, delay, interval, repeat, tick, Some(stress))
            .map_err(EngineError::TimeKeeper)?;
        Ok(())
    }

    /// Register a handler for a channel, by its fully qualified id.
    pub fn on(&self, id: impl AsRef<str>, handler: Handler) -> Result<usize, HandlerError> {
        self.0.handlers.add(ChannelId::new(id.as_ref()), handler)
    }

    /// Call a channel: runs its protection pipeline, applies
    /// debounce/throttle, dispatches to its handlers, and drains any
    /// intra-links the dispatch produced before returning.
    pub async fn call(&self, id: impl AsRef<str>, payload: Option<Value>) -> Response {
        let response = self.call_inner(id.as_ref(), payload).await;
        self.drain_intra_links().await;
        response
    }

    async fn call_inner(&self, id: &str, payload: Option<Value>) -> Response {
        if self.0.offline.load(Ordering::SeqCst) {
            return Response::from_tag(cyre_core::ErrorTag::Offline, "engine is offline");
        }

        let Some(entry) = self.0.channels.get(id) else {
            return Response::from_tag(
                cyre_core::ErrorTag::InvalidId,
                format!("channel not found: {id}"),
            );
        };

        let payload = payload.unwrap_or_else(|| {
            entry
                .config
                .payload
                .clone()
                .unwrap_or(Value::Null)
        });

        let ctx = TalentContext {
            last_payload: self.0.payloads.get(id),
        };

        let admitted = match entry.pipeline.run(payload, &ctx).await {
            PipelineResult::Terminated(response) => {
                self.emit_pipeline_skip(&entry, &response);
                return response;
            }
            PipelineResult::Proceed(payload) => payload,
        };

        if let Some(debounce_ms) = entry.config.debounce.filter(|d| !d.is_zero()) {
            return self.handle_debounce(entry, admitted, debounce_ms);
        }

        if let Some(throttle_ms) = entry.config.throttle.filter(|t| !t.is_zero()) {
            let now = self.0.clock.now_ms();
            let last = entry.bookkeeping.lock().unwrap().last_exec_time;
            if let Some(last) = last {
                let elapsed = now.saturating_sub(last);
                if elapsed < throttle_ms.as_millis() {
                    let remaining = throttle_ms.as_millis() - elapsed;
                    let response = Response::from_tag(
                        cyre_core::ErrorTag::Throttled,
                        format!("throttled, {remaining}ms remaining"),
                    );
                    self.emit_sensor(&entry, SensorEventType::Throttle, &response);
                    return response;
                }
            }
        }

        self.dispatch_now(entry, admitted).await
    }

    fn handle_debounce(
        &self,
        entry: Arc<ChannelEntry>,
        payload: Value,
        debounce_ms: DurationMs,
    ) -> Response {
        let now = self.0.clock.now_ms();

        let (generation, arm_max_wait, first_call_at) = {
            let mut book = entry.bookkeeping.lock().unwrap();
            let burst = book.debounce.get_or_insert_with(|| DebounceBurst {
                generation: 0,
                pending_payload: Value::Null,
                first_call_at: now,
                max_wait_armed: false,
            });
            burst.generation += 1;
            burst.pending_payload = payload;
            let arm = entry.config.max_wait.is_some() && !burst.max_wait_armed;
            if arm {
                burst.max_wait_armed = true;
            }
            (burst.generation, arm, burst.first_call_at)
        };

        let response = Response::from_tag(cyre_core::ErrorTag::Debounced, "debounced");
        self.emit_sensor(&entry, SensorEventType::Debounce, &response);

        let engine = self.clone();
        let wake_entry = Arc::clone(&entry);
        tokio::spawn(async move {
            engine.0.timekeeper.wait(debounce_ms).await;
            engine.fire_debounce(wake_entry, generation).await;
        });

        if arm_max_wait {
            if let Some(max_wait) = entry.config.max_wait {
                let elapsed = now.saturating_sub(first_call_at);
                let remaining = DurationMs::from_millis(max_wait.as_millis().saturating_sub(elapsed));
                let engine = self.clone();
                let wake_entry = Arc::clone(&entry);
                tokio::spawn(async move {
                    engine.0.timekeeper.wait(remaining).await;
                    engine.fire_max_wait(wake_entry, first_call_at).await;
                });
            }
        }

        response
    }

    async fn fire_debounce(&self, entry: Arc<ChannelEntry>, generation: u64) {
        let payload = {
            let mut book = entry.bookkeeping.lock().unwrap();
            match &book.debounce {
                Some(burst) if burst.generation == generation => {
                    let payload = burst.pending_payload.clone();
                    book.debounce = None;
                    Some(payload)
                }
                _ => None,
            }
        };
        if let Some(payload) = payload {
            self.dispatch_now(entry, payload).await;
            self.drain_intra_links().await;
        }
    }

    async fn fire_max_wait(&self, entry: Arc<ChannelEntry>, expected_first_call_at: u64) {
        let payload = {
            let mut book = entry.bookkeeping.lock().unwrap();
            match &book.debounce {
                Some(burst) if burst.first_call_at == expected_first_call_at => {
                    let payload = burst.pending_payload.clone();
                    book.debounce = None;
                    Some(payload)
                }
                _ => None,
            }
        };
        if let Some(payload) = payload {
            self.dispatch_now(entry, payload).await;
            self.drain_intra_links().await;
        }
    }

    async fn dispatch_now(&self, entry: Arc<ChannelEntry>, payload: Value) -> Response {
        let handlers = self.0.handlers.list(entry.id.as_str());
        if handlers.is_empty() {
            let response = Response::from_tag(
                cyre_core::ErrorTag::NoSubscriber,
                format!("no subscriber for {}", entry.id),
            );
            self.emit_sensor(&entry, SensorEventType::Error, &response);
            return response;
        }

        let request = cyre_dispatch::DispatchRequest {
            channel_id: entry.id.to_string(),
            payload: payload.clone(),
            handlers,
            declared_operator: entry.config.dispatch,
            error_strategy: entry.config.error_strategy,
            collect_results: entry.config.collect_results,
            dispatch_timeout: entry.config.dispatch_timeout,
        };

        let outcome = cyre_dispatch::dispatch(request).await;
        let response = outcome.response;

        let now = self.0.clock.now_ms();
        if response.ok {
            self.0
                .payloads
                .update(entry.id.clone(), payload, response.clone(), now);
            let mut book = entry.bookkeeping.lock().unwrap();
            book.last_exec_time = Some(now);
            book.execution_count += 1;
        } else if response.error == Some(true) {
            entry.bookkeeping.lock().unwrap().error_count += 1;
        }

        let event_type = if response.ok {
            SensorEventType::Success
        } else if response.error == Some(true) {
            SensorEventType::Error
        } else {
            SensorEventType::Skip
        };
        self.emit_sensor(&entry, event_type, &response);

        if !outcome.intra_links.is_empty() {
            let mut queue = self.0.intra_queue.lock().unwrap();
            for link in outcome.intra_links {
                queue.push_back(link);
            }
        }

        response
    }

    async fn drain_intra_links(&self) {
        loop {
            let next = self.0.intra_queue.lock().unwrap().pop_front();
            let Some(link) = next else { break };
            self.call_inner(link.id.as_str(), link.payload).await;
        }
    }

    fn emit_pipeline_skip(&self, entry: &ChannelEntry, response: &Response) {
        let event_type = match response.error {
            Some(true) => SensorEventType::Error,
            _ if entry.config.block => SensorEventType::Blocked,
            _ => SensorEventType::Skip,
        };
        self.emit_sensor(entry, event_type, response);
    }

    fn emit_sensor(&self, entry: &ChannelEntry, event_type: SensorEventType, response: &Response) {
        if !entry.config.log {
            return;
        }
        self.0.sensor.emit(
            Some(entry.id.to_string()),
            event_type,
            self.0.clock.now_ms(),
            Some(response.message.clone()),
            None,
            Some(entry.config.priority),
        );
    }

    /// Remove a channel: cancels any scheduling formation, drops its
    /// handlers, and forgets its payload history.
    pub fn forget(&self, id: &str) -> bool {
        self.0.timekeeper.forget(id);
        self.0.handlers.remove_all(id);
        self.0.payloads.forget(id);
        self.0.channels.forget(id).is_some()
    }

    pub(crate) fn destroy_branch(&self, prefix: &str) {
        for entry in self.0.channels.channels_under(prefix) {
            self.0.timekeeper.forget(entry.id.as_str());
            self.0.handlers.remove_all(entry.id.as_str());
            self.0.payloads.forget(entry.id.as_str());
            self.0.channels.forget(entry.id.as_str());
        }
    }

    /// Pause one scheduled channel, or every scheduled channel when `id`
    /// is `None`.
    pub fn pause(&self, id: Option<&str>) {
        self.0.timekeeper.pause(id);
    }

    /// Resume one scheduled channel, or every scheduled channel when
    /// `id` is `None`.
    pub fn resume(&self, id: Option<&str>) {
        self.0.timekeeper.resume(id);
    }

    /// Reject further channel registrations. Irreversible.
    pub fn lock(&self) {
        self.0.channels.lock();
    }

    /// Take the engine offline: cancels every scheduling formation,
    /// stops the breathing sampler, and clears every registry. Every
    /// subsequent `call` returns `ErrorTag::Offline`.
    pub fn shutdown(&self) {
        self.0.offline.store(true, Ordering::SeqCst);
        self.0.timekeeper.shutdown();
        self.0.breathing.shutdown();
        self.0.channels.clear();
        self.0.handlers.clear();
        self.0.payloads.clear();
    }

    /// Whether `payload` differs from the channel's last dispatched
    /// payload.
    pub fn has_changed(&self, id: &str, payload: &Value) -> bool {
        self.0.payloads.has_changed(id, payload)
    }

    /// The payload current immediately before the last successful
    /// dispatch.
    pub fn get_previous(&self, id: &str) -> Option<Value> {
        self.0.payloads.get_previous(id)
    }

    /// The channel's last known payload.
    pub fn get(&self, id: &str) -> Option<Value> {
        self.0.payloads.get(id)
    }

    /// Execution counters and timing for a channel.
    pub fn get_metrics(&self, id: &str) -> Option<Metrics> {
        let entry = self.0.channels.get(id)?;
        let book = entry.bookkeeping.lock().unwrap();
        Some(Metrics {
            execution_count: book.execution_count,
            error_count: book.error_count,
            last_exec_time: book.last_exec_time,
            updated_at: self.0.payloads.updated_at(id),
        })
    }
}

impl Default for Cyre {
    fn default() -> Self {
        Self::new()
    }
}
