//! The channel (action) configuration and its builder.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::duration::DurationMs;
use crate::id::ChannelId;

/// An async, fallible payload-rewriting talent: `schema`, `selector`,
/// and `transform` are all this shape — "take the current payload,
/// produce a new one, or fail."
pub type TalentFn = Arc<dyn Fn(Value) -> BoxFuture<'static, Result<Value, String>> + Send + Sync>;

/// The `condition` talent: "given the current payload, should dispatch
/// proceed?" Cannot fail — a condition that can't decide is a bug in the
/// caller, not a pipeline fault.
pub type ConditionFn = Arc<dyn Fn(Value) -> BoxFuture<'static, bool> + Send + Sync>;

/// How multiple handlers on one channel are combined.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionOperator {
    /// Exactly one handler; always the derived operator when
    /// `handler_count == 1`, regardless of the declared `dispatch`.
    Single,
    /// All handlers run concurrently; combined per [`CollectResults`].
    Parallel,
    /// Handlers run one after another in registration order.
    Sequential,
    /// First handler to settle (success or failure) wins.
    Race,
    /// Each handler receives the previous handler's output as its input.
    Waterfall,
}

/// How dispatch reacts to a handler failure.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorStrategy {
    /// The aggregate response fails as soon as any handler fails.
    FailFast,
    /// Failures are recorded; the response succeeds if at least one
    /// handler succeeded.
    Continue,
}

/// How `parallel`/`sequential` results are collapsed into one payload.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectResults {
    /// The first handler to resolve, in settlement order.
    First,
    /// The last handler in registration order.
    Last,
    /// An ordered list of every handler's outcome.
    All,
}

/// Call-volume classification; carried through for the sensor bus and
/// future scheduling priority (not otherwise interpreted by the core).
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Must run; never shed under breathing pressure.
    Critical,
    /// High priority.
    High,
    /// Default priority.
    Medium,
    /// Low priority; first to be shed under pressure.
    Low,
    /// Background work; shed first and most aggressively.
    Background,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

/// A repeat count for scheduled channels: a fixed number of executions,
/// or unbounded (runs until `forget`/`shutdown`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Repeat {
    /// Execute exactly `n` times. `n == 0` is rejected at registration.
    Times(u64),
    /// Execute until explicitly cancelled.
    Forever,
}

/// Channel (action) configuration. Immutable once registered — the
/// channel registry precompiles a protection pipeline and an execution
/// operator from this value and never re-reads it per call.
#[derive(Clone)]
pub struct ChannelConfig {
    /// Local id as supplied by the caller (before branch prefixing).
    pub id: String,
    /// Seed payload, used until the first successful dispatch replaces it.
    pub payload: Option<Value>,

    // --- Protections ---
    /// Minimum milliseconds between successive dispatches; `None`/`0`
    /// disables throttling.
    pub throttle: Option<DurationMs>,
    /// Milliseconds to coalesce bursts of calls into one dispatch;
    /// `None`/`0` disables debouncing.
    pub debounce: Option<DurationMs>,
    /// Upper bound on total debounce deferral from the first call in a burst.
    pub max_wait: Option<DurationMs>,
    /// Skip dispatch when the new payload is structurally equal to the
    /// last dispatched payload.
    pub detect_changes: bool,
    /// Reject calls whose payload is missing or an empty string.
    pub required: bool,
    /// Unconditionally reject every call to this channel.
    pub block: bool,

    // --- Talents ---
    /// Validates (and may rewrite) the payload; failure terminates the call.
    pub schema: Option<TalentFn>,
    /// Gates dispatch on a predicate over the payload.
    pub condition: Option<ConditionFn>,
    /// Projects the payload to a new value before dispatch.
    pub selector: Option<TalentFn>,
    /// Rewrites the payload immediately before dispatch (and before
    /// change detection).
    pub transform: Option<TalentFn>,

    // --- Scheduling ---
    /// Initial delay before the first execution, for scheduled channels.
    pub delay: Option<DurationMs>,
    /// Cadence between scheduled executions.
    pub interval: Option<DurationMs>,
    /// How many times a scheduled channel executes.
    pub repeat: Option<Repeat>,

    // --- Dispatch policy ---
    /// Declared multi-handler strategy; ignored (forced to `Single`) when
    /// only one handler is registered.
    pub dispatch: ExecutionOperator,
    /// How failures affect the aggregate response.
    pub error_strategy: ErrorStrategy,
    /// How multiple handler outcomes collapse into one payload.
    pub collect_results: CollectResults,
    /// Upper bound on aggregate dispatch wait; `None` means no bound
    /// (`race` defaults to 5s, `waterfall` to 15s if unset).
    pub dispatch_timeout: Option<DurationMs>,

    /// Call-volume classification.
    pub priority: Priority,
    /// Whether this channel's events are recorded on the sensor bus.
    pub log: bool,
}

impl ChannelConfig {
    /// Start building a channel config for the given local id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            payload: None,
            throttle: None,
            debounce: None,
            max_wait: None,
            detect_changes: false,
            required: false,
            block: false,
            schema: None,
            condition: None,
            selector: None,
            transform: None,
            delay: None,
            interval: None,
            repeat: None,
            dispatch: ExecutionOperator::Parallel,
            error_strategy: ErrorStrategy::FailFast,
            collect_results: CollectResults::All,
            dispatch_timeout: None,
            priority: Priority::Medium,
            log: true,
        }
    }

    /// Seed the channel's initial payload.
    pub fn payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Set the throttle window in milliseconds.
    pub fn throttle(mut self, ms: u64) -> Self {
        self.throttle = Some(DurationMs::from_millis(ms));
        self
    }

    /// Set the debounce window in milliseconds.
    pub fn debounce(mut self, ms: u64) -> Self {
        self.debounce = Some(DurationMs::from_millis(ms));
        self
    }

    /// Set the max-wait bound in milliseconds.
    pub fn max_wait(mut self, ms: u64) -> Self {
        self.max_wait = Some(DurationMs::from_millis(ms));
        self
    }

    /// Enable structural change detection.
    pub fn detect_changes(mut self, enabled: bool) -> Self {
        self.detect_changes = enabled;
        self
    }

    /// Require a non-empty payload.
    pub fn required(mut self, enabled: bool) -> Self {
        self.required = enabled;
        self
    }

    /// Unconditionally block calls to this channel.
    pub fn block(mut self, enabled: bool) -> Self {
        self.block = enabled;
        self
    }

    /// Attach a schema talent.
    pub fn schema(mut self, f: TalentFn) -> Self {
        self.schema = Some(f);
        self
    }

    /// Attach a condition talent.
    pub fn condition(mut self, f: ConditionFn) -> Self {
        self.condition = Some(f);
        self
    }

    /// Attach a selector talent.
    pub fn selector(mut self, f: TalentFn) -> Self {
        self.selector = Some(f);
        self
    }

    /// Attach a transform talent.
    pub fn transform(mut self, f: TalentFn) -> Self {
        self.transform = Some(f);
        self
    }

    /// Configure this channel as a scheduled channel.
    pub fn schedule(mut self, delay_ms: u64, interval_ms: u64, repeat: Repeat) -> Self {
        self.delay = Some(DurationMs::from_millis(delay_ms));
        self.interval = Some(DurationMs::from_millis(interval_ms));
        self.repeat = Some(repeat);
        self
    }

    /// Set the multi-handler dispatch strategy.
    pub fn dispatch(mut self, op: ExecutionOperator) -> Self {
        self.dispatch = op;
        self
    }

    /// Set the error strategy.
    pub fn error_strategy(mut self, strategy: ErrorStrategy) -> Self {
        self.error_strategy = strategy;
        self
    }

    /// Set the collect-results strategy.
    pub fn collect_results(mut self, strategy: CollectResults) -> Self {
        self.collect_results = strategy;
        self
    }

    /// Set the dispatch timeout in milliseconds.
    pub fn dispatch_timeout(mut self, ms: u64) -> Self {
        self.dispatch_timeout = Some(DurationMs::from_millis(ms));
        self
    }

    /// Set the call-volume priority.
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Disable sensor-bus logging for this channel.
    pub fn silent(mut self) -> Self {
        self.log = false;
        self
    }

    /// The fully qualified id this channel will be registered under,
    /// given a branch path prefix (empty string for the root).
    pub fn full_id(&self, branch_prefix: &str) -> ChannelId {
        ChannelId::under(branch_prefix, &self.id)
    }
}

impl std::fmt::Debug for ChannelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelConfig")
            .field("id", &self.id)
            .field("throttle", &self.throttle)
            .field("debounce", &self.debounce)
            .field("max_wait", &self.max_wait)
            .field("detect_changes", &self.detect_changes)
            .field("required", &self.required)
            .field("block", &self.block)
            .field("has_schema", &self.schema.is_some())
            .field("has_condition", &self.condition.is_some())
            .field("has_selector", &self.selector.is_some())
            .field("has_transform", &self.transform.is_some())
            .field("delay", &self.delay)
            .field("interval", &self.interval)
            .field("repeat", &self.repeat)
            .field("dispatch", &self.dispatch)
            .field("error_strategy", &self.error_strategy)
            .field("collect_results", &self.collect_results)
            .field("dispatch_timeout", &self.dispatch_timeout)
            .field("priority", &self.priority)
            .finish()
    }
}
