//! The response envelope returned by every `call`, and the canonical
//! error taxonomy carried inside it.

use crate::channel::{CollectResults, ExecutionOperator};
use crate::id::ChannelId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Canonical error/skip tags. These appear in [`Response::message`] and,
/// for genuine faults, in [`Response::error`].
///
/// Validation/protection terminations (`Blocked`..`Debounced`) and system
/// faults (`Offline`..`NoSubscriber`) are never counted as errors — only
/// user-code faults (`SelectorFailed`, `TransformFailed`, `HandlerError`)
/// and `DispatchTimeout` set `Response::error = Some(true)`.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorTag {
    /// `shutdown()` has been called.
    Offline,
    /// `lock()` has been called.
    Locked,
    /// The id was empty or malformed.
    InvalidId,
    /// The same handler closure was registered twice.
    DuplicateHandler,
    /// The channel has no registered handlers.
    NoSubscriber,
    /// `required=true` and the payload was missing/empty.
    RequiredMissing,
    /// The `schema` talent rejected the payload.
    SchemaFailed,
    /// The `selector` talent raised an error.
    SelectorFailed,
    /// The `condition` talent returned falsy.
    ConditionNotMet,
    /// The `transform` talent raised an error.
    TransformFailed,
    /// `detectChanges=true` and the payload was structurally unchanged.
    NoChange,
    /// A call arrived before `throttle` had elapsed.
    Throttled,
    /// The call was deferred by `debounce` (informational, not terminal).
    Debounced,
    /// The aggregate dispatch exceeded `dispatch_timeout`.
    DispatchTimeout,
    /// One or more handlers returned/rejected with an error.
    HandlerError,
    /// `block=true` on the channel.
    Blocked,
}

impl ErrorTag {
    /// Whether this tag counts as a genuine error (vs. a skip/system fault
    /// that is `ok:false` but not `error:true`). Only user-code faults and
    /// timeouts are counted as errors.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            ErrorTag::SelectorFailed
                | ErrorTag::TransformFailed
                | ErrorTag::HandlerError
                | ErrorTag::DispatchTimeout
        )
    }
}

impl std::fmt::Display for ErrorTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorTag::Offline => "OFFLINE",
            ErrorTag::Locked => "LOCKED",
            ErrorTag::InvalidId => "INVALID_ID",
            ErrorTag::DuplicateHandler => "DUPLICATE_HANDLER",
            ErrorTag::NoSubscriber => "NO_SUBSCRIBER",
            ErrorTag::RequiredMissing => "REQUIRED_MISSING",
            ErrorTag::SchemaFailed => "SCHEMA_FAILED",
            ErrorTag::SelectorFailed => "SELECTOR_FAILED",
            ErrorTag::ConditionNotMet => "CONDITION_NOT_MET",
            ErrorTag::TransformFailed => "TRANSFORM_FAILED",
            ErrorTag::NoChange => "NO_CHANGE",
            ErrorTag::Throttled => "THROTTLED",
            ErrorTag::Debounced => "DEBOUNCED",
            ErrorTag::DispatchTimeout => "DISPATCH_TIMEOUT",
            ErrorTag::HandlerError => "HANDLER_ERROR",
            ErrorTag::Blocked => "BLOCKED",
        };
        write!(f, "{s}")
    }
}

/// A chained call enqueued because a handler's return value named
/// another channel id (see [`crate::handler::HandlerResult::Chain`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntraLink {
    /// The channel id that will be called next.
    pub id: ChannelId,
    /// The payload to call it with, if any.
    pub payload: Option<Value>,
}

/// Metadata describing how a dispatch was executed.
#[non_exhaustive]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseMetadata {
    /// The execution operator actually used (may differ from the
    /// channel's declared `dispatch` — see execution operator derivation).
    pub execution_operator: Option<ExecutionOperator>,
    /// Number of handlers registered at dispatch time.
    pub handler_count: usize,
    /// Wall-clock time the dispatch took, in milliseconds.
    pub execution_time_ms: u64,
    /// Whether a `dispatch_timeout` was configured for this dispatch.
    pub has_timeout: bool,
    /// The declared dispatch strategy (may differ from `execution_operator`).
    pub strategy: Option<ExecutionOperator>,
    /// The collect-results strategy used to combine handler outcomes.
    pub collect_results: Option<CollectResults>,
    /// Count of handlers that completed successfully.
    pub successful_handlers: Option<usize>,
    /// Count of handlers that failed.
    pub failed_handlers: Option<usize>,
    /// Chained calls to enqueue, one per handler whose result named a
    /// next channel, in handler registration order.
    pub intra_links: Vec<IntraLink>,
}

/// The uniform response returned by every `call`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Whether the call succeeded and a dispatch occurred.
    pub ok: bool,
    /// The payload produced by dispatch, if any.
    pub payload: Option<Value>,
    /// Human-readable message; for non-ok responses this names the
    /// [`ErrorTag`] that terminated the pipeline or dispatch.
    pub message: String,
    /// Set to `true` only for genuine errors (see [`ErrorTag::is_error`]).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<bool>,
    /// Execution metadata, present whenever a dispatch was attempted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResponseMetadata>,
}

impl Response {
    /// Build a successful response.
    pub fn ok(payload: Option<Value>, message: impl Into<String>) -> Self {
        Self {
            ok: true,
            payload,
            message: message.into(),
            error: None,
            metadata: None,
        }
    }

    /// Build a non-ok response from an [`ErrorTag`], with `error` set
    /// according to [`ErrorTag::is_error`].
    pub fn from_tag(tag: ErrorTag, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            payload: None,
            message: message.into(),
            error: tag.is_error().then_some(true),
            metadata: None,
        }
    }

    /// Attach metadata, returning `self` for chaining.
    pub fn with_metadata(mut self, metadata: ResponseMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Attach a payload, returning `self` for chaining.
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }
}
