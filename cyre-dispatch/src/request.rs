//! The inputs and outputs of one dispatch.

use cyre_core::{CollectResults, DurationMs, ErrorStrategy, ExecutionOperator, Handler, IntraLink, Response};
use serde_json::Value;

/// Everything the executor needs to dispatch one call. Built by the
/// engine from a `ChannelConfig` and its current handler list — the
/// executor itself holds no channel state.
pub struct DispatchRequest {
    /// Fully qualified channel id, used only for error messages and
    /// sensor events.
    pub channel_id: String,
    /// The payload admitted by the protection pipeline.
    pub payload: Value,
    /// Registered handlers, in registration order.
    pub handlers: Vec<Handler>,
    /// The channel's declared multi-handler strategy.
    pub declared_operator: ExecutionOperator,
    /// How failures affect the aggregate response.
    pub error_strategy: ErrorStrategy,
    /// How multiple handler outcomes collapse into one payload.
    pub collect_results: CollectResults,
    /// Upper bound on aggregate dispatch wait.
    pub dispatch_timeout: Option<DurationMs>,
}

/// What one dispatch produced.
pub struct DispatchOutcome {
    /// The response to return to the caller.
    pub response: Response,
    /// Chain calls to enqueue after this dispatch unwinds, one per
    /// handler whose result named a next channel, in registration order.
    pub intra_links: Vec<IntraLink>,
}
