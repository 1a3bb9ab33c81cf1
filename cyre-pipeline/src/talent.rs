//! The `Talent` contract — a single protection-pipeline step.
//!
//! Directly modeled on the teacher's `Hook::on_event` / `HookRegistry`
//! short-circuiting pipeline: an ordered sequence of steps is evaluated,
//! and the pipeline stops at the first step that doesn't say "continue."

use async_trait::async_trait;
use cyre_core::{ErrorTag, Response};
use serde_json::Value;

/// Read-only context available to a talent while it decides.
#[derive(Debug, Clone, Default)]
pub struct TalentContext {
    /// The channel's last successfully dispatched payload, if any —
    /// used by the change-detection talent.
    pub last_payload: Option<Value>,
}

/// What a talent decides, given the current payload.
pub enum TalentOutcome {
    /// Proceed to the next talent with (possibly rewritten) payload.
    Next(Value),
    /// Terminate the pipeline with this response; no further talents run
    /// and dispatch does not occur.
    Done(Response),
}

impl TalentOutcome {
    /// Build a `Done` outcome from an [`ErrorTag`] and message.
    pub fn terminate(tag: ErrorTag, message: impl Into<String>) -> Self {
        TalentOutcome::Done(Response::from_tag(tag, message))
    }
}

/// A single protection-pipeline step.
///
/// Implementations: [`crate::builtin::Block`], [`crate::builtin::Required`],
/// [`crate::builtin::Schema`], [`crate::builtin::Selector`],
/// [`crate::builtin::Condition`], [`crate::builtin::Transform`],
/// [`crate::builtin::DetectChanges`].
///
/// Talents SHOULD complete quickly — they run on every admitted call.
#[async_trait]
pub trait Talent: Send + Sync {
    /// Apply this talent to the current payload.
    async fn apply(&self, payload: Value, ctx: &TalentContext) -> TalentOutcome;

    /// Short name used in sensor events and diagnostics.
    fn name(&self) -> &'static str;
}
