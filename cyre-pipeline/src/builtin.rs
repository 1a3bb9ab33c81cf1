//! Built-in talents, in the fixed pipeline order: block, required, schema,
//! selector, condition, transform, detect-changes.

use async_trait::async_trait;
use cyre_core::{ConditionFn, ErrorTag, TalentFn};
use serde_json::Value;

use crate::talent::{Talent, TalentContext, TalentOutcome};

/// Step 1 — unconditionally reject every call.
pub struct Block;

#[async_trait]
impl Talent for Block {
    async fn apply(&self, _payload: Value, _ctx: &TalentContext) -> TalentOutcome {
        TalentOutcome::terminate(ErrorTag::Blocked, "blocked")
    }

    fn name(&self) -> &'static str {
        "block"
    }
}

/// Step 2 — reject a `null` or empty-string payload. Other falsy JSON
/// values (`0`, `false`) are valid.
pub struct Required;

#[async_trait]
impl Talent for Required {
    async fn apply(&self, payload: Value, _ctx: &TalentContext) -> TalentOutcome {
        let missing = match &payload {
            Value::Null => true,
            Value::String(s) if s.is_empty() => true,
            _ => false,
        };
        if missing {
            TalentOutcome::terminate(ErrorTag::RequiredMissing, "payload is required")
        } else {
            TalentOutcome::Next(payload)
        }
    }

    fn name(&self) -> &'static str {
        "required"
    }
}

/// Step 3 — validate (and may rewrite) the payload.
pub struct Schema(pub TalentFn);

#[async_trait]
impl Talent for Schema {
    async fn apply(&self, payload: Value, _ctx: &TalentContext) -> TalentOutcome {
        match (self.0)(payload).await {
            Ok(next) => TalentOutcome::Next(next),
            Err(message) => TalentOutcome::terminate(ErrorTag::SchemaFailed, message),
        }
    }

    fn name(&self) -> &'static str {
        "schema"
    }
}

/// Step 4 — project the payload to a new value.
pub struct Selector(pub TalentFn);

#[async_trait]
impl Talent for Selector {
    async fn apply(&self, payload: Value, _ctx: &TalentContext) -> TalentOutcome {
        match (self.0)(payload).await {
            Ok(next) => TalentOutcome::Next(next),
            Err(message) => TalentOutcome::terminate(ErrorTag::SelectorFailed, message),
        }
    }

    fn name(&self) -> &'static str {
        "selector"
    }
}

/// Step 5 — gate dispatch on a predicate; a falsy result is a skip, not
/// an error.
pub struct Condition(pub ConditionFn);

#[async_trait]
impl Talent for Condition {
    async fn apply(&self, payload: Value, _ctx: &TalentContext) -> TalentOutcome {
        if (self.0)(payload.clone()).await {
            TalentOutcome::Next(payload)
        } else {
            TalentOutcome::terminate(ErrorTag::ConditionNotMet, "condition not met")
        }
    }

    fn name(&self) -> &'static str {
        "condition"
    }
}

/// Step 6 — rewrite the payload immediately before dispatch.
pub struct Transform(pub TalentFn);

#[async_trait]
impl Talent for Transform {
    async fn apply(&self, payload: Value, _ctx: &TalentContext) -> TalentOutcome {
        match (self.0)(payload).await {
            Ok(next) => TalentOutcome::Next(next),
            Err(message) => TalentOutcome::terminate(ErrorTag::TransformFailed, message),
        }
    }

    fn name(&self) -> &'static str {
        "transform"
    }
}

/// Step 7 — skip dispatch when the payload is structurally unchanged
/// from the last dispatched payload. Runs after `transform`, so a
/// transform that normalizes its output is what change detection
/// actually compares.
///
/// `serde_json::Value`'s `PartialEq` already performs deep structural
/// comparison, so no bespoke deep-equal routine is needed here.
pub struct DetectChanges;

#[async_trait]
impl Talent for DetectChanges {
    async fn apply(&self, payload: Value, ctx: &TalentContext) -> TalentOutcome {
        if ctx.last_payload.as_ref() == Some(&payload) {
            TalentOutcome::terminate(ErrorTag::NoChange, "payload unchanged")
        } else {
            TalentOutcome::Next(payload)
        }
    }

    fn name(&self) -> &'static str {
        "detect_changes"
    }
}
