//! The precompiled, ordered protection pipeline.
//!
//! Covers block, required, schema, selector, condition, transform, and
//! detect-changes. Debounce and throttle need mutable per-channel timing
//! bookkeeping and TimeKeeper coordination that cross into registry/engine
//! state, so they are applied by the `cyre` facade crate immediately after
//! this pipeline yields a payload — see `cyre::engine::Cyre::call`.

use cyre_core::{ChannelConfig, Response};
use serde_json::Value;
use std::sync::Arc;

use crate::builtin::{Block, Condition, DetectChanges, Required, Schema, Selector, Transform};
use crate::talent::{Talent, TalentContext, TalentOutcome};

/// Result of running the pipeline to completion.
pub enum PipelineResult {
    /// Every configured talent passed; dispatch may proceed with this payload.
    Proceed(Value),
    /// A talent terminated the call; this response is returned to the
    /// caller without dispatching.
    Terminated(Response),
}

/// The ordered, precompiled list of talents for one channel.
///
/// Built once at channel registration (`Pipeline::compile`), not
/// re-derived per call — this is what "precompiles the protection
/// pipeline" means concretely.
pub struct Pipeline {
    steps: Vec<Arc<dyn Talent>>,
}

impl Pipeline {
    /// Compile the fixed-order pipeline for a channel config, including
    /// only the steps that are actually configured.
    pub fn compile(config: &ChannelConfig) -> Self {
        let mut steps: Vec<Arc<dyn Talent>> = Vec::new();

        if config.block {
            steps.push(Arc::new(Block));
        }
        if config.required {
            steps.push(Arc::new(Required));
        }
        if let Some(schema) = &config.schema {
            steps.push(Arc::new(Schema(schema.clone())));
        }
        if let Some(selector) = &config.selector {
            steps.push(Arc::new(Selector(selector.clone())));
        }
        if let Some(condition) = &config.condition {
            steps.push(Arc::new(Condition(condition.clone())));
        }
        if let Some(transform) = &config.transform {
            steps.push(Arc::new(Transform(transform.clone())));
        }
        if config.detect_changes {
            steps.push(Arc::new(DetectChanges));
        }

        Self { steps }
    }

    /// Run every step in order, short-circuiting on the first `Done`.
    pub async fn run(&self, mut payload: Value, ctx: &TalentContext) -> PipelineResult {
        for step in &self.steps {
            match step.apply(payload, ctx).await {
                TalentOutcome::Next(next) => payload = next,
                TalentOutcome::Done(response) => return PipelineResult::Terminated(response),
            }
        }
        PipelineResult::Proceed(payload)
    }

    /// Number of configured steps (for diagnostics/tests).
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether no steps are configured (an unprotected channel).
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
