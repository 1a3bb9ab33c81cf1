//! # cyre-pipeline — the protection pipeline (talent chain)
//!
//! A channel's protections and talents (`block`, `required`, `schema`,
//! `selector`, `condition`, `transform`, `detect_changes`) precompile
//! into a [`Pipeline`]: an ordered list of [`Talent`] steps that a
//! payload is threaded through before dispatch. The first step that
//! returns [`TalentOutcome::Done`] stops the pipeline and that response
//! is returned to the caller without dispatching any handler.
//!
//! `debounce` and `throttle` are not pipeline steps here — they need
//! mutable per-channel timing state and TimeKeeper coordination that
//! this crate, by design, does not own. See the `cyre` facade crate.

#![deny(missing_docs)]

pub mod builtin;
pub mod pipeline;
pub mod talent;

pub use builtin::{Block, Condition, DetectChanges, Required, Schema, Selector, Transform};
pub use pipeline::{Pipeline, PipelineResult};
pub use talent::{Talent, TalentContext, TalentOutcome};
