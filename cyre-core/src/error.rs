//! Error types for each core component.
//!
//! Mirrors the response envelope's error tags (see [`crate::response::ErrorTag`])
//! but each component owns its own narrow enum rather than one monolithic
//! error — registration failures, handler failures, dispatch failures, and
//! scheduling failures are distinct concerns with distinct recovery.

use thiserror::Error;

/// Channel registry errors.
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The supplied id was empty (after trimming) or otherwise malformed.
    #[error("invalid id: {0}")]
    InvalidId(String),

    /// A channel with this id is already registered and replacement was
    /// not requested.
    #[error("duplicate id: {0}")]
    DuplicateId(String),

    /// The engine is locked; no new registrations are accepted.
    #[error("registry is locked")]
    Locked,

    /// No channel is registered under this id.
    #[error("channel not found: {0}")]
    NotFound(String),
}

/// Handler registry errors.
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// The exact same handler closure is already registered for this id.
    #[error("duplicate handler for {0}")]
    DuplicateHandler(String),

    /// No channel is registered under this id.
    #[error("channel not found: {0}")]
    ChannelNotFound(String),
}

/// Dispatch executor errors.
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The channel has zero registered handlers.
    #[error("no subscriber for {0}")]
    NoSubscriber(String),

    /// The aggregate wait for handlers exceeded `dispatch_timeout`.
    #[error("dispatch timed out after {0}ms")]
    Timeout(u64),

    /// One or more handlers returned/rejected with an error.
    #[error("handler error: {0}")]
    HandlerError(String),
}

/// TimeKeeper errors.
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimeKeeperError {
    /// `repeat = 0` was requested; a schedule that never executes is
    /// rejected rather than silently accepted.
    #[error("repeat=0 is not a valid schedule")]
    ZeroRepeat,

    /// No formation is registered under this id.
    #[error("no formation for {0}")]
    NotFound(String),
}

/// Top-level errors surfaced by the public engine surface.
///
/// These are the "system fault" category from the response envelope:
/// they never represent a protection-pipeline outcome (those are
/// [`crate::response::ErrorTag`] values embedded in an `ok:false`
/// response, not a `Result::Err`).
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// `shutdown()` has already been called; the engine rejects all calls.
    #[error("engine is offline")]
    Offline,

    /// `lock()` has been called; registration is rejected.
    #[error("engine is locked")]
    Locked,

    /// Propagated registry error.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Propagated handler error.
    #[error("handler error: {0}")]
    Handler(#[from] HandlerError),

    /// Propagated TimeKeeper error.
    #[error("timekeeper error: {0}")]
    TimeKeeper(#[from] TimeKeeperError),
}
