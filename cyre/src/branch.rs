//! Branches: namespaced subtrees of the channel registry.
//!
//! A branch is not a separate registry — it is a path prefix plus a
//! handle back to the owning engine. Every operation delegates to the
//! engine after qualifying the id, so branch channels live in the exact
//! same `ChannelRegistry` as root channels (see `registry::channels_under`).

use cyre_core::{ChannelConfig, ChannelId, EngineError, Handler, HandlerError, Response};
use serde_json::Value;

use crate::engine::Cyre;

/// A namespaced handle onto a subtree of an engine's channels.
///
/// `action`/`on`/`call` transparently qualify local ids with this
/// branch's path; `call` additionally refuses any id that resolves
/// outside the branch's own subtree, so a branch can reach its own
/// descendants but never a sibling or a parent.
#[derive(Clone)]
pub struct Branch {
    engine: Cyre,
    path: String,
}

impl Branch {
    pub(crate) fn new(engine: Cyre, path: String) -> Self {
        Self { engine, path }
    }

    /// This branch's fully qualified path prefix (empty for the root).
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Open a child branch nested under this one.
    pub fn branch(&self, local_id: impl Into<String>) -> Branch {
        let local = local_id.into();
        let path = if self.path.is_empty() {
            local
        } else {
            format!("{}/{}", self.path, local)
        };
        Branch::new(self.engine.clone(), path)
    }

    /// Register a channel under this branch's path.
    pub fn action(&self, config: ChannelConfig) -> Result<ChannelId, EngineError> {
        self.engine.action_under(&self.path, config)
    }

    /// Register a handler for a channel local to this branch.
    pub fn on(&self, local_id: &str, handler: Handler) -> Result<usize, HandlerError> {
        let full = ChannelId::under(&self.path, local_id);
        self.engine.on(full.as_str(), handler)
    }

    /// Call a channel local to this branch (or any of its descendants,
    /// addressed by their full id). Rejects ids outside this branch's
    /// subtree with [`cyre_core::ErrorTag::InvalidId`].
    pub async fn call(&self, id: &str, payload: Option<Value>) -> Response {
        let candidate = if ChannelId::new(id).is_under(&self.path) {
            id.to_string()
        } else {
            ChannelId::under(&self.path, id).to_string()
        };

        if !ChannelId::new(candidate.clone()).is_under(&self.path) {
            return Response::from_tag(
                cyre_core::ErrorTag::InvalidId,
                "branch cannot reach outside its own path",
            );
        }

        self.engine.call(&candidate, payload).await
    }

    /// Cascade-destroy every channel in this branch's subtree: cancels
    /// their scheduling formations and debounce timers, removes their
    /// handlers, payload history, and registry entries.
    pub async fn destroy(&self) {
        self.engine.destroy_branch(&self.path);
    }
}
