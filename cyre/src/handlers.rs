//! The handler registry: an ordered list of subscribers per channel id.
//!
//! Duplicate detection compares `Arc` pointer identity rather than
//! requiring `PartialEq` on the boxed closure, mirroring the teacher's
//! `Arc<dyn Operator>` registration pattern generalized to arbitrary
//! closures instead of a fixed trait.

use std::collections::HashMap;
use std::sync::RwLock;

use cyre_core::{ChannelId, Handler, HandlerError};

/// Owns every channel's ordered handler list.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<ChannelId, Vec<Handler>>>,
}

impl HandlerRegistry {
    /// Create an empty handler registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler to `id`'s list. Rejects the exact same closure
    /// (by `Arc::ptr_eq`) registered twice. Returns the new handler
    /// count for this id.
    pub fn add(&self, id: ChannelId, handler: Handler) -> Result<usize, HandlerError> {
        let mut handlers = self.handlers.write().unwrap();
        let list = handlers.entry(id.clone()).or_default();
        if list.iter().any(|h| std::sync::Arc::ptr_eq(h, &handler)) {
            return Err(HandlerError::DuplicateHandler(id.to_string()));
        }
        list.push(handler);
        Ok(list.len())
    }

    /// Remove one occurrence of `handler` from `id`'s list (by pointer
    /// identity). Drops the entry entirely once its list is empty.
    /// Returns whether a handler was removed.
    pub fn remove(&self, id: &str, handler: &Handler) -> bool {
        let mut handlers = self.handlers.write().unwrap();
        let key = ChannelId::new(id);
        let Some(list) = handlers.get_mut(&key) else {
            return false;
        };
        let before = list.len();
        list.retain(|h| !std::sync::Arc::ptr_eq(h, handler));
        let removed = list.len() < before;
        if list.is_empty() {
            handlers.remove(&key);
        }
        removed
    }

    /// Remove every handler registered for `id`.
    pub fn remove_all(&self, id: &str) {
        self.handlers.write().unwrap().remove(&ChannelId::new(id));
    }

    /// Snapshot the current handler list for `id`, in registration order.
    pub fn list(&self, id: &str) -> Vec<Handler> {
        self.handlers
            .read()
            .unwrap()
            .get(&ChannelId::new(id))
            .cloned()
            .unwrap_or_default()
    }

    /// Number of handlers currently registered for `id`.
    pub fn count(&self, id: &str) -> usize {
        self.handlers
            .read()
            .unwrap()
            .get(&ChannelId::new(id))
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Drop every channel's handler list, used by `shutdown`.
    pub fn clear(&self) {
        self.handlers.write().unwrap().clear();
    }
}
