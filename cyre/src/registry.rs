//! The channel registry: a flat, path-keyed map owning every
//! registered channel and its precompiled pipeline.
//!
//! Kept as a single `BTreeMap<ChannelId, _>` rather than a tree of
//! branch nodes, per the resolved "cyclic references between branches
//! and channels" design note — a branch cascade-destroy is a contiguous
//! range scan over this map, not a tree walk.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use cyre_core::{ChannelConfig, ChannelId, RegistryError};
use cyre_pipeline::Pipeline;

/// Per-channel mutable bookkeeping, guarded by its own mutex so
/// unrelated channels never contend with each other.
pub struct Bookkeeping {
    /// Milliseconds (engine clock) of the last successful dispatch.
    pub last_exec_time: Option<u64>,
    /// Count of successful dispatches.
    pub execution_count: u64,
    /// Count of dispatches that completed with `error: true`.
    pub error_count: u64,
    /// In-flight debounce burst, if one is pending.
    pub debounce: Option<crate::debounce::DebounceBurst>,
}

impl Default for Bookkeeping {
    fn default() -> Self {
        Self {
            last_exec_time: None,
            execution_count: 0,
            error_count: 0,
            debounce: None,
        }
    }
}

/// One registered channel: its immutable config, its precompiled
/// pipeline, and its mutable bookkeeping.
pub struct ChannelEntry {
    /// Fully qualified id this channel is registered under.
    pub id: ChannelId,
    /// The channel's configuration, as supplied at registration.
    pub config: ChannelConfig,
    /// The precompiled protection pipeline (steps 1-7; debounce/throttle
    /// are applied by the engine, not this pipeline).
    pub pipeline: Pipeline,
    /// Per-channel mutable state.
    pub bookkeeping: Mutex<Bookkeeping>,
}

/// Owns every registered channel, keyed by fully qualified id.
#[derive(Default)]
pub struct ChannelRegistry {
    entries: RwLock<BTreeMap<ChannelId, Arc<ChannelEntry>>>,
    locked: AtomicBool,
}

impl ChannelRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a channel under `full_id`. Rejects a duplicate id and
    /// rejects any registration once [`ChannelRegistry::lock`] has been
    /// called.
    pub fn register(
        &self,
        full_id: ChannelId,
        config: ChannelConfig,
    ) -> Result<Arc<ChannelEntry>, RegistryError> {
        if full_id.as_str().trim().is_empty() {
            return Err(RegistryError::InvalidId(full_id.to_string()));
        }
        if self.locked.load(Ordering::SeqCst) {
            return Err(RegistryError::Locked);
        }

        let mut entries = self.entries.write().unwrap();
        if entries.contains_key(&full_id) {
            return Err(RegistryError::DuplicateId(full_id.to_string()));
        }

        let pipeline = Pipeline::compile(&config);
        let entry = Arc::new(ChannelEntry {
            id: full_id.clone(),
            config,
            pipeline,
            bookkeeping: Mutex::new(Bookkeeping::default()),
        });
        entries.insert(full_id, Arc::clone(&entry));
        Ok(entry)
    }

    /// Look up a channel by its fully qualified id.
    pub fn get(&self, id: &str) -> Option<Arc<ChannelEntry>> {
        self.entries.read().unwrap().get(&ChannelId::new(id)).cloned()
    }

    /// Remove a channel. Returns the removed entry, if any.
    pub fn forget(&self, id: &str) -> Option<Arc<ChannelEntry>> {
        self.entries.write().unwrap().remove(&ChannelId::new(id))
    }

    /// Every channel whose id is `prefix` itself or starts with
    /// `prefix + "/"`. A `BTreeMap` range bounds the scan to the
    /// contiguous slice that could possibly match (`'/'` sorts below
    /// every other byte a path segment can start with, so everything
    /// under `prefix` falls within `[prefix, prefix + "0")`) but that
    /// range also admits siblings like `prefix` immediately followed by
    /// a byte below `'0'` (e.g. `"company-reports"` when `prefix` is
    /// `"company"`), so the range is still filtered by `is_under`.
    pub fn channels_under(&self, prefix: &str) -> Vec<Arc<ChannelEntry>> {
        if prefix.is_empty() {
            return self.entries.read().unwrap().values().cloned().collect();
        }
        let start = ChannelId::new(prefix);
        let end = ChannelId::new(format!("{prefix}0"));
        self.entries
            .read()
            .unwrap()
            .range(start..end)
            .filter(|(k, _)| k.is_under(prefix))
            .map(|(_, v)| Arc::clone(v))
            .collect()
    }

    /// Reject further registrations. Irreversible for the lifetime of
    /// this registry.
    pub fn lock(&self) {
        self.locked.store(true, Ordering::SeqCst);
    }

    /// Whether [`ChannelRegistry::lock`] has been called.
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::SeqCst)
    }

    /// Every registered channel (used by `shutdown`/tests).
    pub fn all(&self) -> Vec<Arc<ChannelEntry>> {
        self.entries.read().unwrap().values().cloned().collect()
    }

    /// Drop every registered channel, used by `shutdown`.
    pub fn clear(&self) {
        self.entries.write().unwrap().clear();
    }
}
