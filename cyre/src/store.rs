//! The payload store: per-channel last/previous payload and last
//! response, read by change detection, `hasChanged`, `getPrevious`, and
//! `get`.

use std::collections::HashMap;
use std::sync::RwLock;

use cyre_core::{ChannelId, Response};
use serde_json::Value;

struct Slot {
    previous_payload: Option<Value>,
    last_payload: Option<Value>,
    last_response: Option<Response>,
    updated_at: Option<u64>,
}

/// Execution counters and timing snapshot for one channel, returned by
/// `Cyre::get_metrics`.
#[derive(Debug, Clone)]
pub struct Metrics {
    /// Count of successful dispatches.
    pub execution_count: u64,
    /// Count of dispatches that completed with `error: true`.
    pub error_count: u64,
    /// Engine-clock milliseconds of the last successful dispatch.
    pub last_exec_time: Option<u64>,
    /// Engine-clock milliseconds the payload store was last updated.
    pub updated_at: Option<u64>,
}

/// Owns every channel's last-known payload and response.
#[derive(Default)]
pub struct PayloadStore {
    slots: RwLock<HashMap<ChannelId, Slot>>,
}

impl PayloadStore {
    /// Create an empty payload store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a channel's initial payload at registration, without
    /// touching `previous_payload` or `last_response`.
    pub fn seed(&self, id: ChannelId, payload: Value) {
        self.slots.write().unwrap().insert(
            id,
            Slot {
                previous_payload: None,
                last_payload: Some(payload),
                last_response: None,
                updated_at: None,
            },
        );
    }

    /// Record a successful dispatch: the previous `last_payload` (if
    /// any) becomes `previous_payload`, and `payload`/`response` become
    /// current.
    pub fn update(&self, id: ChannelId, payload: Value, response: Response, now_ms: u64) {
        let mut slots = self.slots.write().unwrap();
        let slot = slots.entry(id).or_insert_with(|| Slot {
            previous_payload: None,
            last_payload: None,
            last_response: None,
            updated_at: None,
        });
        slot.previous_payload = slot.last_payload.take();
        slot.last_payload = Some(payload);
        slot.last_response = Some(response);
        slot.updated_at = Some(now_ms);
    }

    /// The last known payload for `id` (seeded value, or the most
    /// recently dispatched one).
    pub fn get(&self, id: &str) -> Option<Value> {
        self.slots
            .read()
            .unwrap()
            .get(&ChannelId::new(id))
            .and_then(|s| s.last_payload.clone())
    }

    /// The payload that was current immediately before the last
    /// successful dispatch.
    pub fn get_previous(&self, id: &str) -> Option<Value> {
        self.slots
            .read()
            .unwrap()
            .get(&ChannelId::new(id))
            .and_then(|s| s.previous_payload.clone())
    }

    /// Whether `payload` differs structurally from the stored last
    /// payload. A channel with no stored payload is always considered
    /// changed.
    pub fn has_changed(&self, id: &str, payload: &Value) -> bool {
        match self.slots.read().unwrap().get(&ChannelId::new(id)) {
            Some(slot) => slot.last_payload.as_ref() != Some(payload),
            None => true,
        }
    }

    /// Remove a channel's stored payload/response entirely.
    pub fn forget(&self, id: &str) {
        self.slots.write().unwrap().remove(&ChannelId::new(id));
    }

    /// Milliseconds (engine clock) this channel's payload was last updated.
    pub fn updated_at(&self, id: &str) -> Option<u64> {
        self.slots
            .read()
            .unwrap()
            .get(&ChannelId::new(id))
            .and_then(|s| s.updated_at)
    }

    /// Drop every channel's stored payload/response, used by `shutdown`.
    pub fn clear(&self) {
        self.slots.write().unwrap().clear();
    }
}
