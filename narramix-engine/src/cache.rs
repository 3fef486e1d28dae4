//! Decode cache
//!
//! Maps a resource identifier to its decoded, resampled audio. Each key is
//! decoded at most once: concurrent requests for a key that is still being
//! decoded wait on the same [`OnceCell`] and share its result. A failed
//! decode leaves nothing behind, so a later request tries again.
//!
//! Entries are immutable once written and handed out as `Arc<DecodedAudio>`;
//! evicting an entry never invalidates audio a caller already holds.

use crate::audio::DecodedAudio;
use crate::error::Result;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};
use tracing::debug;

/// How many decoded entries the cache keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    /// Keep every decoded entry for the cache's lifetime
    #[default]
    Unbounded,

    /// Keep at most `n` entries, dropping the oldest insertion first
    MaxEntries(usize),
}

impl EvictionPolicy {
    /// `0` means unbounded
    pub fn from_max_entries(max: usize) -> Self {
        if max == 0 {
            EvictionPolicy::Unbounded
        } else {
            EvictionPolicy::MaxEntries(max)
        }
    }

    fn limit(&self) -> Option<usize> {
        match self {
            EvictionPolicy::Unbounded => None,
            EvictionPolicy::MaxEntries(n) => Some(*n),
        }
    }
}

type Slot = Arc<OnceCell<Arc<DecodedAudio>>>;

#[derive(Default)]
struct CacheState {
    slots: HashMap<String, Slot>,

    /// Keys of initialized slots in insertion order
    order: VecDeque<String>,
}

/// Write-once-per-key cache of decoded audio
pub struct DecodeCache {
    state: RwLock<CacheState>,
    policy: EvictionPolicy,

    /// Number of decode closures actually run
    decodes: AtomicUsize,
}

impl DecodeCache {
    pub fn new(policy: EvictionPolicy) -> Self {
        Self {
            state: RwLock::new(CacheState::default()),
            policy,
            decodes: AtomicUsize::new(0),
        }
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    /// Return the cached audio for `key`, running `decode` if absent
    ///
    /// If another task is already decoding `key`, waits for it instead of
    /// starting a second decode. Errors are returned to the caller that ran
    /// the decode and are not stored.
    pub async fn get_or_decode<F, Fut>(&self, key: &str, decode: F) -> Result<Arc<DecodedAudio>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<DecodedAudio>>,
    {
        let slot = self.slot(key).await;

        let mut ran = false;
        let result = slot
            .get_or_try_init(|| {
                ran = true;
                self.decodes.fetch_add(1, Ordering::SeqCst);
                async move { decode().await.map(Arc::new) }
            })
            .await
            .map(Arc::clone);

        match &result {
            Ok(_) if ran => self.record_insert(key, &slot).await,
            Ok(_) => debug!(key = %key, "Decode cache hit"),
            Err(_) => self.discard_failed(key, &slot).await,
        }

        result
    }

    /// Cached audio for `key`, if decoded
    pub async fn get(&self, key: &str) -> Option<Arc<DecodedAudio>> {
        let state = self.state.read().await;
        state.slots.get(key).and_then(|slot| slot.get().cloned())
    }

    /// Number of decoded entries
    pub async fn len(&self) -> usize {
        self.state.read().await.order.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop every entry
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.slots.clear();
        state.order.clear();
    }

    /// Total decodes performed since creation
    pub fn decode_count(&self) -> usize {
        self.decodes.load(Ordering::SeqCst)
    }

    async fn slot(&self, key: &str) -> Slot {
        if let Some(slot) = self.state.read().await.slots.get(key) {
            return Arc::clone(slot);
        }

        let mut state = self.state.write().await;
        Arc::clone(
            state
                .slots
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new())),
        )
    }

    async fn record_insert(&self, key: &str, slot: &Slot) {
        let mut state = self.state.write().await;

        // Cleared or evicted while decoding
        if !state.slots.get(key).is_some_and(|s| Arc::ptr_eq(s, slot)) {
            return;
        }

        state.order.push_back(key.to_string());
        debug!(key = %key, entries = state.order.len(), "Decode cached");

        if let Some(limit) = self.policy.limit() {
            while state.order.len() > limit {
                if let Some(oldest) = state.order.pop_front() {
                    state.slots.remove(&oldest);
                    debug!(key = %oldest, "Decode cache evicted");
                }
            }
        }
    }

    async fn discard_failed(&self, key: &str, slot: &Slot) {
        let mut state = self.state.write().await;
        let failed = state
            .slots
            .get(key)
            .is_some_and(|s| Arc::ptr_eq(s, slot) && !s.initialized());
        if failed && Arc::strong_count(slot) <= 2 {
            // Only this caller and the map hold the slot; nobody else is waiting on it
            state.slots.remove(key);
        }
    }
}

impl Default for DecodeCache {
    fn default() -> Self {
        Self::new(EvictionPolicy::Unbounded)
    }
}
