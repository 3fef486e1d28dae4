//! In-memory resource fetcher

use async_trait::async_trait;
use bytes::Bytes;
use narramix_common::ResourceRef;
use narramix_engine::resource::{FetchedAudio, ResourceFetcher};
use narramix_engine::{Error, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Serves registered byte buffers by location and counts every fetch
#[derive(Default)]
pub struct MemoryFetcher {
    files: Mutex<HashMap<String, Bytes>>,
    fetches: AtomicUsize,
    delay: Option<Duration>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every fetch for `delay` so concurrent requests overlap
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn insert(&self, location: &str, bytes: impl Into<Bytes>) {
        self.files.lock().unwrap().insert(location.to_string(), bytes.into());
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResourceFetcher for MemoryFetcher {
    async fn fetch(&self, resource: &ResourceRef) -> Result<FetchedAudio> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let bytes = match resource {
            ResourceRef::Inline(inline) => Some(inline.bytes.clone()),
            ResourceRef::Location(location) => self.files.lock().unwrap().get(location).cloned(),
        };

        bytes
            .map(|bytes| FetchedAudio {
                bytes,
                mime: Some("audio/wav".to_string()),
            })
            .ok_or_else(|| Error::Fetch(format!("{} not registered", resource)))
    }
}
