//! Mix session
//!
//! Holds the one current mix result for a consumer (a player, a CLI run) and
//! discards results that arrive after a newer mix was started. Every
//! [`MixSession::begin`] bumps a generation counter; a result is only stored
//! if it carries the current generation. Storing a result drops the previous
//! one, releasing its rendered bytes.

use crate::error::Result;
use crate::mixer::{AudioMixer, MixedAudioResult};
use narramix_common::ScheduledAudioItem;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Proof that a mix was started at a given generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MixTicket {
    generation: u64,
}

impl MixTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Default)]
pub struct MixSession {
    generation: AtomicU64,
    current: RwLock<Option<MixedAudioResult>>,
}

impl MixSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new mix, making every earlier ticket stale
    pub fn begin(&self) -> MixTicket {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(generation, "Mix started");
        MixTicket { generation }
    }

    pub fn is_current(&self, ticket: MixTicket) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket.generation
    }

    /// Store `result` if `ticket` is still current
    ///
    /// Returns false (and drops `result`) for a stale ticket.
    pub async fn apply(&self, ticket: MixTicket, result: MixedAudioResult) -> bool {
        let mut current = self.current.write().await;

        // Checked under the lock so a concurrent begin+apply cannot interleave
        if !self.is_current(ticket) {
            info!(
                generation = ticket.generation,
                latest = self.generation.load(Ordering::SeqCst),
                "Discarding stale mix result"
            );
            return false;
        }

        if current.replace(result).is_some() {
            debug!(generation = ticket.generation, "Previous mix released");
        }
        true
    }

    /// Begin, mix and apply in one step
    ///
    /// `Ok(None)` means the mix finished but a newer one had already started.
    pub async fn run(&self, mixer: &AudioMixer, items: &[ScheduledAudioItem]) -> Result<Option<MixedAudioResult>> {
        let ticket = self.begin();
        let result = mixer.mix(items).await?;

        if self.apply(ticket, result).await {
            Ok(self.current().await)
        } else {
            Ok(None)
        }
    }

    /// Copy of the current result
    pub async fn current(&self) -> Option<MixedAudioResult> {
        self.current.read().await.clone()
    }

    /// Release the current result and invalidate in-flight mixes
    pub async fn teardown(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if self.current.write().await.take().is_some() {
            debug!("Mix session torn down, result released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixer::{AudioResource, MixOutcome};
    use narramix_common::ResourceRef;

    fn result(name: &str) -> MixedAudioResult {
        let item = ScheduledAudioItem::new(ResourceRef::location(name), 0.0, 1.0);
        MixedAudioResult {
            resource: AudioResource::Passthrough(item.resource.clone()),
            duration: 1.0,
            segments: vec![item],
            outcome: MixOutcome::Passthrough,
        }
    }

    #[tokio::test]
    async fn test_current_ticket_applies() {
        let session = MixSession::new();
        let ticket = session.begin();

        assert!(session.apply(ticket, result("a.wav")).await);
        assert_eq!(session.current().await, Some(result("a.wav")));
    }

    #[tokio::test]
    async fn test_stale_ticket_is_discarded() {
        let session = MixSession::new();
        let old = session.begin();
        let new = session.begin();

        assert!(session.apply(new, result("new.wav")).await);
        assert!(!session.apply(old, result("old.wav")).await);
        assert_eq!(session.current().await, Some(result("new.wav")));
    }

    #[tokio::test]
    async fn test_stale_result_does_not_replace_nothing() {
        let session = MixSession::new();
        let old = session.begin();
        session.begin();

        assert!(!session.apply(old, result("old.wav")).await);
        assert!(session.current().await.is_none());
    }

    #[tokio::test]
    async fn test_teardown_releases_and_invalidates() {
        let session = MixSession::new();
        let ticket = session.begin();
        session.apply(ticket, result("a.wav")).await;

        let in_flight = session.begin();
        session.teardown().await;

        assert!(session.current().await.is_none());
        assert!(!session.apply(in_flight, result("late.wav")).await);
    }

    #[test]
    fn test_generations_increase() {
        let session = MixSession::new();
        let a = session.begin();
        let b = session.begin();
        assert!(b.generation() > a.generation());
        assert!(!session.is_current(a));
        assert!(session.is_current(b));
    }
}
