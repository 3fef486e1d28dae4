//! Ambience cue scheduler
//!
//! Periodic environment sounds (a gull over the sea every 15 s, birdsong in
//! the forest) are planned as a list of `(offset, resource)` cues. One loop
//! consumes the list in offset order and emits each cue when its time comes.
//! Clearing the list cancels everything still pending.
//!
//! For offline rendering, [`cues_to_items`] turns the same cues into
//! scheduled items the mixer can place on the timeline.

use crate::sounds::LayeredSound;
use narramix_common::{ResourceRef, ScheduledAudioItem};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

/// One planned ambience trigger
#[derive(Debug, Clone, PartialEq)]
pub struct AmbienceCue {
    /// Seconds from the start of the timeline
    pub offset: f64,
    pub resource: ResourceRef,
    pub volume: f32,
    pub environment: String,
}

/// Expand layered sounds over one span of the timeline
///
/// A sound with an interval fires at `span_start + k × interval` for every
/// k ≥ 1 strictly inside the span. A sound without one (or with a
/// non-positive interval) fires once at `span_start`.
pub fn plan_cues(
    environment: &str,
    layers: &[LayeredSound],
    span_start: f64,
    span_duration: f64,
) -> Vec<AmbienceCue> {
    let span_end = span_start + span_duration.max(0.0);
    let mut cues = Vec::new();

    for layer in layers {
        let cue = |offset: f64| AmbienceCue {
            offset,
            resource: layer.resource.clone(),
            volume: layer.volume,
            environment: environment.to_string(),
        };

        match layer.interval_secs {
            Some(interval) if interval > 0.0 => {
                let mut k = 1u32;
                loop {
                    let offset = span_start + f64::from(k) * interval;
                    if offset >= span_end {
                        break;
                    }
                    cues.push(cue(offset));
                    k += 1;
                }
            }
            _ => cues.push(cue(span_start)),
        }
    }

    cues.sort_by(|a, b| a.offset.total_cmp(&b.offset));
    cues
}

/// One-shot scheduled items for offline mixing
pub fn cues_to_items(cues: &[AmbienceCue], cue_duration: f64) -> Vec<ScheduledAudioItem> {
    cues.iter()
        .map(|cue| {
            ScheduledAudioItem::new(cue.resource.clone(), cue.offset, cue_duration.max(0.0))
                .with_volume(cue.volume)
                .with_environment(cue.environment.clone())
        })
        .collect()
}

#[derive(Default)]
struct SchedulerState {
    cues: Mutex<VecDeque<AmbienceCue>>,

    /// Signalled whenever the list changes
    changed: Notify,
}

/// Shared cue list plus its consumer loop
///
/// Cloning yields another handle to the same list, so one task can `run`
/// while another plans or clears.
#[derive(Clone, Default)]
pub struct AmbienceScheduler {
    inner: Arc<SchedulerState>,
}

impl AmbienceScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the cues for one span, keeping the list ordered by offset
    pub async fn plan(
        &self,
        environment: &str,
        layers: &[LayeredSound],
        span_start: f64,
        span_duration: f64,
    ) -> usize {
        let planned = plan_cues(environment, layers, span_start, span_duration);
        let count = planned.len();

        {
            let mut cues = self.inner.cues.lock().await;
            for cue in planned {
                let at = cues.partition_point(|c| c.offset <= cue.offset);
                cues.insert(at, cue);
            }
            debug!(environment = %environment, planned = count, pending = cues.len(), "Planned ambience cues");
        }

        self.inner.changed.notify_waiters();
        count
    }

    /// Drop every pending cue
    pub async fn clear(&self) {
        let dropped = {
            let mut cues = self.inner.cues.lock().await;
            let n = cues.len();
            cues.clear();
            n
        };

        if dropped > 0 {
            info!(dropped, "Ambience cues cancelled");
        }
        self.inner.changed.notify_waiters();
    }

    pub async fn pending(&self) -> Vec<AmbienceCue> {
        self.inner.cues.lock().await.iter().cloned().collect()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.cues.lock().await.is_empty()
    }

    /// Emit cues on `tx` as their offsets elapse
    ///
    /// Offsets are measured from the moment `run` is called. Returns when the
    /// list is empty or the receiver has gone away, with the number of cues
    /// sent.
    pub async fn run(&self, tx: mpsc::Sender<AmbienceCue>) -> usize {
        let started = Instant::now();
        let mut sent = 0;

        loop {
            // Created before reading the list so a concurrent change is not missed
            let changed = self.inner.changed.notified();

            let next_offset = match self.inner.cues.lock().await.front() {
                Some(cue) => cue.offset,
                None => break,
            };

            let deadline = started + Duration::try_from_secs_f64(next_offset.max(0.0)).unwrap_or_default();
            tokio::select! {
                _ = sleep_until(deadline) => {}
                _ = changed => continue,
            }

            let due = {
                let mut cues = self.inner.cues.lock().await;
                match cues.front() {
                    Some(cue) if cue.offset <= next_offset => cues.pop_front(),
                    _ => None,
                }
            };

            let Some(cue) = due else { continue };

            debug!(offset = cue.offset, resource = %cue.resource, "Ambience cue");
            if tx.send(cue).await.is_err() {
                debug!("Cue receiver dropped, stopping scheduler");
                break;
            }
            sent += 1;
        }

        sent
    }
}
