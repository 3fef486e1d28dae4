//! End-to-end narration pipeline
//!
//! classify → lay out the timeline → synthesize each segment → build the
//! queue → mix through the session.

use crate::classifier::{Classification, ClassificationStatus, Classifier, KeywordClassifier};
use crate::error::{Error, Result};
use crate::mixer::{AudioMixer, MixedAudioResult, MixerConfig};
use crate::narration::{NarrationSynthesizer, SpeechMarkup};
use crate::queue::{NarratedSegment, QueueBuilder, SegmentSlot};
use crate::resource::ResourceFetcher;
use crate::session::MixSession;
use crate::sounds::EnvironmentTable;
use futures::future::join_all;
use narramix_common::config::{NarramixConfig, SegmentDefaults};
use narramix_common::{ScheduledAudioItem, TextSegment};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Everything decided before mixing
#[derive(Debug, Clone, Serialize)]
pub struct NarrationPlan {
    pub classification_status: ClassificationStatus,
    pub segments: Vec<TextSegment>,
    pub timeline: Vec<SegmentSlot>,
    pub items: Vec<ScheduledAudioItem>,
}

#[derive(Debug, Clone)]
pub struct NarrationReport {
    pub classification_status: ClassificationStatus,
    pub timeline: Vec<SegmentSlot>,

    /// `None` when a newer narration superseded this one
    pub result: Option<MixedAudioResult>,
}

pub struct Narrator {
    classifier: Arc<dyn Classifier>,
    synthesizer: Arc<dyn NarrationSynthesizer>,
    queue: QueueBuilder,
    mixer: AudioMixer,
    session: MixSession,
    defaults: SegmentDefaults,
}

impl Narrator {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        synthesizer: Arc<dyn NarrationSynthesizer>,
        queue: QueueBuilder,
        mixer: AudioMixer,
        defaults: SegmentDefaults,
    ) -> Self {
        Self {
            classifier,
            synthesizer,
            queue,
            mixer,
            session: MixSession::new(),
            defaults,
        }
    }

    /// Keyword classifier, environment table and mixer from `config`
    pub fn from_config(
        config: &NarramixConfig,
        synthesizer: Arc<dyn NarrationSynthesizer>,
        fetcher: Arc<dyn ResourceFetcher>,
    ) -> Self {
        Self::new(
            Arc::new(KeywordClassifier::from_config(config)),
            synthesizer,
            QueueBuilder::from_config(config, Arc::new(EnvironmentTable::from_config(config))),
            AudioMixer::new(MixerConfig::from_config(config), fetcher),
            config.defaults.clone(),
        )
    }

    pub fn mixer(&self) -> &AudioMixer {
        &self.mixer
    }

    pub fn session(&self) -> &MixSession {
        &self.session
    }

    async fn classify(&self, text: &str) -> Classification {
        match self.classifier.classify(text).await {
            Ok(classification) => classification,
            Err(e) => {
                warn!(error = %e, "Classification failed, narrating whole text with defaults");
                Classification::fallback(text, &self.defaults)
            }
        }
    }

    /// Synthesize every segment that has words; failures become gaps
    async fn synthesize(&self, segments: &[TextSegment], timeline: &[SegmentSlot]) -> Vec<NarratedSegment> {
        let jobs = segments.iter().zip(timeline).enumerate().map(|(index, (segment, slot))| async move {
            if slot.is_empty() {
                return NarratedSegment::new(segment.clone(), None);
            }

            let markup = SpeechMarkup::for_segment(segment);
            let narration = match self.synthesizer.synthesize(index, segment, &markup).await {
                Ok(resource) => Some(resource),
                Err(e) => {
                    warn!(segment = index, error = %e, "Narration synthesis failed");
                    None
                }
            };
            NarratedSegment::new(segment.clone(), narration)
        });

        join_all(jobs).await
    }

    /// Classify, synthesize and queue `text` without mixing
    pub async fn plan(&self, text: &str) -> Result<NarrationPlan> {
        let classification = self.classify(text).await;
        let timeline = self.queue.schedule(&classification.segments);

        let narrated = self.synthesize(&classification.segments, &timeline).await;
        if narrated.iter().all(|n| n.narration.is_none()) {
            return Err(Error::Synthesis(format!(
                "No narration produced for any of {} segments",
                narrated.len()
            )));
        }

        let items = self.queue.build(&narrated);
        info!(
            segments = classification.segments.len(),
            items = items.len(),
            fallback = classification.status.is_fallback(),
            "Narration planned"
        );

        Ok(NarrationPlan {
            classification_status: classification.status,
            segments: classification.segments,
            timeline,
            items,
        })
    }

    /// Full pipeline; the mixed result is also kept in [`Narrator::session`]
    pub async fn narrate(&self, text: &str) -> Result<NarrationReport> {
        let plan = self.plan(text).await?;
        let result = self.session.run(&self.mixer, &plan.items).await?;

        Ok(NarrationReport {
            classification_status: plan.classification_status,
            timeline: plan.timeline,
            result,
        })
    }
}
