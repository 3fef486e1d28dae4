//! Segment queue builder
//!
//! Lays segments out on one timeline and turns each into scheduled audio
//! items: one narration item, at most one ambience bed, and optionally the
//! environment's periodic cue sounds.
//!
//! # Timeline
//!
//! A cursor starts at 0. Each segment starts at the cursor, which then
//! advances by the segment's estimated duration. After a crossfade segment
//! that is not the last one, the cursor is pulled back by the transition
//! duration so the next segment overlaps the tail of this one. The pull
//! never moves the cursor before the segment's own start.
//!
//! Segments estimated at zero seconds emit nothing and leave the cursor
//! where it is.

use crate::scheduler::{cues_to_items, plan_cues};
use crate::sounds::SoundLookup;
use crate::timing;
use narramix_common::config::{NarramixConfig, QueueSettings};
use narramix_common::{ResourceRef, ScheduledAudioItem, TextSegment, TimingInfo, TransitionType};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A classified segment plus its synthesized narration, if any
#[derive(Debug, Clone, PartialEq)]
pub struct NarratedSegment {
    pub segment: TextSegment,

    /// `None` when synthesis failed; the segment keeps its timeline slot
    pub narration: Option<ResourceRef>,
}

impl NarratedSegment {
    pub fn new(segment: TextSegment, narration: Option<ResourceRef>) -> Self {
        Self { segment, narration }
    }
}

/// Where one segment sits on the timeline
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SegmentSlot {
    pub start: f64,
    pub timing: TimingInfo,
}

impl SegmentSlot {
    pub fn end(&self) -> f64 {
        self.start + self.timing.estimated_duration
    }

    /// True for segments that emit no audio
    pub fn is_empty(&self) -> bool {
        self.timing.estimated_duration <= 0.0
    }
}

/// Builds scheduled audio items from segments
pub struct QueueBuilder {
    sounds: Arc<dyn SoundLookup>,
    settings: QueueSettings,
}

impl QueueBuilder {
    pub fn new(sounds: Arc<dyn SoundLookup>, settings: QueueSettings) -> Self {
        Self { sounds, settings }
    }

    pub fn from_config(config: &NarramixConfig, sounds: Arc<dyn SoundLookup>) -> Self {
        Self::new(sounds, config.queue.clone())
    }

    pub fn settings(&self) -> &QueueSettings {
        &self.settings
    }

    /// Timeline positions and timing for every segment, in order
    pub fn schedule(&self, segments: &[TextSegment]) -> Vec<SegmentSlot> {
        let mut cursor = 0.0f64;
        let last = segments.len().saturating_sub(1);

        segments
            .iter()
            .enumerate()
            .map(|(index, segment)| {
                let timing = timing::estimate(&segment.text, segment.speech_rate);
                let slot = SegmentSlot {
                    start: cursor,
                    timing,
                };

                if slot.is_empty() {
                    warn!(segment = index, "Segment has no words, skipping");
                    return slot;
                }

                cursor += timing.estimated_duration;
                if timing.transition == TransitionType::Crossfade && index < last {
                    cursor = (cursor - timing.transition_duration).max(slot.start);
                }

                slot
            })
            .collect()
    }

    /// Scheduled items for `segments`, in insertion order
    pub fn build(&self, segments: &[NarratedSegment]) -> Vec<ScheduledAudioItem> {
        let texts: Vec<TextSegment> = segments.iter().map(|s| s.segment.clone()).collect();
        let slots = self.schedule(&texts);

        let mut items = Vec::with_capacity(segments.len() * 2);
        for (index, (narrated, slot)) in segments.iter().zip(&slots).enumerate() {
            if slot.is_empty() {
                continue;
            }

            let Some(narration) = &narrated.narration else {
                warn!(segment = index, start = slot.start, "No narration for segment, leaving a gap");
                continue;
            };

            let before = items.len();
            items.push(self.narration_item(narration.clone(), slot));

            let segment = &narrated.segment;
            if segment.has_environment() {
                self.push_ambience(&mut items, segment, slot);
            }

            debug!(
                segment = index,
                start = slot.start,
                duration = slot.timing.estimated_duration,
                items = items.len() - before,
                "Segment scheduled"
            );
        }

        info!(segments = segments.len(), items = items.len(), "Queue built");
        items
    }

    fn narration_item(&self, narration: ResourceRef, slot: &SegmentSlot) -> ScheduledAudioItem {
        ScheduledAudioItem::new(narration, slot.start, slot.timing.estimated_duration)
            .with_fades(slot.timing.fade_in, slot.timing.fade_out)
    }

    fn push_ambience(&self, items: &mut Vec<ScheduledAudioItem>, segment: &TextSegment, slot: &SegmentSlot) {
        let environment = segment.environment.trim();
        let duration = slot.timing.estimated_duration;

        match self.sounds.sounds_for(environment).into_iter().next() {
            Some(bed) => {
                let scale = self.settings.ambience_fade_scale;
                let fade_in = (slot.timing.fade_in * scale).min(duration);
                let fade_out = (slot.timing.fade_out * scale).min(duration);

                items.push(
                    ScheduledAudioItem::new(bed, slot.start, duration)
                        .with_volume(self.settings.ambience_volume)
                        .with_fades(fade_in, fade_out)
                        .with_environment(environment)
                        .looped(true),
                );
            }
            None => debug!(environment = %environment, "No ambience for environment"),
        }

        if self.settings.include_cues {
            let layers = self.sounds.layered_for(environment);
            let cues = plan_cues(environment, &layers, slot.start, duration);
            items.extend(cues_to_items(&cues, self.settings.cue_duration));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sounds::{EnvironmentTable, NoSounds};
    use narramix_common::config::default_environments;
    use narramix_common::SpeechRate;

    fn builder(sounds: Arc<dyn SoundLookup>) -> QueueBuilder {
        QueueBuilder::new(sounds, QueueSettings::default())
    }

    fn narrated(text: &str, rate: SpeechRate, environment: &str) -> NarratedSegment {
        NarratedSegment::new(
            TextSegment::new(text, rate).with_environment(environment),
            Some(ResourceRef::location(format!("voice/{}.mp3", text.len()))),
        )
    }

    #[test]
    fn test_overlap_segment_advances_by_full_duration() {
        // 8 words at 2 wps = 4 s, no terminal punctuation → overlap
        let b = builder(Arc::new(NoSounds));
        let slots = b.schedule(&[
            TextSegment::new("a b c d e f g h", SpeechRate::Moderate),
            TextSegment::new("next one", SpeechRate::Moderate),
        ]);

        assert_eq!(slots[0].timing.transition, TransitionType::Overlap);
        assert_eq!(slots[1].start, 4.0);
    }

    #[test]
    fn test_crossfade_pulls_next_start_back() {
        // 6 words at 2 wps = 3 s, ellipsis → crossfade 1 s
        let b = builder(Arc::new(NoSounds));
        let slots = b.schedule(&[
            TextSegment::new("a b c d e f...", SpeechRate::Moderate),
            TextSegment::new("next one", SpeechRate::Moderate),
        ]);

        assert_eq!(slots[1].start, 2.0);
    }

    #[test]
    fn test_crossfade_on_last_segment_is_ignored() {
        let b = builder(Arc::new(NoSounds));
        let slots = b.schedule(&[TextSegment::new("a b c d e f...", SpeechRate::Moderate)]);
        assert_eq!(slots[0].end(), 3.0);
    }

    #[test]
    fn test_crossfade_pull_never_precedes_segment_start() {
        // 1 word at 2.5 wps = 0.4 s, shorter than the 1 s crossfade
        let b = builder(Arc::new(NoSounds));
        let slots = b.schedule(&[
            TextSegment::new("x y z w v", SpeechRate::Fast),
            TextSegment::new("Hmm...", SpeechRate::Fast),
            TextSegment::new("after", SpeechRate::Fast),
        ]);

        assert_eq!(slots[1].start, 2.0);
        assert_eq!(slots[2].start, 2.0);
    }

    #[test]
    fn test_single_segment_without_environment() {
        let b = builder(Arc::new(EnvironmentTable::new(&default_environments(), "")));
        let items = b.build(&[narrated("Hello there.", SpeechRate::Slow, "")]);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].start, 0.0);
        assert!(!items[0].has_environment());
        assert_eq!(items[0].volume, 1.0);
    }

    #[test]
    fn test_ambience_item_follows_narration() {
        let b = builder(Arc::new(EnvironmentTable::new(&default_environments(), "s/")));
        // 10 words at 1.5 wps
        let items = b.build(&[narrated("one two three four five six seven eight nine ten", SpeechRate::Slow, "mer")]);

        assert_eq!(items.len(), 2);
        let (voice, bed) = (&items[0], &items[1]);

        assert_eq!(bed.resource, ResourceRef::location("s/ocean-waves-112906.mp3"));
        assert_eq!(bed.start, voice.start);
        assert_eq!(bed.duration, voice.duration);
        assert_eq!(bed.volume, 0.4);
        assert!(bed.looped);
        assert_eq!(bed.environment.as_deref(), Some("mer"));

        let voice_fade = voice.fade_in.unwrap();
        assert!((bed.fade_in.unwrap() - voice_fade * 1.5).abs() < 1e-12);
        assert!((bed.fade_out.unwrap() - voice.fade_out.unwrap() * 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_environment_adds_no_ambience() {
        let b = builder(Arc::new(EnvironmentTable::new(&default_environments(), "")));
        let items = b.build(&[narrated("It was quiet.", SpeechRate::Slow, "spaceship")]);
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_zero_word_segment_emits_nothing() {
        let b = builder(Arc::new(NoSounds));
        let items = b.build(&[
            narrated("   ", SpeechRate::Slow, ""),
            narrated("a b c", SpeechRate::Slow, ""),
        ]);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].start, 0.0);
    }

    #[test]
    fn test_failed_narration_keeps_timeline_slot() {
        let b = builder(Arc::new(NoSounds));
        let items = b.build(&[
            NarratedSegment::new(TextSegment::new("a b c d", SpeechRate::Moderate), None),
            narrated("e f", SpeechRate::Moderate, ""),
        ]);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].start, 2.0);
    }

    #[test]
    fn test_duplicate_resources_scheduled_independently() {
        let b = builder(Arc::new(NoSounds));
        let voice = ResourceRef::location("same.mp3");
        let items = b.build(&[
            NarratedSegment::new(TextSegment::new("a b", SpeechRate::Moderate), Some(voice.clone())),
            NarratedSegment::new(TextSegment::new("c d", SpeechRate::Moderate), Some(voice)),
        ]);

        assert_eq!(items.len(), 2);
        assert_eq!(items[1].start, 1.0);
    }

    #[test]
    fn test_cues_included_when_enabled() {
        let mut settings = QueueSettings::default();
        settings.include_cues = true;
        let b = QueueBuilder::new(Arc::new(EnvironmentTable::new(&default_environments(), "")), settings);

        // 40 words at 1.0 wps = 40 s in the forest: birds every 10 s at 10, 20, 30
        let text = vec!["w"; 40].join(" ");
        let items = b.build(&[narrated(&text, SpeechRate::VerySlow, "forest")]);

        assert_eq!(items.len(), 2 + 3);
        let cue_starts: Vec<f64> = items[2..].iter().map(|i| i.start).collect();
        assert_eq!(cue_starts, vec![10.0, 20.0, 30.0]);
        assert!(items[2..].iter().all(|i| !i.looped));
    }
}
