//! Text segment and timing data model
//!
//! A [`TextSegment`] is one contiguous slice of input text with the tags the
//! classifier assigned to it. The timing estimator derives a [`TimingInfo`]
//! from it; the queue builder turns both into scheduled audio items.

use crate::text::fold_tag;
use serde::{Deserialize, Serialize};

/// Speech-rate category (closed set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpeechRate {
    VerySlow,
    Slow,
    Moderate,
    Fast,
}

impl SpeechRate {
    /// Estimated words spoken per second at this rate
    pub fn words_per_second(&self) -> f64 {
        match self {
            SpeechRate::VerySlow => 1.0,
            SpeechRate::Slow => 1.5,
            SpeechRate::Moderate => 2.0,
            SpeechRate::Fast => 2.5,
        }
    }

    /// Parse a rate label (case and accent insensitive)
    ///
    /// English and French labels are accepted: "very-slow" / "très lent",
    /// "slow" / "lent", "moderate" / "modéré", "fast" / "rapide".
    /// Returns `None` for anything else; callers decide the policy.
    pub fn parse(label: &str) -> Option<Self> {
        match fold_tag(label).replace('-', "_").as_str() {
            "very_slow" | "tres_lent" => Some(SpeechRate::VerySlow),
            "slow" | "lent" => Some(SpeechRate::Slow),
            "moderate" | "modere" => Some(SpeechRate::Moderate),
            "fast" | "rapide" => Some(SpeechRate::Fast),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SpeechRate::VerySlow => "very-slow",
            SpeechRate::Slow => "slow",
            SpeechRate::Moderate => "moderate",
            SpeechRate::Fast => "fast",
        }
    }

    pub fn all_variants() -> &'static [SpeechRate] {
        &[
            SpeechRate::VerySlow,
            SpeechRate::Slow,
            SpeechRate::Moderate,
            SpeechRate::Fast,
        ]
    }
}

impl std::fmt::Display for SpeechRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Narration loudness category assigned by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum VolumeCategory {
    Soft,
    #[default]
    Normal,
    Loud,
}

impl VolumeCategory {
    /// Parse a volume label ("soft"/"doux", "normal", "loud"/"fort")
    pub fn parse(label: &str) -> Option<Self> {
        match fold_tag(label).as_str() {
            "soft" | "doux" => Some(VolumeCategory::Soft),
            "normal" => Some(VolumeCategory::Normal),
            "loud" | "fort" => Some(VolumeCategory::Loud),
            _ => None,
        }
    }
}

/// One classified slice of input text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSegment {
    /// Raw segment text
    pub text: String,

    /// Environment tag; empty means no ambience
    #[serde(default)]
    pub environment: String,

    /// Emotion tag
    #[serde(default)]
    pub emotion: String,

    pub speech_rate: SpeechRate,

    #[serde(default)]
    pub volume: VolumeCategory,
}

impl TextSegment {
    /// Segment with no environment, emotion or volume tags
    pub fn new(text: impl Into<String>, speech_rate: SpeechRate) -> Self {
        Self {
            text: text.into(),
            environment: String::new(),
            emotion: String::new(),
            speech_rate,
            volume: VolumeCategory::Normal,
        }
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    pub fn with_emotion(mut self, emotion: impl Into<String>) -> Self {
        self.emotion = emotion.into();
        self
    }

    pub fn with_volume(mut self, volume: VolumeCategory) -> Self {
        self.volume = volume;
        self
    }

    /// True when an ambience lookup should be attempted
    pub fn has_environment(&self) -> bool {
        !self.environment.trim().is_empty()
    }
}

/// Transition from a segment into the next one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionType {
    /// Next segment overlaps this one by the transition duration
    Crossfade,
    /// Hard boundary after terminal punctuation
    Cut,
    /// Soft boundary; does not move the next start
    Overlap,
}

impl TransitionType {
    /// Transition duration in seconds
    pub fn duration_secs(&self) -> f64 {
        match self {
            TransitionType::Crossfade => 1.0,
            TransitionType::Cut => 0.2,
            TransitionType::Overlap => 0.5,
        }
    }
}

/// Derived timing for one segment (all values in seconds)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingInfo {
    pub estimated_duration: f64,
    pub fade_in: f64,
    pub fade_out: f64,
    pub transition: TransitionType,
    pub transition_duration: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speech_rate_labels() {
        assert_eq!(SpeechRate::parse("very-slow"), Some(SpeechRate::VerySlow));
        assert_eq!(SpeechRate::parse("Très lent"), Some(SpeechRate::VerySlow));
        assert_eq!(SpeechRate::parse("lent"), Some(SpeechRate::Slow));
        assert_eq!(SpeechRate::parse("modéré"), Some(SpeechRate::Moderate));
        assert_eq!(SpeechRate::parse("RAPIDE"), Some(SpeechRate::Fast));
        assert_eq!(SpeechRate::parse("brisk"), None);
        assert_eq!(SpeechRate::parse(""), None);
    }

    #[test]
    fn test_speech_rate_round_trip_through_str() {
        for rate in SpeechRate::all_variants() {
            assert_eq!(SpeechRate::parse(rate.as_str()), Some(*rate));
        }
    }

    #[test]
    fn test_volume_labels() {
        assert_eq!(VolumeCategory::parse("doux"), Some(VolumeCategory::Soft));
        assert_eq!(VolumeCategory::parse("Loud"), Some(VolumeCategory::Loud));
        assert_eq!(VolumeCategory::parse("whisper"), None);
    }

    #[test]
    fn test_segment_serde_defaults() {
        let seg: TextSegment =
            serde_json::from_str(r#"{"text":"hello","speech_rate":"moderate"}"#).unwrap();
        assert_eq!(seg.speech_rate, SpeechRate::Moderate);
        assert_eq!(seg.volume, VolumeCategory::Normal);
        assert!(!seg.has_environment());
    }

    #[test]
    fn test_has_environment_ignores_whitespace() {
        let seg = TextSegment::new("x", SpeechRate::Slow).with_environment("  ");
        assert!(!seg.has_environment());
    }
}
