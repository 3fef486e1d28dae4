//! Text classification
//!
//! Splits input text into segments and tags each with an environment,
//! emotion, speech rate and volume. [`Classifier`] is the seam for richer
//! (remote, model-backed) classifiers; [`KeywordClassifier`] is the local
//! keyword-matching implementation.

use crate::error::Result;
use async_trait::async_trait;
use narramix_common::config::{EmotionProfile, EnvironmentProfile, NarramixConfig, SegmentDefaults};
use narramix_common::text::fold_text;
use narramix_common::TextSegment;
use serde::Serialize;
use tracing::{debug, info};

/// Whether every segment was tagged from the text itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ClassificationStatus {
    Classified,

    /// Listed segments (by index) received default tags
    Fallback { defaulted: Vec<usize> },
}

impl ClassificationStatus {
    pub fn is_fallback(&self) -> bool {
        matches!(self, ClassificationStatus::Fallback { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub segments: Vec<TextSegment>,
    pub status: ClassificationStatus,
}

impl Classification {
    /// Whole text as one segment carrying only default tags
    pub fn fallback(text: &str, defaults: &SegmentDefaults) -> Self {
        Self {
            segments: vec![default_segment(text, defaults)],
            status: ClassificationStatus::Fallback { defaulted: vec![0] },
        }
    }
}

#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Classification>;
}

fn default_segment(text: &str, defaults: &SegmentDefaults) -> TextSegment {
    TextSegment::new(text, defaults.speech_rate)
        .with_environment(defaults.environment.clone())
        .with_emotion(defaults.emotion.clone())
        .with_volume(defaults.volume)
}

/// Paragraphs separated by one or more blank lines
///
/// Text without any non-blank paragraph comes back whole as one segment.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join("\n"));
    }

    if paragraphs.is_empty() {
        paragraphs.push(text.to_string());
    }
    paragraphs
}

/// Keyword-driven classifier
///
/// Environment and emotion are the first profile (in configuration order)
/// with a keyword occurring in the paragraph, compared case- and
/// accent-insensitively. Speech rate and volume always come from the
/// configured defaults.
pub struct KeywordClassifier {
    environments: Vec<(String, Vec<String>)>,
    emotions: Vec<(String, Vec<String>)>,
    defaults: SegmentDefaults,
}

impl KeywordClassifier {
    pub fn new(
        environments: &[EnvironmentProfile],
        emotions: &[EmotionProfile],
        defaults: SegmentDefaults,
    ) -> Self {
        let fold_all = |keywords: &[String]| -> Vec<String> {
            keywords
                .iter()
                .map(|k| fold_text(k.trim()))
                .filter(|k| !k.is_empty())
                .collect()
        };

        Self {
            environments: environments
                .iter()
                .map(|p| (p.name.clone(), fold_all(&p.keywords)))
                .collect(),
            emotions: emotions
                .iter()
                .map(|p| (p.name.clone(), fold_all(&p.keywords)))
                .collect(),
            defaults,
        }
    }

    pub fn from_config(config: &NarramixConfig) -> Self {
        Self::new(
            &config.sounds.environments,
            &config.emotions,
            config.defaults.clone(),
        )
    }

    fn first_match<'a>(table: &'a [(String, Vec<String>)], folded: &str) -> Option<&'a str> {
        table
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| folded.contains(k.as_str())))
            .map(|(name, _)| name.as_str())
    }

    /// Tag one paragraph; the flag is true when no keyword matched at all
    fn tag(&self, paragraph: &str) -> (TextSegment, bool) {
        let folded = fold_text(paragraph);
        let environment = Self::first_match(&self.environments, &folded);
        let emotion = Self::first_match(&self.emotions, &folded);

        let mut segment = default_segment(paragraph, &self.defaults);
        if let Some(env) = environment {
            segment.environment = env.to_string();
        }
        if let Some(emo) = emotion {
            segment.emotion = emo.to_string();
        }

        (segment, environment.is_none() && emotion.is_none())
    }

    pub fn classify_text(&self, text: &str) -> Classification {
        let mut segments = Vec::new();
        let mut defaulted = Vec::new();

        for (index, paragraph) in split_paragraphs(text).into_iter().enumerate() {
            let (segment, used_defaults) = self.tag(&paragraph);
            debug!(
                segment = index,
                environment = %segment.environment,
                emotion = %segment.emotion,
                defaulted = used_defaults,
                "Classified paragraph"
            );
            if used_defaults {
                defaulted.push(index);
            }
            segments.push(segment);
        }

        let status = if defaulted.is_empty() {
            ClassificationStatus::Classified
        } else {
            ClassificationStatus::Fallback { defaulted }
        };

        info!(segments = segments.len(), fallback = status.is_fallback(), "Text classified");
        Classification { segments, status }
    }
}

#[async_trait]
impl Classifier for KeywordClassifier {
    async fn classify(&self, text: &str) -> Result<Classification> {
        Ok(self.classify_text(text))
    }
}
