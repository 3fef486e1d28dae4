//! Timing estimator
//!
//! Converts a segment's text and speech-rate category into a [`TimingInfo`]:
//! estimated duration from a word count, fades proportional to the duration,
//! and a transition type read off the text's punctuation.
//!
//! Pure and deterministic; no I/O.

use crate::error::{Error, Result};
use narramix_common::text::word_count;
use narramix_common::{SpeechRate, TimingInfo, TransitionType};
use tracing::warn;

/// Upper bound on a fade, in seconds
pub const MAX_FADE_SECS: f64 = 1.0;

/// Fade length as a fraction of the segment duration
pub const FADE_RATIO: f64 = 0.1;

/// Ellipsis marking a trailing-off sentence
const ELLIPSIS: &str = "...";

/// Rate used when a label is not recognized
pub const FALLBACK_RATE: SpeechRate = SpeechRate::Fast;

/// Estimate timing for `text` spoken at `rate`
pub fn estimate(text: &str, rate: SpeechRate) -> TimingInfo {
    let words = word_count(text);
    let estimated_duration = words as f64 / rate.words_per_second();
    let fade = MAX_FADE_SECS.min(estimated_duration * FADE_RATIO);
    let transition = classify_transition(text);

    TimingInfo {
        estimated_duration,
        fade_in: fade,
        fade_out: fade,
        transition,
        transition_duration: transition.duration_secs(),
    }
}

/// Estimate timing from a free-form rate label, defaulting unknown labels
pub fn estimate_for_label(text: &str, rate_label: &str) -> TimingInfo {
    estimate(text, speech_rate_or_default(rate_label))
}

/// Transition type from surface punctuation
///
/// Checked in order: an ellipsis anywhere → crossfade; trimmed text ending in
/// `.`, `!` or `?` → cut; anything else → overlap.
pub fn classify_transition(text: &str) -> TransitionType {
    if text.contains(ELLIPSIS) {
        TransitionType::Crossfade
    } else if text.trim_end().ends_with(['.', '!', '?']) {
        TransitionType::Cut
    } else {
        TransitionType::Overlap
    }
}

/// Strict label parsing
pub fn speech_rate_from_label(label: &str) -> Result<SpeechRate> {
    SpeechRate::parse(label).ok_or_else(|| Error::InvalidCategory(label.to_string()))
}

/// Lenient label parsing: unknown labels map to [`FALLBACK_RATE`]
pub fn speech_rate_or_default(label: &str) -> SpeechRate {
    match speech_rate_from_label(label) {
        Ok(rate) => rate,
        Err(e) => {
            warn!("{}, using {}", e, FALLBACK_RATE);
            FALLBACK_RATE
        }
    }
}
