//! # Narramix Common Library
//!
//! Shared code for the narramix workspace:
//! - Segment and schedule data model (TextSegment, TimingInfo, ScheduledAudioItem)
//! - Fade curve definitions and per-frame gain calculation
//! - Seconds/frames conversion helpers
//! - TOML configuration loading and defaults
//! - Accent-insensitive text folding used for tag lookups

pub mod config;
pub mod error;
pub mod fade_curves;
pub mod schedule;
pub mod segment;
pub mod text;
pub mod time;

pub use error::{Error, Result};
pub use fade_curves::FadeCurve;
pub use schedule::{InlineAudio, ResourceRef, ScheduledAudioItem};
pub use segment::{SpeechRate, TextSegment, TimingInfo, TransitionType, VolumeCategory};
