//! Seconds ↔ frame conversions for the mix timeline
//!
//! The timeline is expressed in seconds (f64). The mixer works in frames at
//! its working sample rate. Three rounding rules are used, and each has its
//! own helper so call sites never improvise:
//!
//! - item placement: `round(start × rate)` ([`start_frame`])
//! - fade lengths: `floor(fade × rate)` ([`fade_frames`])
//! - output length: `ceil(end × rate)` ([`output_frames`])
//!
//! # Examples
//!
//! ```rust
//! use narramix_common::time::*;
//!
//! assert_eq!(start_frame(1.5, 44_100), 66_150);
//! assert_eq!(fade_frames(0.1, 44_100), 4_410);
//! assert_eq!(output_frames(2.00001, 44_100), 88_201);
//! assert_eq!(frames_to_seconds(22_050, 44_100), 0.5);
//! ```

/// Default working sample rate (44.1 kHz)
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Output channel count (stereo)
pub const OUTPUT_CHANNELS: u16 = 2;

/// First output frame of an item starting at `start_secs`
pub fn start_frame(start_secs: f64, sample_rate: u32) -> usize {
    (start_secs.max(0.0) * sample_rate as f64).round() as usize
}

/// Number of frames covered by a fade of `fade_secs`
pub fn fade_frames(fade_secs: f64, sample_rate: u32) -> usize {
    (fade_secs.max(0.0) * sample_rate as f64).floor() as usize
}

/// Frames needed to hold a timeline ending at `end_secs`
pub fn output_frames(end_secs: f64, sample_rate: u32) -> usize {
    (end_secs.max(0.0) * sample_rate as f64).ceil() as usize
}

/// Frames spanned by a duration, rounded to the nearest frame
pub fn duration_frames(duration_secs: f64, sample_rate: u32) -> usize {
    (duration_secs.max(0.0) * sample_rate as f64).round() as usize
}

pub fn frames_to_seconds(frames: usize, sample_rate: u32) -> f64 {
    frames as f64 / sample_rate as f64
}
