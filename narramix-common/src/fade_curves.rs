//! Fade curve implementations for item fade-in/fade-out
//!
//! Provides the gain curves applied by the mixer at the head and tail of
//! every scheduled item, plus [`FadeEnvelope`], which turns a pair of fade
//! lengths (in frames) into a per-frame gain.
//!
//! The default curve is [`FadeCurve::Linear`]: gain ramps `i / fade_in_frames`
//! over the head and `(len - i) / fade_out_frames` over the tail.

use serde::{Deserialize, Serialize};
use std::f32::consts::FRAC_PI_2;

/// Fade curve types
///
/// - Linear: Constant rate of change (the mixer's default)
/// - Exponential: Slow start, fast finish
/// - Logarithmic: Fast start, slow finish
/// - SCurve: Smooth acceleration and deceleration
/// - EqualPower: Constant perceived loudness when two items overlap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FadeCurve {
    /// v(t) = t
    #[default]
    Linear,

    /// v(t) = t²
    Exponential,

    /// v(t) = (1-t)² for fade-out
    Logarithmic,

    /// v(t) = 0.5 × (1 - cos(π × t))
    #[serde(alias = "cosine", alias = "s-curve")]
    SCurve,

    /// v(t) = sin(t × π/2)
    EqualPower,
}

impl FadeCurve {
    /// Fade-in multiplier at a normalized position (0.0 = fade start, 1.0 = full volume)
    pub fn calculate_fade_in(&self, position: f32) -> f32 {
        let t = position.clamp(0.0, 1.0);

        match self {
            FadeCurve::Linear => t,
            FadeCurve::Exponential => t * t,
            FadeCurve::Logarithmic => t.sqrt(),
            FadeCurve::SCurve => 0.5 * (1.0 - (std::f32::consts::PI * t).cos()),
            FadeCurve::EqualPower => (t * FRAC_PI_2).sin(),
        }
    }

    /// Fade-out multiplier given the fraction of the fade still remaining
    ///
    /// `remaining` is 1.0 where the fade-out starts and 0.0 at the last frame
    /// boundary, so a linear fade-out is exactly `remaining`.
    pub fn calculate_fade_out(&self, remaining: f32) -> f32 {
        let r = remaining.clamp(0.0, 1.0);

        match self {
            FadeCurve::Linear => r,
            FadeCurve::Exponential | FadeCurve::Logarithmic => r * r,
            FadeCurve::SCurve => 0.5 * (1.0 - (std::f32::consts::PI * r).cos()),
            FadeCurve::EqualPower => (r * FRAC_PI_2).sin(),
        }
    }

    pub fn all_variants() -> &'static [FadeCurve] {
        &[
            FadeCurve::Linear,
            FadeCurve::Exponential,
            FadeCurve::Logarithmic,
            FadeCurve::SCurve,
            FadeCurve::EqualPower,
        ]
    }
}

/// Per-frame gain envelope for one rendered item
///
/// Frames `0..fade_in_frames` ramp up, the last `fade_out_frames` frames ramp
/// down. Where the two regions overlap (very short items) the smaller gain wins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeEnvelope {
    len_frames: usize,
    fade_in_frames: usize,
    fade_out_frames: usize,
    curve: FadeCurve,
}

impl FadeEnvelope {
    pub fn new(
        len_frames: usize,
        fade_in_frames: usize,
        fade_out_frames: usize,
        curve: FadeCurve,
    ) -> Self {
        Self {
            len_frames,
            fade_in_frames,
            fade_out_frames,
            curve,
        }
    }

    /// Gain in 0.0..=1.0 for frame `i` of the item
    pub fn gain_at(&self, i: usize) -> f32 {
        let mut gain = 1.0f32;

        if self.fade_in_frames > 0 && i < self.fade_in_frames {
            gain = self
                .curve
                .calculate_fade_in(i as f32 / self.fade_in_frames as f32);
        }

        if self.fade_out_frames > 0 && i + self.fade_out_frames > self.len_frames {
            let remaining = self.len_frames.saturating_sub(i) as f32 / self.fade_out_frames as f32;
            gain = gain.min(self.curve.calculate_fade_out(remaining));
        }

        gain
    }

    /// True when no frame is attenuated
    pub fn is_flat(&self) -> bool {
        self.fade_in_frames == 0 && self.fade_out_frames == 0
    }
}
