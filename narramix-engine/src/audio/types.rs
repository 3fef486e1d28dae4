//! Core audio data types
//!
//! Defines the in-memory PCM representation shared by the decoder, the
//! decode cache and the mixer.

/// Decoded PCM audio held fully in RAM
///
/// **Format:**
/// - Samples are f32 (floating point -1.0 to 1.0)
/// - Interleaved in the source's native channel layout: [c0, c1, c0, c1, ...]
/// - Sample rate is the mixer rate once the resampler has run
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    /// PCM samples (interleaved)
    pub samples: Vec<f32>,

    pub sample_rate: u32,

    /// Channel count (1 = mono, 2 = stereo, ...)
    pub channels: u16,

    /// Number of frames (samples.len() / channels)
    pub frames: usize,
}

impl DecodedAudio {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        let channels = channels.max(1);
        let frames = samples.len() / channels as usize;

        Self {
            samples,
            sample_rate,
            channels,
            frames,
        }
    }

    /// Silent buffer of `frames` frames
    pub fn silence(frames: usize, sample_rate: u32, channels: u16) -> Self {
        Self::new(vec![0.0; frames * channels.max(1) as usize], sample_rate, channels)
    }

    /// Get duration in seconds
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.frames == 0
    }

    /// Sample feeding output channel `out_channel` at `frame`
    ///
    /// Mono sources feed every output channel; wider sources map their
    /// channels one to one and extra source channels are ignored.
    #[inline]
    pub fn sample_for(&self, frame: usize, out_channel: usize) -> f32 {
        let channels = self.channels as usize;
        let source_channel = if channels == 1 {
            0
        } else {
            out_channel.min(channels - 1)
        };
        self.samples
            .get(frame * channels + source_channel)
            .copied()
            .unwrap_or(0.0)
    }

    /// Peak absolute sample value
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |peak, s| peak.max(s.abs()))
    }
}
