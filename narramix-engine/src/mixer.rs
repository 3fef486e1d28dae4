//! Audio mixer
//!
//! Renders a list of scheduled items into one stereo timeline.
//!
//! # Pipeline
//!
//! 1. Fetch and decode every item concurrently through the decode cache.
//!    Items that fail are logged and dropped.
//! 2. Allocate a silent stereo buffer long enough for the latest item end.
//! 3. Add each item at its start frame, scaled by its volume and fade
//!    envelope. Looped items tile their source across the scheduled span.
//! 4. Scale the whole buffer down if its peak exceeds the ceiling.
//! 5. Encode as 16-bit PCM WAV.
//!
//! [`AudioMixer::mix`] never fails on decode problems: if nothing can be
//! rendered it falls back to playing the first item as-is. Only an empty
//! request is an error. [`AudioMixer::render`] is the strict variant.

use crate::audio::{encode_wav, DecodedAudio, Resampler, SimpleDecoder, WAV_MIME};
use crate::cache::{DecodeCache, EvictionPolicy};
use crate::error::{Error, Result};
use crate::resource::ResourceFetcher;
use bytes::Bytes;
use futures::future::join_all;
use narramix_common::config::NarramixConfig;
use narramix_common::fade_curves::FadeEnvelope;
use narramix_common::time::{duration_frames, fade_frames, output_frames, start_frame, DEFAULT_SAMPLE_RATE, OUTPUT_CHANNELS};
use narramix_common::{FadeCurve, ResourceRef, ScheduledAudioItem};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Mixer settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixerConfig {
    /// Working and output sample rate (Hz)
    pub sample_rate: u32,

    /// Peak ceiling enforced by normalization
    pub normalize_ceiling: f32,

    pub fade_curve: FadeCurve,

    pub eviction: EvictionPolicy,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            normalize_ceiling: 0.95,
            fade_curve: FadeCurve::Linear,
            eviction: EvictionPolicy::Unbounded,
        }
    }
}

impl MixerConfig {
    pub fn from_config(config: &NarramixConfig) -> Self {
        Self {
            sample_rate: config.sample_rate,
            normalize_ceiling: config.mixer.normalize_ceiling,
            fade_curve: config.mixer.fade_curve,
            eviction: EvictionPolicy::from_max_entries(config.mixer.cache_max_entries),
        }
    }
}

/// Playable handle for a mix result
#[derive(Debug, Clone, PartialEq)]
pub enum AudioResource {
    /// An existing resource, played as-is
    Passthrough(ResourceRef),

    /// Freshly rendered audio held in memory
    Rendered { id: Uuid, bytes: Bytes, mime: String },
}

impl AudioResource {
    /// Encoded bytes of a rendered mix
    pub fn bytes(&self) -> Option<&Bytes> {
        match self {
            AudioResource::Rendered { bytes, .. } => Some(bytes),
            AudioResource::Passthrough(_) => None,
        }
    }
}

impl std::fmt::Display for AudioResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioResource::Passthrough(resource) => write!(f, "{}", resource),
            AudioResource::Rendered { id, bytes, mime } => {
                write!(f, "mix:{} ({}, {} bytes)", id, mime, bytes.len())
            }
        }
    }
}

/// How a result was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixOutcome {
    /// Single item without ambience, nothing rendered
    Passthrough,

    /// Rendered from at least one decoded item
    Mixed,

    /// Rendering failed; first item returned as-is
    Degraded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MixedAudioResult {
    pub resource: AudioResource,

    /// Seconds; latest item end
    pub duration: f64,

    /// Items that made it into the result
    pub segments: Vec<ScheduledAudioItem>,

    pub outcome: MixOutcome,
}

impl MixedAudioResult {
    fn passthrough(item: &ScheduledAudioItem, outcome: MixOutcome) -> Self {
        Self {
            resource: AudioResource::Passthrough(item.resource.clone()),
            duration: item.duration,
            segments: vec![item.clone()],
            outcome,
        }
    }
}

/// Scheduled span of `item` in seconds, falling back to its decoded length
fn effective_duration(item: &ScheduledAudioItem, audio: &DecodedAudio) -> f64 {
    if item.duration > 0.0 {
        item.duration
    } else {
        audio.duration_seconds()
    }
}

/// Add one decoded item into an interleaved output buffer
///
/// Non-looped items render every decoded frame, with the fade-out on the
/// decoded tail, even when that runs past the scheduled duration. Looped
/// items repeat their source until the scheduled length instead. Frames past
/// the end of `out` are dropped.
pub fn place_item(
    out: &mut [f32],
    out_channels: usize,
    sample_rate: u32,
    item: &ScheduledAudioItem,
    audio: &DecodedAudio,
    curve: FadeCurve,
) {
    let decoded = audio.frames;
    if decoded == 0 || out_channels == 0 {
        return;
    }

    let len = if item.looped && item.duration > 0.0 {
        duration_frames(item.duration, sample_rate)
    } else {
        decoded
    };

    let envelope = FadeEnvelope::new(
        len,
        fade_frames(item.fade_in.unwrap_or(0.0), sample_rate),
        fade_frames(item.fade_out.unwrap_or(0.0), sample_rate),
        curve,
    );

    let start = start_frame(item.start, sample_rate);
    let total_frames = out.len() / out_channels;
    let end = len.min(total_frames.saturating_sub(start));

    let flat = envelope.is_flat();
    for i in 0..end {
        let gain = if flat { item.volume } else { item.volume * envelope.gain_at(i) };
        let source = if item.looped { i % decoded } else { i };
        let base = (start + i) * out_channels;
        for ch in 0..out_channels {
            out[base + ch] += audio.sample_for(source, ch) * gain;
        }
    }
}

/// Sum decoded items into a fresh stereo buffer at `sample_rate`
pub fn mix_decoded(inputs: &[(&ScheduledAudioItem, &DecodedAudio)], sample_rate: u32, curve: FadeCurve) -> Vec<f32> {
    let channels = OUTPUT_CHANNELS as usize;
    let end = inputs
        .iter()
        .map(|(item, audio)| item.start + effective_duration(item, audio))
        .fold(0.0f64, f64::max);
    let frames = output_frames(end, sample_rate);

    let mut out = vec![0.0f32; frames * channels];
    for (item, audio) in inputs {
        place_item(&mut out, channels, sample_rate, item, audio, curve);
    }
    out
}

/// Scale `samples` so the peak is at most `ceiling`
///
/// Buffers already at or under the ceiling are untouched. Returns the gain
/// applied.
pub fn normalize(samples: &mut [f32], ceiling: f32) -> f32 {
    let peak = samples.iter().fold(0.0f32, |peak, s| peak.max(s.abs()));
    if peak <= ceiling {
        return 1.0;
    }

    let gain = ceiling / peak;
    for sample in samples.iter_mut() {
        *sample *= gain;
    }
    debug!(peak, gain, "Normalized mix");
    gain
}

/// Mixes scheduled items into one rendered timeline
pub struct AudioMixer {
    config: MixerConfig,
    fetcher: Arc<dyn ResourceFetcher>,
    cache: Arc<DecodeCache>,
}

impl AudioMixer {
    pub fn new(config: MixerConfig, fetcher: Arc<dyn ResourceFetcher>) -> Self {
        Self {
            cache: Arc::new(DecodeCache::new(config.eviction)),
            config,
            fetcher,
        }
    }

    /// Share a decode cache between mixers running at the same sample rate
    pub fn with_cache(mut self, cache: Arc<DecodeCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn config(&self) -> &MixerConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<DecodeCache> {
        &self.cache
    }

    /// Mix `items`, degrading to the first item when rendering fails
    pub async fn mix(&self, items: &[ScheduledAudioItem]) -> Result<MixedAudioResult> {
        let first = items.first().ok_or(Error::NoItems)?;

        if items.len() == 1 && !first.has_environment() {
            debug!(resource = %first.resource, "Single item without ambience, passing through");
            return Ok(MixedAudioResult::passthrough(first, MixOutcome::Passthrough));
        }

        match self.render(items).await {
            Ok(result) => Ok(result),
            Err(e) => {
                error!("Mix failed, falling back to first item: {}", e);
                Ok(MixedAudioResult::passthrough(first, MixOutcome::Degraded))
            }
        }
    }

    /// Render `items` to WAV, failing if no item decodes
    pub async fn render(&self, items: &[ScheduledAudioItem]) -> Result<MixedAudioResult> {
        if items.is_empty() {
            return Err(Error::NoItems);
        }

        info!(items = items.len(), sample_rate = self.config.sample_rate, "Mixing");

        let loaded = join_all(items.iter().map(|item| async move { (item, self.load(item).await) })).await;

        let mut survivors = Vec::with_capacity(loaded.len());
        for (item, result) in loaded {
            match result {
                Ok(audio) => survivors.push((item, audio)),
                Err(e) => warn!(resource = %item.resource, "Dropping item: {}", e),
            }
        }

        if survivors.is_empty() {
            return Err(Error::MixFailure(format!(
                "none of {} items could be decoded",
                items.len()
            )));
        }

        let inputs: Vec<(&ScheduledAudioItem, &DecodedAudio)> =
            survivors.iter().map(|(item, audio)| (*item, audio.as_ref())).collect();

        let mut samples = mix_decoded(&inputs, self.config.sample_rate, self.config.fade_curve);
        normalize(&mut samples, self.config.normalize_ceiling);
        let bytes = encode_wav(&samples, self.config.sample_rate, OUTPUT_CHANNELS)?;

        let duration = inputs
            .iter()
            .map(|(item, audio)| item.start + effective_duration(item, audio))
            .fold(0.0f64, f64::max);

        info!(
            survivors = inputs.len(),
            dropped = items.len() - inputs.len(),
            duration,
            bytes = bytes.len(),
            "Mix rendered"
        );

        Ok(MixedAudioResult {
            resource: AudioResource::Rendered {
                id: Uuid::new_v4(),
                bytes,
                mime: WAV_MIME.to_string(),
            },
            duration,
            segments: inputs.iter().map(|(item, _)| (*item).clone()).collect(),
            outcome: MixOutcome::Mixed,
        })
    }

    /// Decoded audio for one item at the mixer rate, via the cache
    async fn load(&self, item: &ScheduledAudioItem) -> Result<Arc<DecodedAudio>> {
        let key = item.resource.cache_key();
        let sample_rate = self.config.sample_rate;

        self.cache
            .get_or_decode(&key, || async {
                let fetched = self.fetcher.fetch(&item.resource).await?;
                let name = key.clone();

                tokio::task::spawn_blocking(move || {
                    let audio = SimpleDecoder::decode_bytes(&name, fetched.bytes, fetched.mime.as_deref())?;
                    Resampler::to_rate(audio, sample_rate)
                })
                .await
                .map_err(|e| Error::Internal(format!("decode task failed: {}", e)))?
            })
            .await
            .map_err(|e| match e {
                Error::ResourceDecode { .. } => e,
                other => Error::decode(&key, other),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 1000;

    fn item(start: f64, duration: f64) -> ScheduledAudioItem {
        ScheduledAudioItem::new(ResourceRef::location("x.wav"), start, duration)
    }

    fn constant(frames: usize, value: f32, channels: u16) -> DecodedAudio {
        DecodedAudio::new(vec![value; frames * channels as usize], RATE, channels)
    }

    #[test]
    fn test_place_at_start_frame() {
        let mut out = vec![0.0; 20 * 2];
        place_item(&mut out, 2, RATE, &item(0.005, 0.01), &constant(10, 0.5, 2), FadeCurve::Linear);

        assert_eq!(out[4 * 2], 0.0);
        assert_eq!(out[5 * 2], 0.5);
        assert_eq!(out[14 * 2 + 1], 0.5);
        assert_eq!(out[15 * 2], 0.0);
    }

    #[test]
    fn test_mono_is_duplicated() {
        let mut out = vec![0.0; 4 * 2];
        place_item(&mut out, 2, RATE, &item(0.0, 0.004), &constant(4, 0.25, 1), FadeCurve::Linear);
        assert!(out.iter().all(|s| *s == 0.25));
    }

    #[test]
    fn test_linear_fades() {
        // 10 frames, 4 frame fade in, 2 frame fade out
        let it = item(0.0, 0.01).with_fades(0.004, 0.002);
        let mut out = vec![0.0; 10 * 2];
        place_item(&mut out, 2, RATE, &it, &constant(10, 1.0, 2), FadeCurve::Linear);

        let left: Vec<f32> = out.iter().step_by(2).copied().collect();
        assert_eq!(&left[..4], &[0.0, 0.25, 0.5, 0.75]);
        assert_eq!(&left[4..8], &[1.0, 1.0, 1.0, 1.0]);
        // frame 8: remaining 2/2, frame 9: 1/2
        assert_eq!(left[8], 1.0);
        assert_eq!(left[9], 0.5);
    }

    #[test]
    fn test_volume_scales() {
        let mut out = vec![0.0; 4 * 2];
        place_item(&mut out, 2, RATE, &item(0.0, 0.004).with_volume(0.4), &constant(4, 0.5, 2), FadeCurve::Linear);
        assert!(out.iter().all(|s| (*s - 0.2).abs() < 1e-6));
    }

    #[test]
    fn test_decoded_length_ignores_scheduled_duration() {
        let mut out = vec![0.0; 20 * 2];
        place_item(&mut out, 2, RATE, &item(0.0, 0.005), &constant(10, 0.5, 2), FadeCurve::Linear);
        assert_eq!(out[9 * 2], 0.5);
        assert_eq!(out[10 * 2], 0.0);

        let mut out = vec![0.0; 20 * 2];
        place_item(&mut out, 2, RATE, &item(0.0, 0.015), &constant(10, 0.5, 2), FadeCurve::Linear);
        assert_eq!(out[9 * 2], 0.5);
        assert_eq!(out[10 * 2], 0.0);
    }

    #[test]
    fn test_decoded_tail_survives_past_scheduled_end() {
        // Voice estimated at 5 frames but decoded at 10; a later item keeps
        // the output 15 frames long
        let voice = item(0.0, 0.005).with_fades(0.0, 0.002);
        let later = item(0.005, 0.010);
        let audio = constant(10, 0.5, 2);
        let silent = constant(10, 0.0, 2);

        let out = mix_decoded(&[(&voice, &audio), (&later, &silent)], RATE, FadeCurve::Linear);
        let left: Vec<f32> = out.iter().step_by(2).copied().collect();

        assert_eq!(left.len(), 15);
        assert_eq!(left[4], 0.5);
        assert_eq!(left[7], 0.5);
        // Two-frame fade-out ends on the decoded tail, not at frame 5
        assert_eq!(left[8], 0.5);
        assert_eq!(left[9], 0.25);
        assert_eq!(left[10], 0.0);
    }

    #[test]
    fn test_looped_item_tiles_source() {
        let source = DecodedAudio::new(vec![0.1, 0.2, 0.3], RATE, 1);
        let mut out = vec![0.0; 8 * 2];
        place_item(&mut out, 2, RATE, &item(0.0, 0.007).looped(true), &source, FadeCurve::Linear);

        let left: Vec<f32> = out.iter().step_by(2).copied().collect();
        assert_eq!(left, vec![0.1, 0.2, 0.3, 0.1, 0.2, 0.3, 0.1, 0.0]);
    }

    #[test]
    fn test_writes_past_end_are_clipped() {
        let mut out = vec![0.0; 5 * 2];
        place_item(&mut out, 2, RATE, &item(0.003, 0.01), &constant(10, 0.5, 2), FadeCurve::Linear);
        assert_eq!(out[2 * 2], 0.0);
        assert_eq!(out[4 * 2 + 1], 0.5);

        // Starting entirely past the end touches nothing
        let mut out = vec![0.0; 5 * 2];
        place_item(&mut out, 2, RATE, &item(1.0, 0.01), &constant(10, 0.5, 2), FadeCurve::Linear);
        assert!(out.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_mix_length_and_sum() {
        let a = item(0.0, 0.010);
        let b = item(0.005, 0.010);
        let audio = constant(10, 0.5, 2);
        let out = mix_decoded(&[(&a, &audio), (&b, &audio)], RATE, FadeCurve::Linear);

        assert_eq!(out.len(), 15 * 2);
        assert_eq!(out[2 * 2], 0.5);
        assert_eq!(out[7 * 2], 1.0);
        assert_eq!(out[12 * 2], 0.5);
    }

    #[test]
    fn test_zero_duration_uses_decoded_length() {
        let a = item(0.002, 0.0);
        let audio = constant(10, 0.5, 2);
        let out = mix_decoded(&[(&a, &audio)], RATE, FadeCurve::Linear);
        assert_eq!(out.len(), 12 * 2);
        assert_eq!(out[11 * 2], 0.5);
    }

    #[test]
    fn test_normalize_caps_peak() {
        let mut samples = vec![0.5, -1.9, 1.2, 0.0];
        let gain = normalize(&mut samples, 0.95);

        assert!((gain - 0.5).abs() < 1e-6);
        let peak = samples.iter().fold(0.0f32, |p, s| p.max(s.abs()));
        assert!(peak <= 0.95 + 1e-6);
        assert!((samples[2] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_leaves_quiet_buffer_alone() {
        let mut samples = vec![0.5, -0.3, 0.1];
        assert_eq!(normalize(&mut samples, 0.95), 1.0);
        assert_eq!(samples, vec![0.5, -0.3, 0.1]);
    }

    #[test]
    fn test_config_from_settings() {
        let mut config = NarramixConfig::default();
        config.sample_rate = 48_000;
        config.mixer.cache_max_entries = 8;

        let mixer_config = MixerConfig::from_config(&config);
        assert_eq!(mixer_config.sample_rate, 48_000);
        assert_eq!(mixer_config.normalize_ceiling, 0.95);
        assert_eq!(mixer_config.eviction, EvictionPolicy::MaxEntries(8));
    }
}
