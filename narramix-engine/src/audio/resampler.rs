//! Audio resampling using rubato
//!
//! Converts decoded audio to the mixer's working sample rate.

use super::types::DecodedAudio;
use crate::error::{Error, Result};
use rubato::{FastFixedIn, PolynomialDegree, Resampler as RubatoResampler};
use tracing::debug;

/// Audio resampler using rubato for sample rate conversion.
pub struct Resampler;

impl Resampler {
    /// Resample `audio` to `target_rate`, keeping its channel layout.
    ///
    /// Returns the input unchanged when it is already at the target rate
    /// or holds no frames.
    pub fn to_rate(audio: DecodedAudio, target_rate: u32) -> Result<DecodedAudio> {
        if audio.sample_rate == target_rate || audio.is_empty() {
            return Ok(DecodedAudio {
                sample_rate: target_rate,
                ..audio
            });
        }

        let samples = Self::resample(&audio.samples, audio.sample_rate, target_rate, audio.channels)?;
        Ok(DecodedAudio::new(samples, target_rate, audio.channels))
    }

    /// Resample interleaved samples from `input_rate` to `output_rate`.
    pub fn resample(
        input: &[f32],
        input_rate: u32,
        output_rate: u32,
        channels: u16,
    ) -> Result<Vec<f32>> {
        if input_rate == output_rate {
            return Ok(input.to_vec());
        }
        if input_rate == 0 {
            return Err(Error::Internal("Cannot resample from 0 Hz".to_string()));
        }

        debug!(
            "Resampling from {}Hz to {}Hz ({} channels)",
            input_rate, output_rate, channels
        );

        // rubato expects planar input
        let planar_input = Self::deinterleave(input, channels);
        let input_frames = planar_input.first().map_or(0, Vec::len);
        if input_frames == 0 {
            return Ok(Vec::new());
        }

        let ratio = output_rate as f64 / input_rate as f64;
        let expected_frames = (input_frames as f64 * ratio).round() as usize;

        // One chunk covering the whole buffer
        let mut resampler = FastFixedIn::<f32>::new(
            ratio,
            1.0,
            PolynomialDegree::Septic,
            input_frames,
            channels as usize,
        )
        .map_err(|e| Error::Internal(format!("Failed to create resampler: {}", e)))?;

        let delay = resampler.output_delay();
        let mut planar_output = resampler
            .process(&planar_input, None)
            .map_err(|e| Error::Internal(format!("Resampling failed: {}", e)))?;

        // Flush the filter so the tail held back by the delay comes out
        while planar_output.first().map_or(0, Vec::len) < delay + expected_frames {
            let flushed = resampler
                .process_partial::<Vec<f32>>(None, None)
                .map_err(|e| Error::Internal(format!("Resampler flush failed: {}", e)))?;
            if flushed.first().map_or(true, Vec::is_empty) {
                break;
            }
            for (channel, tail) in planar_output.iter_mut().zip(flushed) {
                channel.extend(tail);
            }
        }

        // Drop the leading delay so frame 0 stays frame 0
        for channel in planar_output.iter_mut() {
            let end = (delay + expected_frames).min(channel.len());
            channel.truncate(end);
            channel.drain(..delay.min(end));
        }

        let interleaved_output = Self::interleave(planar_output);

        debug!(
            "Resampled {} input frames to {} output frames",
            input_frames,
            interleaved_output.len() / channels.max(1) as usize
        );

        Ok(interleaved_output)
    }

    /// [L, R, L, R, ...] → [[L, L, ...], [R, R, ...]]
    fn deinterleave(samples: &[f32], channels: u16) -> Vec<Vec<f32>> {
        let num_channels = channels.max(1) as usize;
        let num_frames = samples.len() / num_channels;

        let mut planar = vec![Vec::with_capacity(num_frames); num_channels];
        for frame in samples.chunks_exact(num_channels) {
            for (ch, sample) in frame.iter().enumerate() {
                planar[ch].push(*sample);
            }
        }

        planar
    }

    /// [[L, L, ...], [R, R, ...]] → [L, R, L, R, ...]
    fn interleave(planar: Vec<Vec<f32>>) -> Vec<f32> {
        let num_channels = planar.len();
        let num_frames = planar.iter().map(Vec::len).min().unwrap_or(0);
        let mut interleaved = Vec::with_capacity(num_frames * num_channels);

        for frame_idx in 0..num_frames {
            for channel in &planar {
                interleaved.push(channel[frame_idx]);
            }
        }

        interleaved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deinterleave() {
        let planar = Resampler::deinterleave(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 2);
        assert_eq!(planar, vec![vec![1.0, 3.0, 5.0], vec![2.0, 4.0, 6.0]]);
    }

    #[test]
    fn test_interleave() {
        let interleaved = Resampler::interleave(vec![vec![1.0, 3.0, 5.0], vec![2.0, 4.0, 6.0]]);
        assert_eq!(interleaved, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert!(Resampler::interleave(Vec::new()).is_empty());
    }

    #[test]
    fn test_same_rate_is_untouched() {
        let audio = DecodedAudio::new(vec![0.1, 0.2, 0.3, 0.4], 44100, 2);
        let out = Resampler::to_rate(audio.clone(), 44100).unwrap();
        assert_eq!(out, audio);
    }

    #[test]
    fn test_empty_audio_takes_target_rate() {
        let out = Resampler::to_rate(DecodedAudio::new(Vec::new(), 22050, 1), 44100).unwrap();
        assert!(out.is_empty());
        assert_eq!(out.sample_rate, 44100);
    }

    #[test]
    fn test_downsample_keeps_alignment_and_tail() {
        let input_rate = 16000;
        let mut samples = vec![0.0f32; 1600];
        samples[0] = 1.0;

        let out = Resampler::to_rate(DecodedAudio::new(samples, input_rate, 1), 8000).unwrap();

        assert_eq!(out.frames, 800);
        let peak_frame = out
            .samples
            .iter()
            .enumerate()
            .fold((0, 0.0f32), |best, (i, s)| if s.abs() > best.1 { (i, s.abs()) } else { best })
            .0;
        assert_eq!(peak_frame, 0, "impulse moved to frame {}", peak_frame);
    }

    #[test]
    fn test_downsample_length() {
        let input_rate = 48000;
        let frames = 4800;
        let samples: Vec<f32> = (0..frames)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / input_rate as f32).sin() * 0.5)
            .collect();

        let out = Resampler::to_rate(DecodedAudio::new(samples, input_rate, 1), 44100).unwrap();

        let expected = (frames as f64 * 44100.0 / input_rate as f64) as usize;
        assert_eq!(out.channels, 1);
        assert_eq!(out.sample_rate, 44100);
        assert!(
            out.frames + 10 >= expected && out.frames <= expected + 10,
            "Expected ~{} frames, got {}",
            expected,
            out.frames
        );
    }
}
