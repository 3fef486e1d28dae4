//! Audio Test Fixture Generator
//!
//! Builds 16-bit WAV fixtures in memory or on disk

use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Configuration for generated audio
#[derive(Debug, Clone)]
pub struct AudioConfig {
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,

    /// Peak amplitude 0.0..=1.0 (0.0 writes silence)
    pub amplitude: f32,

    /// Tone frequency; `None` writes a constant (DC) level
    pub frequency: Option<f32>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            duration_seconds: 1.0,
            sample_rate: 44100,
            channels: 2,
            amplitude: 0.3,
            frequency: Some(440.0),
        }
    }
}

fn sample_at(config: &AudioConfig, i: usize) -> i16 {
    let level = match config.frequency {
        Some(freq) => {
            let t = i as f32 / config.sample_rate as f32;
            config.amplitude * (2.0 * std::f32::consts::PI * freq * t).sin()
        }
        None => config.amplitude,
    };
    (level * i16::MAX as f32).round() as i16
}

/// Encode a WAV with `config` into memory
pub fn wav_bytes(config: &AudioConfig) -> anyhow::Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: config.channels,
        sample_rate: config.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        let frames = (config.duration_seconds * config.sample_rate as f64).round() as usize;
        for i in 0..frames {
            let sample = sample_at(config, i);
            for _ in 0..config.channels {
                writer.write_sample(sample)?;
            }
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

/// Generate a test WAV file with specified configuration
pub fn generate_test_wav(path: &Path, config: &AudioConfig) -> anyhow::Result<PathBuf> {
    std::fs::write(path, wav_bytes(config)?)?;
    Ok(path.to_path_buf())
}

/// 440 Hz tone
pub fn tone_wav(duration_seconds: f64, sample_rate: u32, amplitude: f32) -> Vec<u8> {
    wav_bytes(&AudioConfig {
        duration_seconds,
        sample_rate,
        amplitude,
        ..AudioConfig::default()
    })
    .unwrap()
}

/// Constant level, handy for exact peak assertions
pub fn constant_wav(duration_seconds: f64, sample_rate: u32, level: f32) -> Vec<u8> {
    wav_bytes(&AudioConfig {
        duration_seconds,
        sample_rate,
        amplitude: level,
        frequency: None,
        ..AudioConfig::default()
    })
    .unwrap()
}

pub fn silent_wav(duration_seconds: f64, sample_rate: u32) -> Vec<u8> {
    constant_wav(duration_seconds, sample_rate, 0.0)
}
