//! Test helper modules for narramix-engine integration tests
//!
//! - audio_generator: WAV fixtures (tones, silence) written with hound
//! - memory_fetcher: in-memory ResourceFetcher with fetch counting and injected failures

#![allow(dead_code)]

pub mod audio_generator;
pub mod memory_fetcher;

pub use audio_generator::{constant_wav, generate_test_wav, silent_wav, tone_wav, AudioConfig};
pub use memory_fetcher::MemoryFetcher;
