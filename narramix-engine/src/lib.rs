//! # Narramix Engine
//!
//! Turns classified narration text into one mixed audio stream:
//! - [`timing`] estimates segment durations, fades and transitions
//! - [`queue`] lays segments on a timeline with their ambience beds
//! - [`mixer`] decodes, sums, normalizes and encodes the scheduled items
//! - [`scheduler`] plays periodic ambience cues in real time
//! - [`pipeline`] runs classification, synthesis, queueing and mixing end to end

pub mod audio;
pub mod cache;
pub mod classifier;
pub mod error;
pub mod mixer;
pub mod narration;
pub mod pipeline;
pub mod queue;
pub mod resource;
pub mod scheduler;
pub mod session;
pub mod sounds;
pub mod timing;

pub use error::{Error, Result};
pub use mixer::{AudioMixer, AudioResource, MixOutcome, MixedAudioResult, MixerConfig};
pub use pipeline::{NarrationReport, Narrator};
pub use queue::{NarratedSegment, QueueBuilder};
pub use session::{MixSession, MixTicket};
