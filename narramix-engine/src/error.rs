//! Error types for narramix-engine
//!
//! Defines engine error types using thiserror for clear error propagation.
//! Per-item decode errors are recovered inside the mixer; only an empty mix
//! request reaches callers of [`crate::mixer::AudioMixer::mix`] as a hard error.

use thiserror::Error;

/// Main error type for narramix-engine
#[derive(Error, Debug)]
pub enum Error {
    /// Unrecognized speech-rate label
    #[error("Invalid speech-rate category: {0}")]
    InvalidCategory(String),

    /// One item's audio could not be fetched or decoded
    #[error("Failed to decode {resource}: {reason}")]
    ResourceDecode { resource: String, reason: String },

    /// No item in a mix request decoded successfully
    #[error("Mix failed: {0}")]
    MixFailure(String),

    /// Mix requested with an empty item list
    #[error("No audio items to mix")]
    NoItems,

    /// Resource fetch errors (HTTP status, missing file, unsupported scheme)
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// WAV encoding errors
    #[error("Encode error: {0}")]
    Encode(String),

    /// Narration synthesis errors
    #[error("Synthesis error: {0}")]
    Synthesis(String),

    /// Configuration errors from narramix-common
    #[error(transparent)]
    Config(#[from] narramix_common::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Background task failed to complete
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn decode(resource: impl std::fmt::Display, reason: impl std::fmt::Display) -> Self {
        Error::ResourceDecode {
            resource: resource.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Fetch(e.to_string())
    }
}

impl From<hound::Error> for Error {
    fn from(e: hound::Error) -> Self {
        Error::Encode(e.to_string())
    }
}

/// Convenience Result type using the engine Error
pub type Result<T> = std::result::Result<T, Error>;
