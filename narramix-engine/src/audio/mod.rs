//! Audio processing: decoding, resampling and WAV encoding

pub mod decoder;
pub mod resampler;
pub mod types;
pub mod wav;

pub use decoder::SimpleDecoder;
pub use resampler::Resampler;
pub use types::DecodedAudio;
pub use wav::{encode_wav, WAV_MIME};
