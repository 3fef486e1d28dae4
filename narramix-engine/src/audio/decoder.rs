//! Audio decoder using symphonia
//!
//! Decodes in-memory encoded audio (MP3, FLAC, AAC, Vorbis, WAV) to
//! interleaved f32 PCM in the source's native channel layout.

use super::types::DecodedAudio;
use crate::error::{Error, Result};
use bytes::Bytes;
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Audio decoder using symphonia.
pub struct SimpleDecoder;

impl SimpleDecoder {
    /// Decode an entire encoded buffer to PCM.
    ///
    /// `name` is used for logging and, together with `mime`, as a format hint.
    ///
    /// # Errors
    /// - Unsupported or unrecognized format
    /// - No audio track
    /// - Decoder construction failure
    pub fn decode_bytes(name: &str, bytes: Bytes, mime: Option<&str>) -> Result<DecodedAudio> {
        debug!(resource = %name, bytes = bytes.len(), "Decoding");

        let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());
        let hint = Self::hint_for(name, mime);

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| Error::decode(name, format!("Failed to probe format: {}", e)))?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| Error::decode(name, "No audio track found"))?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| Error::decode(name, format!("Failed to create decoder: {}", e)))?;

        // Filled in from the first decoded packet when the container omits them
        let mut sample_rate = codec_params.sample_rate;
        let mut channels = codec_params.channels.map(|c| c.count() as u16);

        let mut samples = Vec::new();
        let mut sample_buf: Option<SampleBuffer<f32>> = None;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => {
                    warn!(resource = %name, "Error reading packet: {}", e);
                    break;
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    sample_rate.get_or_insert(spec.rate);
                    channels.get_or_insert(spec.channels.count() as u16);

                    let required = decoded.capacity() * spec.channels.count();
                    if sample_buf.as_ref().map_or(true, |b| b.capacity() < required) {
                        sample_buf = Some(SampleBuffer::<f32>::new(decoded.capacity() as u64, spec));
                    }
                    if let Some(buf) = sample_buf.as_mut() {
                        buf.copy_interleaved_ref(decoded);
                        samples.extend_from_slice(buf.samples());
                    }
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    warn!(resource = %name, "Decode error: {}", e);
                    continue;
                }
                Err(e) => {
                    return Err(Error::decode(name, e));
                }
            }
        }

        let sample_rate = sample_rate.ok_or_else(|| Error::decode(name, "Sample rate not found"))?;
        let channels = channels.ok_or_else(|| Error::decode(name, "Channel count not found"))?;

        let audio = DecodedAudio::new(samples, sample_rate, channels);
        debug!(
            resource = %name,
            sample_rate,
            channels,
            frames = audio.frames,
            "Decoded"
        );

        Ok(audio)
    }

    fn hint_for(name: &str, mime: Option<&str>) -> Hint {
        let mut hint = Hint::new();

        if let Some(mime) = mime {
            hint.mime_type(mime);
        }

        if let Some(ext) = extension_of(name) {
            hint.with_extension(ext);
        }

        hint
    }
}

/// File extension of a path or URL, ignoring any query string or fragment
fn extension_of(name: &str) -> Option<&str> {
    let path = name.split(['?', '#']).next().unwrap_or(name);
    let (_, ext) = path.rsplit_once('.')?;
    (!ext.is_empty() && !ext.contains('/')).then_some(ext)
}
