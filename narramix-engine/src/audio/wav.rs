//! 16-bit PCM WAV encoding
//!
//! Writes a canonical RIFF/WAVE file (44-byte header for mono or stereo) into
//! memory with hound.

use crate::error::Result;
use bytes::Bytes;
use std::io::Cursor;

/// MIME type of encoded output
pub const WAV_MIME: &str = "audio/wav";

/// Size of the canonical header hound writes for ≤ 2 channel 16-bit PCM
pub const WAV_HEADER_LEN: usize = 44;

/// Float sample → signed 16-bit
///
/// Clamps to [-1, 1] and scales by 32767 with round-half-away-from-zero, so
/// the output is symmetric around 0 and never reaches -32768.
#[inline]
pub fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32767.0).round() as i16
}

/// Encode interleaved samples as a 16-bit PCM WAV file
pub fn encode_wav(samples: &[f32], sample_rate: u32, channels: u16) -> Result<Bytes> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(WAV_HEADER_LEN + samples.len() * 2));
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        let mut writer16 = writer.get_i16_writer(samples.len() as u32);
        for sample in samples {
            writer16.write_sample(to_i16(*sample));
        }
        writer16.flush()?;
        writer.finalize()?;
    }

    Ok(Bytes::from(cursor.into_inner()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_conversion() {
        assert_eq!(to_i16(0.0), 0);
        assert_eq!(to_i16(1.0), 32767);
        assert_eq!(to_i16(-1.0), -32767);
        assert_eq!(to_i16(2.5), 32767);
        assert_eq!(to_i16(-3.0), -32767);
        assert_eq!(to_i16(0.5), 16384);
    }

    #[test]
    fn test_header_layout() {
        let frames = 10;
        let bytes = encode_wav(&vec![0.0; frames * 2], 44100, 2).unwrap();

        assert_eq!(bytes.len(), WAV_HEADER_LEN + frames * 2 * 2);
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(&bytes[12..16], b"fmt ");
        // format tag 1 = PCM
        assert_eq!(u16::from_le_bytes([bytes[20], bytes[21]]), 1);
        assert_eq!(u16::from_le_bytes([bytes[22], bytes[23]]), 2);
        assert_eq!(u32::from_le_bytes([bytes[24], bytes[25], bytes[26], bytes[27]]), 44100);
        // byte rate, block align, bits
        assert_eq!(u32::from_le_bytes([bytes[28], bytes[29], bytes[30], bytes[31]]), 44100 * 4);
        assert_eq!(u16::from_le_bytes([bytes[32], bytes[33]]), 4);
        assert_eq!(u16::from_le_bytes([bytes[34], bytes[35]]), 16);
        assert_eq!(&bytes[36..40], b"data");
        assert_eq!(
            u32::from_le_bytes([bytes[40], bytes[41], bytes[42], bytes[43]]) as usize,
            frames * 2 * 2
        );
        assert!(bytes[WAV_HEADER_LEN..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_samples_read_back() {
        let bytes = encode_wav(&[0.5, -0.5, 1.5, -1.5], 8000, 2).unwrap();
        let reader = hound::WavReader::new(Cursor::new(bytes.to_vec())).unwrap();
        let samples: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![16384, -16384, 32767, -32767]);
    }
}
