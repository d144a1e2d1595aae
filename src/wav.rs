//! Canonical 16-bit PCM WAV serialization.
//!
//! This is the exact byte contract consumed by the cloning upload
//! endpoint, so encoding is fully deterministic: identical input always
//! produces identical bytes.

use std::f32::consts::PI;

use crate::error::EncodeError;
use crate::extract::SampleBuffer;

const HEADER_LEN: usize = 44;
const BYTES_PER_SAMPLE: u32 = 2;

/// Serialize a sample buffer as a 16-bit PCM RIFF/WAVE byte blob.
///
/// Mono and stereo only; stereo is interleaved left/right sample by
/// sample. Samples are clamped to [-1.0, 1.0] and quantized with
/// asymmetric scaling (negative by 32768, non-negative by 32767) so a
/// full-scale 1.0 sample cannot overflow i16.
pub fn encode_wav(buffer: &SampleBuffer) -> Result<Vec<u8>, EncodeError> {
    let channel_count = buffer.channel_count();
    if channel_count == 0 || channel_count > 2 {
        return Err(EncodeError::UnsupportedChannelCount(channel_count));
    }

    let channels = buffer.channels();
    let frame_count = buffer.frame_count();
    let sample_rate = buffer.sample_rate();

    let num_channels = channel_count as u32;
    let data_len = frame_count as u32 * num_channels * BYTES_PER_SAMPLE;
    let byte_rate = sample_rate * num_channels * BYTES_PER_SAMPLE;
    let block_align = (num_channels * BYTES_PER_SAMPLE) as u16;

    let mut out = Vec::with_capacity(HEADER_LEN + data_len as usize);

    // RIFF chunk descriptor
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    // "fmt " sub-chunk: PCM, format code 1
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&(num_channels as u16).to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());

    // "data" sub-chunk
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());

    for frame in 0..frame_count {
        for channel in channels {
            let sample = quantize(channel.get(frame).copied().unwrap_or(0.0));
            out.extend_from_slice(&sample.to_le_bytes());
        }
    }

    Ok(out)
}

/// Clamp and quantize one normalized sample to signed 16-bit.
fn quantize(sample: f32) -> i16 {
    let clamped = sample.clamp(-1.0, 1.0);
    if clamped < 0.0 {
        (clamped * 32768.0).round() as i16
    } else {
        (clamped * 32767.0).round() as i16
    }
}

/// Render a short mono sine tone.
///
/// Used as the audible stand-in when the mock backend answers a
/// synthesis request: no real audio bytes exist, so callers play this
/// instead.
pub fn fallback_tone(duration_secs: f64, sample_rate: u32) -> SampleBuffer {
    const TONE_HZ: f32 = 440.0;
    const AMPLITUDE: f32 = 0.3;

    let frames = (duration_secs * sample_rate as f64).floor() as usize;
    let samples = (0..frames)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            AMPLITUDE * (2.0 * PI * TONE_HZ * t).sin()
        })
        .collect();
    SampleBuffer::new(vec![samples], sample_rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn mono(samples: Vec<f32>, rate: u32) -> SampleBuffer {
        SampleBuffer::new(vec![samples], rate)
    }

    fn sample_at(blob: &[u8], index: usize) -> i16 {
        let offset = HEADER_LEN + index * 2;
        i16::from_le_bytes([blob[offset], blob[offset + 1]])
    }

    #[test]
    fn test_header_parses_independently() {
        let blob = encode_wav(&mono(vec![0.5, -0.5, 0.25], 22050)).unwrap();

        let reader = hound::WavReader::new(Cursor::new(blob)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 22050);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.sample_format, hound::SampleFormat::Int);
        assert_eq!(reader.len(), 3);
    }

    #[test]
    fn test_all_zero_samples_encode_as_zero_bytes() {
        let frames = 100;
        let blob = encode_wav(&mono(vec![0.0; frames], 16000)).unwrap();

        assert_eq!(blob.len(), HEADER_LEN + frames * 2);
        assert!(blob[HEADER_LEN..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_clamping_matches_full_scale() {
        let blob = encode_wav(&mono(vec![2.0, 1.0, -2.0, -1.0], 16000)).unwrap();

        assert_eq!(sample_at(&blob, 0), 32767);
        assert_eq!(sample_at(&blob, 1), 32767);
        assert_eq!(sample_at(&blob, 2), -32768);
        assert_eq!(sample_at(&blob, 3), -32768);
    }

    #[test]
    fn test_stereo_interleaves_left_right() {
        let buffer = SampleBuffer::new(vec![vec![0.5, 0.5], vec![-0.5, -0.5]], 44100);
        let blob = encode_wav(&buffer).unwrap();

        let left = sample_at(&blob, 0);
        let right = sample_at(&blob, 1);
        assert_eq!(left, (0.5f32 * 32767.0).round() as i16);
        assert_eq!(right, (-0.5f32 * 32768.0).round() as i16);

        // Stereo header fields
        assert_eq!(u16::from_le_bytes([blob[22], blob[23]]), 2);
        let byte_rate = u32::from_le_bytes([blob[28], blob[29], blob[30], blob[31]]);
        assert_eq!(byte_rate, 44100 * 2 * 2);
        assert_eq!(u16::from_le_bytes([blob[32], blob[33]]), 4);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let buffer = mono(vec![0.1, -0.2, 0.3], 8000);
        assert_eq!(encode_wav(&buffer).unwrap(), encode_wav(&buffer).unwrap());
    }

    #[test]
    fn test_rejects_more_than_two_channels() {
        let buffer = SampleBuffer::new(vec![vec![0.0], vec![0.0], vec![0.0]], 16000);
        let err = encode_wav(&buffer).unwrap_err();
        assert!(matches!(err, EncodeError::UnsupportedChannelCount(3)));
    }

    #[test]
    fn test_fallback_tone_shape() {
        let tone = fallback_tone(0.25, 16000);
        assert_eq!(tone.channel_count(), 1);
        assert_eq!(tone.frame_count(), 4000);
        assert!(tone.channels()[0].iter().all(|s| s.abs() <= 0.3 + 1e-6));
        // A tone is not silence.
        assert!(tone.channels()[0].iter().any(|&s| s.abs() > 0.1));
    }
}
