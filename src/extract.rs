//! Audio clip extraction from in-memory media sources.
//!
//! The whole byte stream is decoded per call at its native sample rate,
//! then the requested time window is sliced out. Decoding everything per
//! extraction keeps the code simple and is fine for sources bounded to
//! tens of megabytes; multi-hour media is out of scope.

use std::io::Cursor;

use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::conv::FromSample;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

use crate::error::ExtractError;

/// Channel-separated PCM samples normalized to [-1.0, 1.0].
///
/// Values outside the nominal range are tolerated here and clamped at
/// encode time.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl SampleBuffer {
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Self {
        Self {
            channels,
            sample_rate,
        }
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frames per channel
    pub fn frame_count(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Clip length in seconds
    pub fn duration_secs(&self) -> f64 {
        self.frame_count() as f64 / self.sample_rate as f64
    }
}

/// Extracts time-bounded clips from decoded media
#[derive(Debug, Clone, Default)]
pub struct ClipExtractor;

impl ClipExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract the `[start_time, end_time)` window from a media byte
    /// stream as channel-separated samples at the source's native rate.
    ///
    /// The clip always has exactly `floor(end*rate) - floor(start*rate)`
    /// frames per channel; any frame past the end of the decoded source
    /// is filled with silence.
    pub fn extract(
        &self,
        source_bytes: &[u8],
        start_time: f64,
        end_time: f64,
    ) -> Result<SampleBuffer, ExtractError> {
        if end_time <= start_time {
            return Err(ExtractError::InvalidRange {
                start: start_time,
                end: end_time,
            });
        }

        let decoded = decode_all(source_bytes)?;
        let rate = decoded.sample_rate as f64;

        let start_sample = (start_time * rate).floor() as usize;
        let end_sample = (end_time * rate).floor() as usize;
        let frame_count = end_sample - start_sample;

        let mut channels = Vec::with_capacity(decoded.channels.len());
        for source in &decoded.channels {
            let mut clip = Vec::with_capacity(frame_count);
            for i in start_sample..end_sample {
                clip.push(source.get(i).copied().unwrap_or(0.0));
            }
            channels.push(clip);
        }

        debug!(
            "✂️  Extracted {:.2}s-{:.2}s: {} frames x {} channels at {}Hz",
            start_time,
            end_time,
            frame_count,
            channels.len(),
            decoded.sample_rate
        );

        Ok(SampleBuffer::new(channels, decoded.sample_rate))
    }
}

struct DecodedAudio {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

/// Decode a full media byte stream into channel-separated f32 samples.
fn decode_all(source_bytes: &[u8]) -> Result<DecodedAudio, ExtractError> {
    let cursor = Cursor::new(source_bytes.to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

    let hint = Hint::new();
    let meta_opts: MetadataOptions = Default::default();
    let fmt_opts: FormatOptions = Default::default();

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &fmt_opts, &meta_opts)
        .map_err(|e| ExtractError::Decode(format!("unrecognized media container: {e}")))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| ExtractError::Decode("no decodable audio track found".to_string()))?;
    let track_id = track.id;

    let dec_opts: DecoderOptions = Default::default();
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &dec_opts)
        .map_err(|e| ExtractError::Decode(format!("unsupported codec: {e}")))?;

    let mut channels: Vec<Vec<f32>> = Vec::new();
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            // End of stream surfaces as an IO error from the reader.
            Err(SymphoniaError::IoError(_)) => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(ExtractError::Decode(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let buffer = match decoder.decode(&packet) {
            Ok(buffer) => buffer,
            // A corrupt packet is skippable; anything else is fatal.
            Err(SymphoniaError::DecodeError(_)) => continue,
            Err(e) => return Err(ExtractError::Decode(e.to_string())),
        };

        if sample_rate == 0 {
            sample_rate = buffer.spec().rate;
        }
        append_buffer(&mut channels, &buffer);
    }

    if channels.is_empty() || sample_rate == 0 {
        return Err(ExtractError::Decode(
            "stream contained no decodable audio samples".to_string(),
        ));
    }

    Ok(DecodedAudio {
        channels,
        sample_rate,
    })
}

/// Append one decoded packet's samples to the per-channel accumulators,
/// converting whatever sample format the codec produced to f32.
fn append_buffer(channels: &mut Vec<Vec<f32>>, buffer: &AudioBufferRef<'_>) {
    match buffer {
        AudioBufferRef::U8(buf) => append_typed(channels, buf),
        AudioBufferRef::U16(buf) => append_typed(channels, buf),
        AudioBufferRef::U24(buf) => append_typed(channels, buf),
        AudioBufferRef::U32(buf) => append_typed(channels, buf),
        AudioBufferRef::S8(buf) => append_typed(channels, buf),
        AudioBufferRef::S16(buf) => append_typed(channels, buf),
        AudioBufferRef::S24(buf) => append_typed(channels, buf),
        AudioBufferRef::S32(buf) => append_typed(channels, buf),
        AudioBufferRef::F32(buf) => append_typed(channels, buf),
        AudioBufferRef::F64(buf) => append_typed(channels, buf),
    }
}

fn append_typed<T>(channels: &mut Vec<Vec<f32>>, buf: &AudioBuffer<T>)
where
    T: symphonia::core::sample::Sample,
    f32: FromSample<T>,
{
    let count = buf.spec().channels.count();
    if channels.is_empty() {
        channels.resize(count, Vec::new());
    }
    for (index, channel) in channels.iter_mut().enumerate().take(count) {
        channel.extend(buf.chan(index).iter().map(|v| f32::from_sample(*v)));
    }
}
