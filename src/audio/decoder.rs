use log::{debug, warn};
use std::io::Cursor;

use symphonia::core::audio::{SampleBuffer as PcmScratch, SignalSpec};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::SampleDecoder;
use crate::error::DecodeError;
use crate::models::SampleBuffer;

/// What is known about the container before probing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatHint {
    pub media_type: Option<String>,
    pub extension: Option<String>,
}

impl FormatHint {
    pub fn new(media_type: Option<&str>, extension: Option<&str>) -> Self {
        Self {
            media_type: media_type.map(str::to_string),
            extension: extension.map(|e| e.to_ascii_lowercase()),
        }
    }

    fn to_probe_hint(&self) -> Hint {
        let mut hint = Hint::new();
        if let Some(media_type) = &self.media_type {
            hint.mime_type(media_type);
        }
        if let Some(extension) = &self.extension {
            hint.with_extension(extension);
        }
        hint
    }
}

/// Decodes a whole file in memory with symphonia's default codec registry
#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaDecoder;

impl SymphoniaDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl SampleDecoder for SymphoniaDecoder {
    fn decode_samples(&self, bytes: Vec<u8>, hint: &FormatHint) -> Result<SampleBuffer, DecodeError> {
        let media_source = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

        let probed = symphonia::default::get_probe()
            .format(
                &hint.to_probe_hint(),
                media_source,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| DecodeError::UnsupportedFormat {
                format: format!("probe failed: {}", e),
            })?;
        let mut format_reader = probed.format;

        let track = format_reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| DecodeError::UnsupportedFormat {
                format: "no audio track found".to_string(),
            })?;
        let track_id = track.id;
        let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
        let mut channels = track.codec_params.channels.map(|c| c.count() as u16).unwrap_or(0);

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| DecodeError::DecodeFailed(format!("failed to create decoder: {}", e)))?;

        let mut samples: Vec<f32> = Vec::new();
        // Conversion buffer, rebuilt when a packet outgrows it
        let mut scratch: Option<(PcmScratch<f32>, usize, SignalSpec)> = None;

        loop {
            let packet = match format_reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref err)) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => {
                    return Err(DecodeError::CorruptedFile(format!("failed to read packet: {}", e)));
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(msg)) => {
                    warn!("Skipping undecodable packet: {}", msg);
                    continue;
                }
                Err(e) => return Err(DecodeError::DecodeFailed(e.to_string())),
            };

            let spec = *decoded.spec();
            sample_rate = spec.rate;
            channels = spec.channels.count() as u16;

            let frames = decoded.capacity();
            let reusable = matches!(&scratch, Some((_, cap, s)) if *cap >= frames && *s == spec);
            if !reusable {
                scratch = Some((PcmScratch::<f32>::new(frames as u64, spec), frames, spec));
            }
            if let Some((buffer, _, _)) = scratch.as_mut() {
                buffer.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buffer.samples());
            }
        }

        if samples.is_empty() || channels == 0 || sample_rate == 0 {
            return Err(DecodeError::EmptyStream);
        }

        debug!(
            "Decoded {} samples ({} Hz, {} channels)",
            samples.len(),
            sample_rate,
            channels
        );
        Ok(SampleBuffer::new(sample_rate, channels, samples))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    /// 16-bit PCM WAV bytes holding `frames` frames of a rising ramp
    pub fn wav_bytes(sample_rate: u32, channels: u16, frames: usize) -> Vec<u8> {
        let data_len = (frames * channels as usize * 2) as u32;
        let mut bytes = Vec::with_capacity(44 + data_len as usize);

        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVE");

        bytes.extend_from_slice(b"fmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&channels.to_le_bytes());
        bytes.extend_from_slice(&sample_rate.to_le_bytes());
        bytes.extend_from_slice(&(sample_rate * channels as u32 * 2).to_le_bytes());
        bytes.extend_from_slice(&(channels * 2).to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());

        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        for frame in 0..frames {
            let value = ((frame % 256) as i16) * 64;
            for _ in 0..channels {
                bytes.extend_from_slice(&value.to_le_bytes());
            }
        }
        bytes
    }
}
