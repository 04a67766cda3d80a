//! RIFF/WAVE Container
//!
//! Canonical 44-byte PCM header and 16-bit sample payload, written through
//! `hound`. Only 16-bit signed integer samples are produced.

pub mod writer;

pub use writer::{wav_spec, WavStreamWriter};

use crate::{OplError, Result};

/// Size of the canonical PCM WAVE header
pub const WAV_HEADER_LEN: usize = 44;

/// Bytes per sample (16-bit PCM)
pub const BYTES_PER_SAMPLE: u32 = 2;

/// Bytes of the RIFF chunk that precede the data payload, minus the
/// 8-byte RIFF chunk header itself
const RIFF_OVERHEAD: u32 = 36;

/// WAVE format tag for integer PCM
const WAVE_FORMAT_PCM: u16 = 1;

/// Header fields derived from the final sample count
///
/// [`WavStreamWriter`] produces this same header through `hound`; the type
/// exists for callers that assemble the container themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    sample_count: u32,
    sample_rate: u32,
    channels: u16,
}

impl WavHeader {
    /// Describe `sample_count` frames of `channels`-channel audio.
    ///
    /// Fails if any size field would not fit its 32-bit (or 16-bit) slot.
    pub fn new(sample_count: u64, sample_rate: u32, channels: u16) -> Result<Self> {
        if channels == 0 {
            return Err(OplError::AudioFileError(
                "WAV data needs at least one channel".to_string(),
            ));
        }
        let block_align = channels.checked_mul(BYTES_PER_SAMPLE as u16).ok_or_else(|| {
            OplError::AudioFileError(format!("{} channels exceed the WAV block size", channels))
        })?;
        if sample_rate.checked_mul(block_align as u32).is_none() {
            return Err(OplError::AudioFileError(format!(
                "byte rate of {} Hz x {} channels exceeds 32 bits",
                sample_rate, channels
            )));
        }
        let data_len = sample_count * block_align as u64;
        if data_len > (u32::MAX - RIFF_OVERHEAD) as u64 {
            return Err(OplError::AudioFileError(format!(
                "{} sample frames exceed the 4 GiB RIFF limit",
                sample_count
            )));
        }
        Ok(WavHeader {
            sample_count: sample_count as u32,
            sample_rate,
            channels,
        })
    }

    /// Sample frames in the payload
    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Interleaved channels
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Length of the `data` chunk in bytes
    pub fn data_len(&self) -> u32 {
        self.sample_count * self.block_align() as u32
    }

    /// Value of the RIFF size field
    pub fn riff_len(&self) -> u32 {
        self.data_len() + RIFF_OVERHEAD
    }

    /// Bytes per second of audio
    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * self.block_align() as u32
    }

    /// Bytes per sample frame
    pub fn block_align(&self) -> u16 {
        self.channels * BYTES_PER_SAMPLE as u16
    }

    /// Serialize the header
    pub fn to_bytes(&self) -> [u8; WAV_HEADER_LEN] {
        let mut out = [0u8; WAV_HEADER_LEN];
        out[0..4].copy_from_slice(b"RIFF");
        out[4..8].copy_from_slice(&self.riff_len().to_le_bytes());
        out[8..12].copy_from_slice(b"WAVE");
        out[12..16].copy_from_slice(b"fmt ");
        out[16..20].copy_from_slice(&16u32.to_le_bytes());
        out[20..22].copy_from_slice(&WAVE_FORMAT_PCM.to_le_bytes());
        out[22..24].copy_from_slice(&self.channels.to_le_bytes());
        out[24..28].copy_from_slice(&self.sample_rate.to_le_bytes());
        out[28..32].copy_from_slice(&self.byte_rate().to_le_bytes());
        out[32..34].copy_from_slice(&self.block_align().to_le_bytes());
        out[34..36].copy_from_slice(&((BYTES_PER_SAMPLE * 8) as u16).to_le_bytes());
        out[36..40].copy_from_slice(b"data");
        out[40..44].copy_from_slice(&self.data_len().to_le_bytes());
        out
    }
}
