//! Incremental WAV writer
//!
//! Streams sample chunks into a `hound` writer as they are produced; hound
//! writes the header up front and patches the lengths on `finish`.

use super::WavHeader;
use crate::{OplError, Result};
use std::io::{Seek, Write};

/// Format description for 16-bit integer PCM
pub fn wav_spec(sample_rate: u32, channels: u16) -> hound::WavSpec {
    hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}

/// WAV sink for audio whose length is unknown up front.
///
/// The sink must be positioned at its start: the header lengths are patched
/// at absolute offsets.
pub struct WavStreamWriter<W: Write + Seek> {
    inner: hound::WavWriter<W>,
    sample_rate: u32,
    channels: u16,
    frames: u64,
}

impl<W: Write + Seek> WavStreamWriter<W> {
    /// Start a WAV stream at the beginning of `inner`
    pub fn new(inner: W, sample_rate: u32, channels: u16) -> Result<Self> {
        // validates the format before hound writes anything
        WavHeader::new(0, sample_rate, channels)?;
        let inner = hound::WavWriter::new(inner, wav_spec(sample_rate, channels))?;
        Ok(WavStreamWriter {
            inner,
            sample_rate,
            channels,
            frames: 0,
        })
    }

    /// Append interleaved samples (a whole number of frames).
    ///
    /// The samples are copied into the sink before this returns, so engine
    /// chunks can be passed straight through.
    pub fn write_samples(&mut self, samples: &[i16]) -> Result<()> {
        let channels = self.channels as usize;
        if samples.len() % channels != 0 {
            return Err(OplError::AudioFileError(format!(
                "{} samples do not form whole {}-channel frames",
                samples.len(),
                channels
            )));
        }
        let frames = self.frames + (samples.len() / channels) as u64;
        // fail before the payload outgrows what the header can describe
        WavHeader::new(frames, self.sample_rate, self.channels)?;

        let mut writer = self.inner.get_i16_writer(samples.len() as u32);
        for &sample in samples {
            writer.write_sample(sample);
        }
        writer.flush()?;
        self.frames = frames;
        Ok(())
    }

    /// Sample frames written so far
    pub fn frames_written(&self) -> u64 {
        self.frames
    }

    /// Payload bytes written so far
    pub fn data_len(&self) -> u64 {
        self.frames * self.channels as u64 * super::BYTES_PER_SAMPLE as u64
    }

    /// Patch the header with the final length and flush the sink
    pub fn finish(self) -> Result<()> {
        self.inner.finalize()?;
        Ok(())
    }
}
