//! Chunked Synthesis Driver
//!
//! Splits an arbitrary sample count into generate calls the engine accepts
//! and hands each chunk to a consumer before the next call overwrites it.

use super::{OplEngine, MAX_CHUNK_SAMPLES, MIN_CHUNK_SAMPLES};
use crate::{OplError, Result};

/// Length of the next generate call when `remaining` samples are still owed.
///
/// A single owed sample still produces [`MIN_CHUNK_SAMPLES`]; the one-sample
/// overshoot (about 0.02 ms at 49716 Hz) is accepted.
#[inline]
pub fn chunk_len(remaining: u64) -> usize {
    remaining.clamp(MIN_CHUNK_SAMPLES as u64, MAX_CHUNK_SAMPLES as u64) as usize
}

/// Exclusive owner of an [`OplEngine`] for one render or playback session
#[derive(Debug)]
pub struct ChunkedDriver<E> {
    engine: E,
    sample_rate: u32,
    channels: usize,
}

impl<E: OplEngine> ChunkedDriver<E> {
    /// Take ownership of `engine`, validating its output format
    pub fn new(engine: E) -> Result<Self> {
        let channel_count = engine.channel_count();
        if !(1..=2).contains(&channel_count) {
            return Err(OplError::ChannelCount(channel_count));
        }
        let sample_rate = engine.sample_rate();
        if sample_rate == 0 {
            return Err(OplError::ConfigError(
                "engine reports a sample rate of 0 Hz".to_string(),
            ));
        }
        Ok(ChunkedDriver {
            engine,
            sample_rate,
            channels: channel_count as usize,
        })
    }

    /// Output sample rate of the engine
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Interleaved channels per frame
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Read-only access to the engine
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// End the session and return the engine
    pub fn into_engine(self) -> E {
        self.engine
    }

    /// Forward a register write to the engine
    pub fn write(&mut self, register: u8, value: u8) -> Result<()> {
        self.engine.write(register, value)
    }

    /// Generate the next chunk towards `remaining` owed samples.
    ///
    /// Returns the interleaved chunk; its frame count is
    /// `chunk_len(remaining)`. `remaining` must be non-zero.
    pub fn generate_chunk(&mut self, remaining: u64) -> Result<&[i16]> {
        debug_assert!(remaining > 0, "generate_chunk called with nothing owed");
        let len = chunk_len(remaining);
        let expected = len * self.channels;
        let samples = self.engine.generate(len)?;
        if samples.len() != expected {
            return Err(OplError::EngineFault(format!(
                "generate({}) returned {} samples, expected {}",
                len,
                samples.len(),
                expected
            )));
        }
        Ok(samples)
    }

    /// Generate `total_samples` frames, passing each chunk to `handle_chunk`.
    ///
    /// `handle_chunk` receives the interleaved chunk and its frame count. The
    /// chunk borrow ends when the callback returns; anything that needs the
    /// data later must copy it. Errors from the engine or the callback stop
    /// generation immediately.
    ///
    /// Returns the number of frames actually generated, which exceeds
    /// `total_samples` by one when the final remainder was a single sample.
    pub fn for_each_chunk<F>(&mut self, total_samples: u64, mut handle_chunk: F) -> Result<u64>
    where
        F: FnMut(&[i16], usize) -> Result<()>,
    {
        let mut remaining = total_samples;
        let mut generated = 0u64;
        while remaining > 0 {
            let len = chunk_len(remaining);
            let chunk = self.generate_chunk(remaining)?;
            handle_chunk(chunk, len)?;
            generated += len as u64;
            remaining = remaining.saturating_sub(len as u64);
        }
        Ok(generated)
    }
}
