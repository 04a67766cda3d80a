//! Scripted engine for unit tests

use super::{OplEngine, MAX_CHUNK_SAMPLES, MIN_CHUNK_SAMPLES};
use crate::{OplError, Result};

/// Deterministic stand-in for an OPL emulator.
///
/// Each frame's sample is its absolute frame index plus the last written
/// value in the high byte, so output depends on both timing and write order.
/// Like a real emulator it reuses a single output buffer.
#[derive(Debug, Clone)]
pub(crate) struct RampEngine {
    sample_rate: u32,
    channels: u8,
    frames: u64,
    last_value: u8,
    buffer: Vec<i16>,
    writes: Vec<(u8, u8)>,
    generate_calls: Vec<usize>,
    fail_generate_after: Option<usize>,
    reject_register: Option<u8>,
    truncate_output: bool,
}

impl RampEngine {
    pub(crate) fn with_channels(sample_rate: u32, channels: u8) -> Self {
        RampEngine {
            sample_rate,
            channels,
            frames: 0,
            last_value: 0,
            buffer: Vec::with_capacity(MAX_CHUNK_SAMPLES * channels as usize),
            writes: Vec::new(),
            generate_calls: Vec::new(),
            fail_generate_after: None,
            reject_register: None,
            truncate_output: false,
        }
    }

    pub(crate) fn mono(sample_rate: u32) -> Self {
        Self::with_channels(sample_rate, 1)
    }

    pub(crate) fn stereo(sample_rate: u32) -> Self {
        Self::with_channels(sample_rate, 2)
    }

    pub(crate) fn fail_generate_after(&mut self, calls: usize) {
        self.fail_generate_after = Some(calls);
    }

    pub(crate) fn reject_register(&mut self, register: u8) {
        self.reject_register = Some(register);
    }

    pub(crate) fn truncate_output(&mut self, enabled: bool) {
        self.truncate_output = enabled;
    }

    pub(crate) fn writes(&self) -> &[(u8, u8)] {
        &self.writes
    }

    pub(crate) fn generate_calls(&self) -> &[usize] {
        &self.generate_calls
    }
}

impl OplEngine for RampEngine {
    fn write(&mut self, register: u8, value: u8) -> Result<()> {
        if self.reject_register == Some(register) {
            return Err(OplError::EngineFault(format!(
                "register 0x{:02X} rejected",
                register
            )));
        }
        self.writes.push((register, value));
        self.last_value = value;
        Ok(())
    }

    fn generate(&mut self, sample_count: usize) -> Result<&[i16]> {
        if !(MIN_CHUNK_SAMPLES..=MAX_CHUNK_SAMPLES).contains(&sample_count) {
            return Err(OplError::ChunkOutOfRange(sample_count));
        }
        if let Some(limit) = self.fail_generate_after {
            if self.generate_calls.len() >= limit {
                return Err(OplError::EngineFault("emulator halted".to_string()));
            }
        }
        self.generate_calls.push(sample_count);

        self.buffer.clear();
        for _ in 0..sample_count {
            let sample = (self.frames as u16).wrapping_add((self.last_value as u16) << 8) as i16;
            for _ in 0..self.channels {
                self.buffer.push(sample);
            }
            self.frames += 1;
        }

        let len = if self.truncate_output {
            self.buffer.len() - 1
        } else {
            self.buffer.len()
        };
        Ok(&self.buffer[..len])
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channel_count(&self) -> u8 {
        self.channels
    }
}
