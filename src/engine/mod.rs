//! OPL Engine Capability
//!
//! The chip emulator is supplied by the caller. This module defines the
//! narrow interface the driver needs from it and the chunked driver that keeps
//! every generate call inside the emulator's sample window.

pub mod chunked;
#[cfg(test)]
pub(crate) mod testing;

pub use chunked::{chunk_len, ChunkedDriver};

use crate::Result;

/// Fewest samples a single generate call can produce
pub const MIN_CHUNK_SAMPLES: usize = 2;

/// Most samples a single generate call can produce
pub const MAX_CHUNK_SAMPLES: usize = 512;

/// Interface to an OPL emulator instance
///
/// An engine is stateful single-chip hardware emulation: register writes
/// change what subsequent generate calls produce, so one engine must only be
/// driven by one session at a time. The driver types in this crate take the
/// engine by value to enforce that.
///
/// # Example
///
/// ```
/// use opl_imf::{OplEngine, Result};
///
/// fn key_on<E: OplEngine>(chip: &mut E) -> Result<Vec<i16>> {
///     chip.write(0xA0, 0x41)?; // F-number low, channel 0
///     chip.write(0xB0, 0x32)?; // key-on, block 4
///     let chunk = chip.generate(512)?;
///     Ok(chunk.to_vec()) // copy before the next generate call
/// }
/// ```
pub trait OplEngine {
    /// Write `value` to OPL register `register`
    fn write(&mut self, register: u8, value: u8) -> Result<()>;

    /// Run the chip for `sample_count` sample frames.
    ///
    /// Returns interleaved 16-bit PCM, `sample_count * channel_count()`
    /// values long. The slice aliases the engine's internal buffer and is
    /// overwritten by the next call, which the borrow on `self` enforces.
    ///
    /// Engines must reject counts outside
    /// [`MIN_CHUNK_SAMPLES`]..=[`MAX_CHUNK_SAMPLES`] with
    /// [`OplError::ChunkOutOfRange`](crate::OplError::ChunkOutOfRange).
    fn generate(&mut self, sample_count: usize) -> Result<&[i16]>;

    /// Output sample rate in Hz
    fn sample_rate(&self) -> u32;

    /// Interleaved output channels (1 = mono, 2 = stereo)
    fn channel_count(&self) -> u8;
}

impl<E: OplEngine + ?Sized> OplEngine for &mut E {
    fn write(&mut self, register: u8, value: u8) -> Result<()> {
        (**self).write(register, value)
    }

    fn generate(&mut self, sample_count: usize) -> Result<&[i16]> {
        (**self).generate(sample_count)
    }

    fn sample_rate(&self) -> u32 {
        (**self).sample_rate()
    }

    fn channel_count(&self) -> u8 {
        (**self).channel_count()
    }
}

impl<E: OplEngine + ?Sized> OplEngine for Box<E> {
    fn write(&mut self, register: u8, value: u8) -> Result<()> {
        (**self).write(register, value)
    }

    fn generate(&mut self, sample_count: usize) -> Result<&[i16]> {
        (**self).generate(sample_count)
    }

    fn sample_rate(&self) -> u32 {
        (**self).sample_rate()
    }

    fn channel_count(&self) -> u8 {
        (**self).channel_count()
    }
}
