//! Shared fixtures for integration tests

#![allow(dead_code)]

use opl_imf::{OplEngine, OplError, Result, MAX_CHUNK_SAMPLES, MIN_CHUNK_SAMPLES};

/// Deterministic engine whose output encodes the frame counter and the most
/// recent register value, so both timing and write order show in the audio.
#[derive(Debug)]
pub struct ScriptedEngine {
    sample_rate: u32,
    channels: u8,
    frame: u64,
    last_value: u8,
    buffer: Vec<i16>,
    pub writes: Vec<(u8, u8)>,
    pub generate_calls: Vec<usize>,
}

impl ScriptedEngine {
    pub fn new(sample_rate: u32, channels: u8) -> Self {
        ScriptedEngine {
            sample_rate,
            channels,
            frame: 0,
            last_value: 0,
            buffer: Vec::new(),
            writes: Vec::new(),
            generate_calls: Vec::new(),
        }
    }
}

impl OplEngine for ScriptedEngine {
    fn write(&mut self, register: u8, value: u8) -> Result<()> {
        self.writes.push((register, value));
        self.last_value = value;
        Ok(())
    }

    fn generate(&mut self, sample_count: usize) -> Result<&[i16]> {
        if !(MIN_CHUNK_SAMPLES..=MAX_CHUNK_SAMPLES).contains(&sample_count) {
            return Err(OplError::ChunkOutOfRange(sample_count));
        }
        self.generate_calls.push(sample_count);
        self.buffer.clear();
        for _ in 0..sample_count {
            let sample = ((self.frame % 4096) as i16) ^ ((self.last_value as i16) << 4);
            for channel in 0..self.channels {
                self.buffer.push(sample.wrapping_add(channel as i16));
            }
            self.frame += 1;
        }
        Ok(&self.buffer)
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channel_count(&self) -> u8 {
        self.channels
    }
}

/// Encode events as IMF records
pub fn imf_records(events: &[(u8, u8, u16)]) -> Vec<u8> {
    let mut data = Vec::with_capacity(events.len() * 4);
    for &(register, value, delay) in events {
        data.push(register);
        data.push(value);
        data.extend_from_slice(&delay.to_le_bytes());
    }
    data
}

/// Type-1 file: length header followed by the records
pub fn imf_type1(events: &[(u8, u8, u16)]) -> Vec<u8> {
    let records = imf_records(events);
    let mut data = (records.len() as u16).to_le_bytes().to_vec();
    data.extend_from_slice(&records);
    data
}

/// A short song with chords, a rhythm hit and uneven delays
pub fn demo_song() -> Vec<(u8, u8, u16)> {
    vec![
        (0x01, 0x20, 0),
        (0x20, 0x01, 0),
        (0x40, 0x10, 0),
        (0xA0, 0x98, 0),
        (0xB0, 0x31, 12),
        (0xA1, 0x41, 0),
        (0xB1, 0x32, 7),
        (0xBD, 0x30, 1),
        (0xB0, 0x11, 25),
        (0xB1, 0x12, 3),
        (0xBD, 0x20, 40),
    ]
}
