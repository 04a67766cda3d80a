//! IMF Song Data
//!
//! Parsing of IMF (id Music Format) register-write streams and conversion of
//! their tick delays into sample counts.
//!
//! An IMF song is a flat list of 4-byte records: OPL register, value, and a
//! little-endian 16-bit delay measured in ticks of the song's variant
//! (560 Hz for `.imf`, 700 Hz for `.wlf`).

pub mod reader;
pub mod tick;

pub use reader::{Events, ImfReader, EVENT_LEN};
pub use tick::{delay_samples, samples_per_tick};

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tick rate of standard IMF songs in Hz
pub const STANDARD_TICK_RATE_HZ: u32 = 560;

/// Tick rate of the faster `.wlf` songs in Hz
pub const FAST_TICK_RATE_HZ: u32 = 700;

/// IMF timing variant, fixed per song
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImfVariant {
    /// 560 ticks per second
    #[default]
    Standard,
    /// 700 ticks per second
    Fast,
}

impl ImfVariant {
    /// Native tick rate of the variant in Hz
    pub fn tick_rate_hz(self) -> u32 {
        match self {
            ImfVariant::Standard => STANDARD_TICK_RATE_HZ,
            ImfVariant::Fast => FAST_TICK_RATE_HZ,
        }
    }

    /// Pick the variant from the file naming convention: `.wlf` files run at
    /// 700 Hz, everything else at 560 Hz.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        match path.as_ref().extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("wlf") => ImfVariant::Fast,
            _ => ImfVariant::Standard,
        }
    }
}

/// A single register write followed by a delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    /// OPL register (0x00-0xFF)
    pub register: u8,
    /// Value written to the register
    pub value: u8,
    /// Ticks to wait before the next event is applied
    pub delay_ticks: u16,
}

impl Event {
    /// Create a new event
    pub const fn new(register: u8, value: u8, delay_ticks: u16) -> Self {
        Event {
            register,
            value,
            delay_ticks,
        }
    }
}

/// A parsed IMF song ready for playback
///
/// Events are replayed strictly in order. A zero delay means the next event
/// follows immediately with no audio generated in between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventStream {
    events: Vec<Event>,
    variant: ImfVariant,
    total_ticks: u64,
}

impl EventStream {
    /// Parse raw IMF bytes (type 0 or type 1)
    ///
    /// Malformed input never fails: a declared length beyond the buffer and
    /// any trailing partial record are dropped.
    pub fn parse(data: &[u8], variant: ImfVariant) -> Self {
        Self::from_events(ImfReader::new(data).events().collect(), variant)
    }

    /// Build a stream from already decoded events
    pub fn from_events(events: Vec<Event>, variant: ImfVariant) -> Self {
        let total_ticks = events.iter().map(|e| e.delay_ticks as u64).sum();
        EventStream {
            events,
            variant,
            total_ticks,
        }
    }

    /// All events in playback order
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Event at `index`, if any
    pub fn get(&self, index: usize) -> Option<&Event> {
        self.events.get(index)
    }

    /// Number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True if the stream holds no events
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Timing variant of the song
    pub fn variant(&self) -> ImfVariant {
        self.variant
    }

    /// Native tick rate in Hz
    pub fn tick_rate_hz(&self) -> u32 {
        self.variant.tick_rate_hz()
    }

    /// Sum of all delays, in ticks
    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    /// Song length at the native tick rate
    pub fn duration_seconds(&self) -> f64 {
        self.total_ticks as f64 / self.tick_rate_hz() as f64
    }
}
