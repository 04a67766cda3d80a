//! Playback cursor
//!
//! All state a pull-based playback session carries between audio callbacks.
//! Keeping it in a value rather than in the player lets several sessions run
//! side by side and lets tests drive the state machine directly.

use super::mute::MuteMask;
use crate::engine::MAX_CHUNK_SAMPLES;

/// Cross-callback playback state
#[derive(Debug, Clone)]
pub struct PlaybackCursor {
    /// Index of the next event to apply
    pub(crate) position: usize,
    /// Frames still to generate before the next event is applied
    pub(crate) samples_owed: u64,
    /// Frames of the last chunk that did not fit the previous output buffer
    pub(crate) carry: Vec<i16>,
    /// Read offset into `carry`, in samples
    pub(crate) carry_pos: usize,
    pub(crate) looping: bool,
    pub(crate) finished: bool,
    pub(crate) loops: u64,
    pub(crate) mute: MuteMask,
}

impl PlaybackCursor {
    /// Cursor at the start of a song.
    ///
    /// Allocates the carry buffer for one full chunk up front so that no
    /// allocation happens on the audio thread.
    pub fn new(channels: usize, looping: bool) -> Self {
        PlaybackCursor {
            position: 0,
            samples_owed: 0,
            carry: Vec::with_capacity(MAX_CHUNK_SAMPLES * channels),
            carry_pos: 0,
            looping,
            finished: false,
            loops: 0,
            mute: MuteMask::default(),
        }
    }

    /// Index of the next event to apply
    pub fn position(&self) -> usize {
        self.position
    }

    /// Frames owed to the delay currently being played
    pub fn samples_owed(&self) -> u64 {
        self.samples_owed
    }

    /// Already generated samples waiting for the next output buffer
    pub fn carried_samples(&self) -> usize {
        self.carry.len() - self.carry_pos
    }

    /// True once a non-looping song has played out
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Times playback wrapped back to the first event
    pub fn loop_count(&self) -> u64 {
        self.loops
    }

    /// Whether the song restarts after its last event
    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Enable or disable looping.
    ///
    /// Enabling looping on a finished song resumes it from the first event.
    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
        if looping && self.finished {
            self.finished = false;
        }
    }

    /// Current mute state
    pub fn mute(&self) -> &MuteMask {
        &self.mute
    }

    /// Mutable mute state
    pub fn mute_mut(&mut self) -> &mut MuteMask {
        &mut self.mute
    }

    /// Take up to `max_samples` carried samples
    pub(crate) fn take_carry(&mut self, max_samples: usize) -> &[i16] {
        let start = self.carry_pos;
        let end = (start + max_samples).min(self.carry.len());
        self.carry_pos = end;
        &self.carry[start..end]
    }

    /// Forget the carry buffer once it has been fully read
    pub(crate) fn compact_carry(&mut self) {
        if self.carry_pos >= self.carry.len() {
            self.carry.clear();
            self.carry_pos = 0;
        }
    }

    /// Start owing the frames of a new delay
    pub(crate) fn owe(&mut self, frames: u64) {
        self.samples_owed = frames;
    }

    /// Account for a generated chunk of `len` frames.
    ///
    /// A two-frame chunk for a single owed frame settles the delay; the
    /// extra frame is not carried into the next one.
    pub(crate) fn consume(&mut self, len: u64) {
        self.samples_owed = self.samples_owed.saturating_sub(len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overshoot_settles_only_its_own_delay() {
        let mut cursor = PlaybackCursor::new(2, true);
        cursor.owe(1);
        cursor.consume(2);
        assert_eq!(cursor.samples_owed(), 0);
        cursor.owe(3);
        assert_eq!(cursor.samples_owed(), 3);
        cursor.consume(2);
        assert_eq!(cursor.samples_owed(), 1);
    }

    #[test]
    fn test_carry_buffer_drains() {
        let mut cursor = PlaybackCursor::new(1, false);
        cursor.carry.extend_from_slice(&[1, 2, 3, 4, 5]);
        assert_eq!(cursor.take_carry(2), &[1, 2]);
        cursor.compact_carry();
        assert_eq!(cursor.carried_samples(), 3);
        assert_eq!(cursor.take_carry(10), &[3, 4, 5]);
        cursor.compact_carry();
        assert_eq!(cursor.carried_samples(), 0);
        assert!(cursor.carry.capacity() >= MAX_CHUNK_SAMPLES);
    }

    #[test]
    fn test_relooping_a_finished_song() {
        let mut cursor = PlaybackCursor::new(2, false);
        cursor.finished = true;
        cursor.set_looping(true);
        assert!(!cursor.is_finished());
    }
}
