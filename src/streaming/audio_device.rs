//! Audio device integration using rodio
//!
//! Plays a [`SharedPlayer`] on the system audio device. The rodio mixer pulls
//! samples one at a time; the source refills a small float buffer from the
//! player in batches so the player lock is taken once per batch.

use super::SharedPlayer;
use crate::engine::OplEngine;
use crate::{OplError, Result};
use rodio::{OutputStream, Sink, Source};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Frames fetched from the player per refill
pub const DEFAULT_FRAMES_PER_PULL: usize = 1024;

/// Audio source that pulls from a streaming player
struct PlayerSource<E> {
    player: SharedPlayer<E>,
    sample_rate: u32,
    channels: u16,
    finished: Arc<AtomicBool>,
    underruns: Arc<AtomicUsize>,
    buffer: Vec<f32>,
    buffer_pos: usize,
}

impl<E: OplEngine> PlayerSource<E> {
    fn new(
        player: SharedPlayer<E>,
        frames_per_pull: usize,
        finished: Arc<AtomicBool>,
        underruns: Arc<AtomicUsize>,
    ) -> Self {
        let (sample_rate, channels) = {
            let player = player.lock();
            (player.sample_rate(), player.channels())
        };
        let len = frames_per_pull.max(1) * channels as usize;
        PlayerSource {
            player,
            sample_rate,
            channels,
            finished,
            underruns,
            buffer: vec![0.0; len],
            buffer_pos: len, // refill on first read
        }
    }

    fn refill(&mut self) {
        // Never wait on the audio thread; a control thread holding the lock
        // costs one buffer of silence
        match self.player.try_lock() {
            Some(mut player) => {
                player.fill_buffer_f32(&mut self.buffer);
            }
            None => {
                let count = self.underruns.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!(underruns = count, "player busy, emitting silence");
                self.buffer.fill(0.0);
            }
        }
        self.buffer_pos = 0;
    }
}

impl<E: OplEngine> Source for PlayerSource<E> {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

impl<E: OplEngine> Iterator for PlayerSource<E> {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.finished.load(Ordering::Relaxed) {
            return None;
        }
        if self.buffer_pos >= self.buffer.len() {
            self.refill();
        }
        let sample = self.buffer[self.buffer_pos];
        self.buffer_pos += 1;
        Some(sample)
    }
}

/// Audio playback device using rodio
pub struct AudioDevice {
    _stream: OutputStream,
    sink: Sink,
    finished: Arc<AtomicBool>,
    underruns: Arc<AtomicUsize>,
}

impl AudioDevice {
    /// Open the default output device and start playing `player`.
    ///
    /// `frames_per_pull` sets how many frames are requested from the player
    /// at a time; [`DEFAULT_FRAMES_PER_PULL`] suits most devices.
    pub fn new<E>(player: SharedPlayer<E>, frames_per_pull: usize) -> Result<Self>
    where
        E: OplEngine + Send + 'static,
    {
        let (stream, stream_handle) = OutputStream::try_default().map_err(|e| {
            OplError::AudioDeviceError(format!("Failed to create audio stream: {}", e))
        })?;
        let sink = Sink::try_new(&stream_handle).map_err(|e| {
            OplError::AudioDeviceError(format!("Failed to create audio sink: {}", e))
        })?;

        let finished = Arc::new(AtomicBool::new(false));
        let underruns = Arc::new(AtomicUsize::new(0));
        let source = PlayerSource::new(
            player,
            frames_per_pull,
            Arc::clone(&finished),
            Arc::clone(&underruns),
        );
        tracing::debug!(
            sample_rate = source.sample_rate,
            channels = source.channels,
            frames_per_pull,
            "audio device opened"
        );
        sink.append(source);

        Ok(AudioDevice {
            _stream: stream,
            sink,
            finished,
            underruns,
        })
    }

    /// Pause playback
    pub fn pause(&self) {
        self.sink.pause();
    }

    /// Resume playback
    pub fn play(&self) {
        self.sink.play();
    }

    /// Refills that found the player locked and played silence instead
    pub fn underruns(&self) -> usize {
        self.underruns.load(Ordering::Relaxed)
    }

    /// Stop pulling from the player and let the stream end
    pub fn finish(&self) {
        self.finished.store(true, Ordering::Relaxed);
    }
}

impl Drop for AudioDevice {
    fn drop(&mut self) {
        self.finish();
        self.sink.pause();
    }
}
