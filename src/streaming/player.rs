//! Real-time pull player
//!
//! The audio device asks for a fixed number of frames per callback; delays in
//! the song rarely line up with those buffers. The player therefore keeps the
//! frames still owed to the current delay, plus any already generated frames
//! that did not fit, in a [`PlaybackCursor`] and resumes from there on the
//! next call.
//!
//! The generate-call schedule depends only on the song, never on the size of
//! the output buffers, so splitting one pull into several yields exactly the
//! same frames.

use super::cursor::PlaybackCursor;
use super::mute::{ChannelMask, PercussionVoice};
use super::StreamConfig;
use crate::engine::{chunk_len, ChunkedDriver, OplEngine};
use crate::imf::{delay_samples, samples_per_tick, EventStream};
use crate::{OplError, Result};
use parking_lot::Mutex;
use std::sync::Arc;

/// Sample formats the player can write
pub trait OutputSample: Copy {
    /// Value of a silent sample
    const SILENCE: Self;

    /// Convert a 16-bit engine sample
    fn from_pcm(sample: i16) -> Self;
}

impl OutputSample for i16 {
    const SILENCE: Self = 0;

    #[inline]
    fn from_pcm(sample: i16) -> Self {
        sample
    }
}

impl OutputSample for f32 {
    const SILENCE: Self = 0.0;

    /// Normalized to -1.0..1.0
    #[inline]
    fn from_pcm(sample: i16) -> Self {
        sample as f32 / 32768.0
    }
}

#[inline]
fn copy_pcm<S: OutputSample>(dst: &mut [S], src: &[i16]) {
    for (d, &s) in dst.iter_mut().zip(src) {
        *d = S::from_pcm(s);
    }
}

/// Fill `out` with interleaved frames, advancing `cursor` through `stream`.
///
/// `out.len() / channels` frames are written; a trailing partial frame is left
/// silent. Once a non-looping song ends, or on error, the rest of `out` is
/// padded with silence.
///
/// Returns the number of frames that carry song audio. Those frames are
/// valid even when the engine fails part way: the error is returned next to
/// the count, after the buffer has been padded. Never allocates and never
/// blocks.
pub fn fill_frames<E: OplEngine, S: OutputSample>(
    driver: &mut ChunkedDriver<E>,
    stream: &EventStream,
    samples_per_tick: u32,
    cursor: &mut PlaybackCursor,
    out: &mut [S],
) -> (usize, Result<()>) {
    let channels = driver.channels();
    let mut filled = 0;
    let outcome = render_frames(driver, stream, samples_per_tick, cursor, out, &mut filled);
    for sample in &mut out[filled * channels..] {
        *sample = S::SILENCE;
    }
    (filled, outcome)
}

fn render_frames<E: OplEngine, S: OutputSample>(
    driver: &mut ChunkedDriver<E>,
    stream: &EventStream,
    samples_per_tick: u32,
    cursor: &mut PlaybackCursor,
    out: &mut [S],
    filled: &mut usize,
) -> Result<()> {
    let channels = driver.channels();
    let wanted = out.len() / channels;

    loop {
        // Frames left over from the previous callback go first
        if cursor.carried_samples() > 0 {
            let room = (wanted - *filled) * channels;
            let start = *filled * channels;
            let carried = cursor.take_carry(room);
            copy_pcm(&mut out[start..start + carried.len()], carried);
            *filled += carried.len() / channels;
            cursor.compact_carry();
        }
        if *filled == wanted {
            return Ok(());
        }

        // OWING: play out the current delay
        if cursor.samples_owed > 0 {
            let len = chunk_len(cursor.samples_owed);
            let chunk = driver.generate_chunk(cursor.samples_owed)?;
            let fit = len.min(wanted - *filled);
            let start = *filled * channels;
            copy_pcm(&mut out[start..start + fit * channels], &chunk[..fit * channels]);
            if fit < len {
                // The engine buffer is overwritten by the next call; keep a copy
                cursor.carry.extend_from_slice(&chunk[fit * channels..]);
                cursor.carry_pos = 0;
            }
            *filled += fit;
            cursor.consume(len as u64);
            continue;
        }

        // READY: apply events up to and including the next delay
        if cursor.finished || !advance(driver, stream, samples_per_tick, cursor)? {
            cursor.finished = true;
            return Ok(());
        }
    }
}

/// Apply zero-delay events and one delayed event. Returns false when the song
/// has ended and will not loop.
fn advance<E: OplEngine>(
    driver: &mut ChunkedDriver<E>,
    stream: &EventStream,
    samples_per_tick: u32,
    cursor: &mut PlaybackCursor,
) -> Result<bool> {
    if stream.is_empty() {
        return Ok(false);
    }
    if cursor.looping && stream.total_ticks() == 0 {
        tracing::warn!(
            events = stream.len(),
            "looping stream contains no delays, stopping playback"
        );
        return Ok(false);
    }

    loop {
        if cursor.position >= stream.len() {
            if !cursor.looping {
                return Ok(false);
            }
            cursor.position = 0;
            cursor.loops += 1;
        }

        let event = stream.events()[cursor.position];
        driver.write(event.register, cursor.mute.filter(event.register, event.value))?;
        cursor.position += 1;

        if event.delay_ticks > 0 {
            cursor.owe(delay_samples(event.delay_ticks, samples_per_tick));
            return Ok(true);
        }
    }
}

/// Player handle shared between a control thread and the audio thread
pub type SharedPlayer<E> = Arc<Mutex<StreamingPlayer<E>>>;

/// Pull-based IMF player for audio callbacks
pub struct StreamingPlayer<E> {
    driver: ChunkedDriver<E>,
    stream: EventStream,
    cursor: PlaybackCursor,
    samples_per_tick: u32,
    fault: Option<OplError>,
}

impl<E: OplEngine> StreamingPlayer<E> {
    /// Create a player that owns `engine` for the whole session
    pub fn new(engine: E, stream: EventStream, config: StreamConfig) -> Result<Self> {
        let driver = ChunkedDriver::new(engine)?;
        let samples_per_tick = samples_per_tick(driver.sample_rate(), stream.tick_rate_hz());
        let cursor = PlaybackCursor::new(driver.channels(), config.looping);
        Ok(StreamingPlayer {
            driver,
            stream,
            cursor,
            samples_per_tick,
            fault: None,
        })
    }

    /// Wrap the player for use from several threads
    pub fn into_shared(self) -> SharedPlayer<E> {
        Arc::new(Mutex::new(self))
    }

    /// Fill `out` with interleaved 16-bit frames.
    ///
    /// Always fills the whole buffer; returns the number of frames that carry
    /// song audio (the rest is silence). An engine fault keeps the frames
    /// produced before it, and the player stays silent from then on with the
    /// fault kept in [`Self::fault`].
    pub fn fill_buffer(&mut self, out: &mut [i16]) -> usize {
        self.fill(out)
    }

    /// Fill `out` with interleaved frames normalized to -1.0..1.0
    pub fn fill_buffer_f32(&mut self, out: &mut [f32]) -> usize {
        self.fill(out)
    }

    fn fill<S: OutputSample>(&mut self, out: &mut [S]) -> usize {
        if self.fault.is_some() {
            out.fill(S::SILENCE);
            return 0;
        }
        let (frames, outcome) = fill_frames(
            &mut self.driver,
            &self.stream,
            self.samples_per_tick,
            &mut self.cursor,
            out,
        );
        if let Err(e) = outcome {
            tracing::warn!(
                error = %e,
                position = self.cursor.position,
                "engine fault during playback, falling back to silence"
            );
            self.fault = Some(e);
        }
        frames
    }

    /// Mute or unmute melodic channel `channel` (0-8)
    pub fn set_channel_mute(&mut self, channel: usize, muted: bool) {
        if let Some(flag) = ChannelMask::channel(channel) {
            self.cursor.mute.channels.set(flag, muted);
        }
    }

    /// True if melodic channel `channel` is muted
    pub fn is_channel_muted(&self, channel: usize) -> bool {
        ChannelMask::channel(channel).is_some_and(|flag| self.cursor.mute.channels.contains(flag))
    }

    /// Mute or unmute rhythm voice `voice` (0 = hi-hat .. 4 = bass drum)
    pub fn set_percussion_mute(&mut self, voice: usize, muted: bool) {
        if let Some(voice) = PercussionVoice::from_index(voice) {
            self.cursor.mute.percussion.set(voice.mask(), muted);
        }
    }

    /// True if rhythm voice `voice` is muted
    pub fn is_percussion_muted(&self, voice: usize) -> bool {
        PercussionVoice::from_index(voice)
            .is_some_and(|voice| self.cursor.mute.percussion.contains(voice.mask()))
    }

    /// Enable or disable looping
    pub fn set_looping(&mut self, looping: bool) {
        self.cursor.set_looping(looping);
    }

    /// Whether the song restarts after its last event
    pub fn is_looping(&self) -> bool {
        self.cursor.is_looping()
    }

    /// Fraction of the event stream consumed in the current pass
    pub fn position(&self) -> f32 {
        if self.stream.is_empty() {
            return 0.0;
        }
        self.cursor.position as f32 / self.stream.len() as f32
    }

    /// True once a non-looping song has played out
    pub fn is_finished(&self) -> bool {
        self.cursor.is_finished()
    }

    /// The fault that ended playback, if any
    pub fn fault(&self) -> Option<&OplError> {
        self.fault.as_ref()
    }

    /// Playback state
    pub fn cursor(&self) -> &PlaybackCursor {
        &self.cursor
    }

    /// The song being played
    pub fn stream(&self) -> &EventStream {
        &self.stream
    }

    /// Samples generated per song tick
    pub fn samples_per_tick(&self) -> u32 {
        self.samples_per_tick
    }

    /// Output sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.driver.sample_rate()
    }

    /// Interleaved channels per frame
    pub fn channels(&self) -> u16 {
        self.driver.channels() as u16
    }

    /// End the session and return the engine
    pub fn into_engine(self) -> E {
        self.driver.into_engine()
    }
}
