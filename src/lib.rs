//! IMF Driver for OPL2 Emulators
//!
//! Sequences the register writes of an IMF (id Music Format) song into an
//! OPL emulator and turns the song's tick delays into exact sample counts.
//! The emulator itself is supplied by the caller through the [`OplEngine`]
//! trait; this crate owns everything around it.
//!
//! # Features
//! - Type-0 and type-1 IMF parsing (560 Hz `.imf` and 700 Hz `.wlf` variants)
//! - Chunked synthesis within the engine's `[2, 512]` sample window
//! - Batch rendering to an in-memory buffer or an incremental WAV sink
//! - Pull-based real-time playback with carry-over across callback buffers
//! - Per-channel and per-percussion-voice muting, looping
//!
//! # Crate feature flags
//! - `streaming` (opt-in): rodio-based [`streaming::AudioDevice`]
//!
//! # Quick start
//! ## Render a song to WAV
//! ```no_run
//! use opl_imf::{BatchRenderer, EventStream, ImfVariant, OplEngine, RenderConfig};
//!
//! fn export<E: OplEngine>(engine: E) -> Result<(), Box<dyn std::error::Error>> {
//!     let data = std::fs::read("song.imf")?;
//!     let stream = EventStream::parse(&data, ImfVariant::Standard);
//!     let mut renderer = BatchRenderer::new(engine, RenderConfig::default())?;
//!     let audio = renderer.render(&stream)?;
//!     std::fs::write("song.wav", audio.to_wav_bytes()?)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Real-time streaming
//! ```no_run
//! use opl_imf::{EventStream, ImfVariant, OplEngine, StreamConfig, StreamingPlayer};
//!
//! fn play<E: OplEngine>(engine: E) -> opl_imf::Result<()> {
//!     let data = std::fs::read("song.wlf")?;
//!     let stream = EventStream::parse(&data, ImfVariant::Fast);
//!     let mut player = StreamingPlayer::new(engine, stream, StreamConfig::default())?;
//!     player.set_channel_mute(0, true);
//!
//!     // Called from the audio callback with the device's buffer
//!     let mut frames = vec![0.0f32; 8192 * 2];
//!     player.fill_buffer_f32(&mut frames);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub mod engine; // Engine capability & chunked synthesis
pub mod imf; // IMF stream parsing & tick conversion
pub mod render; // Batch rendering
pub mod streaming; // Real-time pull playback
pub mod wav; // RIFF/WAVE container

/// Error types for IMF rendering and playback
#[derive(thiserror::Error, Debug)]
pub enum OplError {
    /// The engine rejected a call or reported an internal failure
    #[error("Engine fault: {0}")]
    EngineFault(String),

    /// A generate call asked for a sample count outside the engine window
    #[error("Chunk length {0} outside engine window [2, 512]")]
    ChunkOutOfRange(usize),

    /// The engine reports a channel layout the driver cannot interleave
    #[error("Unsupported channel count {0} (expected 1 or 2)")]
    ChannelCount(u8),

    /// Error building or writing the WAV container
    #[error("Audio file write error: {0}")]
    AudioFileError(String),

    /// IO error from the output sink
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Rendering was cancelled between chunks
    #[error("Rendering cancelled")]
    Cancelled,

    /// The audio output device could not be opened
    #[error("Audio device error: {0}")]
    AudioDeviceError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for OplError {
    /// Converts a String into `OplError::Other`.
    ///
    /// Prefer the specific variants where the failure class matters to the
    /// caller (`EngineFault` ends a session, `Io` does not imply the engine
    /// state is corrupt).
    fn from(msg: String) -> Self {
        OplError::Other(msg)
    }
}

impl From<&str> for OplError {
    fn from(msg: &str) -> Self {
        OplError::Other(msg.to_string())
    }
}

impl From<hound::Error> for OplError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(e) => OplError::Io(e),
            other => OplError::AudioFileError(other.to_string()),
        }
    }
}

/// Result type for driver operations
pub type Result<T> = std::result::Result<T, OplError>;

// Public API exports
pub use engine::{ChunkedDriver, OplEngine, MAX_CHUNK_SAMPLES, MIN_CHUNK_SAMPLES};
pub use imf::{samples_per_tick, Event, EventStream, ImfReader, ImfVariant};
pub use render::{BatchRenderer, RenderConfig, RenderProgress, RenderSummary, RenderedAudio};
#[cfg(feature = "streaming")]
pub use streaming::AudioDevice;
pub use streaming::{
    ChannelMask, PercussionMask, PercussionVoice, PlaybackCursor, SharedPlayer, StreamConfig,
    StreamingPlayer,
};
pub use wav::{wav_spec, WavHeader, WavStreamWriter, WAV_HEADER_LEN};
