//! Real-time streaming playback
//!
//! A [`StreamingPlayer`] owns an engine and an IMF song and fills audio
//! callback buffers on demand. Delays that span callbacks, looping, and
//! live channel muting are handled here; device output through rodio is
//! available with the `streaming` feature.

#[cfg(feature = "streaming")]
pub mod audio_device;
pub mod cursor;
pub mod mute;
pub mod player;

#[cfg(feature = "streaming")]
pub use audio_device::{AudioDevice, DEFAULT_FRAMES_PER_PULL};
pub use cursor::PlaybackCursor;
pub use mute::{ChannelMask, MuteMask, PercussionMask, PercussionVoice, MELODIC_CHANNELS};
pub use player::{fill_frames, OutputSample, SharedPlayer, StreamingPlayer};

use serde::{Deserialize, Serialize};

/// Streaming playback configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Restart from the first event when the song ends
    pub looping: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        StreamConfig { looping: true }
    }
}

impl StreamConfig {
    /// Play the song once, then silence
    pub fn once() -> Self {
        StreamConfig { looping: false }
    }

    /// Enable or disable looping
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }
}
