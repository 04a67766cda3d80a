//! Render progress and summary reporting

use std::fmt;
use std::time::Duration;

/// Coarse progress of a batch render
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderProgress {
    /// Fraction of the event stream consumed (0.0 to 1.0)
    pub fraction: f32,
    /// Sample frames rendered so far
    pub samples_rendered: u64,
}

/// Outcome of a completed batch render
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSummary {
    /// Sample frames rendered
    pub samples: u64,
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Interleaved channels per frame
    pub channels: u16,
    /// Wall-clock time spent rendering
    pub render_time: Duration,
}

impl RenderSummary {
    /// Length of the rendered audio
    pub fn song_duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples as f64 / self.sample_rate as f64)
    }

    /// How many times faster than real time the render ran
    pub fn realtime_factor(&self) -> f64 {
        let elapsed = self.render_time.as_secs_f64();
        if elapsed <= 0.0 {
            return f64::INFINITY;
        }
        self.song_duration().as_secs_f64() / elapsed
    }
}

impl fmt::Display for RenderSummary {
    /// Song length as `m:ss.cc`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.song_duration().as_secs_f64();
        let minutes = (total / 60.0).floor();
        let seconds = total - minutes * 60.0;
        write!(f, "{}:{:05.2}", minutes as u64, seconds)
    }
}
