//! Batch Rendering
//!
//! Plays a whole IMF stream through the engine as fast as possible and
//! collects the audio, either in memory or straight into a WAV sink.

pub mod summary;

pub use summary::{RenderProgress, RenderSummary};

use crate::engine::{ChunkedDriver, OplEngine, MAX_CHUNK_SAMPLES};
use crate::imf::{delay_samples, samples_per_tick, EventStream};
use crate::wav::{WavHeader, WavStreamWriter, WAV_HEADER_LEN};
use crate::{OplError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Cursor, Seek, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Default progress cadence, in seconds of song time
pub const DEFAULT_PROGRESS_INTERVAL_SECS: u32 = 5;

/// Batch render configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Report progress after this many seconds of song time (0 disables)
    pub progress_interval_secs: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            progress_interval_secs: DEFAULT_PROGRESS_INTERVAL_SECS,
        }
    }
}

impl RenderConfig {
    /// Set the progress cadence in seconds of song time
    pub fn progress_interval(mut self, secs: u32) -> Self {
        self.progress_interval_secs = secs;
        self
    }
}

/// Rendered audio held in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedAudio {
    samples: Vec<i16>,
    sample_rate: u32,
    channels: u16,
}

impl RenderedAudio {
    /// Interleaved 16-bit samples
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Take the sample buffer
    pub fn into_samples(self) -> Vec<i16> {
        self.samples
    }

    /// Sample frames rendered
    pub fn frames(&self) -> u64 {
        (self.samples.len() / self.channels as usize) as u64
    }

    /// Output sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Interleaved channels per frame
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// WAV header describing this audio
    pub fn wav_header(&self) -> Result<WavHeader> {
        WavHeader::new(self.frames(), self.sample_rate, self.channels)
    }

    /// Complete WAV file contents: header followed by the PCM payload
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>> {
        let header = self.wav_header()?;
        let mut out = Cursor::new(Vec::with_capacity(
            WAV_HEADER_LEN + header.data_len() as usize,
        ));
        let mut writer = WavStreamWriter::new(&mut out, self.sample_rate, self.channels)?;
        let frames_per_write = MAX_CHUNK_SAMPLES * self.channels as usize;
        for chunk in self.samples.chunks(frames_per_write) {
            writer.write_samples(chunk)?;
        }
        writer.finish()?;
        Ok(out.into_inner())
    }
}

type ProgressFn = Box<dyn FnMut(RenderProgress) + Send>;

/// Renders complete IMF songs with an exclusively owned engine
pub struct BatchRenderer<E> {
    driver: ChunkedDriver<E>,
    config: RenderConfig,
    on_progress: Option<ProgressFn>,
    cancel: Option<Arc<AtomicBool>>,
}

impl<E: OplEngine> BatchRenderer<E> {
    /// Create a renderer around `engine`
    pub fn new(engine: E, config: RenderConfig) -> Result<Self> {
        Ok(BatchRenderer {
            driver: ChunkedDriver::new(engine)?,
            config,
            on_progress: None,
            cancel: None,
        })
    }

    /// Receive coarse progress reports while rendering
    pub fn with_progress<F>(mut self, on_progress: F) -> Self
    where
        F: FnMut(RenderProgress) + Send + 'static,
    {
        self.on_progress = Some(Box::new(on_progress));
        self
    }

    /// Stop rendering with [`OplError::Cancelled`] once `flag` is set.
    ///
    /// The flag is checked between chunks; a generate call in progress
    /// always completes.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Output sample rate of the engine
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

    /// Render `stream` into memory
    pub fn render(&mut self, stream: &EventStream) -> Result<RenderedAudio> {
        let mut samples = Vec::new();
        self.render_with(stream, |chunk| {
            samples.extend_from_slice(chunk);
            Ok(())
        })?;
        Ok(RenderedAudio {
            samples,
            sample_rate: self.sample_rate(),
            channels: self.channels(),
        })
    }

    /// Render `stream` as a WAV file into `sink`, which must be positioned
    /// at its start. Pass `&mut sink` to keep using it afterwards.
    ///
    /// The header lengths are patched when the song ends. On error the sink
    /// holds a partial file and should be discarded.
    pub fn render_to_writer<W: Write + Seek>(
        &mut self,
        stream: &EventStream,
        sink: W,
    ) -> Result<RenderSummary> {
        let mut writer = WavStreamWriter::new(sink, self.sample_rate(), self.channels())?;
        let summary = self.render_with(stream, |chunk| writer.write_samples(chunk))?;
        writer.finish()?;
        Ok(summary)
    }

    /// Render `stream` to a WAV file at `path`, removing the partial file if
    /// rendering fails.
    pub fn render_to_file<P: AsRef<Path>>(
        &mut self,
        stream: &EventStream,
        path: P,
    ) -> Result<RenderSummary> {
        let path = path.as_ref();
        let mut sink = BufWriter::new(File::create(path)?);
        let rendered = self.render_to_writer(stream, &mut sink);
        drop(sink);
        if rendered.is_err() {
            let _ = std::fs::remove_file(path);
        }
        rendered
    }

    /// Render `stream`, passing every chunk to `sink` as it is generated.
    ///
    /// The chunk is only valid for the duration of the call; `sink` must copy
    /// whatever it keeps.
    ///
    /// Each delay produces `delay_ticks * samples_per_tick` frames, plus one
    /// when the engine's two-sample minimum rounds a final single frame up.
    /// That extra frame is not repaid; each delay is rendered on its own.
    pub fn render_with<F>(&mut self, stream: &EventStream, mut sink: F) -> Result<RenderSummary>
    where
        F: FnMut(&[i16]) -> Result<()>,
    {
        let started = Instant::now();
        let tick_rate = stream.tick_rate_hz();
        let tick_samples = samples_per_tick(self.driver.sample_rate(), tick_rate);
        let progress_every = self.config.progress_interval_secs as u64 * tick_rate as u64;
        let total_events = stream.len().max(1);

        let mut frames = 0u64;
        let mut ticks_since_report = 0u64;

        self.check_cancelled()?;
        for (index, event) in stream.events().iter().enumerate() {
            if progress_every > 0 && ticks_since_report > progress_every {
                self.report(RenderProgress {
                    fraction: index as f32 / total_events as f32,
                    samples_rendered: frames,
                });
                ticks_since_report = 0;
            }

            self.driver.write(event.register, event.value)?;
            if event.delay_ticks == 0 {
                continue;
            }
            ticks_since_report += event.delay_ticks as u64;

            let owed = delay_samples(event.delay_ticks, tick_samples);
            let cancel = &self.cancel;
            let generated = self.driver.for_each_chunk(owed, |chunk, _| {
                sink(chunk)?;
                if cancel.as_ref().is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                    return Err(OplError::Cancelled);
                }
                Ok(())
            })?;
            frames += generated;
        }

        self.report(RenderProgress {
            fraction: 1.0,
            samples_rendered: frames,
        });

        let summary = RenderSummary {
            samples: frames,
            sample_rate: self.driver.sample_rate(),
            channels: self.driver.channels() as u16,
            render_time: started.elapsed(),
        };
        tracing::info!(
            samples = summary.samples,
            length = %summary,
            render_secs = summary.render_time.as_secs_f64(),
            speed = summary.realtime_factor(),
            "render complete"
        );
        Ok(summary)
    }

    fn check_cancelled(&self) -> Result<()> {
        match &self.cancel {
            Some(flag) if flag.load(Ordering::Relaxed) => Err(OplError::Cancelled),
            _ => Ok(()),
        }
    }

    fn report(&mut self, progress: RenderProgress) {
        tracing::trace!(
            fraction = progress.fraction,
            samples = progress.samples_rendered,
            "render progress"
        );
        if let Some(on_progress) = self.on_progress.as_mut() {
            on_progress(progress);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::RampEngine;
    use crate::imf::{Event, ImfVariant};
    use parking_lot::Mutex;

    fn stream(events: Vec<Event>) -> EventStream {
        EventStream::from_events(events, ImfVariant::Standard)
    }

    #[test]
    fn test_sample_count_matches_delays() {
        // 44100 Hz / 560 Hz -> 79 samples per tick
        let song = stream(vec![
            Event::new(0x20, 0x01, 0),
            Event::new(0xA0, 0x41, 10),
            Event::new(0xB0, 0x32, 0),
            Event::new(0xB0, 0x12, 7),
        ]);
        let mut renderer = BatchRenderer::new(RampEngine::stereo(44_100), RenderConfig::default())
            .unwrap();
        let audio = renderer.render(&song).unwrap();
        assert_eq!(audio.frames(), 17 * 79);
        assert_eq!(audio.samples().len(), 17 * 79 * 2);

        let engine = renderer.into_engine();
        assert_eq!(
            engine.writes(),
            &[(0x20, 0x01), (0xA0, 0x41), (0xB0, 0x32), (0xB0, 0x12)]
        );
    }

    #[test]
    fn test_zero_delays_generate_nothing() {
        let song = stream(vec![Event::new(0x20, 0x01, 0), Event::new(0x40, 0x3F, 0)]);
        let mut renderer =
            BatchRenderer::new(RampEngine::mono(44_100), RenderConfig::default()).unwrap();
        let audio = renderer.render(&song).unwrap();
        assert_eq!(audio.frames(), 0);
        assert!(renderer.into_engine().generate_calls().is_empty());
    }

    #[test]
    fn test_single_sample_remainder_rounds_up_per_delay() {
        // 1 sample per tick: each delay is clamped on its own, the extra
        // frame of a one-sample remainder is never taken from the next delay
        let song = stream(vec![
            Event::new(0x20, 0x01, 1),
            Event::new(0x20, 0x02, 3),
            Event::new(0x20, 0x03, 513),
            Event::new(0x20, 0x04, 10),
        ]);
        let mut renderer =
            BatchRenderer::new(RampEngine::mono(560), RenderConfig::default()).unwrap();
        let audio = renderer.render(&song).unwrap();
        assert_eq!(audio.frames(), 2 + 3 + 514 + 10);
        assert_eq!(renderer.into_engine().generate_calls(), &[2, 3, 512, 2, 10]);
    }

    #[test]
    fn test_engine_fault_aborts_render() {
        let mut engine = RampEngine::mono(44_100);
        engine.reject_register(0xBD);
        let song = stream(vec![Event::new(0x20, 0x01, 4), Event::new(0xBD, 0x20, 4)]);
        let mut renderer = BatchRenderer::new(engine, RenderConfig::default()).unwrap();
        let err = renderer.render(&song).unwrap_err();
        assert!(matches!(err, OplError::EngineFault(_)));
    }

    #[test]
    fn test_cancel_between_chunks() {
        let flag = Arc::new(AtomicBool::new(false));
        let song = stream(vec![Event::new(0x20, 0x01, 100)]);
        let mut renderer = BatchRenderer::new(RampEngine::mono(44_100), RenderConfig::default())
            .unwrap()
            .with_cancel_flag(Arc::clone(&flag));

        let mut chunks = 0;
        let err = renderer
            .render_with(&song, |_| {
                chunks += 1;
                if chunks == 3 {
                    flag.store(true, Ordering::Relaxed);
                }
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, OplError::Cancelled));
        assert_eq!(chunks, 3);
        assert_eq!(renderer.into_engine().generate_calls().len(), 3);
    }

    #[test]
    fn test_progress_reports() {
        // 2 seconds of song per event, report every 5 seconds
        let song = stream((0..10).map(|i| Event::new(0x20, i, 1_120)).collect());
        let reports = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&reports);
        let mut renderer = BatchRenderer::new(RampEngine::mono(560), RenderConfig::default())
            .unwrap()
            .with_progress(move |p| sink.lock().push(p));
        renderer.render(&song).unwrap();

        let reports = reports.lock();
        let fractions: Vec<f32> = reports.iter().map(|p| p.fraction).collect();
        assert_eq!(fractions, vec![0.3, 0.6, 0.9, 1.0]);
        assert_eq!(reports[0].samples_rendered, 3 * 1_120);
        assert_eq!(reports.last().unwrap().samples_rendered, 10 * 1_120);
    }

    #[test]
    fn test_wav_bytes() {
        let song = stream(vec![Event::new(0x20, 0x01, 2)]);
        let mut renderer =
            BatchRenderer::new(RampEngine::stereo(44_100), RenderConfig::default()).unwrap();
        let bytes = renderer.render(&song).unwrap().to_wav_bytes().unwrap();
        assert_eq!(bytes.len(), WAV_HEADER_LEN + 158 * 4);
        assert_eq!(u32::from_le_bytes(bytes[40..44].try_into().unwrap()), 158 * 4);
    }

    #[test]
    fn test_config_builder() {
        assert_eq!(RenderConfig::default().progress_interval_secs, 5);
        assert_eq!(RenderConfig::default().progress_interval(0).progress_interval_secs, 0);
    }
}
