//! Audio presentation and the audio clock.
//!
//! The audio sink's position counter is the master clock for AV sync. It starts
//! when the sink is opened and only advances while the sink is not paused.

pub mod cpal_sink;
pub mod device;
pub mod output;
pub mod pcm;
pub mod queue;

use std::time::Instant;

pub use cpal_sink::CpalAudioSink;
pub use pcm::SampleEncoding;

/// Format of the PCM handed to [`AudioSink::play`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AudioParams {
    pub encoding: SampleEncoding,
    pub channels: u16,
    pub sample_rate: u32,
}

impl AudioParams {
    /// Video-only streams still need a clock.
    pub fn is_silent(&self) -> bool {
        self.channels == 0 || self.sample_rate == 0
    }
}

/// Audio output plus the master clock.
///
/// Not `Send`: platform streams are bound to the thread that created them.
pub trait AudioSink {
    fn open(&mut self, params: AudioParams) -> anyhow::Result<()>;
    /// Queue interleaved little-endian PCM for output.
    fn play(&mut self, pcm: &[u8]);
    /// Suspend output; the clock holds.
    fn pause(&mut self);
    fn resume(&mut self);
    /// Drop queued audio and restart the clock from zero, running.
    fn restart(&mut self) -> anyhow::Result<()>;
    fn close(&mut self);
    /// Seconds elapsed on the audio clock.
    fn clock(&self) -> f64;
}

/// Clock driven by the monotonic system clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct WallClock {
    base: f64,
    since: Option<Instant>,
}

impl WallClock {
    /// Running from zero.
    pub fn started() -> Self {
        Self {
            base: 0.0,
            since: Some(Instant::now()),
        }
    }

    pub fn pause(&mut self) {
        if let Some(since) = self.since.take() {
            self.base += since.elapsed().as_secs_f64();
        }
    }

    pub fn resume(&mut self) {
        if self.since.is_none() {
            self.since = Some(Instant::now());
        }
    }

    pub fn is_running(&self) -> bool {
        self.since.is_some()
    }

    pub fn now(&self) -> f64 {
        self.base + self.since.map(|s| s.elapsed().as_secs_f64()).unwrap_or(0.0)
    }
}

/// Discards PCM; keeps time with a [`WallClock`].
#[derive(Debug, Default)]
pub struct NullAudioSink {
    clock: WallClock,
}

impl NullAudioSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioSink for NullAudioSink {
    fn open(&mut self, params: AudioParams) -> anyhow::Result<()> {
        tracing::debug!(?params, "null audio sink opened");
        self.clock = WallClock::started();
        Ok(())
    }

    fn play(&mut self, _pcm: &[u8]) {}

    fn pause(&mut self) {
        self.clock.pause();
    }

    fn resume(&mut self) {
        self.clock.resume();
    }

    fn restart(&mut self) -> anyhow::Result<()> {
        self.clock = WallClock::started();
        Ok(())
    }

    fn close(&mut self) {
        self.clock = WallClock::default();
    }

    fn clock(&self) -> f64 {
        self.clock.now()
    }
}
