//! [`AudioSink`] backed by a CPAL output stream.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use anyhow::Result;
use cpal::traits::{DeviceTrait, StreamTrait};

use crate::audio::output::{OutputOptions, build_output_stream};
use crate::audio::queue::{PcmQueue, calc_max_buffered_samples};
use crate::audio::{AudioParams, AudioSink, WallClock, device};

const QUEUE_SECONDS: f32 = 2.0;
const REFILL_MAX_FRAMES: usize = 1024;

struct ActiveOutput {
    _stream: cpal::Stream,
    queue: Arc<PcmQueue>,
    paused: Arc<AtomicBool>,
    clock_frames: Arc<AtomicU64>,
    /// Frame count at the last restart.
    base_frames: u64,
    rate: u32,
}

/// Plays decoded PCM on a CPAL device.
///
/// Output runs at the decoded sample rate. Video-only streams, and devices
/// that cannot open at that rate, fall back to a wall clock so presentation
/// keeps a time base.
pub struct CpalAudioSink {
    device_name: Option<String>,
    params: Option<AudioParams>,
    active: Option<ActiveOutput>,
    fallback: WallClock,
}

impl CpalAudioSink {
    pub fn new(device_name: Option<String>) -> Self {
        Self {
            device_name,
            params: None,
            active: None,
            fallback: WallClock::default(),
        }
    }

    fn start_output(&self, params: AudioParams) -> Result<ActiveOutput> {
        let host = cpal::default_host();
        let device = device::pick_device(&host, self.device_name.as_deref())?;
        let config = device::pick_output_config(&device, params.channels, params.sample_rate)?;
        let mut stream_config: cpal::StreamConfig = config.clone().into();
        if let Some(buf) = device::pick_buffer_size(&config) {
            stream_config.buffer_size = buf;
        }
        tracing::info!(
            device = %device.description()?,
            channels = stream_config.channels,
            rate_hz = stream_config.sample_rate,
            "audio output"
        );

        let channels = usize::from(params.channels);
        let rate = stream_config.sample_rate;
        let queue = Arc::new(PcmQueue::new(
            channels,
            calc_max_buffered_samples(rate, channels, QUEUE_SECONDS),
        ));
        let paused = Arc::new(AtomicBool::new(false));
        let clock_frames = Arc::new(AtomicU64::new(0));
        let stream = build_output_stream(
            &device,
            &stream_config,
            config.sample_format(),
            &queue,
            OutputOptions {
                refill_max_frames: REFILL_MAX_FRAMES,
                paused: paused.clone(),
                clock_frames: clock_frames.clone(),
            },
        )?;
        stream.play()?;

        Ok(ActiveOutput {
            _stream: stream,
            queue,
            paused,
            clock_frames,
            base_frames: 0,
            rate,
        })
    }
}

/// Decoded PCM goes to the device unchanged apart from sample encoding.
fn queue_pcm(queue: &PcmQueue, params: AudioParams, pcm: &[u8]) {
    queue.push(&params.encoding.to_f32(pcm));
}

impl AudioSink for CpalAudioSink {
    fn open(&mut self, params: AudioParams) -> Result<()> {
        self.close();
        self.params = Some(params);
        self.fallback = WallClock::started();
        if params.is_silent() {
            tracing::info!("no audio track; using wall clock");
            return Ok(());
        }
        match self.start_output(params) {
            Ok(active) => self.active = Some(active),
            Err(e) => tracing::warn!("audio output unavailable, using wall clock: {e:#}"),
        }
        Ok(())
    }

    fn play(&mut self, pcm: &[u8]) {
        let (Some(active), Some(params)) = (self.active.as_ref(), self.params) else {
            return;
        };
        queue_pcm(&active.queue, params, pcm);
    }

    fn pause(&mut self) {
        if let Some(active) = self.active.as_ref() {
            active.paused.store(true, Ordering::Relaxed);
        }
        self.fallback.pause();
    }

    fn resume(&mut self) {
        if let Some(active) = self.active.as_ref() {
            active.paused.store(false, Ordering::Relaxed);
        }
        self.fallback.resume();
    }

    fn restart(&mut self) -> Result<()> {
        if let Some(active) = self.active.as_mut() {
            active.queue.clear();
            active.base_frames = active.clock_frames.load(Ordering::Relaxed);
            active.paused.store(false, Ordering::Relaxed);
        }
        self.fallback = WallClock::started();
        Ok(())
    }

    fn close(&mut self) {
        self.active = None;
        self.params = None;
        self.fallback = WallClock::default();
    }

    fn clock(&self) -> f64 {
        match self.active.as_ref() {
            Some(active) if active.rate > 0 => {
                let frames = active
                    .clock_frames
                    .load(Ordering::Relaxed)
                    .saturating_sub(active.base_frames);
                frames as f64 / f64::from(active.rate)
            }
            _ => self.fallback.now(),
        }
    }
}
