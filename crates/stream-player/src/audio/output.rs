//! CPAL output stream and real-time callback.
//!
//! The callback:
//! - refills a small local buffer from the [`PcmQueue`] without blocking
//! - maps channels (mono↔stereo, best-effort otherwise)
//! - counts every frame it outputs while not paused; that count is the audio clock

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use cpal::traits::DeviceTrait;

use crate::audio::queue::PcmQueue;

/// Shared handles between the stream callback and its owner.
#[derive(Clone, Debug)]
pub struct OutputOptions {
    /// Maximum frames pulled from the queue per refill.
    pub refill_max_frames: usize,
    /// While `true` the callback outputs silence, does not drain, and the clock holds.
    pub paused: Arc<AtomicBool>,
    /// Frames output since the stream was built.
    pub clock_frames: Arc<AtomicU64>,
}

/// Build an output stream fed from `queue`.
///
/// `queue` must carry interleaved `f32` samples at the stream's sample rate.
pub fn build_output_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    sample_format: cpal::SampleFormat,
    queue: &Arc<PcmQueue>,
    opts: OutputOptions,
) -> Result<cpal::Stream> {
    match sample_format {
        cpal::SampleFormat::F32 => build_stream::<f32>(device, config, queue, opts),
        cpal::SampleFormat::I16 => build_stream::<i16>(device, config, queue, opts),
        cpal::SampleFormat::I32 => build_stream::<i32>(device, config, queue, opts),
        cpal::SampleFormat::U16 => build_stream::<u16>(device, config, queue, opts),
        other => Err(anyhow!("Unsupported sample format: {other:?}")),
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    queue: &Arc<PcmQueue>,
    opts: OutputOptions,
) -> Result<cpal::Stream>
where
    T: cpal::Sample + cpal::SizedSample + cpal::FromSample<f32> + Send + 'static,
{
    let channels_out = usize::from(config.channels).max(1);
    let state = Mutex::new(CallbackState {
        pos: 0,
        src_channels: queue.channels(),
        src: Vec::new(),
    });
    let refill_max_frames = opts.refill_max_frames.max(1);
    let queue_cb = queue.clone();
    let silence = <T as cpal::Sample>::from_sample::<f32>(0.0);

    let err_fn = |err| tracing::warn!("stream error: {err}");

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _| {
            if opts.paused.load(Ordering::Relaxed) {
                data.fill(silence);
                return;
            }
            let frames = data.len() / channels_out;
            opts.clock_frames.fetch_add(frames as u64, Ordering::Relaxed);

            let Ok(mut st) = state.lock() else {
                data.fill(silence);
                return;
            };
            for frame in 0..frames {
                if st.pos >= st.src.len() {
                    st.pos = 0;
                    st.src.clear();
                    match queue_cb.pop(refill_max_frames) {
                        Some(v) => st.src = v,
                        None => {
                            data[frame * channels_out..].fill(silence);
                            break;
                        }
                    }
                }
                for ch in 0..channels_out {
                    let sample = next_sample_mapped(&mut st, channels_out, ch);
                    data[frame * channels_out + ch] = <T as cpal::Sample>::from_sample::<f32>(sample);
                }
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}

struct CallbackState {
    pos: usize,
    src_channels: usize,
    src: Vec<f32>,
}

/// Read one output sample for `dst_ch`; `pos` advances after the last channel.
fn next_sample_mapped(st: &mut CallbackState, dst_channels: usize, dst_ch: usize) -> f32 {
    if st.pos >= st.src.len() {
        return 0.0;
    }
    let frame_start = st.pos;
    let get_src = |ch: usize, st: &CallbackState| -> f32 {
        if ch < st.src_channels && frame_start + ch < st.src.len() {
            st.src[frame_start + ch]
        } else {
            0.0
        }
    };

    let out = match (st.src_channels, dst_channels) {
        (1, 1) | (1, 2) => get_src(0, st),
        (2, 2) => get_src(dst_ch.min(1), st),
        (2, 1) => 0.5 * (get_src(0, st) + get_src(1, st)),
        _ => get_src(dst_ch.min(st.src_channels.saturating_sub(1)), st),
    };

    if dst_ch + 1 == dst_channels {
        st.pos += st.src_channels;
    }
    out
}
