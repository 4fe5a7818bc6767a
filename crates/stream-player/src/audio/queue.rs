//! Bounded queue between the player thread and the CPAL callback.
//!
//! The player pushes whole packets as frames are presented; the callback
//! drains without blocking. Neither side ever waits on the other.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Interleaved `f32` samples, capped at `max_buffered_samples`.
pub struct PcmQueue {
    channels: usize,
    inner: Mutex<VecDeque<f32>>,
    max_buffered_samples: usize,
    low_watermark_ms: AtomicU64,
}

/// Capacity in samples for `seconds` of audio (`2.0` when `seconds` is unusable).
pub fn calc_max_buffered_samples(rate_hz: u32, channels: usize, seconds: f32) -> usize {
    let secs = if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        2.0
    };
    let frames = (rate_hz as f32 * secs).ceil() as usize;
    frames.saturating_mul(channels)
}

impl PcmQueue {
    pub fn new(channels: usize, max_buffered_samples: usize) -> Self {
        let channels = channels.max(1);
        Self {
            channels,
            inner: Mutex::new(VecDeque::new()),
            max_buffered_samples: max_buffered_samples.max(channels),
            low_watermark_ms: AtomicU64::new(0),
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn len_frames(&self) -> usize {
        self.inner
            .lock()
            .map(|q| q.len() / self.channels)
            .unwrap_or(0)
    }

    /// Append samples; returns how many were dropped because the queue was full.
    pub fn push(&self, samples: &[f32]) -> usize {
        let Ok(mut q) = self.inner.lock() else {
            return samples.len();
        };
        let room = self.max_buffered_samples.saturating_sub(q.len());
        // Keep whole frames only.
        let take = (samples.len().min(room) / self.channels) * self.channels;
        q.extend(&samples[..take]);
        let dropped = samples.len() - take;
        if dropped > 0 {
            tracing::debug!(dropped, "audio queue full");
        }
        dropped
    }

    /// Pop up to `max_frames` whole frames; `None` when nothing is queued.
    pub fn pop(&self, max_frames: usize) -> Option<Vec<f32>> {
        let out = {
            let Ok(mut q) = self.inner.lock() else {
                return None;
            };
            let take = (q.len() / self.channels).min(max_frames) * self.channels;
            if take == 0 {
                return None;
            }
            q.drain(..take).collect::<Vec<f32>>()
        };
        self.log_low_watermark();
        Some(out)
    }

    pub fn clear(&self) {
        if let Ok(mut q) = self.inner.lock() {
            q.clear();
        }
    }

    fn log_low_watermark(&self) {
        let threshold = (self.max_buffered_samples / 8).max(self.channels * 16);
        let queued = self.inner.lock().map(|q| q.len()).unwrap_or(0);
        if queued > 0 && queued < threshold {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_else(|_| Duration::from_millis(0))
                .as_millis() as u64;
            let last = self.low_watermark_ms.load(Ordering::Relaxed);
            if now.saturating_sub(last) > 1000 {
                self.low_watermark_ms.store(now, Ordering::Relaxed);
                tracing::info!(
                    queued_samples = queued,
                    threshold_samples = threshold,
                    "audio queue low watermark"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calc_max_buffered_samples_fallbacks() {
        assert_eq!(calc_max_buffered_samples(48_000, 2, 2.0), 192_000);
        assert_eq!(calc_max_buffered_samples(48_000, 2, -1.0), 192_000);
        assert_eq!(calc_max_buffered_samples(48_000, 2, f32::NAN), 192_000);
    }

    #[test]
    fn pop_empty_returns_none() {
        let q = PcmQueue::new(2, 16);
        assert!(q.pop(4).is_none());
    }

    #[test]
    fn pop_returns_whole_frames() {
        let q = PcmQueue::new(2, 64);
        q.push(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(q.pop(2).unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(q.len_frames(), 1);
    }

    #[test]
    fn push_drops_overflow() {
        let q = PcmQueue::new(2, 4);
        assert_eq!(q.push(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]), 2);
        assert_eq!(q.len_frames(), 2);
        q.clear();
        assert_eq!(q.len_frames(), 0);
    }
}
