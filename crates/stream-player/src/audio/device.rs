//! Output device discovery and selection.

use anyhow::{Context, Result, anyhow};
use cpal::traits::{DeviceTrait, HostTrait};

/// Pick the first output device whose name contains `needle` (case-insensitive),
/// or the host default.
pub fn pick_device(host: &cpal::Host, needle: Option<&str>) -> Result<cpal::Device> {
    if let Some(needle) = needle.filter(|n| !n.trim().is_empty()) {
        let mut devices = host.output_devices().context("No output devices")?;
        return devices
            .find(|d| {
                d.description()
                    .map(|desc| matches_device_name(&desc.name(), needle))
                    .unwrap_or(false)
            })
            .ok_or_else(|| anyhow!("No output device matched: {needle}"));
    }

    host.default_output_device()
        .ok_or_else(|| anyhow!("No default output device"))
}

/// Choose an output config for `channels` running at exactly `rate`.
///
/// PCM is played at the decoded rate; a device without that rate is rejected
/// and the caller falls back to a wall clock. Among matching configs the
/// closer channel count wins, then the better sample format.
pub fn pick_output_config(
    device: &cpal::Device,
    channels: u16,
    rate: u32,
) -> Result<cpal::SupportedStreamConfig> {
    let mut best: Option<(Score, cpal::SupportedStreamConfig)> = None;
    for range in device.supported_output_configs()? {
        if !supports_rate(range.min_sample_rate(), range.max_sample_rate(), rate) {
            continue;
        }
        let score = Score {
            channel_distance: range.channels().abs_diff(channels),
            format_rank: sample_format_rank(range.sample_format()),
        };
        if best.as_ref().is_none_or(|(b, _)| score < *b) {
            best = Some((score, range.with_sample_rate(rate)));
        }
    }
    best.map(|(_, cfg)| cfg)
        .ok_or_else(|| anyhow!("No output config runs at {rate} Hz"))
}

/// Prefer a fixed, moderate buffer; the audio clock lags output by one buffer.
pub fn pick_buffer_size(config: &cpal::SupportedStreamConfig) -> Option<cpal::BufferSize> {
    const TARGET_FRAMES: u32 = 2048;
    match config.buffer_size() {
        cpal::SupportedBufferSize::Range { min, max } => {
            Some(cpal::BufferSize::Fixed(TARGET_FRAMES.clamp(*min, *max)))
        }
        cpal::SupportedBufferSize::Unknown => None,
    }
}

/// Names of the available output devices, in host order.
pub fn list_devices(host: &cpal::Host) -> Result<Vec<String>> {
    let devices = host.output_devices().context("No output devices")?;
    let mut out = Vec::new();
    for d in devices {
        out.push(d.description()?.to_string());
    }
    Ok(out)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Score {
    channel_distance: u16,
    format_rank: u8,
}

fn supports_rate(min: u32, max: u32, rate: u32) -> bool {
    rate > 0 && (min..=max).contains(&rate)
}

fn sample_format_rank(format: cpal::SampleFormat) -> u8 {
    match format {
        cpal::SampleFormat::F32 => 0,
        cpal::SampleFormat::I32 => 1,
        cpal::SampleFormat::I16 => 2,
        cpal::SampleFormat::U16 => 3,
        _ => 10,
    }
}

fn matches_device_name(name: &str, needle: &str) -> bool {
    let needle = needle.trim();
    if needle.is_empty() {
        return false;
    }
    name.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_device_name_is_case_insensitive() {
        assert!(matches_device_name("USB DAC", "dac"));
        assert!(matches_device_name("usb dac", "USB"));
        assert!(!matches_device_name("USB DAC", "speaker"));
        assert!(!matches_device_name("USB DAC", ""));
    }

    #[test]
    fn only_exact_rates_are_supported() {
        assert!(supports_rate(44_100, 96_000, 48_000));
        assert!(supports_rate(48_000, 48_000, 48_000));
        assert!(!supports_rate(48_000, 48_000, 44_100));
        assert!(!supports_rate(44_100, 96_000, 22_050));
        assert!(!supports_rate(0, 96_000, 0));
    }

    #[test]
    fn score_orders_channels_before_format() {
        let exact_channels = Score {
            channel_distance: 0,
            format_rank: 3,
        };
        let f32_out = Score {
            channel_distance: 2,
            format_rank: 0,
        };
        assert!(exact_channels < f32_out);
        assert!(
            Score {
                format_rank: 0,
                ..exact_channels
            } < exact_channels
        );
    }
}
