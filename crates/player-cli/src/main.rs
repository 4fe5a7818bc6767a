//! stream-play: a small CLI around the `stream-player` engine.
//!
//! Plays one URL through the external decode service. Audio goes to a CPAL
//! device; video frames are counted and logged rather than drawn.
//!
//! ## Flow
//! 1. **Download**: paced byte ranges (or a live pull) feed the decode service.
//! 2. **Decode**: the service returns timestamped audio and video frames.
//! 3. **Present**: the player thread paces video against the audio clock.

mod cli;
mod config;

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::{after, never, select, tick};
use stream_player::audio::{CpalAudioSink, device};
use stream_player::{PlaneLayout, PlayRequest, PlayerHandle, ProgressControl, VideoSink, launch};
use stream_player_types::PlayerNotice;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = cli::Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,stream_player=info,player_cli=info")
        }))
        .init();

    if args.list_devices {
        let host = cpal::default_host();
        for name in device::list_devices(&host)? {
            println!("{name}");
        }
        return Ok(());
    }

    let Some(cli::Command::Play {
        url,
        live,
        no_audio,
        header_wait,
        seek_ms,
        seek_after_secs,
    }) = args.cmd.clone()
    else {
        anyhow::bail!("nothing to do; try `stream-play play <url>`");
    };

    let device_name = args.device.clone();
    let (handle, join) = launch(
        config::player_config(&args),
        Box::new(move || Box::new(CpalAudioSink::new(device_name))),
    )?;
    handle.set_progress_control(Box::new(LogProgress::default()));

    let (notice_tx, notice_rx) = crossbeam_channel::unbounded();
    let req = PlayRequest::new(url.clone(), Box::new(LoggingVideoSink::default()))
        .with_callback(Box::new(move |notice| {
            let _ = notice_tx.send(notice);
        }))
        .live(live)
        .has_audio(!no_audio)
        .header_wait_bytes(header_wait);
    if let Err(e) = handle.play(req) {
        handle.shutdown();
        let _ = join.join();
        anyhow::bail!("play {url} refused: {e} (code {})", e.code());
    }
    tracing::info!(%url, live, "playback requested");

    let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = stop_tx.try_send(());
    })
    .context("install ctrl-c handler")?;

    let outcome = wait_for_end(&handle, &notice_rx, &stop_rx, seek_ms, seek_after_secs);

    let _ = handle.stop();
    handle.shutdown();
    if join.join().is_err() {
        tracing::warn!("player thread panicked");
    }
    outcome
}

fn wait_for_end(
    handle: &PlayerHandle,
    notices: &crossbeam_channel::Receiver<PlayerNotice>,
    stop: &crossbeam_channel::Receiver<()>,
    seek_ms: Option<u64>,
    seek_after_secs: u64,
) -> Result<()> {
    let status_tick = tick(Duration::from_secs(2));
    let mut seek_at = match seek_ms {
        Some(_) => after(Duration::from_secs(seek_after_secs)),
        None => never(),
    };

    loop {
        select! {
            recv(notices) -> notice => match notice {
                Ok(PlayerNotice::Finished) => {
                    tracing::info!("playback finished");
                    return Ok(());
                }
                Ok(PlayerNotice::Error(err)) => {
                    tracing::error!(code = err.error, status = err.status, "{}", err.message);
                    anyhow::bail!("playback failed: {}", err.message);
                }
                Err(_) => return Ok(()),
            },
            recv(stop) -> _ => {
                tracing::info!("interrupted");
                return Ok(());
            }
            recv(seek_at) -> _ => {
                seek_at = never();
                if let Some(ms) = seek_ms {
                    match handle.seek_to(ms) {
                        Ok(()) => tracing::info!(ms, "seek issued"),
                        Err(e) => tracing::warn!(ms, code = e.code(), "seek refused: {e}"),
                    }
                }
            }
            recv(status_tick) -> _ => {
                if let Some(status) = handle.status() {
                    match serde_json::to_string(&status) {
                        Ok(json) => tracing::info!(status = %json, "player status"),
                        Err(e) => tracing::debug!("status encode failed: {e}"),
                    }
                }
            }
        }
    }
}

/// Counts presented frames and logs throughput every few seconds.
struct LoggingVideoSink {
    shown: u64,
    since: Instant,
    layout: Option<PlaneLayout>,
}

impl Default for LoggingVideoSink {
    fn default() -> Self {
        Self {
            shown: 0,
            since: Instant::now(),
            layout: None,
        }
    }
}

impl VideoSink for LoggingVideoSink {
    fn display(&mut self, frame: &[u8], layout: PlaneLayout) -> bool {
        if self.layout != Some(layout) {
            tracing::info!(
                width = layout.width,
                height = layout.height,
                bytes = frame.len(),
                "video frame layout"
            );
            self.layout = Some(layout);
        }
        self.shown += 1;
        let elapsed = self.since.elapsed();
        if elapsed >= Duration::from_secs(5) {
            let fps = self.shown as f64 / elapsed.as_secs_f64();
            tracing::info!(frames = self.shown, fps = format!("{fps:.1}"), "video");
            self.shown = 0;
            self.since = Instant::now();
        }
        true
    }

    fn fullscreen(&mut self) {
        tracing::info!("fullscreen requested");
    }
}

#[derive(Default)]
struct LogProgress {
    max_ms: u64,
    label: String,
}

impl ProgressControl for LogProgress {
    fn set_range(&mut self, _min_ms: u64, max_ms: u64) {
        self.max_ms = max_ms;
    }

    fn set_position(&mut self, ms: u64) {
        tracing::debug!(ms, max_ms = self.max_ms, "position");
    }

    fn set_label(&mut self, text: &str) {
        if self.label != text {
            self.label = text.to_string();
            tracing::debug!(label = %self.label, "progress");
        }
    }
}
