//! Player actor runtime.
//!
//! The [`Player`] lives on its own thread. Control calls arrive as
//! [`PlayerCommand`]s with a one-shot reply channel; download responses,
//! decode events and timer ticks are multiplexed with `select!`.

use std::thread::JoinHandle;
use std::time::Instant;

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender, never, select, tick};
use stream_player_proto::{DecodeEvent, DownloadResponse};
use stream_player_types::{PlayerState, PlayerStatus};

use crate::audio::AudioSink;
use crate::config::PlayerConfig;
use crate::decode::{DecodeLink, spawn_decode_transport};
use crate::download::DownloadLink;
use crate::download::worker::spawn_download_worker;
use crate::error::ControlError;
use crate::player::{PlayRequest, Player};
use crate::sinks::{LoadingIndicator, ProgressControl};
use crate::timer::TimerSlot;

/// Builds the audio sink on the player thread (platform streams are not `Send`).
pub type AudioFactory = Box<dyn FnOnce() -> Box<dyn AudioSink> + Send>;

type Reply<T> = Sender<T>;

/// Commands accepted by the player thread.
pub enum PlayerCommand {
    Play {
        req: PlayRequest,
        reply: Reply<Result<(), ControlError>>,
    },
    Pause {
        reply: Reply<Result<(), ControlError>>,
    },
    Resume {
        reply: Reply<Result<(), ControlError>>,
    },
    Stop {
        reply: Reply<Result<(), ControlError>>,
    },
    SeekTo {
        ms: u64,
        reply: Reply<Result<(), ControlError>>,
    },
    Fullscreen {
        reply: Reply<Result<(), ControlError>>,
    },
    State {
        reply: Reply<PlayerState>,
    },
    Status {
        reply: Reply<PlayerStatus>,
    },
    SetProgressControl(Box<dyn ProgressControl>),
    SetLoadingIndicator(Box<dyn LoadingIndicator>),
    SetVisible(bool),
    Shutdown,
}

/// Handle for sending commands to the player thread.
#[derive(Clone)]
pub struct PlayerHandle {
    pub cmd_tx: Sender<PlayerCommand>,
}

impl PlayerHandle {
    fn call<T>(&self, make: impl FnOnce(Reply<T>) -> PlayerCommand) -> Option<T> {
        let (reply, rx) = crossbeam_channel::bounded(1);
        self.cmd_tx.send(make(reply)).ok()?;
        rx.recv().ok()
    }

    fn control(
        &self,
        make: impl FnOnce(Reply<Result<(), ControlError>>) -> PlayerCommand,
    ) -> Result<(), ControlError> {
        self.call(make).unwrap_or(Err(ControlError::Runtime))
    }

    pub fn play(&self, req: PlayRequest) -> Result<(), ControlError> {
        self.control(|reply| PlayerCommand::Play { req, reply })
    }

    pub fn pause(&self) -> Result<(), ControlError> {
        self.control(|reply| PlayerCommand::Pause { reply })
    }

    pub fn resume(&self) -> Result<(), ControlError> {
        self.control(|reply| PlayerCommand::Resume { reply })
    }

    pub fn stop(&self) -> Result<(), ControlError> {
        self.control(|reply| PlayerCommand::Stop { reply })
    }

    pub fn seek_to(&self, ms: u64) -> Result<(), ControlError> {
        self.control(|reply| PlayerCommand::SeekTo { ms, reply })
    }

    pub fn fullscreen(&self) -> Result<(), ControlError> {
        self.control(|reply| PlayerCommand::Fullscreen { reply })
    }

    /// `Idle` once the runtime is gone.
    pub fn state(&self) -> PlayerState {
        self.call(|reply| PlayerCommand::State { reply })
            .unwrap_or_default()
    }

    pub fn is_playing(&self) -> bool {
        self.state() == PlayerState::Playing
    }

    pub fn status(&self) -> Option<PlayerStatus> {
        self.call(|reply| PlayerCommand::Status { reply })
    }

    pub fn set_progress_control(&self, progress: Box<dyn ProgressControl>) {
        let _ = self.cmd_tx.send(PlayerCommand::SetProgressControl(progress));
    }

    pub fn set_loading_indicator(&self, loading: Box<dyn LoadingIndicator>) {
        let _ = self.cmd_tx.send(PlayerCommand::SetLoadingIndicator(loading));
    }

    pub fn set_visible(&self, visible: bool) {
        let _ = self.cmd_tx.send(PlayerCommand::SetVisible(visible));
    }

    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(PlayerCommand::Shutdown);
    }
}

/// Actor links the player talks through.
pub struct PlayerLinks {
    pub download: DownloadLink,
    pub download_rx: Receiver<DownloadResponse>,
    pub decode: DecodeLink,
    pub decode_rx: Receiver<DecodeEvent>,
}

/// Start the download worker, the decode transport and the player thread.
pub fn launch(config: PlayerConfig, audio: AudioFactory) -> Result<(PlayerHandle, JoinHandle<()>)> {
    let (download, download_rx) = spawn_download_worker(config.http_timeout);
    let (decode, decode_rx) = spawn_decode_transport(config.decoder_url.clone());
    spawn_player(
        config,
        PlayerLinks {
            download,
            download_rx,
            decode,
            decode_rx,
        },
        audio,
    )
}

/// Spawn the player thread over existing links.
pub fn spawn_player(
    config: PlayerConfig,
    links: PlayerLinks,
    audio: AudioFactory,
) -> Result<(PlayerHandle, JoinHandle<()>)> {
    let (cmd_tx, cmd_rx) = crossbeam_channel::unbounded();
    let join = std::thread::Builder::new()
        .name("stream-player".to_string())
        .spawn(move || player_thread_main(config, links, audio, cmd_rx))
        .context("spawn player thread")?;
    Ok((PlayerHandle { cmd_tx }, join))
}

/// Periodic ticker mirroring one [`TimerSlot`].
struct Ticker {
    generation: u64,
    rx: Receiver<Instant>,
}

impl Default for Ticker {
    fn default() -> Self {
        Self {
            generation: 0,
            rx: never(),
        }
    }
}

impl Ticker {
    /// Recreate the ticker when the slot was re-armed or disarmed.
    fn sync(&mut self, slot: TimerSlot) {
        if slot.generation() == self.generation {
            return;
        }
        self.generation = slot.generation();
        self.rx = match slot.period() {
            Some(period) => tick(period),
            None => never(),
        };
    }
}

enum Event {
    Command(PlayerCommand),
    Download(DownloadResponse),
    Decode(DecodeEvent),
    DownloadTick,
    TrackTick,
    InitRetryTick,
    Render,
    DownloadClosed,
    DecodeClosed,
    Shutdown,
}

fn player_thread_main(
    config: PlayerConfig,
    links: PlayerLinks,
    audio: AudioFactory,
    cmd_rx: Receiver<PlayerCommand>,
) {
    let render = tick(config.render_interval);
    let mut player = Player::new(config, links.download, links.decode, audio());
    let mut download_rx = links.download_rx;
    let mut decode_rx = links.decode_rx;
    let mut download_ticker = Ticker::default();
    let mut track_ticker = Ticker::default();
    let mut init_ticker = Ticker::default();

    loop {
        let timers = player.timers();
        download_ticker.sync(timers.download);
        track_ticker.sync(timers.track);
        init_ticker.sync(timers.init_retry);

        let event = select! {
            recv(cmd_rx) -> msg => msg.map(Event::Command).unwrap_or(Event::Shutdown),
            recv(download_rx) -> msg => msg.map(Event::Download).unwrap_or(Event::DownloadClosed),
            recv(decode_rx) -> msg => msg.map(Event::Decode).unwrap_or(Event::DecodeClosed),
            recv(download_ticker.rx) -> _ => Event::DownloadTick,
            recv(track_ticker.rx) -> _ => Event::TrackTick,
            recv(init_ticker.rx) -> _ => Event::InitRetryTick,
            recv(render) -> _ => Event::Render,
        };

        match event {
            Event::Command(PlayerCommand::Shutdown) | Event::Shutdown => break,
            Event::Command(cmd) => handle_command(&mut player, cmd),
            Event::Download(resp) => player.on_download(resp),
            Event::Decode(ev) => player.on_decode(ev),
            Event::DownloadTick => player.on_download_tick(),
            Event::TrackTick => player.on_track_tick(),
            Event::InitRetryTick => player.on_init_retry_tick(),
            Event::Render => player.on_render_tick(),
            Event::DownloadClosed => {
                tracing::warn!("download worker exited");
                download_rx = never();
            }
            Event::DecodeClosed => {
                tracing::warn!("decode transport exited");
                decode_rx = never();
            }
        }
    }

    let _ = player.stop();
    tracing::info!("player thread exiting");
}

fn handle_command(player: &mut Player, cmd: PlayerCommand) {
    match cmd {
        PlayerCommand::Play { req, reply } => {
            let _ = reply.send(logged("play", player.play(req)));
        }
        PlayerCommand::Pause { reply } => {
            let _ = reply.send(logged("pause", player.pause()));
        }
        PlayerCommand::Resume { reply } => {
            let _ = reply.send(logged("resume", player.resume()));
        }
        PlayerCommand::Stop { reply } => {
            let _ = reply.send(logged("stop", player.stop()));
        }
        PlayerCommand::SeekTo { ms, reply } => {
            let _ = reply.send(logged("seek", player.seek_to(ms)));
        }
        PlayerCommand::Fullscreen { reply } => {
            let _ = reply.send(logged("fullscreen", player.fullscreen()));
        }
        PlayerCommand::State { reply } => {
            let _ = reply.send(player.state());
        }
        PlayerCommand::Status { reply } => {
            let _ = reply.send(player.status());
        }
        PlayerCommand::SetProgressControl(progress) => player.set_progress_control(progress),
        PlayerCommand::SetLoadingIndicator(loading) => player.set_loading_indicator(loading),
        PlayerCommand::SetVisible(visible) => player.set_visible(visible),
        PlayerCommand::Shutdown => {}
    }
}

fn logged(call: &str, outcome: Result<(), ControlError>) -> Result<(), ControlError> {
    if let Err(e) = &outcome {
        tracing::info!(call, code = e.code(), "control call refused: {e}");
    }
    outcome
}
