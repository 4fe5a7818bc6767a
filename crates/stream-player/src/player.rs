//! Player orchestration engine.
//!
//! [`Player`] owns every piece of session state and is driven from a single
//! thread: control calls, download responses, decode events and timer ticks
//! all arrive as method calls. Nothing here blocks.

use stream_player_proto::{
    DecodeEvent, DownloadResponse, DownloadToken, MediaFrame, MediaKind, Protocol, Status,
    StatusKind, StreamInfo,
};
use stream_player_types::{
    DecoderState, PLAY_ERROR_FILE_INFO, PlayError, PlayerNotice, PlayerState, PlayerStatus,
};

use crate::audio::{AudioParams, AudioSink, SampleEncoding};
use crate::config::PlayerConfig;
use crate::decode::{DecodeLink, DecodeSession, InitRetry};
use crate::download::{ChunkOutcome, DownloadLink, DownloadScheduler, MediaSource};
use crate::error::{ControlError, DecodeCall, SessionError};
use crate::frame_buffer::FrameBuffer;
use crate::seek::{RequestDataAction, SeekCoordinator};
use crate::sinks::{LoadingIndicator, PlaneLayout, PlayCallback, ProgressControl, VideoSink, format_time};
use crate::timer::{PlayerTimers, TimerSlot};

/// Arguments of [`Player::play`].
pub struct PlayRequest {
    pub url: String,
    pub video: Option<Box<dyn VideoSink>>,
    pub callback: Option<PlayCallback>,
    /// Bytes to feed before `open`; 0 uses the configured default.
    pub header_wait_bytes: u64,
    pub live: bool,
    pub has_audio: bool,
}

impl PlayRequest {
    pub fn new(url: impl Into<String>, video: Box<dyn VideoSink>) -> Self {
        Self {
            url: url.into(),
            video: Some(video),
            callback: None,
            header_wait_bytes: 0,
            live: false,
            has_audio: true,
        }
    }

    pub fn with_callback(mut self, callback: PlayCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn live(mut self, live: bool) -> Self {
        self.live = live;
        self
    }

    pub fn has_audio(mut self, has_audio: bool) -> Self {
        self.has_audio = has_audio;
        self
    }

    pub fn header_wait_bytes(mut self, bytes: u64) -> Self {
        self.header_wait_bytes = bytes;
        self
    }
}

pub struct Player {
    config: PlayerConfig,
    state: PlayerState,
    decoder_state: DecoderState,
    scheduler: DownloadScheduler,
    session: DecodeSession,
    frames: FrameBuffer,
    seek: SeekCoordinator,
    audio: Box<dyn AudioSink>,
    video: Option<Box<dyn VideoSink>>,
    callback: Option<PlayCallback>,
    progress: Option<Box<dyn ProgressControl>>,
    loading: Option<Box<dyn LoadingIndicator>>,
    track: TimerSlot,
    init_retry: TimerSlot,
    url: Option<String>,
    live: bool,
    has_audio: bool,
    header_wait_bytes: u64,
    info: Option<StreamInfo>,
    layout: PlaneLayout,
    display_duration: String,
    /// Seconds added to the audio clock to get the presentation position.
    begin_offset: f64,
    first_frame: bool,
    buffering: bool,
    /// A fatal error was reported for this session.
    failed: bool,
    /// A `start` failure was reported for this session.
    start_failed: bool,
    /// Live bytes fed so far.
    stream_received: u64,
    /// Live sessions stop on pause; this is replayed on resume.
    live_resume: Option<PlayRequest>,
}

impl Player {
    pub fn new(
        config: PlayerConfig,
        download: DownloadLink,
        decode: DecodeLink,
        audio: Box<dyn AudioSink>,
    ) -> Self {
        let scheduler = DownloadScheduler::new(download, config.default_chunk_interval);
        let session = DecodeSession::new(decode, config.init_retries);
        let seek = SeekCoordinator::new(config.default_seek_wait_bytes);
        Self {
            config,
            state: PlayerState::Idle,
            decoder_state: DecoderState::Idle,
            scheduler,
            session,
            frames: FrameBuffer::new(),
            seek,
            audio,
            video: None,
            callback: None,
            progress: None,
            loading: None,
            track: TimerSlot::default(),
            init_retry: TimerSlot::default(),
            url: None,
            live: false,
            has_audio: true,
            header_wait_bytes: 0,
            info: None,
            layout: PlaneLayout::default(),
            display_duration: format_time(0.0),
            begin_offset: 0.0,
            first_frame: true,
            buffering: false,
            failed: false,
            start_failed: false,
            stream_received: 0,
            live_resume: None,
        }
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn decoder_state(&self) -> DecoderState {
        self.decoder_state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlayerState::Playing
    }

    pub fn is_buffering(&self) -> bool {
        self.buffering
    }

    pub fn is_seeking(&self) -> bool {
        self.seek.is_seeking()
    }

    pub fn buffered_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn read_offset(&self) -> u64 {
        self.scheduler.read_offset()
    }

    pub fn timers(&self) -> PlayerTimers {
        PlayerTimers {
            download: self.scheduler.timer(),
            track: self.track,
            init_retry: self.init_retry,
        }
    }

    fn ceiling(&self) -> f64 {
        self.config.max_buffer_seconds
    }

    // ---- control surface ----

    pub fn play(&mut self, req: PlayRequest) -> Result<(), ControlError> {
        match self.state {
            PlayerState::Pausing => return self.resume(),
            PlayerState::Playing => return Ok(()),
            PlayerState::Idle => {}
        }
        let url = req.url.trim().to_string();
        let Some(protocol) = Some(url.as_str())
            .filter(|u| !u.is_empty())
            .and_then(Protocol::from_url)
        else {
            return Err(ControlError::InvalidUrl);
        };
        if req.video.is_none() {
            return Err(ControlError::MissingVideoSink);
        }
        if !self.scheduler.link_alive() {
            return Err(ControlError::DownloaderUnavailable);
        }
        if !self.session.link_alive() {
            return Err(ControlError::DecoderUnavailable);
        }

        let header_wait_bytes = if req.header_wait_bytes == 0 {
            self.config.default_header_wait_bytes
        } else {
            req.header_wait_bytes
        };
        tracing::info!(
            url = %url,
            live = req.live,
            has_audio = req.has_audio,
            header_wait_bytes,
            "play"
        );

        self.live_resume = None;
        self.video = req.video;
        self.callback = req.callback;
        self.live = req.live;
        self.has_audio = req.has_audio;
        self.header_wait_bytes = header_wait_bytes;
        self.url = Some(url.clone());
        self.failed = false;
        self.start_failed = false;
        self.first_frame = true;
        self.begin_offset = 0.0;
        self.stream_received = 0;
        self.seek.set_wait_bytes(self.config.default_seek_wait_bytes);
        self.scheduler.open(MediaSource::new(
            url,
            protocol,
            self.config.chunk_size,
            req.live,
        ));

        self.state = PlayerState::Playing;
        self.track.arm(self.config.track_interval);
        self.start_buffering();

        if self.live {
            self.on_file_info(-1, 200);
        } else if !self.scheduler.request_info() {
            self.report_fatal(PlayError::transport("download worker unavailable"));
        }
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), ControlError> {
        if self.live && self.state != PlayerState::Idle {
            tracing::info!("pause (live): stopping session");
            let saved = PlayRequest {
                url: self.url.clone().unwrap_or_default(),
                video: self.video.take(),
                callback: self.callback.take(),
                header_wait_bytes: self.header_wait_bytes,
                live: true,
                has_audio: self.has_audio,
            };
            let _ = self.stop();
            self.live_resume = Some(saved);
            return Ok(());
        }
        if self.state != PlayerState::Playing {
            return Err(ControlError::NotPlaying);
        }
        tracing::info!("pause");
        self.pause_playback();
        Ok(())
    }

    fn pause_playback(&mut self) {
        self.state = PlayerState::Pausing;
        self.audio.pause();
        self.pause_decoding();
        self.track.disarm();
    }

    pub fn resume(&mut self) -> Result<(), ControlError> {
        if self.state == PlayerState::Idle {
            return match self.live_resume.take() {
                Some(req) => {
                    tracing::info!("resume (live): restarting session");
                    self.play(req)
                }
                None => Err(ControlError::NotPausing),
            };
        }
        if self.state != PlayerState::Pausing {
            return Err(ControlError::NotPausing);
        }
        tracing::info!("resume");
        if !self.buffering {
            self.audio.resume();
        }
        self.state = PlayerState::Playing;
        if self.decoder_state == DecoderState::Ready {
            self.start_decoding();
        }
        if !self.seek.is_seeking() {
            self.track.arm(self.config.track_interval);
        }
        Ok(())
    }

    /// Prebuffer after a seek is complete; audio and the track timer wait for
    /// the first presented frame.
    fn resume_from_seek(&mut self) {
        if self.state != PlayerState::Pausing {
            return;
        }
        tracing::info!(
            read_offset = self.scheduler.read_offset(),
            "seek prebuffer reached; resuming"
        );
        self.state = PlayerState::Playing;
        if self.decoder_state == DecoderState::Ready {
            self.start_decoding();
        }
    }

    pub fn stop(&mut self) -> Result<(), ControlError> {
        if self.state == PlayerState::Idle {
            self.live_resume = None;
            return Err(ControlError::NotPlaying);
        }
        tracing::info!("stop");

        self.scheduler.close();
        self.track.disarm();
        self.init_retry.disarm();
        if let Some(loading) = self.loading.as_mut() {
            loading.hide();
        }
        self.video = None;
        self.callback = None;
        self.frames.clear();
        self.seek.reset();
        self.audio.close();
        if let Some(progress) = self.progress.as_mut() {
            progress.set_position(0);
            progress.set_label(&format!("{}/{}", format_time(0.0), format_time(0.0)));
        }

        if let Err(e) = self.session.close() {
            tracing::debug!("close not sent: {e}");
        }
        if let Err(e) = self.session.uninit() {
            tracing::debug!("uninit not sent: {e}");
        }
        self.session.reset();

        self.state = PlayerState::Idle;
        self.decoder_state = DecoderState::Idle;
        self.url = None;
        self.live = false;
        self.has_audio = true;
        self.header_wait_bytes = 0;
        self.info = None;
        self.layout = PlaneLayout::default();
        self.display_duration = format_time(0.0);
        self.begin_offset = 0.0;
        self.first_frame = true;
        self.buffering = false;
        self.failed = false;
        self.start_failed = false;
        self.stream_received = 0;
        Ok(())
    }

    pub fn seek_to(&mut self, ms: u64) -> Result<(), ControlError> {
        if self.state == PlayerState::Idle {
            return Err(ControlError::NotPlaying);
        }
        if self.live {
            return Err(ControlError::SeekUnsupported);
        }
        if self.seek.is_seeking() || self.session.in_flight(DecodeCall::Seek) {
            return Err(ControlError::SeekInProgress);
        }
        if self.decoder_state < DecoderState::Ready {
            return Err(ControlError::NotPlaying);
        }
        tracing::info!(ms, "seek");

        if self.state == PlayerState::Playing {
            self.pause_playback();
        }
        self.scheduler.halt();
        self.frames.clear();
        match self.session.seek(ms, self.config.accurate_seek) {
            Ok(()) => {}
            Err(SessionError::CallInFlight(_)) => return Err(ControlError::SeekInProgress),
            Err(SessionError::Disconnected) => {
                self.report_fatal(PlayError::transport("decode service link closed"));
                return Err(ControlError::DecoderUnavailable);
            }
        }
        self.begin_offset = ms as f64 / 1000.0;
        if self.decoder_state == DecoderState::Finished {
            self.decoder_state = DecoderState::Ready;
        }
        self.seek.begin(ms);
        if let Some(progress) = self.progress.as_mut() {
            progress.set_position(ms);
        }
        self.start_buffering();
        Ok(())
    }

    pub fn fullscreen(&mut self) -> Result<(), ControlError> {
        let video = self.video.as_mut().ok_or(ControlError::MissingVideoSink)?;
        video.fullscreen();
        Ok(())
    }

    pub fn set_progress_control(&mut self, progress: Box<dyn ProgressControl>) {
        self.progress = Some(progress);
    }

    pub fn set_loading_indicator(&mut self, loading: Box<dyn LoadingIndicator>) {
        self.loading = Some(loading);
    }

    /// Page visibility: hidden pauses, visible resumes.
    pub fn set_visible(&mut self, visible: bool) {
        if self.state == PlayerState::Idle && self.live_resume.is_none() {
            return;
        }
        let outcome = if visible { self.resume() } else { self.pause() };
        if let Err(e) = outcome {
            tracing::debug!(visible, "visibility change ignored: {e}");
        }
    }

    pub fn status(&self) -> PlayerStatus {
        let source = self.scheduler.source();
        let position = (self.state != PlayerState::Idle)
            .then(|| ((self.audio.clock() + self.begin_offset).max(0.0) * 1000.0) as u64);
        PlayerStatus {
            state: self.state,
            decoder_state: self.decoder_state,
            url: self.url.clone(),
            live: self.live,
            total_size: source.map(|s| s.total_size),
            read_offset: source.map(|s| s.read_offset),
            duration_ms: self.info.map(|i| i.duration_ms),
            position_ms: position,
            buffered_ms: (self.frames.buffered_duration() * 1000.0) as u64,
            buffered_frames: self.frames.len(),
            buffering: self.buffering,
            seeking: self.seek.is_seeking(),
            video_width: self.info.map(|i| i.width),
            video_height: self.info.map(|i| i.height),
            sample_rate: self.info.map(|i| i.sample_rate),
            channels: self.info.map(|i| i.channels),
        }
    }

    // ---- timer ticks ----

    pub fn on_download_tick(&mut self) {
        if self.state == PlayerState::Idle || self.failed {
            return;
        }
        self.scheduler.download_one_chunk();
    }

    pub fn on_track_tick(&mut self) {
        if self.state != PlayerState::Playing {
            return;
        }
        let position = (self.audio.clock() + self.begin_offset).max(0.0);
        let label = format!("{}/{}", format_time(position), self.display_duration);
        if let Some(progress) = self.progress.as_mut() {
            progress.set_position((position * 1000.0) as u64);
            progress.set_label(&label);
        }
    }

    pub fn on_init_retry_tick(&mut self) {
        if self.state == PlayerState::Idle {
            self.init_retry.disarm();
            return;
        }
        match self.session.retry_init() {
            None | Some(Ok(InitRetry::Sent)) => self.init_retry.disarm(),
            Some(Ok(InitRetry::Waiting)) => {}
            Some(Ok(InitRetry::Exhausted)) => {
                self.init_retry.disarm();
                self.report_fatal(PlayError::transport("decode service unavailable"));
            }
            Some(Err(e)) => {
                self.init_retry.disarm();
                self.report_fatal(PlayError::transport(e.to_string()));
            }
        }
    }

    /// One render-refresh tick of the AV sync loop.
    pub fn on_render_tick(&mut self) {
        if self.state != PlayerState::Playing || self.frames.is_empty() || self.buffering {
            return;
        }
        for _ in 0..self.config.frames_per_tick {
            let Some(frame) = self.frames.pop_front() else {
                break;
            };
            let shown = match frame.kind {
                MediaKind::Audio => self.display_audio(&frame),
                MediaKind::Video => self.display_video(&frame),
            };
            if !shown {
                self.frames.push_front(frame);
                break;
            }
        }

        if self.frames.buffered_duration() < self.ceiling() / 2.0
            && !self.session.is_decoding()
            && self.decoder_state == DecoderState::Ready
        {
            self.start_decoding();
        }
        if self.frames.is_empty() {
            if self.decoder_state == DecoderState::Finished {
                self.complete();
            } else {
                self.start_buffering();
            }
        }
    }

    // ---- download responses ----

    pub fn on_download(&mut self, resp: DownloadResponse) {
        if self.state == PlayerState::Idle {
            return;
        }
        match resp {
            DownloadResponse::InfoResp { size, http_status } => self.on_file_info(size, http_status),
            DownloadResponse::DataResp {
                start,
                end,
                token,
                bytes,
            } => self.on_data(start, end, token, bytes),
            DownloadResponse::Failed { token: None, error } => {
                self.report_fatal(PlayError {
                    error: PLAY_ERROR_FILE_INFO,
                    status: 0,
                    message: error,
                });
            }
            DownloadResponse::Failed {
                token: Some(token),
                error,
            } => {
                if !self.scheduler.accept(token) {
                    tracing::debug!(token = token.0, "stale download failure dropped");
                    return;
                }
                tracing::warn!("chunk download failed; retrying on next tick: {error}");
                if !self.scheduler.timer().is_armed() {
                    self.scheduler.start_paced();
                }
            }
            DownloadResponse::StreamData { token, bytes } => self.on_live_data(token, bytes),
            DownloadResponse::StreamEnded { token, error } => {
                if !self.scheduler.is_current(token) {
                    return;
                }
                match error {
                    Some(e) => tracing::warn!("live stream ended: {e}"),
                    None => tracing::info!("live stream ended"),
                }
            }
        }
    }

    fn on_file_info(&mut self, size: i64, http_status: u16) {
        if !(200..300).contains(&http_status) {
            self.report_fatal(PlayError::file_info(http_status));
            return;
        }
        tracing::info!(size, http_status, "file size");
        self.scheduler.set_total_size(size);
        match self.session.init(size, self.header_wait_bytes) {
            Ok(InitRetry::Sent) => {}
            Ok(InitRetry::Waiting) => self.init_retry.arm(self.config.init_backoff),
            Ok(InitRetry::Exhausted) => {
                self.report_fatal(PlayError::transport("decode service unavailable"));
            }
            Err(e) => self.report_fatal(PlayError::transport(e.to_string())),
        }
    }

    fn on_data(&mut self, start: u64, end: u64, token: DownloadToken, bytes: Vec<u8>) {
        if !self.scheduler.accept(token) {
            tracing::debug!(start, end, token = token.0, "stale download response dropped");
            return;
        }
        if self.failed {
            return;
        }
        let len = bytes.len();
        let remaining = self.scheduler.remaining();
        let prebuffered = self.state == PlayerState::Pausing
            && self.seek.is_seeking()
            && self.seek.on_bytes(len, remaining);

        self.scheduler.advance(len);
        if let Err(e) = self.session.feed(bytes) {
            self.report_fatal(PlayError::transport(e.to_string()));
            return;
        }

        match self.decoder_state {
            DecoderState::Idle => {
                let threshold = u64::try_from(self.scheduler.source().map_or(-1, |s| s.total_size))
                    .map_or(self.header_wait_bytes, |total| total.min(self.header_wait_bytes));
                if self.scheduler.read_offset() >= threshold {
                    self.open_decoder();
                }
                self.scheduler.download_one_chunk();
            }
            DecoderState::Initializing => {
                self.scheduler.download_one_chunk();
            }
            DecoderState::Ready | DecoderState::Finished => {}
        }
        if self.seek.is_urgent() {
            self.scheduler.download_one_chunk();
        }
        if prebuffered {
            self.resume_from_seek();
        }
    }

    fn on_live_data(&mut self, token: DownloadToken, bytes: Vec<u8>) {
        if !self.scheduler.is_current(token) || self.state != PlayerState::Playing || self.failed {
            return;
        }
        let chunk = usize::try_from(self.config.chunk_size).unwrap_or(usize::MAX).max(1);
        for slice in bytes.chunks(chunk) {
            if let Err(e) = self.session.feed(slice.to_vec()) {
                self.report_fatal(PlayError::transport(e.to_string()));
                return;
            }
        }
        self.stream_received += bytes.len() as u64;
        if self.decoder_state == DecoderState::Idle && self.stream_received >= self.header_wait_bytes {
            self.open_decoder();
        }
    }

    fn open_decoder(&mut self) {
        tracing::info!(
            header_bytes = self.scheduler.read_offset().max(self.stream_received),
            "header threshold reached; opening decoder"
        );
        self.decoder_state = DecoderState::Initializing;
        if let Err(e) = self.session.open(true, self.has_audio) {
            self.report_fatal(PlayError::transport(e.to_string()));
        }
    }

    // ---- decode events ----

    pub fn on_decode(&mut self, event: DecodeEvent) {
        self.session.on_event(&event);
        if self.state == PlayerState::Idle {
            return;
        }
        match event {
            DecodeEvent::InitResp { status } => self.on_init(status),
            DecodeEvent::OpenResp { status, info } => self.on_open(status, info),
            DecodeEvent::Frame(frame) => self.on_frame(frame),
            DecodeEvent::StartResp { status } => match status.kind() {
                StatusKind::Ok => {}
                StatusKind::StreamEnded => self.on_decode_finished(),
                StatusKind::Stale => tracing::debug!("stale start response ignored"),
                StatusKind::Failure(code) => self.on_start_failed(code),
            },
            DecodeEvent::PauseResp { status } => {
                if let StatusKind::Failure(code) = status.kind() {
                    tracing::warn!(code, "pause rejected by decode service");
                }
            }
            DecodeEvent::DecodeFinished => self.on_decode_finished(),
            DecodeEvent::RequestData { offset, available } => self.on_request_data(offset, available),
            DecodeEvent::SeekResp {
                status,
                offset_hint,
            } => match status.kind() {
                StatusKind::Ok => tracing::debug!(offset_hint, "seek accepted"),
                StatusKind::Stale => tracing::debug!("stale seek response ignored"),
                StatusKind::StreamEnded | StatusKind::Failure(_) => {
                    self.seek.on_seek_failed();
                    self.report(PlayError::protocol(status.0, "seek"));
                }
            },
            DecodeEvent::CloseResp { status } => {
                tracing::debug!(code = status.0, "decoder closed");
            }
        }
    }

    fn on_init(&mut self, status: Status) {
        if !status.is_ok() {
            self.report_fatal(PlayError::protocol(status.0, "init"));
            return;
        }
        tracing::info!("decoder initialized");
        if self.live {
            if !self.scheduler.request_live_stream() {
                self.report_fatal(PlayError::transport("download worker unavailable"));
            }
        } else if self.scheduler.download_one_chunk() == ChunkOutcome::Unavailable {
            self.report_fatal(PlayError::transport("download worker unavailable"));
        }
    }

    fn on_open(&mut self, status: Status, info: Option<StreamInfo>) {
        let Some(info) = info.filter(|_| status.is_ok()) else {
            self.report_fatal(PlayError::protocol(status.0, "open"));
            return;
        };
        tracing::info!(
            duration_ms = info.duration_ms,
            width = info.width,
            height = info.height,
            pixel_format = info.pixel_format,
            audio_format = info.audio_format,
            channels = info.channels,
            sample_rate = info.sample_rate,
            "decoder opened"
        );
        self.info = Some(info);
        self.layout = PlaneLayout::from_info(&info);
        self.display_duration = format_time(info.duration_ms as f64 / 1000.0);
        if let Some(progress) = self.progress.as_mut() {
            progress.set_range(0, info.duration_ms);
        }

        if !self.live {
            let size = self.scheduler.source().map_or(-1, |s| s.total_size);
            if info.duration_ms > 0 && size > 0 {
                let byte_rate = 1000.0 * size as f64 / info.duration_ms as f64;
                let target = self.config.download_speed_coef * byte_rate;
                self.scheduler.set_target_throughput(target);
                let seek_wait = (byte_rate * self.ceiling() * 2.0) as u64;
                self.seek.set_wait_bytes(seek_wait);
                tracing::info!(
                    byte_rate = byte_rate as u64,
                    target_speed = target as u64,
                    chunk_interval_ms = self.scheduler.chunk_interval().as_millis() as u64,
                    seek_wait_bytes = seek_wait,
                    "download pacing"
                );
            }
            self.scheduler.start_paced();
        }

        let params = AudioParams {
            encoding: SampleEncoding::from_code_or_default(info.audio_format),
            channels: if self.has_audio { info.channels } else { 0 },
            sample_rate: if self.has_audio { info.sample_rate } else { 0 },
        };
        if let Err(e) = self.audio.open(params) {
            tracing::warn!("audio sink open failed: {e:#}");
        }
        if self.buffering {
            self.audio.pause();
        }

        self.decoder_state = DecoderState::Ready;
        self.start_decoding();
    }

    fn on_frame(&mut self, frame: MediaFrame) {
        // Frames decoded before a seek arrive until the service processes it.
        if self.state == PlayerState::Pausing && self.seek.is_seeking() {
            return;
        }
        self.frames.push(frame);
        if self.frames.buffered_duration() >= self.ceiling()
            || self.decoder_state == DecoderState::Finished
        {
            self.pause_decoding();
            if self.buffering {
                self.stop_buffering();
            }
        }
    }

    /// Reported once per session; `start` is re-sent whenever the buffer drains.
    fn on_start_failed(&mut self, code: i32) {
        if self.start_failed {
            tracing::debug!(code, "start rejected again");
            return;
        }
        self.start_failed = true;
        self.report(PlayError::protocol(code, "start"));
    }

    fn on_decode_finished(&mut self) {
        tracing::info!(buffered = self.frames.len(), "decoder finished");
        self.pause_decoding();
        self.decoder_state = DecoderState::Finished;
        if self.buffering {
            self.stop_buffering();
        }
        if self.frames.is_empty() && self.state == PlayerState::Playing {
            self.complete();
        }
    }

    fn on_request_data(&mut self, offset: i64, available: u64) {
        if !self.seek.is_just_seeked() {
            tracing::debug!(offset, available, "data request outside seek ignored");
            return;
        }
        let remaining = self.scheduler.remaining();
        let total = self.scheduler.source().map_or(-1, |s| s.total_size);
        tracing::info!(offset, available, remaining, "decoder requested data after seek");
        match self.seek.on_request_data(offset, available, remaining, total) {
            Some(RequestDataAction::ResumeNow) => self.resume_from_seek(),
            Some(RequestDataAction::Reposition(offset)) => {
                self.scheduler.reposition(offset as i64);
                self.start_paced_download();
            }
            Some(RequestDataAction::Continue) => self.start_paced_download(),
            None => {}
        }
    }

    fn start_paced_download(&mut self) {
        self.scheduler.start_paced();
        if self.seek.is_urgent() {
            self.scheduler.download_one_chunk();
        }
    }

    // ---- presentation ----

    fn display_audio(&mut self, frame: &MediaFrame) -> bool {
        if self.state != PlayerState::Playing {
            return false;
        }
        if self.seek.is_seeking() {
            self.after_seek_first_frame();
        }
        if self.live && self.has_audio && self.first_frame {
            self.begin_offset = frame.timestamp - self.audio.clock();
            self.first_frame = false;
        }
        self.audio.play(&frame.payload);
        true
    }

    fn display_video(&mut self, frame: &MediaFrame) -> bool {
        if self.state != PlayerState::Playing {
            return false;
        }
        if self.seek.is_seeking() {
            self.after_seek_first_frame();
        }
        let clock = self.audio.clock();
        if self.first_frame && (!self.has_audio || self.live) {
            self.begin_offset = if self.has_audio {
                frame.timestamp - clock
            } else {
                frame.timestamp - clock + self.ceiling() / 2.0
            };
            self.first_frame = false;
        }
        if frame.timestamp > clock + self.begin_offset {
            return false;
        }
        match self.video.as_mut() {
            Some(video) => video.display(&frame.payload, self.layout),
            None => true,
        }
    }

    fn after_seek_first_frame(&mut self) {
        if let Err(e) = self.audio.restart() {
            tracing::warn!("audio restart after seek failed: {e:#}");
        }
        self.track.arm(self.config.track_interval);
        if let Some(loading) = self.loading.as_mut() {
            loading.hide();
        }
        self.seek.finish();
        tracing::info!(position = self.begin_offset, "seek complete");
    }

    fn start_buffering(&mut self) {
        if self.buffering {
            return;
        }
        tracing::debug!("buffering");
        self.buffering = true;
        if let Some(loading) = self.loading.as_mut() {
            loading.show();
        }
        self.audio.pause();
    }

    fn stop_buffering(&mut self) {
        tracing::debug!(buffered = self.frames.len(), "buffering done");
        self.buffering = false;
        if let Some(loading) = self.loading.as_mut() {
            loading.hide();
        }
        if self.state == PlayerState::Playing {
            self.audio.resume();
        }
    }

    fn start_decoding(&mut self) {
        if self.session.is_decoding() {
            return;
        }
        let interval = if self.seek.is_urgent() {
            0
        } else {
            self.config.decode_interval_ms
        };
        if let Err(e) = self.session.start(interval) {
            self.report_fatal(PlayError::transport(e.to_string()));
        }
    }

    fn pause_decoding(&mut self) {
        if !self.session.is_decoding() {
            return;
        }
        if let Err(e) = self.session.pause() {
            tracing::debug!("pause not sent: {e}");
        }
    }

    fn complete(&mut self) {
        tracing::info!("playback finished");
        self.notify(PlayerNotice::Finished);
        let _ = self.stop();
    }

    // ---- reporting ----

    fn notify(&mut self, notice: PlayerNotice) {
        if let Some(callback) = self.callback.as_mut() {
            callback(notice);
        }
    }

    /// Surface a failure that leaves the session running.
    fn report(&mut self, err: PlayError) {
        tracing::warn!(error = err.error, status = err.status, "{}", err.message);
        self.notify(PlayerNotice::Error(err));
    }

    /// Surface a failure that ends the session; reported once.
    fn report_fatal(&mut self, err: PlayError) {
        if self.failed {
            return;
        }
        self.failed = true;
        tracing::error!(error = err.error, status = err.status, "{}", err.message);
        self.notify(PlayerNotice::Error(err));
        self.scheduler.halt();
        self.init_retry.disarm();
    }
}
