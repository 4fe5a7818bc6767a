//! End-to-end engine scenarios driven through `Player`'s event methods.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use crossbeam_channel::Receiver;
use stream_player::audio::{AudioParams, AudioSink};
use stream_player::decode::DecodeLink;
use stream_player::download::DownloadLink;
use stream_player::{
    ControlError, LoadingIndicator, PlaneLayout, PlayRequest, Player, PlayerConfig, VideoSink,
};
use stream_player_proto::{
    DecodeEvent, DecodeRequest, DownloadRequest, DownloadResponse, DownloadToken, MediaFrame,
    Status, StreamInfo,
};
use stream_player_types::{DecoderState, PlayerNotice, PlayerState};

const CHUNK: u64 = 65_536;

#[derive(Default)]
struct AudioLog {
    clock: f64,
    restarts: usize,
    played: usize,
    paused: bool,
}

struct ManualAudio(Arc<Mutex<AudioLog>>);

impl AudioSink for ManualAudio {
    fn open(&mut self, _params: AudioParams) -> anyhow::Result<()> {
        Ok(())
    }

    fn play(&mut self, _pcm: &[u8]) {
        self.0.lock().unwrap().played += 1;
    }

    fn pause(&mut self) {
        self.0.lock().unwrap().paused = true;
    }

    fn resume(&mut self) {
        self.0.lock().unwrap().paused = false;
    }

    fn restart(&mut self) -> anyhow::Result<()> {
        let mut log = self.0.lock().unwrap();
        log.restarts += 1;
        log.clock = 0.0;
        log.paused = false;
        Ok(())
    }

    fn close(&mut self) {}

    fn clock(&self) -> f64 {
        self.0.lock().unwrap().clock
    }
}

struct RecordingVideo(Arc<Mutex<Vec<u8>>>);

impl VideoSink for RecordingVideo {
    fn display(&mut self, frame: &[u8], _layout: PlaneLayout) -> bool {
        self.0.lock().unwrap().push(frame[0]);
        true
    }
}

struct RecordingIndicator(Arc<Mutex<Vec<&'static str>>>);

impl LoadingIndicator for RecordingIndicator {
    fn show(&mut self) {
        self.0.lock().unwrap().push("show");
    }

    fn hide(&mut self) {
        self.0.lock().unwrap().push("hide");
    }
}

struct Harness {
    player: Player,
    downloads: Receiver<DownloadRequest>,
    decodes: Receiver<DecodeRequest>,
    decode_link: DecodeLink,
    audio: Arc<Mutex<AudioLog>>,
    shown: Arc<Mutex<Vec<u8>>>,
    notices: Arc<Mutex<Vec<PlayerNotice>>>,
}

impl Harness {
    fn new() -> Self {
        let (download_link, downloads) = DownloadLink::channel();
        let (decode_link, decodes) = DecodeLink::channel();
        let audio = Arc::new(Mutex::new(AudioLog::default()));
        let player = Player::new(
            PlayerConfig::default(),
            download_link,
            decode_link.clone(),
            Box::new(ManualAudio(audio.clone())),
        );
        Self {
            player,
            downloads,
            decodes,
            decode_link,
            audio,
            shown: Arc::new(Mutex::new(Vec::new())),
            notices: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn request(&self, url: &str) -> PlayRequest {
        let notices = self.notices.clone();
        PlayRequest::new(url, Box::new(RecordingVideo(self.shown.clone())))
            .with_callback(Box::new(move |n| notices.lock().unwrap().push(n)))
    }

    fn set_clock(&self, seconds: f64) {
        self.audio.lock().unwrap().clock = seconds;
    }

    fn notices(&self) -> Vec<PlayerNotice> {
        self.notices.lock().unwrap().clone()
    }

    fn shown(&self) -> Vec<u8> {
        self.shown.lock().unwrap().clone()
    }

    /// Decode requests sent so far, feeds excluded.
    fn control_requests(&self) -> Vec<DecodeRequest> {
        self.decodes
            .try_iter()
            .filter(|r| !matches!(r, DecodeRequest::Feed(_)))
            .collect()
    }

    fn next_chunk(&self) -> (u64, u64, DownloadToken) {
        match self.downloads.try_recv() {
            Ok(DownloadRequest::Download {
                start, end, token, ..
            }) => (start, end, token),
            other => panic!("expected chunk request, got {other:?}"),
        }
    }

    fn serve(&mut self, (start, end, token): (u64, u64, DownloadToken)) {
        self.player.on_download(DownloadResponse::DataResp {
            start,
            end,
            token,
            bytes: vec![0u8; (end - start + 1) as usize],
        });
    }

    /// play → file size → init; leaves the first chunk request queued.
    fn start_file(&mut self, size: i64, header_wait_bytes: u64) {
        let req = self.request("http://media/clip.mp4").header_wait_bytes(header_wait_bytes);
        self.start_request(req, size);
    }

    fn start_request(&mut self, req: PlayRequest, size: i64) {
        self.player.play(req).unwrap();
        assert!(matches!(
            self.downloads.try_recv(),
            Ok(DownloadRequest::GetInfo { .. })
        ));
        self.player.on_download(DownloadResponse::InfoResp {
            size,
            http_status: 200,
        });
        self.player.on_decode(DecodeEvent::InitResp { status: Status::OK });
    }

    /// Serve header chunks until `open` goes out, then answer it.
    fn open_file(&mut self, size: i64, header_wait_bytes: u64, duration_ms: u64) {
        self.start_file(size, header_wait_bytes);
        self.finish_open(duration_ms);
    }

    fn finish_open(&mut self, duration_ms: u64) {
        while self.player.decoder_state() == DecoderState::Idle {
            let chunk = self.next_chunk();
            self.serve(chunk);
        }
        self.player.on_decode(DecodeEvent::OpenResp {
            status: Status::OK,
            info: Some(stream_info(duration_ms)),
        });
        assert_eq!(self.player.decoder_state(), DecoderState::Ready);
    }

    fn drain_downloads(&self) {
        while self.downloads.try_recv().is_ok() {}
    }

    fn push_video(&mut self, tenths: std::ops::RangeInclusive<u8>) {
        for i in tenths {
            self.player
                .on_decode(DecodeEvent::Frame(MediaFrame::video(f64::from(i) / 10.0, vec![i])));
        }
    }
}

fn stream_info(duration_ms: u64) -> StreamInfo {
    StreamInfo {
        duration_ms,
        pixel_format: 0,
        width: 4,
        height: 2,
        audio_format: 1,
        channels: 2,
        sample_rate: 48_000,
    }
}

#[test]
fn file_playback_runs_to_finished() {
    let mut h = Harness::new();
    h.start_file(10_000_000, 0);
    assert_eq!(
        h.control_requests(),
        vec![DecodeRequest::Init {
            total_size: 10_000_000,
            header_wait_bytes: 524_288
        }]
    );

    for n in 1..=8 {
        let chunk = h.next_chunk();
        assert_eq!(chunk.0, (n - 1) * CHUNK);
        h.serve(chunk);
        let opened = h
            .control_requests()
            .iter()
            .any(|r| matches!(r, DecodeRequest::Open { .. }));
        assert_eq!(opened, n == 8, "open after chunk {n}");
    }
    assert_eq!(h.player.decoder_state(), DecoderState::Initializing);

    h.player.on_decode(DecodeEvent::OpenResp {
        status: Status::OK,
        info: Some(stream_info(60_000)),
    });
    assert_eq!(
        h.control_requests(),
        vec![DecodeRequest::Start { interval_ms: 5 }]
    );
    assert!(h.player.timers().download.is_armed());
    assert!(h.player.is_buffering());

    h.player
        .on_decode(DecodeEvent::Frame(MediaFrame::audio(0.0, vec![0; 8])));
    h.push_video(0..=10);
    assert!(!h.player.is_buffering());
    assert_eq!(h.control_requests(), vec![DecodeRequest::Pause]);

    h.player.on_decode(DecodeEvent::DecodeFinished);
    assert_eq!(h.player.decoder_state(), DecoderState::Finished);
    assert_eq!(h.player.state(), PlayerState::Playing);

    h.set_clock(5.0);
    for _ in 0..10 {
        h.player.on_render_tick();
    }
    assert_eq!(h.shown(), (0..=10).collect::<Vec<u8>>());
    assert_eq!(h.audio.lock().unwrap().played, 1);
    assert_eq!(h.notices(), vec![PlayerNotice::Finished]);
    assert_eq!(h.player.state(), PlayerState::Idle);
    let tail = h.control_requests();
    assert!(tail.contains(&DecodeRequest::Close));
    assert!(tail.contains(&DecodeRequest::Uninit));
}

#[test]
fn seek_repositions_then_prebuffers_before_resume() {
    let mut h = Harness::new();
    h.open_file(40_000_000, 0, 60_000);
    h.push_video(0..=5);
    h.control_requests();

    // Paced download in flight when the seek lands.
    while h.downloads.try_recv().is_ok() {}
    h.player.on_download_tick();
    let pre_seek = h.next_chunk();
    let offset_before = h.player.read_offset();

    h.player.seek_to(30_000).unwrap();
    assert_eq!(h.player.state(), PlayerState::Pausing);
    assert_eq!(h.player.buffered_frames(), 0);
    assert_eq!(
        h.control_requests(),
        vec![
            DecodeRequest::Pause,
            DecodeRequest::Seek {
                ms: 30_000,
                accurate: true
            }
        ]
    );
    assert_eq!(h.player.seek_to(1_000), Err(ControlError::SeekInProgress));

    h.serve(pre_seek);
    assert_eq!(h.player.read_offset(), offset_before);

    h.player.on_decode(DecodeEvent::SeekResp {
        status: Status::OK,
        offset_hint: 15_000_000,
    });
    h.player.on_decode(DecodeEvent::RequestData {
        offset: 15_000_000,
        available: 0,
    });
    assert_eq!(h.player.read_offset(), 15_000_000);

    let mut served = 0;
    while h.player.state() == PlayerState::Pausing {
        let chunk = h.next_chunk();
        assert_eq!(chunk.0, 15_000_000 + served * CHUNK);
        h.serve(chunk);
        served += 1;
        assert!(served <= 30, "seek never resumed");
    }
    // ceil(1_333_333 / 65_536)
    assert_eq!(served, 21);
    assert!(h.player.is_seeking());

    h.player.on_decode(DecodeEvent::Frame(MediaFrame::video(30.0, vec![200])));
    h.player.on_decode(DecodeEvent::Frame(MediaFrame::video(31.0, vec![201])));
    assert!(!h.player.is_buffering());
    h.player.on_render_tick();
    assert_eq!(h.shown(), vec![200]);
    assert!(!h.player.is_seeking());
    assert_eq!(h.audio.lock().unwrap().restarts, 1);
    assert!(h.player.timers().track.is_armed());
    assert!(h.notices().is_empty());
}

#[test]
fn open_failure_is_reported_once_and_stops_downloads() {
    let mut h = Harness::new();
    h.start_file(10_000_000, 0);
    while h.player.decoder_state() == DecoderState::Idle {
        let chunk = h.next_chunk();
        h.serve(chunk);
    }
    let outstanding = h.next_chunk();

    h.player.on_decode(DecodeEvent::OpenResp {
        status: Status(5),
        info: None,
    });
    h.serve(outstanding);
    for _ in 0..3 {
        h.player.on_download_tick();
    }
    h.player.on_decode(DecodeEvent::InitResp { status: Status(3) });

    assert!(h.downloads.try_recv().is_err());
    let notices = h.notices();
    assert_eq!(notices.len(), 1);
    let PlayerNotice::Error(err) = &notices[0] else {
        panic!("expected error notice");
    };
    assert_eq!(err.error, 5);
    assert!(!h.player.timers().download.is_armed());
}

#[test]
fn video_waits_for_audio_clock() {
    let mut h = Harness::new();
    h.open_file(10_000_000, CHUNK, 60_000);
    h.push_video(1..=12);
    assert!(!h.player.is_buffering());

    h.set_clock(0.15);
    h.player.on_render_tick();
    h.player.on_render_tick();
    assert_eq!(h.shown(), vec![1]);

    h.set_clock(0.25);
    h.player.on_render_tick();
    assert_eq!(h.shown(), vec![1, 2]);

    h.set_clock(0.31);
    h.player.on_render_tick();
    assert_eq!(h.shown(), vec![1, 2, 3]);
    assert_eq!(h.player.buffered_frames(), 9);
}

#[test]
fn stop_twice_closes_once() {
    let mut h = Harness::new();
    h.open_file(1_000_000, CHUNK, 10_000);
    h.control_requests();

    assert_eq!(h.player.stop(), Ok(()));
    assert_eq!(h.player.stop(), Err(ControlError::NotPlaying));
    let reqs = h.control_requests();
    assert_eq!(reqs.iter().filter(|r| **r == DecodeRequest::Close).count(), 1);
    assert_eq!(reqs.iter().filter(|r| **r == DecodeRequest::Uninit).count(), 1);
    assert!(!h.player.timers().track.is_armed());
    assert!(!h.player.timers().download.is_armed());

    // Late replies after stop are ignored.
    h.player.on_decode(DecodeEvent::DecodeFinished);
    assert!(h.notices().is_empty());
}

#[test]
fn small_file_opens_at_end_of_file() {
    let mut h = Harness::new();
    h.start_file(100_000, 0);
    let first = h.next_chunk();
    assert_eq!((first.0, first.1), (0, 65_535));
    h.serve(first);
    let second = h.next_chunk();
    assert_eq!((second.0, second.1), (65_536, 99_999));
    h.serve(second);

    assert_eq!(h.player.decoder_state(), DecoderState::Initializing);
    assert!(h.downloads.try_recv().is_err());
    assert_eq!(h.player.read_offset(), 100_000);
}

#[test]
fn live_source_opens_after_header_bytes() {
    let mut h = Harness::new();
    let req = h
        .request("http://live/stream")
        .live(true)
        .header_wait_bytes(100_000);
    h.player.play(req).unwrap();
    assert!(h.downloads.try_recv().is_err());
    assert_eq!(
        h.control_requests(),
        vec![DecodeRequest::Init {
            total_size: -1,
            header_wait_bytes: 100_000
        }]
    );

    h.player.on_decode(DecodeEvent::InitResp { status: Status::OK });
    let Ok(DownloadRequest::OpenStream { token, .. }) = h.downloads.try_recv() else {
        panic!("expected live pull");
    };

    h.player.on_download(DownloadResponse::StreamData {
        token: DownloadToken(token.0 + 7),
        bytes: vec![0; 200_000],
    });
    h.player.on_download(DownloadResponse::StreamData {
        token,
        bytes: vec![0; 60_000],
    });
    assert_eq!(h.player.decoder_state(), DecoderState::Idle);
    h.player.on_download(DownloadResponse::StreamData {
        token,
        bytes: vec![0; 60_000],
    });
    assert_eq!(h.player.decoder_state(), DecoderState::Initializing);
    assert_eq!(
        h.control_requests(),
        vec![DecodeRequest::Open {
            has_video: true,
            has_audio: true
        }]
    );

    assert_eq!(h.player.seek_to(1_000), Err(ControlError::SeekUnsupported));

    // Pausing a live source tears the session down; resume starts a fresh one.
    h.player.pause().unwrap();
    assert_eq!(h.player.state(), PlayerState::Idle);
    h.player.resume().unwrap();
    assert_eq!(h.player.state(), PlayerState::Playing);
    let reqs = h.control_requests();
    assert!(reqs.contains(&DecodeRequest::Close));
    assert_eq!(
        reqs.last(),
        Some(&DecodeRequest::Init {
            total_size: -1,
            header_wait_bytes: 100_000
        })
    );
}

#[test]
fn init_gives_up_when_service_stays_unreachable() {
    let mut h = Harness::new();
    h.decode_link.ready_flag().store(false, Ordering::Relaxed);
    let req = h.request("http://media/clip.mp4");
    h.player.play(req).unwrap();
    h.player.on_download(DownloadResponse::InfoResp {
        size: 1_000_000,
        http_status: 200,
    });
    assert!(h.player.timers().init_retry.is_armed());

    for _ in 0..3 {
        h.player.on_init_retry_tick();
        assert!(h.notices().is_empty());
    }
    h.player.on_init_retry_tick();

    let notices = h.notices();
    assert_eq!(notices.len(), 1);
    let PlayerNotice::Error(err) = &notices[0] else {
        panic!("expected error notice");
    };
    assert_eq!(err.error, stream_player_types::PLAY_ERROR_TRANSPORT);
    assert!(!h.player.timers().init_retry.is_armed());
    assert!(h.control_requests().is_empty());
}

#[test]
fn start_status_codes() {
    let mut h = Harness::new();
    h.open_file(1_000_000, CHUNK, 10_000);

    h.player.on_decode(DecodeEvent::StartResp { status: Status(9) });
    assert!(h.notices().is_empty());

    h.player.on_decode(DecodeEvent::StartResp { status: Status(4) });
    assert_eq!(h.notices().len(), 1);
    assert_eq!(h.player.state(), PlayerState::Playing);

    // Repeated start failures in one session reach the callback once.
    h.player.on_decode(DecodeEvent::StartResp { status: Status(4) });
    assert_eq!(h.notices().len(), 1);

    h.player.on_decode(DecodeEvent::StartResp { status: Status(7) });
    assert_eq!(h.notices().last(), Some(&PlayerNotice::Finished));
    assert_eq!(h.player.state(), PlayerState::Idle);
}

#[test]
fn control_preconditions() {
    let mut h = Harness::new();
    let bad_scheme = h.request("ftp://media/clip.mp4");
    assert_eq!(h.player.play(bad_scheme), Err(ControlError::InvalidUrl));
    let empty = h.request("");
    assert_eq!(h.player.play(empty), Err(ControlError::InvalidUrl));
    let mut missing = h.request("http://media/clip.mp4");
    missing.video = None;
    assert_eq!(h.player.play(missing), Err(ControlError::MissingVideoSink));
    assert_eq!(h.player.pause(), Err(ControlError::NotPlaying));
    assert_eq!(h.player.resume(), Err(ControlError::NotPausing));
    assert_eq!(h.player.seek_to(10), Err(ControlError::NotPlaying));

    h.open_file(1_000_000, CHUNK, 10_000);
    h.player.pause().unwrap();
    assert!(h.audio.lock().unwrap().paused);
    assert_eq!(h.player.pause(), Err(ControlError::NotPlaying));
    let other = h.request("http://media/other.mp4");
    h.player.play(other).unwrap();
    assert_eq!(h.player.state(), PlayerState::Playing);
}

/// Open a 40 MB, 60 s file and seek to 30 s with decoding still running.
fn seek_mid_file(h: &mut Harness) {
    h.open_file(40_000_000, 0, 60_000);
    h.push_video(0..=5);
    h.drain_downloads();
    h.player.seek_to(30_000).unwrap();
    h.control_requests();
}

#[test]
fn rejected_seek_clears_seek_and_stays_paused() {
    let mut h = Harness::new();
    seek_mid_file(&mut h);
    let offset = h.player.read_offset();

    h.player.on_decode(DecodeEvent::SeekResp {
        status: Status(3),
        offset_hint: 0,
    });
    assert!(!h.player.is_seeking());
    assert_eq!(h.player.state(), PlayerState::Pausing);
    let notices = h.notices();
    assert_eq!(notices.len(), 1);
    let PlayerNotice::Error(err) = &notices[0] else {
        panic!("expected error notice");
    };
    assert_eq!(err.error, 3);

    // No retry, and a late data request no longer repositions.
    h.player.on_decode(DecodeEvent::RequestData {
        offset: 15_000_000,
        available: 0,
    });
    assert!(h.control_requests().is_empty());
    assert!(h.downloads.try_recv().is_err());
    assert!(!h.player.timers().download.is_armed());
    assert_eq!(h.player.read_offset(), offset);
}

#[test]
fn buffer_hit_with_all_bytes_resumes_without_downloading() {
    let mut h = Harness::new();
    seek_mid_file(&mut h);

    h.player.on_decode(DecodeEvent::RequestData {
        offset: -1,
        available: 40_000_000,
    });
    assert_eq!(h.player.state(), PlayerState::Playing);
    assert_eq!(
        h.control_requests(),
        vec![DecodeRequest::Start { interval_ms: 0 }]
    );
    assert!(h.downloads.try_recv().is_err());
    assert!(h.player.is_seeking());
}

#[test]
fn buffer_hit_short_of_the_end_restarts_downloads() {
    let mut h = Harness::new();
    seek_mid_file(&mut h);
    let offset = h.player.read_offset();

    h.player.on_decode(DecodeEvent::RequestData {
        offset: -1,
        available: 0,
    });
    assert_eq!(h.player.state(), PlayerState::Pausing);
    assert!(h.player.timers().download.is_armed());
    let (start, _, _) = h.next_chunk();
    assert_eq!(start, offset);
}

#[test]
fn video_only_stream_paces_from_first_frame() {
    let mut h = Harness::new();
    let req = h
        .request("http://media/silent.mp4")
        .header_wait_bytes(CHUNK)
        .has_audio(false);
    h.start_request(req, 10_000_000);
    h.finish_open(60_000);
    assert!(h.control_requests().contains(&DecodeRequest::Open {
        has_video: true,
        has_audio: false
    }));

    // 10.0 .. 11.0 s; the first frame sets the offset to 10.0 + 0.5.
    h.push_video(100..=110);
    assert!(!h.player.is_buffering());
    for _ in 0..4 {
        h.player.on_render_tick();
    }
    assert_eq!(h.shown(), (100..=105).collect::<Vec<u8>>());

    h.set_clock(0.25);
    h.player.on_render_tick();
    h.player.on_render_tick();
    assert_eq!(h.shown(), (100..=107).collect::<Vec<u8>>());
}

#[test]
fn drained_buffer_rebuffers_and_restarts_decoding() {
    let mut h = Harness::new();
    let indicator = Arc::new(Mutex::new(Vec::new()));
    h.open_file(10_000_000, CHUNK, 60_000);
    h.player
        .set_loading_indicator(Box::new(RecordingIndicator(indicator.clone())));
    h.push_video(0..=10);
    assert!(!h.player.is_buffering());
    assert!(!h.audio.lock().unwrap().paused);
    h.control_requests();

    h.set_clock(5.0);
    for _ in 0..3 {
        h.player.on_render_tick();
    }
    // 0.6 .. 1.0 left: under half the ceiling.
    assert_eq!(
        h.control_requests(),
        vec![DecodeRequest::Start { interval_ms: 5 }]
    );

    for _ in 0..3 {
        h.player.on_render_tick();
    }
    assert_eq!(h.player.buffered_frames(), 0);
    assert!(h.player.is_buffering());
    assert!(h.audio.lock().unwrap().paused);
    assert_eq!(indicator.lock().unwrap().last(), Some(&"show"));
    assert!(h.control_requests().is_empty());
    assert_eq!(h.player.state(), PlayerState::Playing);
}

#[test]
fn chunk_failures_retry_only_for_the_current_session() {
    let mut h = Harness::new();
    h.open_file(10_000_000, CHUNK, 60_000);
    assert!(h.player.timers().download.is_armed());

    // Requested before pacing started; its token is stale now.
    let (_, _, stale) = h.next_chunk();
    h.player.on_download(DownloadResponse::Failed {
        token: Some(stale),
        error: "connection reset".into(),
    });
    assert!(h.downloads.try_recv().is_err());

    h.player.on_download_tick();
    let (start, _, current) = h.next_chunk();
    assert_eq!(start, CHUNK);
    h.player.on_download(DownloadResponse::Failed {
        token: Some(current),
        error: "connection reset".into(),
    });
    assert!(h.downloads.try_recv().is_err());
    assert!(h.player.timers().download.is_armed());

    h.player.on_download_tick();
    let (retry, _, _) = h.next_chunk();
    assert_eq!(retry, CHUNK);
    assert_eq!(h.player.read_offset(), CHUNK);
    assert!(h.notices().is_empty());
}
