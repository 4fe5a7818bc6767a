//! Chunked download scheduler.
//!
//! Owns the active [`MediaSource`] and enforces single-outstanding-request
//! discipline. Every new download session (initial start, seek, stop) bumps the
//! token; responses carrying an older token are stale.

use std::time::Duration;

use stream_player_proto::{DownloadRequest, DownloadToken, Protocol, StreamAbort};

use crate::download::DownloadLink;
use crate::timer::TimerSlot;

/// Byte source of one `play()` call.
#[derive(Clone, Debug, PartialEq)]
pub struct MediaSource {
    pub url: String,
    pub protocol: Protocol,
    /// Total size in bytes; `-1` while unknown or for live sources.
    pub total_size: i64,
    pub read_offset: u64,
    pub chunk_size: u64,
    pub live: bool,
}

impl MediaSource {
    pub fn new(url: impl Into<String>, protocol: Protocol, chunk_size: u64, live: bool) -> Self {
        Self {
            url: url.into(),
            protocol,
            total_size: -1,
            read_offset: 0,
            chunk_size: chunk_size.max(1),
            live,
        }
    }

    /// Bytes left after the read cursor (0 when the size is unknown).
    pub fn remaining(&self) -> u64 {
        u64::try_from(self.total_size)
            .map(|total| total.saturating_sub(self.read_offset))
            .unwrap_or(0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkOutcome {
    Requested { start: u64, end: u64 },
    /// A request is already outstanding.
    Busy,
    /// The read cursor reached the end of the file; pacing stopped.
    EndOfFile,
    /// No file source, or the download worker is gone.
    Unavailable,
}

pub struct DownloadScheduler {
    link: DownloadLink,
    source: Option<MediaSource>,
    token: DownloadToken,
    downloading: bool,
    chunk_interval: Duration,
    default_chunk_interval: Duration,
    timer: TimerSlot,
    live_abort: Option<StreamAbort>,
}

impl DownloadScheduler {
    pub fn new(link: DownloadLink, default_chunk_interval: Duration) -> Self {
        Self {
            link,
            source: None,
            token: DownloadToken::default(),
            downloading: false,
            chunk_interval: default_chunk_interval,
            default_chunk_interval,
            timer: TimerSlot::default(),
            live_abort: None,
        }
    }

    pub fn link_alive(&self) -> bool {
        self.link.is_alive()
    }

    /// Begin a new download session for `source`.
    pub fn open(&mut self, source: MediaSource) {
        self.close();
        self.chunk_interval = self.default_chunk_interval;
        self.source = Some(source);
    }

    pub fn source(&self) -> Option<&MediaSource> {
        self.source.as_ref()
    }

    pub fn set_total_size(&mut self, size: i64) {
        if let Some(src) = self.source.as_mut() {
            src.total_size = size;
        }
    }

    pub fn read_offset(&self) -> u64 {
        self.source.as_ref().map(|s| s.read_offset).unwrap_or(0)
    }

    pub fn remaining(&self) -> u64 {
        self.source.as_ref().map(MediaSource::remaining).unwrap_or(0)
    }

    pub fn token(&self) -> DownloadToken {
        self.token
    }

    pub fn is_downloading(&self) -> bool {
        self.downloading
    }

    pub fn chunk_interval(&self) -> Duration {
        self.chunk_interval
    }

    pub fn timer(&self) -> TimerSlot {
        self.timer
    }

    /// Ask the worker for the total size of the current source.
    pub fn request_info(&mut self) -> bool {
        let Some(src) = self.source.as_ref() else {
            return false;
        };
        self.link.send(DownloadRequest::GetInfo {
            url: src.url.clone(),
            protocol: src.protocol,
        })
    }

    /// Pace chunks so that throughput reaches `target_bytes_per_sec`.
    pub fn set_target_throughput(&mut self, target_bytes_per_sec: f64) {
        let chunk = self.source.as_ref().map(|s| s.chunk_size).unwrap_or(1) as f64;
        if target_bytes_per_sec.is_finite() && target_bytes_per_sec > 0.0 {
            let secs = chunk / target_bytes_per_sec;
            self.chunk_interval = Duration::from_secs_f64(secs.clamp(0.001, 60.0));
        }
    }

    /// Start paced downloading under a fresh token.
    ///
    /// A request still in flight from the previous token becomes stale; its
    /// range is requested again because the cursor only advances on accepted data.
    pub fn start_paced(&mut self) {
        self.token = self.token.next();
        self.downloading = false;
        self.timer.arm(self.chunk_interval);
        tracing::debug!(
            token = self.token.0,
            interval_ms = self.chunk_interval.as_millis() as u64,
            "download pacing started"
        );
    }

    /// Stop pacing and invalidate every outstanding response.
    pub fn halt(&mut self) {
        self.timer.disarm();
        self.token = self.token.next();
        self.downloading = false;
    }

    /// Request the next chunk `[offset, min(offset + chunk - 1, size - 1)]`.
    pub fn download_one_chunk(&mut self) -> ChunkOutcome {
        if self.downloading {
            return ChunkOutcome::Busy;
        }
        let Some(src) = self.source.as_ref() else {
            return ChunkOutcome::Unavailable;
        };
        if src.live {
            return ChunkOutcome::Unavailable;
        }
        let Ok(total) = u64::try_from(src.total_size) else {
            return ChunkOutcome::Unavailable;
        };

        let start = src.read_offset;
        if start >= total {
            tracing::info!(offset = start, size = total, "reached end of file");
            self.timer.disarm();
            return ChunkOutcome::EndOfFile;
        }
        let end = (start + src.chunk_size - 1).min(total - 1);

        let sent = self.link.send(DownloadRequest::Download {
            url: src.url.clone(),
            protocol: src.protocol,
            start,
            end,
            token: self.token,
        });
        if !sent {
            tracing::warn!("download worker unavailable");
            return ChunkOutcome::Unavailable;
        }
        self.downloading = true;
        ChunkOutcome::Requested { start, end }
    }

    /// Match a response token against the current session.
    ///
    /// Returns `false` for stale responses. An accepted response frees the
    /// single outstanding slot.
    pub fn accept(&mut self, token: DownloadToken) -> bool {
        if token != self.token {
            return false;
        }
        self.downloading = false;
        true
    }

    pub fn is_current(&self, token: DownloadToken) -> bool {
        token == self.token
    }

    pub fn advance(&mut self, len: usize) {
        if let Some(src) = self.source.as_mut() {
            src.read_offset = src.read_offset.saturating_add(len as u64);
        }
    }

    /// Move the read cursor, clamped to the file bounds.
    pub fn reposition(&mut self, offset: i64) {
        if let Some(src) = self.source.as_mut() {
            let max = u64::try_from(src.total_size).unwrap_or(0);
            src.read_offset = u64::try_from(offset).unwrap_or(0).min(max);
        }
    }

    /// Open a continuous pull for a live source.
    pub fn request_live_stream(&mut self) -> bool {
        let Some(src) = self.source.as_ref() else {
            return false;
        };
        if let Some(prev) = self.live_abort.take() {
            prev.abort();
        }
        let abort = StreamAbort::new();
        let sent = self.link.send(DownloadRequest::OpenStream {
            url: src.url.clone(),
            chunk_size: src.chunk_size as usize,
            token: self.token,
            abort: abort.clone(),
        });
        if sent {
            self.live_abort = Some(abort);
        }
        sent
    }

    /// Tear the session down: pacing, live pull and source.
    pub fn close(&mut self) {
        self.halt();
        if let Some(abort) = self.live_abort.take() {
            abort.abort();
        }
        self.source = None;
    }
}
