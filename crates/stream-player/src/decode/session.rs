//! Client side of one decode session.
//!
//! `init`, `open`, `seek` and `close` allow a single request in flight each; the
//! guard is released by the matching response in [`DecodeSession::on_event`].

use std::collections::HashSet;

use stream_player_proto::{DecodeEvent, DecodeRequest};

use crate::decode::DecodeLink;
use crate::error::{DecodeCall, SessionError};

/// Outcome of an `init` attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InitRetry {
    Sent,
    /// Service not reachable yet; try again after the backoff.
    Waiting,
    /// Attempts used up without reaching the service.
    Exhausted,
}

pub struct DecodeSession {
    link: DecodeLink,
    in_flight: HashSet<DecodeCall>,
    decoding: bool,
    init_attempts: u32,
    max_init_attempts: u32,
    pending_init: Option<DecodeRequest>,
}

impl DecodeSession {
    pub fn new(link: DecodeLink, max_init_attempts: u32) -> Self {
        Self {
            link,
            in_flight: HashSet::new(),
            decoding: false,
            init_attempts: 0,
            max_init_attempts: max_init_attempts.max(1),
            pending_init: None,
        }
    }

    pub fn link_alive(&self) -> bool {
        self.link.is_alive()
    }

    pub fn is_decoding(&self) -> bool {
        self.decoding
    }

    pub fn in_flight(&self, call: DecodeCall) -> bool {
        self.in_flight.contains(&call)
    }

    fn guarded(&mut self, call: DecodeCall, req: DecodeRequest) -> Result<(), SessionError> {
        if self.in_flight.contains(&call) {
            return Err(SessionError::CallInFlight(call));
        }
        self.link.send(req)?;
        self.in_flight.insert(call);
        Ok(())
    }

    /// First `init` attempt. Counts as attempt one even when the service is
    /// not reachable yet.
    pub fn init(&mut self, total_size: i64, header_wait_bytes: u64) -> Result<InitRetry, SessionError> {
        if self.in_flight.contains(&DecodeCall::Init) {
            return Err(SessionError::CallInFlight(DecodeCall::Init));
        }
        self.pending_init = Some(DecodeRequest::Init {
            total_size,
            header_wait_bytes,
        });
        self.init_attempts = 0;
        self.attempt_init()
    }

    /// Next attempt after a backoff; `None` when no `init` is pending.
    pub fn retry_init(&mut self) -> Option<Result<InitRetry, SessionError>> {
        self.pending_init.as_ref()?;
        Some(self.attempt_init())
    }

    fn attempt_init(&mut self) -> Result<InitRetry, SessionError> {
        self.init_attempts += 1;
        if self.link.is_ready() {
            let Some(req) = self.pending_init.take() else {
                return Ok(InitRetry::Sent);
            };
            self.guarded(DecodeCall::Init, req)?;
            return Ok(InitRetry::Sent);
        }
        if self.init_attempts >= self.max_init_attempts {
            tracing::warn!(attempts = self.init_attempts, "decode service unreachable");
            self.pending_init = None;
            return Ok(InitRetry::Exhausted);
        }
        tracing::debug!(attempt = self.init_attempts, "decode service not ready");
        Ok(InitRetry::Waiting)
    }

    pub fn uninit(&mut self) -> Result<(), SessionError> {
        self.link.send(DecodeRequest::Uninit)
    }

    pub fn open(&mut self, has_video: bool, has_audio: bool) -> Result<(), SessionError> {
        self.guarded(
            DecodeCall::Open,
            DecodeRequest::Open {
                has_video,
                has_audio,
            },
        )
    }

    pub fn close(&mut self) -> Result<(), SessionError> {
        self.guarded(DecodeCall::Close, DecodeRequest::Close)
    }

    pub fn feed(&mut self, bytes: Vec<u8>) -> Result<(), SessionError> {
        self.link.send(DecodeRequest::Feed(bytes))
    }

    pub fn start(&mut self, interval_ms: u32) -> Result<(), SessionError> {
        self.link.send(DecodeRequest::Start { interval_ms })?;
        self.decoding = true;
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), SessionError> {
        self.decoding = false;
        self.link.send(DecodeRequest::Pause)
    }

    pub fn seek(&mut self, ms: u64, accurate: bool) -> Result<(), SessionError> {
        self.guarded(DecodeCall::Seek, DecodeRequest::Seek { ms, accurate })
    }

    /// Release the guard answered by `event`.
    pub fn on_event(&mut self, event: &DecodeEvent) {
        let call = match event {
            DecodeEvent::InitResp { .. } => DecodeCall::Init,
            DecodeEvent::OpenResp { .. } => DecodeCall::Open,
            DecodeEvent::SeekResp { .. } => DecodeCall::Seek,
            DecodeEvent::CloseResp { .. } => DecodeCall::Close,
            _ => return,
        };
        self.in_flight.remove(&call);
    }

    /// Forget everything about the current session.
    pub fn reset(&mut self) {
        self.in_flight.clear();
        self.decoding = false;
        self.init_attempts = 0;
        self.pending_init = None;
    }
}
