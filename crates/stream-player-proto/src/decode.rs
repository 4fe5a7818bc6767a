//! Decode-service request/event unions.

use crate::frame::MediaFrame;

/// Requests sent from the player to the decode service.
#[derive(Clone, Debug, PartialEq)]
pub enum DecodeRequest {
    /// Prepare a decoder for a source of `total_size` bytes (`-1` when live).
    Init {
        total_size: i64,
        header_wait_bytes: u64,
    },
    Uninit,
    Open {
        has_video: bool,
        has_audio: bool,
    },
    Close,
    /// Raw source bytes; fire-and-forget.
    Feed(Vec<u8>),
    Start {
        interval_ms: u32,
    },
    Pause,
    Seek {
        ms: u64,
        accurate: bool,
    },
}

impl DecodeRequest {
    /// Short label for logs.
    pub fn name(&self) -> &'static str {
        match self {
            DecodeRequest::Init { .. } => "init",
            DecodeRequest::Uninit => "uninit",
            DecodeRequest::Open { .. } => "open",
            DecodeRequest::Close => "close",
            DecodeRequest::Feed(_) => "feed",
            DecodeRequest::Start { .. } => "start",
            DecodeRequest::Pause => "pause",
            DecodeRequest::Seek { .. } => "seek",
        }
    }
}

/// Opaque status code carried by every decode-service response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Status(pub i32);

/// Classification of a [`Status`].
///
/// Only 7 and 9 carry meaning beyond success/failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusKind {
    Ok,
    /// The stream ended while decoding was active.
    StreamEnded,
    /// Stale or duplicate request; safe to ignore.
    Stale,
    Failure(i32),
}

impl Status {
    pub const OK: Status = Status(0);
    pub const STREAM_ENDED: Status = Status(7);
    pub const STALE: Status = Status(9);

    pub fn is_ok(self) -> bool {
        self.0 == 0
    }

    pub fn kind(self) -> StatusKind {
        match self.0 {
            0 => StatusKind::Ok,
            7 => StatusKind::StreamEnded,
            9 => StatusKind::Stale,
            other => StatusKind::Failure(other),
        }
    }
}

/// Stream parameters returned by a successful `open`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamInfo {
    pub duration_ms: u64,
    pub pixel_format: i32,
    pub width: u32,
    pub height: u32,
    /// Sample encoding code (0 = i8, 1 = i16, 2 = i32, 3 = f32).
    pub audio_format: i32,
    pub channels: u16,
    pub sample_rate: u32,
}

/// Responses and unsolicited events from the decode service, in emission order.
#[derive(Clone, Debug, PartialEq)]
pub enum DecodeEvent {
    InitResp {
        status: Status,
    },
    OpenResp {
        status: Status,
        info: Option<StreamInfo>,
    },
    Frame(MediaFrame),
    StartResp {
        status: Status,
    },
    PauseResp {
        status: Status,
    },
    DecodeFinished,
    /// The service wants bytes from `offset`; `-1` means "use what is buffered".
    RequestData {
        offset: i64,
        available: u64,
    },
    SeekResp {
        status: Status,
        offset_hint: i64,
    },
    CloseResp {
        status: Status,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_kind_special_cases() {
        assert_eq!(Status(0).kind(), StatusKind::Ok);
        assert_eq!(Status(7).kind(), StatusKind::StreamEnded);
        assert_eq!(Status(9).kind(), StatusKind::Stale);
        assert_eq!(Status(5).kind(), StatusKind::Failure(5));
        assert_eq!(Status(-1).kind(), StatusKind::Failure(-1));
    }

    #[test]
    fn request_names_are_stable() {
        assert_eq!(DecodeRequest::Feed(vec![1, 2]).name(), "feed");
        assert_eq!(
            DecodeRequest::Seek {
                ms: 10,
                accurate: true
            }
            .name(),
            "seek"
        );
    }
}
