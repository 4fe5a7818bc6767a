use serde::{Deserialize, Serialize};

/// Top-level player state.
///
/// Governs whether frames render and timers run.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlayerState {
    #[default]
    Idle,
    Playing,
    Pausing,
}

/// Decode-session lifecycle as seen by the player.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum DecoderState {
    /// Accepting header bytes only.
    #[default]
    Idle,
    /// `open` is in flight.
    Initializing,
    /// Accepting feed/decode.
    Ready,
    /// End of stream reported by the decode service.
    Finished,
}

/// Synchronous result of a control call: `error_code == 0` means success.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayResult {
    pub error_code: i32,
    pub message: String,
}

impl PlayResult {
    pub fn success() -> Self {
        Self {
            error_code: 0,
            message: "Success".to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error_code == 0
    }
}

/// Error code used when the file-info probe fails (`status` carries the HTTP status).
pub const PLAY_ERROR_FILE_INFO: i32 = -1;
/// Error code used when the decode service cannot be reached.
pub const PLAY_ERROR_TRANSPORT: i32 = -2;

/// Failure payload delivered through the registered play callback.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayError {
    pub error: i32,
    pub status: i32,
    pub message: String,
}

impl PlayError {
    /// The file-info request returned a non-success HTTP status.
    pub fn file_info(http_status: u16) -> Self {
        Self {
            error: PLAY_ERROR_FILE_INFO,
            status: i32::from(http_status),
            message: format!("file info request failed with http status {http_status}"),
        }
    }

    /// The decode service answered with a non-zero status.
    pub fn protocol(status: i32, call: &str) -> Self {
        Self {
            error: status,
            status: 0,
            message: format!("{call} failed with status {status}"),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            error: PLAY_ERROR_TRANSPORT,
            status: 0,
            message: message.into(),
        }
    }
}

/// Notification delivered to the play callback.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum PlayerNotice {
    /// A user-visible failure; delivered once per failure.
    Error(PlayError),
    /// Playback drained the buffer after the decoder finished.
    Finished,
}

/// Point-in-time view of the player, suitable for logs and front-ends.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct PlayerStatus {
    pub state: PlayerState,
    pub decoder_state: DecoderState,
    /// Source URL of the active session.
    pub url: Option<String>,
    pub live: bool,
    /// Total size in bytes; `-1` for live sources.
    pub total_size: Option<i64>,
    /// Next byte the scheduler will request.
    pub read_offset: Option<u64>,
    pub duration_ms: Option<u64>,
    /// Current presentation position (audio clock + begin offset).
    pub position_ms: Option<u64>,
    /// Timestamp span of queued frames in milliseconds.
    pub buffered_ms: u64,
    pub buffered_frames: usize,
    pub buffering: bool,
    pub seeking: bool,
    pub video_width: Option<u32>,
    pub video_height: Option<u32>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
}
