//! Error types for the player engine.
//!
//! Control calls fail synchronously with [`ControlError`]. Failures that happen
//! later (network, decode service) never cross actor boundaries as errors; they
//! travel as response fields and reach the user through the play callback.

use stream_player_types::PlayResult;

/// Precondition failure returned by a control call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ControlError {
    #[error("Invalid url")]
    InvalidUrl,
    #[error("Video sink not set")]
    MissingVideoSink,
    #[error("Downloader not initialized")]
    DownloaderUnavailable,
    #[error("Decoder not initialized")]
    DecoderUnavailable,
    #[error("Not playing")]
    NotPlaying,
    #[error("Not pausing")]
    NotPausing,
    #[error("Seek is not supported for live sources")]
    SeekUnsupported,
    #[error("Seek already in progress")]
    SeekInProgress,
    #[error("Player runtime is not running")]
    Runtime,
}

impl ControlError {
    pub fn code(&self) -> i32 {
        match self {
            ControlError::InvalidUrl => -1,
            ControlError::MissingVideoSink => -2,
            ControlError::DownloaderUnavailable => -3,
            ControlError::DecoderUnavailable => -4,
            ControlError::NotPlaying | ControlError::NotPausing => -1,
            ControlError::SeekUnsupported => -5,
            ControlError::SeekInProgress => -6,
            ControlError::Runtime => -7,
        }
    }
}

impl From<ControlError> for PlayResult {
    fn from(err: ControlError) -> Self {
        PlayResult {
            error_code: err.code(),
            message: err.to_string(),
        }
    }
}

/// Collapse a control outcome into the `{error_code, message}` form.
pub fn play_result(outcome: Result<(), ControlError>) -> PlayResult {
    match outcome {
        Ok(()) => PlayResult::success(),
        Err(err) => err.into(),
    }
}

/// Decode-session calls that may have at most one request in flight.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DecodeCall {
    Init,
    Open,
    Seek,
    Close,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("{0:?} already in flight")]
    CallInFlight(DecodeCall),
    #[error("decode service link is closed")]
    Disconnected,
}

/// Failure inside a download or decode transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("http request failed: {0}")]
    Http(#[from] ureq::Error),
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("protocol error: {0}")]
    Protocol(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_negative() {
        let all = [
            ControlError::InvalidUrl,
            ControlError::MissingVideoSink,
            ControlError::DownloaderUnavailable,
            ControlError::DecoderUnavailable,
            ControlError::NotPlaying,
            ControlError::NotPausing,
            ControlError::SeekUnsupported,
            ControlError::SeekInProgress,
            ControlError::Runtime,
        ];
        assert!(all.iter().all(|e| e.code() < 0));
    }

    #[test]
    fn play_result_maps_outcome() {
        assert!(play_result(Ok(())).is_success());
        let res = play_result(Err(ControlError::MissingVideoSink));
        assert_eq!(res.error_code, -2);
        assert_eq!(res.message, "Video sink not set");
    }

    #[test]
    fn in_flight_error_names_call() {
        let err = SessionError::CallInFlight(DecodeCall::Open);
        assert_eq!(err.to_string(), "Open already in flight");
    }
}
