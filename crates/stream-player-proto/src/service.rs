//! JSON text messages exchanged with the decode service over its WebSocket.

use serde::{Deserialize, Serialize};

use crate::decode::{DecodeEvent, DecodeRequest, Status, StreamInfo};

/// Commands understood by the decode service.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "cmd")]
pub enum ServiceCommand {
    #[serde(rename = "initDecoder", rename_all = "camelCase")]
    InitDecoder { file_size: i64, wait_header_length: u64 },
    #[serde(rename = "uninitDecoder")]
    UninitDecoder,
    #[serde(rename = "openDecoder", rename_all = "camelCase")]
    OpenDecoder { has_video: bool, has_audio: bool },
    #[serde(rename = "closeDecoder")]
    CloseDecoder,
    #[serde(rename = "startDecode", rename_all = "camelCase")]
    StartDecode { interval_ms: u32 },
    #[serde(rename = "stopDecode")]
    StopDecode,
    #[serde(rename = "seekTo", rename_all = "camelCase")]
    SeekTo { ms: u64, accurate_seek: bool },
}

impl ServiceCommand {
    pub fn to_text(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Map a request onto its text command. `Feed` travels as a binary message.
pub fn command_for(req: &DecodeRequest) -> Option<ServiceCommand> {
    let cmd = match req {
        DecodeRequest::Init {
            total_size,
            header_wait_bytes,
        } => ServiceCommand::InitDecoder {
            file_size: *total_size,
            wait_header_length: *header_wait_bytes,
        },
        DecodeRequest::Uninit => ServiceCommand::UninitDecoder,
        DecodeRequest::Open {
            has_video,
            has_audio,
        } => ServiceCommand::OpenDecoder {
            has_video: *has_video,
            has_audio: *has_audio,
        },
        DecodeRequest::Close => ServiceCommand::CloseDecoder,
        DecodeRequest::Feed(_) => return None,
        DecodeRequest::Start { interval_ms } => ServiceCommand::StartDecode {
            interval_ms: *interval_ms,
        },
        DecodeRequest::Pause => ServiceCommand::StopDecode,
        DecodeRequest::Seek { ms, accurate } => ServiceCommand::SeekTo {
            ms: *ms,
            accurate_seek: *accurate,
        },
    };
    Some(cmd)
}

/// Any text message sent by the decode service.
///
/// Every reply carries `cmd`, `code` and `msg`; the remaining fields are
/// populated depending on the command.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceReply {
    pub cmd: String,
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub msg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_pix_fmt: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_sample_fmt: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_channels: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_sample_rate: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available: Option<u64>,
}

impl ServiceReply {
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    fn stream_info(&self) -> StreamInfo {
        StreamInfo {
            duration_ms: self.duration.unwrap_or(0),
            pixel_format: self.video_pix_fmt.unwrap_or(0),
            width: self.video_width.unwrap_or(0),
            height: self.video_height.unwrap_or(0),
            audio_format: self.audio_sample_fmt.unwrap_or(0),
            channels: self.audio_channels.unwrap_or(0),
            sample_rate: self.audio_sample_rate.unwrap_or(0),
        }
    }

    /// Translate into a player-facing event; unknown commands yield `None`.
    ///
    /// A `startDecode` reply with status 7 is the service's end-of-stream
    /// signal and becomes [`DecodeEvent::DecodeFinished`].
    pub fn into_event(self) -> Option<DecodeEvent> {
        let status = Status(self.code);
        let event = match self.cmd.as_str() {
            "initDecoder" => DecodeEvent::InitResp { status },
            "openDecoder" => DecodeEvent::OpenResp {
                status,
                info: status.is_ok().then(|| self.stream_info()),
            },
            "startDecode" if status == Status::STREAM_ENDED => DecodeEvent::DecodeFinished,
            "startDecode" => DecodeEvent::StartResp { status },
            "stopDecode" => DecodeEvent::PauseResp { status },
            "closeDecoder" => DecodeEvent::CloseResp { status },
            "decodeFinished" => DecodeEvent::DecodeFinished,
            "requestData" => DecodeEvent::RequestData {
                offset: self.offset.unwrap_or(-1),
                available: self.available.unwrap_or(0),
            },
            "seekTo" => DecodeEvent::SeekResp {
                status,
                offset_hint: self.offset.unwrap_or(-1),
            },
            _ => return None,
        };
        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_command_uses_service_field_names() {
        let cmd = command_for(&DecodeRequest::Init {
            total_size: 1000,
            header_wait_bytes: 524288,
        })
        .unwrap();
        let v: serde_json::Value = serde_json::from_str(&cmd.to_text().unwrap()).unwrap();
        assert_eq!(v["cmd"], "initDecoder");
        assert_eq!(v["fileSize"], 1000);
        assert_eq!(v["waitHeaderLength"], 524288);
    }

    #[test]
    fn pause_maps_to_stop_decode() {
        let cmd = command_for(&DecodeRequest::Pause).unwrap();
        assert_eq!(cmd.to_text().unwrap(), r#"{"cmd":"stopDecode"}"#);
    }

    #[test]
    fn feed_has_no_text_command() {
        assert!(command_for(&DecodeRequest::Feed(vec![0; 4])).is_none());
    }

    #[test]
    fn open_reply_carries_stream_info() {
        let text = r#"{"cmd":"openDecoder","code":0,"msg":"","duration":61000,
            "videoPixFmt":0,"videoWidth":640,"videoHeight":360,
            "audioSampleFmt":1,"audioChannels":2,"audioSampleRate":44100}"#;
        let event = ServiceReply::parse(text).unwrap().into_event().unwrap();
        let DecodeEvent::OpenResp { status, info } = event else {
            panic!("unexpected event {event:?}");
        };
        assert!(status.is_ok());
        let info = info.unwrap();
        assert_eq!(info.duration_ms, 61000);
        assert_eq!(info.width, 640);
        assert_eq!(info.channels, 2);
        assert_eq!(info.sample_rate, 44100);
    }

    #[test]
    fn failed_open_has_no_info() {
        let text = r#"{"cmd":"openDecoder","code":3,"msg":"bad header"}"#;
        let event = ServiceReply::parse(text).unwrap().into_event().unwrap();
        assert_eq!(
            event,
            DecodeEvent::OpenResp {
                status: Status(3),
                info: None
            }
        );
    }

    #[test]
    fn start_reply_seven_means_finished() {
        let text = r#"{"cmd":"startDecode","code":7,"msg":"eof"}"#;
        let event = ServiceReply::parse(text).unwrap().into_event().unwrap();
        assert_eq!(event, DecodeEvent::DecodeFinished);
    }

    #[test]
    fn request_data_defaults_offset() {
        let text = r#"{"cmd":"requestData","code":0,"msg":"","available":1024}"#;
        let event = ServiceReply::parse(text).unwrap().into_event().unwrap();
        assert_eq!(
            event,
            DecodeEvent::RequestData {
                offset: -1,
                available: 1024
            }
        );
    }

    #[test]
    fn unknown_reply_is_dropped() {
        let reply = ServiceReply::parse(r#"{"cmd":"uninitDecoder","code":0}"#).unwrap();
        assert!(reply.into_event().is_none());
    }
}
