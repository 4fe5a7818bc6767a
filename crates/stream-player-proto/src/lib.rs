//! Shared protocol primitives for the stream player.
//!
//! Two channels cross actor boundaries, each modeled as a closed tagged union:
//! - decode channel: [`DecodeRequest`] out, [`DecodeEvent`] back
//! - download channel: [`DownloadRequest`] out, [`DownloadResponse`] back
//!
//! The decode service itself is reached over a WebSocket:
//! - text messages carry JSON commands/replies (see [`service`])
//! - binary messages carry raw feed bytes (client → service) or decoded
//!   media frames (service → client, see [`frame`])
//!
//! Media frame format:
//! - kind: u8 (0 = video, 1 = audio)
//! - timestamp: 16 bytes, ASCII decimal seconds, NUL/space padded
//! - payload: remaining bytes

pub mod decode;
pub mod download;
pub mod frame;
pub mod service;
pub mod socket;

pub use decode::{DecodeEvent, DecodeRequest, Status, StatusKind, StreamInfo};
pub use download::{DownloadRequest, DownloadResponse, DownloadToken, Protocol, StreamAbort};
pub use frame::{MediaFrame, MediaKind, decode_media_frame, encode_media_frame};
