//! Byte-source protocol for `ws://` URLs.
//!
//! The client sends one JSON text message per request:
//! - `{"url": ..., "cmd": "size"}` answered by a 4-byte little-endian i32
//! - `{"url": ..., "cmd": "data", "start": s, "end": e}` answered by
//!   `e - s + 1` bytes, possibly split over several binary messages

use serde::{Deserialize, Serialize};

pub const SIZE_HEADER_LEN: usize = 4;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SocketCommand {
    pub url: String,
    pub cmd: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<u64>,
}

impl SocketCommand {
    pub fn size(url: &str) -> Self {
        Self {
            url: url.to_string(),
            cmd: "size".to_string(),
            start: None,
            end: None,
        }
    }

    pub fn data(url: &str, start: u64, end: u64) -> Self {
        Self {
            url: url.to_string(),
            cmd: "data".to_string(),
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn to_text(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Read the size reply once at least four bytes have arrived.
pub fn decode_size_header(buf: &[u8]) -> Option<i32> {
    let head: [u8; SIZE_HEADER_LEN] = buf.get(..SIZE_HEADER_LEN)?.try_into().ok()?;
    Some(i32::from_le_bytes(head))
}
