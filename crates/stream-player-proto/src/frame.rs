//! Binary media frame framing used by the decode service.

use std::io;

/// Length of the kind flag.
pub const KIND_LEN: usize = 1;
/// Length of the ASCII timestamp field.
pub const TIMESTAMP_LEN: usize = 16;
/// Total header length preceding the payload.
pub const HEADER_LEN: usize = KIND_LEN + TIMESTAMP_LEN;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video = 0,
    Audio = 1,
}

impl MediaKind {
    pub fn from_u8(b: u8) -> io::Result<Self> {
        match b {
            0 => Ok(MediaKind::Video),
            1 => Ok(MediaKind::Audio),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unknown media kind {b:#x}"),
            )),
        }
    }
}

/// One decoded frame: planar YUV for video, interleaved PCM for audio.
#[derive(Clone, Debug, PartialEq)]
pub struct MediaFrame {
    pub kind: MediaKind,
    /// Presentation timestamp in seconds on the decode-service clock.
    pub timestamp: f64,
    pub payload: Vec<u8>,
}

impl MediaFrame {
    pub fn video(timestamp: f64, payload: Vec<u8>) -> Self {
        Self {
            kind: MediaKind::Video,
            timestamp,
            payload,
        }
    }

    pub fn audio(timestamp: f64, payload: Vec<u8>) -> Self {
        Self {
            kind: MediaKind::Audio,
            timestamp,
            payload,
        }
    }
}

/// Encode a media frame (header + payload) into a single buffer.
///
/// The timestamp is written as `%.6f` and NUL padded; values that do not fit
/// the 16-byte field are rejected.
pub fn encode_media_frame(kind: MediaKind, timestamp: f64, payload: &[u8]) -> io::Result<Vec<u8>> {
    let text = format!("{timestamp:.6}");
    if text.len() > TIMESTAMP_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "timestamp does not fit header",
        ));
    }

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.push(kind as u8);
    out.extend_from_slice(text.as_bytes());
    out.resize(HEADER_LEN, 0);
    out.extend_from_slice(payload);
    Ok(out)
}

/// Decode a binary message from the decode service.
pub fn decode_media_frame(buf: &[u8]) -> io::Result<MediaFrame> {
    if buf.len() < HEADER_LEN {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "short media frame"));
    }
    let kind = MediaKind::from_u8(buf[0])?;
    let timestamp = parse_timestamp(&buf[KIND_LEN..HEADER_LEN])?;
    Ok(MediaFrame {
        kind,
        timestamp,
        payload: buf[HEADER_LEN..].to_vec(),
    })
}

fn parse_timestamp(field: &[u8]) -> io::Result<f64> {
    let text = std::str::from_utf8(field)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "timestamp not utf-8"))?;
    let text = text.trim_end_matches('\0').trim();
    text.parse::<f64>().map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("bad timestamp {text:?}"),
        )
    })
}
