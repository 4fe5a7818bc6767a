//! Download-channel request/response unions.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Transport used to fetch source bytes, chosen by URL scheme.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Protocol {
    Http,
    Socket,
}

impl Protocol {
    /// `http(s)://` maps to [`Protocol::Http`], `ws(s)://` to [`Protocol::Socket`].
    pub fn from_url(url: &str) -> Option<Self> {
        let scheme = url.split_once("://")?.0.to_ascii_lowercase();
        match scheme.as_str() {
            "http" | "https" => Some(Protocol::Http),
            "ws" | "wss" => Some(Protocol::Socket),
            _ => None,
        }
    }
}

/// Identifies one outstanding request; responses echo it back.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DownloadToken(pub u64);

impl DownloadToken {
    pub fn next(self) -> Self {
        DownloadToken(self.0.wrapping_add(1))
    }
}

/// Shared cancel flag for a continuous stream pull.
#[derive(Clone, Debug, Default)]
pub struct StreamAbort(Arc<AtomicBool>);

impl StreamAbort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Clone, Debug)]
pub enum DownloadRequest {
    GetInfo {
        url: String,
        protocol: Protocol,
    },
    /// Fetch the inclusive byte range `start..=end`.
    Download {
        url: String,
        protocol: Protocol,
        start: u64,
        end: u64,
        token: DownloadToken,
    },
    /// Pull an unbounded source in `chunk_size` pieces until aborted.
    OpenStream {
        url: String,
        chunk_size: usize,
        token: DownloadToken,
        abort: StreamAbort,
    },
    Close,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DownloadResponse {
    /// `size` is meaningful only when `http_status` is 2xx.
    InfoResp { size: i64, http_status: u16 },
    DataResp {
        start: u64,
        end: u64,
        token: DownloadToken,
        bytes: Vec<u8>,
    },
    /// A request failed before producing data. `token` is `None` for info probes.
    Failed {
        token: Option<DownloadToken>,
        error: String,
    },
    StreamData {
        token: DownloadToken,
        bytes: Vec<u8>,
    },
    StreamEnded {
        token: DownloadToken,
        error: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_follows_scheme() {
        assert_eq!(Protocol::from_url("http://a/b.mp4"), Some(Protocol::Http));
        assert_eq!(Protocol::from_url("HTTPS://a/b.mp4"), Some(Protocol::Http));
        assert_eq!(Protocol::from_url("ws://a:9000/live"), Some(Protocol::Socket));
        assert_eq!(Protocol::from_url("ftp://a"), None);
        assert_eq!(Protocol::from_url("no-scheme"), None);
    }

    #[test]
    fn abort_flag_is_shared() {
        let a = StreamAbort::new();
        let b = a.clone();
        assert!(!b.is_aborted());
        a.abort();
        assert!(b.is_aborted());
    }

    #[test]
    fn token_increments() {
        assert_eq!(DownloadToken(4).next(), DownloadToken(5));
    }
}
