//! HTTP range transport.

use std::io::Read;
use std::time::{Duration, Instant};

use crate::error::TransportError;

/// Outcome of a size probe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SizeProbe {
    pub http_status: u16,
    pub size: Option<u64>,
}

/// Range fetcher for `http(s)://` sources.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Probe the total size with a one-byte range request.
    ///
    /// Error statuses come back as a probe result so the caller can report them.
    pub fn probe_size(&self, url: &str) -> Result<SizeProbe, TransportError> {
        let resp = match ureq::get(url)
            .config()
            .timeout_per_call(Some(self.timeout))
            .build()
            .header("Range", "bytes=0-0")
            .call()
        {
            Ok(resp) => resp,
            Err(ureq::Error::StatusCode(code)) => {
                return Ok(SizeProbe {
                    http_status: code,
                    size: None,
                });
            }
            Err(e) => return Err(e.into()),
        };

        let status = resp.status();
        let content_range = header_str(resp.headers(), "Content-Range");
        let content_length =
            header_str(resp.headers(), "Content-Length").and_then(|s| s.parse::<u64>().ok());

        let size = match status {
            ureq::http::StatusCode::PARTIAL_CONTENT => content_range
                .as_deref()
                .and_then(parse_content_range_total),
            ureq::http::StatusCode::OK => content_length,
            _ => None,
        };
        Ok(SizeProbe {
            http_status: status.as_u16(),
            size,
        })
    }

    /// Fetch the inclusive byte range `start..=end`.
    pub fn fetch_range(&self, url: &str, start: u64, end: u64) -> Result<Vec<u8>, TransportError> {
        let range = format!("bytes={start}-{end}");
        let began = Instant::now();
        let resp = ureq::get(url)
            .config()
            .timeout_per_call(Some(self.timeout))
            .build()
            .header("Range", &range)
            .call()?;

        let status = resp.status();
        let mut buf = Vec::new();
        let (_, body) = resp.into_parts();
        body.into_reader().read_to_end(&mut buf)?;
        let elapsed = began.elapsed();

        if elapsed > Duration::from_millis(250) {
            let kbps = if elapsed.as_millis() > 0 {
                (buf.len() as u128 * 1000 / elapsed.as_millis()) / 1024
            } else {
                0
            };
            tracing::warn!(
                took_ms = elapsed.as_millis() as u64,
                bytes = buf.len(),
                kbps = kbps as u64,
                range = range.as_str(),
                "http range fetch slow"
            );
        }

        let want = (end - start + 1) as usize;
        match status {
            ureq::http::StatusCode::PARTIAL_CONTENT => Ok(buf),
            // Server ignored the range header and sent the whole body.
            ureq::http::StatusCode::OK => slice_full_body(buf, start, want),
            other => Err(TransportError::Protocol(format!(
                "unexpected status {other} for {range}"
            ))),
        }
    }

    /// Open an unbounded body reader for a live source.
    pub fn open_stream(&self, url: &str) -> Result<impl Read + use<>, TransportError> {
        let resp = ureq::get(url).call()?;
        let (_, body) = resp.into_parts();
        Ok(body.into_reader())
    }
}

fn header_str(headers: &ureq::http::HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

fn slice_full_body(mut buf: Vec<u8>, start: u64, want: usize) -> Result<Vec<u8>, TransportError> {
    let start = start as usize;
    if start >= buf.len() {
        return Err(TransportError::Protocol(format!(
            "range start {start} beyond body of {} bytes",
            buf.len()
        )));
    }
    let end = (start + want).min(buf.len());
    buf.truncate(end);
    Ok(buf.split_off(start))
}

/// Extract the total length from a Content-Range header.
fn parse_content_range_total(header: &str) -> Option<u64> {
    // Format: "bytes start-end/total"
    let (_, total) = header.split_once('/')?;
    total.trim().parse::<u64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_content_range_total_reads_total() {
        assert_eq!(parse_content_range_total("bytes 0-0/10000000"), Some(10_000_000));
    }

    #[test]
    fn parse_content_range_total_rejects_invalid() {
        assert_eq!(parse_content_range_total("bytes 0-99/*"), None);
        assert_eq!(parse_content_range_total("bytes 0-99"), None);
    }

    #[test]
    fn full_body_is_sliced_to_range() {
        let body: Vec<u8> = (0..10).collect();
        assert_eq!(slice_full_body(body.clone(), 2, 3).unwrap(), vec![2, 3, 4]);
        assert_eq!(slice_full_body(body.clone(), 8, 5).unwrap(), vec![8, 9]);
        assert!(slice_full_body(body, 10, 1).is_err());
    }
}
