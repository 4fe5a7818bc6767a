//! Byte-source transport for `ws://` URLs.
//!
//! One connection per request: send the JSON command, then collect binary
//! messages until the expected number of bytes has arrived.

use std::net::TcpStream;
use std::time::Duration;

use stream_player_proto::socket::{SIZE_HEADER_LEN, SocketCommand, decode_size_header};
use tungstenite::protocol::Message;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::WebSocket;

use crate::error::TransportError;

#[derive(Clone, Debug)]
pub struct SocketFetcher {
    timeout: Duration,
}

impl SocketFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn probe_size(&self, url: &str) -> Result<i64, TransportError> {
        let bytes = self.exchange(url, &SocketCommand::size(url), SIZE_HEADER_LEN)?;
        decode_size_header(&bytes)
            .map(i64::from)
            .ok_or_else(|| TransportError::Protocol("short size reply".to_string()))
    }

    pub fn fetch_range(&self, url: &str, start: u64, end: u64) -> Result<Vec<u8>, TransportError> {
        let want = (end - start + 1) as usize;
        self.exchange(url, &SocketCommand::data(url, start, end), want)
    }

    fn exchange(
        &self,
        url: &str,
        cmd: &SocketCommand,
        expect: usize,
    ) -> Result<Vec<u8>, TransportError> {
        let (mut ws, _) = tungstenite::connect(url)?;
        set_read_timeout(&ws, self.timeout);
        ws.send(Message::text(cmd.to_text()?))?;

        let data = collect_binary(&mut ws, expect);
        let _ = ws.close(None);
        data
    }
}

fn set_read_timeout(ws: &WebSocket<MaybeTlsStream<TcpStream>>, timeout: Duration) {
    if let MaybeTlsStream::Plain(stream) = ws.get_ref() {
        if let Err(e) = stream.set_read_timeout(Some(timeout)) {
            tracing::debug!("socket read timeout not set: {e}");
        }
    }
}

fn collect_binary(
    ws: &mut WebSocket<MaybeTlsStream<TcpStream>>,
    expect: usize,
) -> Result<Vec<u8>, TransportError> {
    let mut data = Vec::with_capacity(expect);
    while data.len() < expect {
        match ws.read()? {
            Message::Binary(bytes) => data.extend_from_slice(&bytes),
            Message::Close(_) => {
                return Err(TransportError::Protocol(format!(
                    "connection closed after {} of {expect} bytes",
                    data.len()
                )));
            }
            Message::Ping(payload) => {
                let _ = ws.send(Message::Pong(payload));
            }
            _ => {}
        }
    }
    if data.len() > expect {
        tracing::warn!(got = data.len(), expect, "socket reply longer than requested");
        data.truncate(expect);
    }
    Ok(data)
}
