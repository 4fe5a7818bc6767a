//! WebSocket transport to the decode service.
//!
//! One thread owns the socket. It alternates between a short blocking read and
//! draining queued requests, so replies and outbound commands share a loop
//! without a second connection.

use std::net::TcpStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use stream_player_proto::service::{ServiceReply, command_for};
use stream_player_proto::{DecodeEvent, DecodeRequest, decode_media_frame};
use tungstenite::WebSocket;
use tungstenite::protocol::Message;
use tungstenite::stream::MaybeTlsStream;

use crate::decode::DecodeLink;
use crate::download::AliveGuard;
use crate::error::TransportError;

type Socket = WebSocket<MaybeTlsStream<TcpStream>>;

const RECONNECT_DELAY: Duration = Duration::from_millis(200);
const READ_TIMEOUT: Duration = Duration::from_millis(20);

enum Exit {
    /// Player dropped its link or event receiver.
    Shutdown,
    Lost(TransportError),
}

/// Spawn the transport thread for `url`.
///
/// The link reports not-ready until a connection is up; requests sent while
/// disconnected are dropped.
pub fn spawn_decode_transport(url: String) -> (DecodeLink, Receiver<DecodeEvent>) {
    let (req_tx, req_rx) = crossbeam_channel::unbounded();
    let (event_tx, event_rx) = crossbeam_channel::unbounded();
    let ready = Arc::new(AtomicBool::new(false));
    let alive = Arc::new(AtomicBool::new(true));
    let guard = AliveGuard(alive.clone());

    let thread_ready = ready.clone();
    let spawned = std::thread::Builder::new()
        .name("stream-decode".to_string())
        .spawn(move || {
            let _guard = guard;
            transport_main(&url, &req_rx, &event_tx, &thread_ready);
            thread_ready.store(false, Ordering::Relaxed);
        });
    if let Err(e) = spawned {
        tracing::error!("decode transport spawn failed: {e}");
    }

    (DecodeLink::new(req_tx, ready, alive), event_rx)
}

fn transport_main(
    url: &str,
    rx: &Receiver<DecodeRequest>,
    tx: &Sender<DecodeEvent>,
    ready: &AtomicBool,
) {
    let mut logged_failure = false;
    loop {
        match tungstenite::connect(url) {
            Ok((mut ws, _)) => {
                tracing::info!(url, "decode service connected");
                logged_failure = false;
                set_read_timeout(&ws);
                ready.store(true, Ordering::Relaxed);
                let exit = serve(&mut ws, rx, tx);
                ready.store(false, Ordering::Relaxed);
                let _ = ws.close(None);
                match exit {
                    Exit::Shutdown => return,
                    Exit::Lost(e) => tracing::warn!("decode service connection lost: {e}"),
                }
            }
            Err(e) => {
                if !logged_failure {
                    tracing::warn!(url, "decode service unreachable: {e}");
                    logged_failure = true;
                }
            }
        }

        match rx.recv_timeout(RECONNECT_DELAY) {
            Ok(req) => tracing::debug!(request = req.name(), "decode service offline; request dropped"),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return,
        }
        for req in rx.try_iter() {
            tracing::debug!(request = req.name(), "decode service offline; request dropped");
        }
    }
}

fn set_read_timeout(ws: &Socket) {
    if let MaybeTlsStream::Plain(stream) = ws.get_ref() {
        if let Err(e) = stream.set_read_timeout(Some(READ_TIMEOUT)) {
            tracing::debug!("decode socket read timeout not set: {e}");
        }
    }
}

fn serve(ws: &mut Socket, rx: &Receiver<DecodeRequest>, tx: &Sender<DecodeEvent>) -> Exit {
    loop {
        match ws.read() {
            Ok(Message::Text(text)) => {
                if let Some(event) = reply_event(text.as_str()) {
                    if tx.send(event).is_err() {
                        return Exit::Shutdown;
                    }
                }
            }
            Ok(Message::Binary(bytes)) => match decode_media_frame(&bytes) {
                Ok(frame) => {
                    if tx.send(DecodeEvent::Frame(frame)).is_err() {
                        return Exit::Shutdown;
                    }
                }
                Err(e) => tracing::warn!("bad media frame: {e}"),
            },
            Ok(Message::Ping(data)) => {
                let _ = ws.send(Message::Pong(data));
            }
            Ok(Message::Close(_)) => {
                return Exit::Lost(TransportError::Protocol("closed by service".to_string()));
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(ref e))
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut => {}
            Err(e) => return Exit::Lost(e.into()),
        }

        loop {
            let req = match rx.try_recv() {
                Ok(req) => req,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return Exit::Shutdown,
            };
            if let Err(e) = send_request(ws, req) {
                return Exit::Lost(e);
            }
        }
    }
}

fn send_request(ws: &mut Socket, req: DecodeRequest) -> Result<(), TransportError> {
    if let DecodeRequest::Feed(bytes) = req {
        ws.send(Message::binary(bytes))?;
        return Ok(());
    }
    let Some(cmd) = command_for(&req) else {
        return Ok(());
    };
    tracing::debug!(request = req.name(), "decode request");
    ws.send(Message::text(cmd.to_text()?))?;
    Ok(())
}

fn reply_event(text: &str) -> Option<DecodeEvent> {
    match ServiceReply::parse(text) {
        Ok(reply) => {
            if reply.code != 0 {
                tracing::debug!(cmd = reply.cmd.as_str(), code = reply.code, msg = reply.msg.as_str(), "decode reply");
            }
            reply.into_event()
        }
        Err(e) => {
            tracing::warn!("unparseable decode reply: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use stream_player_proto::Status;

    use super::*;

    #[test]
    fn reply_text_maps_to_event() {
        let event = reply_event(r#"{"cmd":"initDecoder","code":0,"msg":"ok"}"#);
        assert_eq!(event, Some(DecodeEvent::InitResp { status: Status::OK }));
    }

    #[test]
    fn garbage_reply_is_dropped() {
        assert_eq!(reply_event("not json"), None);
    }

    #[test]
    fn unknown_command_is_dropped() {
        assert_eq!(reply_event(r#"{"cmd":"uninitDecoder","code":0}"#), None);
    }
}
