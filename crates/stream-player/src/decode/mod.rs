//! Decode actor: session client (player side) and WebSocket transport.

pub mod remote;
pub mod session;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::{Receiver, Sender};
use stream_player_proto::DecodeRequest;

use crate::error::SessionError;

pub use remote::spawn_decode_transport;
pub use session::{DecodeSession, InitRetry};

/// Player-side end of the decode request channel.
///
/// `ready` reports whether the service is reachable right now; `alive` whether
/// the transport thread still runs at all.
#[derive(Clone, Debug)]
pub struct DecodeLink {
    tx: Sender<DecodeRequest>,
    ready: Arc<AtomicBool>,
    alive: Arc<AtomicBool>,
}

impl DecodeLink {
    pub fn new(tx: Sender<DecodeRequest>, ready: Arc<AtomicBool>, alive: Arc<AtomicBool>) -> Self {
        Self { tx, ready, alive }
    }

    /// In-memory link that is always ready; the receiver sees every request.
    pub fn channel() -> (Self, Receiver<DecodeRequest>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let link = Self::new(
            tx,
            Arc::new(AtomicBool::new(true)),
            Arc::new(AtomicBool::new(true)),
        );
        (link, rx)
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Relaxed)
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Relaxed)
    }

    /// Handle for flipping readiness from outside (transport thread, tests).
    pub fn ready_flag(&self) -> Arc<AtomicBool> {
        self.ready.clone()
    }

    pub fn send(&self, req: DecodeRequest) -> Result<(), SessionError> {
        self.tx.send(req).map_err(|_| {
            self.alive.store(false, Ordering::Relaxed);
            SessionError::Disconnected
        })
    }
}
