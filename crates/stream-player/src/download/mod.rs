//! Download actor: scheduler (player side) and transports (worker side).

pub mod http;
pub mod live;
pub mod scheduler;
pub mod socket;
pub mod worker;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::{Receiver, Sender};
use stream_player_proto::DownloadRequest;

pub use scheduler::{ChunkOutcome, DownloadScheduler, MediaSource};

/// Player-side end of the download request channel.
#[derive(Clone, Debug)]
pub struct DownloadLink {
    tx: Sender<DownloadRequest>,
    alive: Arc<AtomicBool>,
}

impl DownloadLink {
    pub fn new(tx: Sender<DownloadRequest>, alive: Arc<AtomicBool>) -> Self {
        Self { tx, alive }
    }

    /// In-memory link with no worker behind it; the receiver sees every request.
    pub fn channel() -> (Self, Receiver<DownloadRequest>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self::new(tx, Arc::new(AtomicBool::new(true))), rx)
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Relaxed)
    }

    pub fn send(&self, req: DownloadRequest) -> bool {
        match self.tx.send(req) {
            Ok(()) => true,
            Err(_) => {
                self.alive.store(false, Ordering::Relaxed);
                false
            }
        }
    }
}

/// Clears a liveness flag when the owning thread exits.
pub(crate) struct AliveGuard(pub(crate) Arc<AtomicBool>);

impl Drop for AliveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Relaxed);
    }
}
