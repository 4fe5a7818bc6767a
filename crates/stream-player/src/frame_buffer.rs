//! Decoded frames waiting for presentation.

use std::collections::VecDeque;

use stream_player_proto::MediaFrame;

/// FIFO of decoded audio and video frames in arrival order.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    frames: VecDeque<MediaFrame>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: MediaFrame) {
        self.frames.push_back(frame);
    }

    /// Put back a frame that was popped but not yet due.
    pub fn push_front(&mut self, frame: MediaFrame) {
        self.frames.push_front(frame);
    }

    pub fn front(&self) -> Option<&MediaFrame> {
        self.frames.front()
    }

    pub fn pop_front(&mut self) -> Option<MediaFrame> {
        self.frames.pop_front()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Timestamp span between the newest and oldest frame, in seconds.
    pub fn buffered_duration(&self) -> f64 {
        match (self.frames.front(), self.frames.back()) {
            (Some(first), Some(last)) => (last.timestamp - first.timestamp).max(0.0),
            _ => 0.0,
        }
    }
}
