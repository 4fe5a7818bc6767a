//! Live sources as a cancellable lazy sequence of byte chunks.

use std::io::{self, Read};

use stream_player_proto::StreamAbort;

/// Yields slices of at most `chunk_size` bytes as they arrive from `reader`.
///
/// Iteration ends at end of stream, on the first read error (yielded once), or
/// as soon as the abort flag is raised.
pub struct LiveChunks<R> {
    reader: R,
    chunk_size: usize,
    abort: StreamAbort,
    done: bool,
}

impl<R: Read> LiveChunks<R> {
    pub fn new(reader: R, chunk_size: usize, abort: StreamAbort) -> Self {
        Self {
            reader,
            chunk_size: chunk_size.max(1),
            abort,
            done: false,
        }
    }
}

impl<R: Read> Iterator for LiveChunks<R> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.abort.is_aborted() {
            return None;
        }
        let mut buf = vec![0u8; self.chunk_size];
        loop {
            match self.reader.read(&mut buf) {
                Ok(0) => {
                    self.done = true;
                    return None;
                }
                Ok(n) => {
                    if self.abort.is_aborted() {
                        return None;
                    }
                    buf.truncate(n);
                    return Some(Ok(buf));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
