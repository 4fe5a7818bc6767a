//! Seek negotiation state.
//!
//! A seek runs pause, flush, byte-offset negotiation, prebuffer wait and
//! resume. [`SeekCoordinator`] holds the bookkeeping; the player drives the
//! side effects.

/// State of one in-flight seek.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeekContext {
    pub target_ms: u64,
    /// Download back-to-back instead of paced.
    pub urgent: bool,
    pub bytes_received: u64,
    pub prebuffer_target: u64,
    /// Waiting for the decode service to say where to read from.
    pub just_seeked: bool,
}

/// What the player should do with a `requestData` event after a seek.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestDataAction {
    /// Everything left is already buffered on the service side.
    ResumeNow,
    /// Move the read cursor, then download paced.
    Reposition(u64),
    /// Keep the cursor, download paced.
    Continue,
}

#[derive(Debug)]
pub struct SeekCoordinator {
    wait_bytes: u64,
    ctx: Option<SeekContext>,
}

impl SeekCoordinator {
    pub fn new(wait_bytes: u64) -> Self {
        Self {
            wait_bytes,
            ctx: None,
        }
    }

    /// Prebuffer size once the byte rate is known.
    pub fn set_wait_bytes(&mut self, bytes: u64) {
        self.wait_bytes = bytes.max(1);
    }

    pub fn wait_bytes(&self) -> u64 {
        self.wait_bytes
    }

    pub fn context(&self) -> Option<&SeekContext> {
        self.ctx.as_ref()
    }

    /// Start a seek; returns `false` if one is already in flight.
    pub fn begin(&mut self, target_ms: u64) -> bool {
        if self.ctx.is_some() {
            return false;
        }
        self.ctx = Some(SeekContext {
            target_ms,
            urgent: true,
            bytes_received: 0,
            prebuffer_target: self.wait_bytes,
            just_seeked: true,
        });
        true
    }

    pub fn is_seeking(&self) -> bool {
        self.ctx.is_some()
    }

    pub fn is_just_seeked(&self) -> bool {
        self.ctx.is_some_and(|c| c.just_seeked)
    }

    pub fn is_urgent(&self) -> bool {
        self.ctx.is_some_and(|c| c.urgent)
    }

    /// Interpret the first `requestData` after a seek.
    ///
    /// `remaining` is the byte count after the current read cursor.
    pub fn on_request_data(&mut self, offset: i64, available: u64, remaining: u64, total_size: i64) -> Option<RequestDataAction> {
        let ctx = self.ctx.as_mut().filter(|c| c.just_seeked)?;
        ctx.just_seeked = false;
        let action = if offset < 0 {
            if available >= remaining {
                RequestDataAction::ResumeNow
            } else {
                RequestDataAction::Continue
            }
        } else {
            let max = u64::try_from(total_size).unwrap_or(0);
            RequestDataAction::Reposition(u64::try_from(offset).unwrap_or(0).min(max))
        };
        Some(action)
    }

    /// Count prebuffer bytes; `true` once the target is met.
    ///
    /// `remaining` is measured before these bytes advance the cursor.
    pub fn on_bytes(&mut self, len: usize, remaining: u64) -> bool {
        let Some(ctx) = self.ctx.as_mut() else {
            return false;
        };
        ctx.bytes_received = ctx.bytes_received.saturating_add(len as u64);
        ctx.prebuffer_target = remaining.min(self.wait_bytes);
        ctx.bytes_received >= ctx.prebuffer_target
    }

    /// The service rejected the seek; nothing is retried.
    pub fn on_seek_failed(&mut self) {
        if let Some(ctx) = self.ctx.take() {
            tracing::warn!(target_ms = ctx.target_ms, "seek failed");
        }
    }

    /// First frame after the seek was presented.
    pub fn finish(&mut self) {
        self.ctx = None;
    }

    pub fn reset(&mut self) {
        self.ctx = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_seek_is_refused() {
        let mut seek = SeekCoordinator::new(1000);
        assert!(seek.begin(30_000));
        assert!(!seek.begin(10_000));
        assert!(seek.is_urgent());
        assert!(seek.is_just_seeked());
    }

    #[test]
    fn request_data_is_handled_once() {
        let mut seek = SeekCoordinator::new(1000);
        seek.begin(30_000);
        assert_eq!(
            seek.on_request_data(15_000_000, 0, 40_000_000, 40_000_000),
            Some(RequestDataAction::Reposition(15_000_000))
        );
        assert!(!seek.is_just_seeked());
        assert_eq!(seek.on_request_data(0, 0, 0, 40_000_000), None);
    }

    #[test]
    fn reposition_is_clamped() {
        let mut seek = SeekCoordinator::new(1000);
        seek.begin(1);
        assert_eq!(
            seek.on_request_data(9_000, 0, 100, 5_000),
            Some(RequestDataAction::Reposition(5_000))
        );
    }

    #[test]
    fn buffered_tail_resumes_immediately() {
        let mut seek = SeekCoordinator::new(1000);
        seek.begin(1);
        assert_eq!(
            seek.on_request_data(-1, 800, 800, 5_000),
            Some(RequestDataAction::ResumeNow)
        );
        seek.finish();
        seek.begin(1);
        assert_eq!(
            seek.on_request_data(-1, 100, 800, 5_000),
            Some(RequestDataAction::Continue)
        );
    }

    #[test]
    fn prebuffer_uses_smaller_of_remaining_and_wait() {
        let mut seek = SeekCoordinator::new(1000);
        seek.begin(1);
        assert!(!seek.on_bytes(600, 10_000));
        assert!(seek.on_bytes(600, 9_400));

        seek.finish();
        seek.begin(1);
        assert!(seek.on_bytes(300, 300));
    }

    #[test]
    fn failure_clears_context() {
        let mut seek = SeekCoordinator::new(1000);
        seek.begin(1);
        seek.on_seek_failed();
        assert!(!seek.is_seeking());
        assert!(!seek.is_urgent());
    }
}
