//! Periodic timer descriptions.
//!
//! The engine never owns a clock thread. It describes each periodic schedule as
//! a [`TimerSlot`]; the runtime recreates the matching ticker whenever a slot's
//! generation changes, so arming or disarming always invalidates pending ticks.

use std::time::Duration;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TimerSlot {
    generation: u64,
    period: Option<Duration>,
}

impl TimerSlot {
    /// (Re)start the schedule; any previous schedule is superseded.
    pub fn arm(&mut self, period: Duration) {
        self.generation = self.generation.wrapping_add(1);
        self.period = Some(period.max(Duration::from_millis(1)));
    }

    pub fn disarm(&mut self) {
        if self.period.take().is_some() {
            self.generation = self.generation.wrapping_add(1);
        }
    }

    pub fn is_armed(&self) -> bool {
        self.period.is_some()
    }

    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// All schedules the player currently wants.
///
/// The render tick is not listed: it runs unconditionally.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlayerTimers {
    pub download: TimerSlot,
    pub track: TimerSlot,
    pub init_retry: TimerSlot,
}
