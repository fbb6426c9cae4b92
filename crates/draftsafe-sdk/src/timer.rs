//! Deadline-based timers.
//!
//! Timers here never sleep. They record when they are due against an
//! injected clock, and the owner asks them whether they fire at a given
//! instant. This keeps every timer decision deterministic under test.

use draftsafe_core::Millis;

/// A trailing debounce: re-arming pushes the deadline out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Debounce {
    due: Option<Millis>,
}

impl Debounce {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel any pending deadline and schedule a new one `delay` after `now`.
    pub fn arm(&mut self, now: Millis, delay: Millis) {
        self.due = Some(now.saturating_add(delay));
    }

    pub fn cancel(&mut self) {
        self.due = None;
    }

    pub fn due(&self) -> Option<Millis> {
        self.due
    }

    pub fn is_pending(&self) -> bool {
        self.due.is_some()
    }

    /// Fire at most once: returns true and disarms if the deadline has passed.
    pub fn fire(&mut self, now: Millis) -> bool {
        match self.due {
            Some(due) if now >= due => {
                self.due = None;
                true
            }
            _ => false,
        }
    }
}

/// A fixed-rate interval. Missed periods collapse into one firing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Interval {
    period: Millis,
    next: Option<Millis>,
}

impl Interval {
    /// Start an interval whose first firing is one period after `now`.
    /// A zero period never fires.
    pub fn new(now: Millis, period: Millis) -> Self {
        let next = (period > 0).then(|| now.saturating_add(period));
        Self { period, next }
    }

    pub fn due(&self) -> Option<Millis> {
        self.next
    }

    pub fn stop(&mut self) {
        self.next = None;
    }

    pub fn fire(&mut self, now: Millis) -> bool {
        let Some(next) = self.next else {
            return false;
        };
        if now < next {
            return false;
        }
        let missed = (now - next) / self.period;
        self.next = Some(next.saturating_add(self.period.saturating_mul(missed + 1)));
        true
    }
}
