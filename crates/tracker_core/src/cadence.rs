use std::time::Duration;

/// What a cadence wants done at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickDecision {
    /// The interval elapsed and nothing is outstanding. Call [`Cadence::begin`] if work is issued.
    Fire,
    /// The interval elapsed but the previous request is still outstanding; the tick is dropped.
    SkipOutstanding,
    NotDue,
    Stopped,
}

/// Fixed-interval scheduled task with single-flight semantics.
///
/// Time is supplied by the caller as a `Duration` since an arbitrary origin, so
/// a test can drive it with a virtual clock by passing plain values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cadence {
    interval: Duration,
    next_due: Option<Duration>,
    outstanding: bool,
}

impl Cadence {
    /// Creates a stopped cadence.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_due: None,
            outstanding: false,
        }
    }

    /// Starts (or restarts) the cadence; the first tick is due immediately.
    pub fn start(&mut self, now: Duration) {
        self.next_due = Some(now);
        self.outstanding = false;
    }

    pub fn stop(&mut self) {
        self.next_due = None;
        self.outstanding = false;
    }

    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    pub fn is_outstanding(&self) -> bool {
        self.outstanding
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn poll(&mut self, now: Duration) -> TickDecision {
        let Some(due) = self.next_due else {
            return TickDecision::Stopped;
        };
        if now < due {
            return TickDecision::NotDue;
        }
        // Missed ticks are coalesced into one rather than fired in a burst.
        self.next_due = Some(next_after(due, now, self.interval));
        if self.outstanding {
            TickDecision::SkipOutstanding
        } else {
            TickDecision::Fire
        }
    }

    /// Marks a request as issued for the tick that just fired.
    pub fn begin(&mut self) {
        self.outstanding = true;
    }

    /// Marks the outstanding request as finished.
    pub fn complete(&mut self) {
        self.outstanding = false;
    }
}

fn next_after(due: Duration, now: Duration, interval: Duration) -> Duration {
    let interval_ns = interval.as_nanos().max(1);
    let behind = now.saturating_sub(due).as_nanos();
    let periods = behind / interval_ns + 1;
    let offset = u64::try_from(periods * interval_ns).unwrap_or(u64::MAX);
    due.saturating_add(Duration::from_nanos(offset))
}
