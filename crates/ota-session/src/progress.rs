use std::time::Duration;

/// What the limiter lets through: bytes since the last report and how many
/// notifications were swallowed in between.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tick {
    pub since_last: u64,
    pub suppressed: u32,
}

/// Lets at most one progress report through per interval.
///
/// The first delivery after a reset always reports. Later ones report only
/// once `interval` has passed since the previous report; the rest are
/// counted so the next report (or a [`flush`](Self::flush)) can say how
/// many were skipped.
#[derive(Clone, Debug)]
pub struct ProgressLimiter {
    interval: Duration,
    last: Option<Duration>,
    since_last: u64,
    suppressed: u32,
}

impl ProgressLimiter {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
            since_last: 0,
            suppressed: 0,
        }
    }

    /// Account for `bytes` received at `now`.
    pub fn record(&mut self, now: Duration, bytes: usize) -> Option<Tick> {
        self.since_last += bytes as u64;
        if let Some(last) = self.last {
            if now.saturating_sub(last) < self.interval {
                self.suppressed = self.suppressed.saturating_add(1);
                return None;
            }
        }

        let tick = Tick {
            since_last: self.since_last,
            suppressed: self.suppressed,
        };
        self.last = Some(now);
        self.since_last = 0;
        self.suppressed = 0;
        Some(tick)
    }

    /// Return the suppressed count and start over.
    pub fn flush(&mut self) -> u32 {
        let suppressed = self.suppressed;
        *self = Self::new(self.interval);
        suppressed
    }
}
