use std::{
    sync::{
        Arc,
        atomic::{AtomicI64, AtomicU64, Ordering},
    },
    time::Instant,
};

use chrono::{DateTime, FixedOffset, Local, TimeZone, Utc};

/// Time sources for the overlay stage.
///
/// The rate limiter only ever reads `monotonic_ms`; `wall_time` feeds the
/// human-visible strftime expansion and may jump.
pub trait Clock: Send {
    /// Milliseconds on a monotonic timeline.
    fn monotonic_ms(&self) -> u64;
    /// Local wall-clock time.
    fn wall_time(&self) -> DateTime<FixedOffset>;
}

/// Process clock: `Instant` for monotonic time, `chrono::Local` for wall time.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn monotonic_ms(&self) -> u64 {
        self.origin.elapsed().as_millis().min(u64::MAX as u128) as u64
    }

    fn wall_time(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// Manually driven clock for tests and offline replays.
///
/// Clones share the same timeline, so a test can keep one handle while the
/// stage owns another.
///
/// # Example
/// ```rust
/// use burnin::clock::{Clock, ManualClock};
///
/// let clock = ManualClock::new();
/// let handle = clock.clone();
/// handle.advance_ms(250);
/// assert_eq!(clock.monotonic_ms(), 250);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    mono_ms: Arc<AtomicU64>,
    wall_secs: Arc<AtomicI64>,
}

impl ManualClock {
    /// Clock at monotonic 0 and wall time 1970-01-01T00:00:00Z.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_ms(&self, ms: u64) {
        self.mono_ms.store(ms, Ordering::Relaxed);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.mono_ms.fetch_add(ms, Ordering::Relaxed);
    }

    /// Set wall time as seconds since the Unix epoch (UTC); independent of the monotonic timeline.
    pub fn set_wall_secs(&self, secs: i64) {
        self.wall_secs.store(secs, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn monotonic_ms(&self) -> u64 {
        self.mono_ms.load(Ordering::Relaxed)
    }

    fn wall_time(&self) -> DateTime<FixedOffset> {
        Utc.timestamp_opt(self.wall_secs.load(Ordering::Relaxed), 0)
            .single()
            .unwrap_or_default()
            .fixed_offset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wall_time_does_not_move_monotonic() {
        let clock = ManualClock::new();
        clock.set_ms(500);
        clock.set_wall_secs(-86_400);
        assert_eq!(clock.monotonic_ms(), 500);
        assert_eq!(clock.wall_time().timestamp(), -86_400);
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.monotonic_ms();
        let b = clock.monotonic_ms();
        assert!(b >= a);
    }
}
