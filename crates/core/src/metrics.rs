use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

/// Lightweight counters for per-frame render caches.
///
/// # Example
/// ```rust
/// use burnin_core::metrics::Metrics;
///
/// let metrics = Metrics::default();
/// metrics.render();
/// metrics.cache_hit();
/// assert_eq!(metrics.renders(), 1);
/// assert_eq!(metrics.cache_hits(), 1);
/// ```
#[derive(Debug, Default)]
pub struct Metrics {
    frames: AtomicU64,
    renders: AtomicU64,
    cache_hits: AtomicU64,
    skipped_empty: AtomicU64,
    skipped_clipped: AtomicU64,
    last_nanos: AtomicU64,
}

impl Metrics {
    /// Increment processed frame counter.
    pub fn frame(&self) {
        self.frames.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment render (rasterization) counter.
    pub fn render(&self) {
        self.renders.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment cached-patch reuse counter.
    pub fn cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment counter for items skipped because they produced nothing to draw.
    pub fn skip_empty(&self) {
        self.skipped_empty.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment counter for items skipped because they did not fit the frame.
    pub fn skip_clipped(&self) {
        self.skipped_clipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the duration of the most recent frame.
    pub fn record_duration(&self, dur: Duration) {
        let nanos = dur.as_nanos().min(u64::MAX as u128) as u64;
        self.last_nanos.store(nanos, Ordering::Relaxed);
    }

    /// Snapshot of processed frames.
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    /// Snapshot of renders.
    pub fn renders(&self) -> u64 {
        self.renders.load(Ordering::Relaxed)
    }

    /// Snapshot of cache hits.
    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    /// Snapshot of empty skips.
    pub fn skipped_empty(&self) -> u64 {
        self.skipped_empty.load(Ordering::Relaxed)
    }

    /// Snapshot of clipped skips.
    pub fn skipped_clipped(&self) -> u64 {
        self.skipped_clipped.load(Ordering::Relaxed)
    }

    /// Last frame duration in milliseconds, if one was recorded.
    pub fn last_millis(&self) -> Option<f64> {
        let last = self.last_nanos.load(Ordering::Relaxed);
        if last == 0 {
            None
        } else {
            Some(last as f64 / 1_000_000.0)
        }
    }
}

impl Clone for Metrics {
    fn clone(&self) -> Self {
        let cloned = Metrics::default();
        cloned.frames.store(self.frames(), Ordering::Relaxed);
        cloned.renders.store(self.renders(), Ordering::Relaxed);
        cloned.cache_hits.store(self.cache_hits(), Ordering::Relaxed);
        cloned
            .skipped_empty
            .store(self.skipped_empty(), Ordering::Relaxed);
        cloned
            .skipped_clipped
            .store(self.skipped_clipped(), Ordering::Relaxed);
        cloned
            .last_nanos
            .store(self.last_nanos.load(Ordering::Relaxed), Ordering::Relaxed);
        cloned
    }
}
