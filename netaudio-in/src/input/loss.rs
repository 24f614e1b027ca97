//! Delivered vs. missing block accounting
//!
//! Counters describe a single connection epoch: they only grow while the
//! stream stays connected and are zeroed together when it goes away.

/// Snapshot of a consumer's loss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LossStats {
    /// Blocks forwarded downstream
    pub received: u64,
    /// Ticks with no block ready
    pub missing: u64,
}

impl LossStats {
    /// Loss ratio as a percentage of received blocks (`missing / received * 100`)
    ///
    /// None while nothing has been received.
    pub fn loss_ratio(&self) -> Option<f64> {
        if self.received == 0 {
            None
        } else {
            Some(self.missing as f64 * 100.0 / self.received as f64)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.received == 0 && self.missing == 0
    }
}

/// Resettable loss counter pair
#[derive(Debug, Default, Clone)]
pub struct LossTracker {
    stats: LossStats,
}

impl LossTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a forwarded block
    pub fn record_received(&mut self) -> LossStats {
        self.stats.received = self.stats.received.saturating_add(1);
        self.stats
    }

    /// Count a tick without a block
    pub fn record_missing(&mut self) -> LossStats {
        self.stats.missing = self.stats.missing.saturating_add(1);
        self.stats
    }

    /// Zero both counters, returning what they held
    pub fn reset(&mut self) -> LossStats {
        std::mem::take(&mut self.stats)
    }

    pub fn stats(&self) -> LossStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_zero() {
        let tracker = LossTracker::new();
        assert!(tracker.stats().is_empty());
        assert_eq!(tracker.stats().loss_ratio(), None);
    }

    #[test]
    fn test_loss_ratio() {
        let mut tracker = LossTracker::new();
        tracker.record_received();
        tracker.record_received();
        let stats = tracker.record_missing();

        assert_eq!(stats, LossStats { received: 2, missing: 1 });
        assert_eq!(format!("{:.3}", stats.loss_ratio().unwrap()), "50.000");
    }

    #[test]
    fn test_loss_ratio_undefined_without_received() {
        let mut tracker = LossTracker::new();
        tracker.record_missing();
        assert_eq!(tracker.stats().loss_ratio(), None);
    }

    #[test]
    fn test_reset_clears_both_and_returns_previous() {
        let mut tracker = LossTracker::new();
        tracker.record_received();
        tracker.record_missing();
        tracker.record_missing();

        let previous = tracker.reset();
        assert_eq!(previous, LossStats { received: 1, missing: 2 });
        assert!(tracker.stats().is_empty());
    }
}
