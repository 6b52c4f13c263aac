//! Tile cache counters.

use std::fmt;

/// Running totals kept by the tile cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Fetch orders handed out by reconciliation.
    pub fetches_issued: u64,
    /// Results attached to the map.
    pub installs: u64,
    /// Results dropped because their entry was evicted or superseded.
    pub stale_discards: u64,
    /// Fetches that completed with an error.
    pub failures: u64,
    /// Entries removed from the cache.
    pub evictions: u64,
    /// Evicted entries whose fetch was still in flight.
    pub cancellations: u64,
}

impl CacheStats {
    /// Fraction of issued fetches that ended up on the map.
    pub fn install_ratio(&self) -> f64 {
        if self.fetches_issued == 0 {
            0.0
        } else {
            self.installs as f64 / self.fetches_issued as f64
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "issued={} installed={} stale={} failed={} evicted={} cancelled={}",
            self.fetches_issued,
            self.installs,
            self.stale_discards,
            self.failures,
            self.evictions,
            self.cancellations
        )
    }
}
