//! Allocation counters and usage snapshots.

use serde::Serialize;

/// Counters for pool activity since construction or the last reset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AllocStats {
    /// Successful allocations.
    pub allocations: u64,
    /// Zero-length requests answered without touching the arena.
    pub empty_requests: u64,
    /// Failed allocations (out of memory).
    pub failures: u64,
    /// Successful deallocations.
    pub deallocations: u64,
    /// Deallocations rejected by the handle check.
    pub rejected_deallocations: u64,
    /// Allocations that split a region and left a free remainder.
    pub splits: u64,
    /// Allocations that consumed a whole region.
    pub whole_consumes: u64,
    /// Bytes lost to internal fragmentation by whole-region consumes.
    pub slack_bytes: u64,
    /// Squeeze passes that merged at least one neighbour.
    pub squeezes: u64,
    /// Headers collapsed away by squeezing.
    pub merged_headers: u64,
}

impl AllocStats {
    /// Create new zeroed stats.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all counters.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Record a squeeze pass that removed `merged` headers.
    pub fn record_squeeze(&mut self, merged: usize) {
        if merged > 0 {
            self.squeezes += 1;
            self.merged_headers += merged as u64;
        }
    }
}

/// Point-in-time view of how the arena is carved up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PoolUsage {
    /// Arena capacity in bytes.
    pub capacity: usize,
    /// Number of regions in the chain.
    pub regions: usize,
    /// Number of free regions.
    pub free_regions: usize,
    /// Number of busy regions.
    pub busy_regions: usize,
    /// Data bytes in free regions.
    pub free_bytes: usize,
    /// Data bytes in busy regions, including internal fragmentation.
    pub busy_bytes: usize,
    /// Bytes taken by headers.
    pub header_bytes: usize,
    /// Largest free region's data size. Adjacent free regions are counted
    /// separately until an allocation pass squeezes them.
    pub largest_free: usize,
}
