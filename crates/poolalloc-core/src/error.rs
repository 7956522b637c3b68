//! Error type for pool operations.

use std::collections::TryReserveError;

/// Error type for arena construction and allocation.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// The arena bytes could not be obtained from the system allocator.
    #[error("failed to acquire a {capacity}-byte arena")]
    ArenaAcquisition {
        /// Requested arena capacity in bytes.
        capacity: usize,
        /// Underlying reservation failure.
        #[source]
        source: TryReserveError,
    },

    /// The configured capacity cannot host even one region header.
    #[error("capacity {capacity} is below the minimum of {minimum} bytes")]
    InvalidCapacity {
        /// Configured capacity.
        capacity: usize,
        /// Minimum accepted capacity.
        minimum: usize,
    },

    /// No region, even after coalescing, can satisfy the request.
    #[error("out of memory: {requested} bytes requested from a {capacity}-byte arena")]
    OutOfMemory {
        /// Requested data bytes (saturated on overflow).
        requested: usize,
        /// Arena capacity in bytes.
        capacity: usize,
    },

    /// The handle does not name a region header in this arena.
    #[error("no region starts at data offset {offset}")]
    InvalidHandle {
        /// Data offset carried by the handle.
        offset: usize,
    },

    /// The handle names a region that is already free or was reissued.
    #[error("region at data offset {offset} is not live")]
    DoubleFree {
        /// Data offset carried by the handle.
        offset: usize,
    },

    /// The header chain violates a structural invariant.
    #[error("header chain corrupted: {0}")]
    Corrupted(String),
}

impl PoolError {
    /// Whether this is an allocation exhaustion.
    #[must_use]
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, Self::OutOfMemory { .. })
    }
}
