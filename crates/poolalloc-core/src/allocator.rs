//! Typed pool allocator over a fixed arena.
//!
//! `PoolAllocator<T>` hands out blocks sized for `n` elements of `T` from a
//! single arena acquired at construction. Allocation is first-fit over the
//! header chain with lazy coalescing; release is constant-time and never
//! merges neighbours.

use std::fmt;
use std::marker::PhantomData;
use std::mem::size_of;
use std::ops::Range;

use tracing::{debug, trace, warn};

use crate::arena::{Arena, ArenaBounds};
use crate::block::{PoolPtr, RegionInfo};
use crate::chain::{HeaderChain, Placement};
use crate::config::PoolConfig;
use crate::constants::HEADER_SIZE;
use crate::error::PoolError;
use crate::stats::{AllocStats, PoolUsage};

/// Fixed-capacity first-fit allocator for elements of `T`.
///
/// The allocator owns its arena; it is move-only and never grows.
pub struct PoolAllocator<T> {
    arena: Arena,
    chain: HeaderChain,
    stats: AllocStats,
    _marker: PhantomData<fn() -> T>,
}

impl<T> PoolAllocator<T> {
    /// Create an allocator with the default capacity.
    pub fn new() -> Result<Self, PoolError> {
        Self::from_config(&PoolConfig::default())
    }

    /// Create an allocator over an arena of `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Result<Self, PoolError> {
        Self::from_config(&PoolConfig::with_capacity(capacity))
    }

    /// Create an allocator from a configuration.
    pub fn from_config(config: &PoolConfig) -> Result<Self, PoolError> {
        config.validate()?;
        let arena = Arena::acquire(config.capacity)?;
        debug!(
            capacity = config.capacity,
            element_size = size_of::<T>(),
            "acquired arena"
        );
        Ok(Self {
            chain: HeaderChain::new(config.capacity),
            arena,
            stats: AllocStats::new(),
            _marker: PhantomData,
        })
    }

    /// Allocator for another element type with the same capacity and a
    /// fresh, independent arena.
    pub fn rebind<U>(&self) -> Result<PoolAllocator<U>, PoolError> {
        PoolAllocator::with_capacity(self.capacity())
    }

    /// Transfer the arena to a new allocator, leaving `self` detached.
    ///
    /// A detached allocator has no bounds, fails every allocation and
    /// ignores releases.
    #[must_use]
    pub fn take(&mut self) -> Self {
        Self {
            arena: self.arena.take(),
            chain: std::mem::take(&mut self.chain),
            stats: std::mem::take(&mut self.stats),
            _marker: PhantomData,
        }
    }

    /// Allocate room for `n` elements.
    ///
    /// Returns `Ok(None)` for `n == 0` without touching the arena.
    pub fn allocate(&mut self, n: usize) -> Result<Option<PoolPtr<T>>, PoolError> {
        if n == 0 {
            self.stats.empty_requests += 1;
            return Ok(None);
        }

        let capacity = self.capacity();
        let Some(bytes) = n.checked_mul(size_of::<T>()) else {
            return Err(self.exhausted(usize::MAX));
        };
        // Cannot fit even in a fully coalesced arena; fail without walking.
        if bytes >= capacity.saturating_sub(HEADER_SIZE) {
            return Err(self.exhausted(bytes));
        }

        let Some((at, header)) = self.chain.first_fit(bytes, &mut self.stats) else {
            return Err(self.exhausted(bytes));
        };

        let placed = self.chain.split(at, header, bytes);
        match placed.placement {
            Placement::Split { remainder } => {
                self.stats.splits += 1;
                trace!(at = placed.at, remainder, "placed with free remainder");
            }
            Placement::Whole { slack } => {
                self.stats.whole_consumes += 1;
                self.stats.slack_bytes += slack as u64;
            }
        }
        self.stats.allocations += 1;
        Ok(Some(PoolPtr::new(placed.at + HEADER_SIZE, n, placed.tag)))
    }

    /// Release a block. Never fails.
    ///
    /// `n` is advisory; the region size is recomputed from the chain.
    /// Handles that are not live in this pool, including handles issued by
    /// another pool, are ignored and logged.
    pub fn deallocate(&mut self, ptr: PoolPtr<T>, n: usize) {
        if let Err(err) = self.try_deallocate(ptr) {
            warn!(offset = ptr.offset(), n, error = %err, "ignored release");
        }
    }

    /// Release a block, reporting handles that are not live in this pool.
    pub fn try_deallocate(&mut self, ptr: PoolPtr<T>) -> Result<(), PoolError> {
        match self.chain.release(ptr.offset(), ptr.tag()) {
            Ok(_) => {
                self.stats.deallocations += 1;
                Ok(())
            }
            Err(err) => {
                self.stats.rejected_deallocations += 1;
                Err(err)
            }
        }
    }

    /// Bytes of the elements behind a live handle.
    #[must_use]
    pub fn bytes(&self, ptr: PoolPtr<T>) -> Option<&[u8]> {
        let range = self.data_range(ptr)?;
        self.arena.slice(range)
    }

    /// Mutable bytes of the elements behind a live handle.
    #[must_use]
    pub fn bytes_mut(&mut self, ptr: PoolPtr<T>) -> Option<&mut [u8]> {
        let range = self.data_range(ptr)?;
        self.arena.slice_mut(range)
    }

    fn data_range(&self, ptr: PoolPtr<T>) -> Option<Range<usize>> {
        let header = self.chain.live(ptr.offset(), ptr.tag())?;
        let len = ptr.byte_len();
        if len > header.size {
            return None;
        }
        Some(header.data..header.data + len)
    }

    fn exhausted(&mut self, requested: usize) -> PoolError {
        self.stats.failures += 1;
        let capacity = self.capacity();
        debug!(requested, capacity, "allocation failed");
        PoolError::OutOfMemory {
            requested,
            capacity,
        }
    }

    /// Arena capacity in bytes (0 once detached).
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.arena.capacity()
    }

    /// Arena begin/end addresses, or `None` once detached.
    #[must_use]
    pub fn bounds(&self) -> Option<ArenaBounds> {
        self.arena.bounds()
    }

    /// Whether the arena has been moved out.
    #[must_use]
    pub fn is_detached(&self) -> bool {
        self.arena.is_detached()
    }

    /// Whether both allocators own the same arena. Only true for an
    /// allocator compared with itself.
    #[must_use]
    pub fn same_arena(&self, other: &Self) -> bool {
        match (self.bounds(), other.bounds()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Regions in chain order.
    #[must_use]
    pub fn regions(&self) -> Vec<RegionInfo> {
        self.chain.walk().collect()
    }

    /// Summary of the current chain.
    #[must_use]
    pub fn usage(&self) -> PoolUsage {
        let mut usage = PoolUsage {
            capacity: self.capacity(),
            ..PoolUsage::default()
        };
        for region in self.chain.walk() {
            usage.regions += 1;
            usage.header_bytes += HEADER_SIZE;
            if region.busy {
                usage.busy_regions += 1;
                usage.busy_bytes += region.size;
            } else {
                usage.free_regions += 1;
                usage.free_bytes += region.size;
                usage.largest_free = usage.largest_free.max(region.size);
            }
        }
        usage
    }

    /// Activity counters.
    #[must_use]
    pub fn stats(&self) -> &AllocStats {
        &self.stats
    }

    /// Reset activity counters.
    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    /// Verify the structural invariants of the header chain.
    pub fn check_invariants(&self) -> Result<(), PoolError> {
        if self.chain.end() != self.capacity() {
            return Err(PoolError::Corrupted(format!(
                "chain ends at {} but the arena holds {} bytes",
                self.chain.end(),
                self.capacity()
            )));
        }
        self.chain.check()
    }
}

impl<T: bytemuck::Pod> PoolAllocator<T> {
    /// Read element `index` of a live block.
    #[must_use]
    pub fn read(&self, ptr: PoolPtr<T>, index: usize) -> Option<T> {
        if index >= ptr.len() {
            return None;
        }
        let bytes = self.bytes(ptr)?;
        let start = index * size_of::<T>();
        Some(bytemuck::pod_read_unaligned(
            &bytes[start..start + size_of::<T>()],
        ))
    }

    /// Write element `index` of a live block. Returns false for a stale
    /// handle or an out-of-range index.
    pub fn write(&mut self, ptr: PoolPtr<T>, index: usize, value: T) -> bool {
        if index >= ptr.len() {
            return false;
        }
        let Some(bytes) = self.bytes_mut(ptr) else {
            return false;
        };
        let start = index * size_of::<T>();
        bytes[start..start + size_of::<T>()].copy_from_slice(bytemuck::bytes_of(&value));
        true
    }
}

impl<T> fmt::Debug for PoolAllocator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolAllocator")
            .field("capacity", &self.capacity())
            .field("bounds", &self.bounds())
            .field("regions", &self.chain.len())
            .finish_non_exhaustive()
    }
}

/// Any two allocators of the same element type compare equal, following the
/// stateless-allocator convention. Use `same_arena` for identity.
impl<T> PartialEq for PoolAllocator<T> {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl<T> Eq for PoolAllocator<T> {}

/// Always `true` for two allocators of the same element type.
#[must_use]
pub fn allocators_equal<T>(_a: &PoolAllocator<T>, _b: &PoolAllocator<T>) -> bool {
    true
}

/// Always `false` for two allocators of the same element type.
#[must_use]
pub fn allocators_not_equal<T>(_a: &PoolAllocator<T>, _b: &PoolAllocator<T>) -> bool {
    false
}
