//! Region headers and the caller-visible handle type.

use std::fmt;
use std::marker::PhantomData;

use serde::Serialize;

use crate::constants::HEADER_SIZE;

/// Metadata describing one region of the arena.
///
/// ```text
/// header           data = header + HEADER_SIZE          next
///   |                 |                                   |
///   +-----------------+-----------------------------------+----
///   |  HEADER_SIZE    |             size bytes            | ...
///   +-----------------+-----------------------------------+----
/// ```
///
/// All positions are byte offsets from the start of the arena; the arena's
/// capacity is the end sentinel and is never itself a header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BlockHeader {
    /// Offset of the first data byte.
    pub data: usize,
    /// Data length in bytes.
    pub size: usize,
    /// Busy flag.
    pub is_busy: bool,
    /// Offset of the next header, or the end sentinel.
    pub next: usize,
    /// Identifier issued on the last free-to-busy transition (0 when never busy).
    pub tag: u64,
}

impl BlockHeader {
    /// Free region whose header sits at `at` and whose extent ends at `next`.
    pub fn free(at: usize, next: usize) -> Self {
        Self {
            data: at + HEADER_SIZE,
            size: next - at - HEADER_SIZE,
            is_busy: false,
            next,
            tag: 0,
        }
    }

    /// Busy region at `at` holding `size` data bytes followed by `next`.
    pub fn busy(at: usize, size: usize, next: usize, tag: u64) -> Self {
        Self {
            data: at + HEADER_SIZE,
            size,
            is_busy: true,
            next,
            tag,
        }
    }
}

/// Read-only view of one region, as reported by `PoolAllocator::regions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegionInfo {
    /// Offset of the region header.
    pub header: usize,
    /// Offset of the first data byte.
    pub data: usize,
    /// Data length in bytes.
    pub size: usize,
    /// Busy flag.
    pub busy: bool,
    /// Offset of the next header (or the arena capacity for the last region).
    pub next: usize,
}

impl RegionInfo {
    /// Header plus data bytes.
    #[must_use]
    pub fn extent(&self) -> usize {
        HEADER_SIZE + self.size
    }
}

impl BlockHeader {
    pub(crate) fn info(&self, at: usize) -> RegionInfo {
        RegionInfo {
            header: at,
            data: self.data,
            size: self.size,
            busy: self.is_busy,
            next: self.next,
        }
    }
}

/// Handle to `len` elements of `T` handed out by a pool.
///
/// It is the pool's pointer type: an arena offset plus the tag of the busy
/// region it was issued for. Handles are plain values; releasing one twice or
/// passing it to another pool is a caller error.
pub struct PoolPtr<T> {
    offset: usize,
    len: usize,
    tag: u64,
    _marker: PhantomData<fn() -> T>,
}

impl<T> PoolPtr<T> {
    pub(crate) fn new(offset: usize, len: usize, tag: u64) -> Self {
        Self {
            offset,
            len,
            tag,
            _marker: PhantomData,
        }
    }

    /// Arena offset of the first data byte.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Element count requested at allocation.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false; zero-length requests never produce a handle.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn tag(&self) -> u64 {
        self.tag
    }

    /// Byte length of the requested elements.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.len * std::mem::size_of::<T>()
    }
}

impl<T> Clone for PoolPtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for PoolPtr<T> {}

impl<T> PartialEq for PoolPtr<T> {
    fn eq(&self, other: &Self) -> bool {
        self.offset == other.offset && self.len == other.len && self.tag == other.tag
    }
}

impl<T> Eq for PoolPtr<T> {}

impl<T> fmt::Debug for PoolPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolPtr")
            .field("offset", &self.offset)
            .field("len", &self.len)
            .field("tag", &self.tag)
            .finish()
    }
}
