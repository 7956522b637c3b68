//! Owned byte arena backing a pool.
//!
//! The buffer is acquired once, never resized, and released when the arena
//! is dropped. An empty arena stands for a detached (moved-from) pool.

use std::ops::Range;

use serde::Serialize;

use crate::error::PoolError;

/// Absolute addresses bounding an arena. `end` is a sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ArenaBounds {
    /// Address of the first arena byte.
    pub begin: usize,
    /// Address one past the last arena byte.
    pub end: usize,
}

/// Fixed-capacity byte buffer.
#[derive(Debug, Default)]
pub struct Arena {
    buf: Vec<u8>,
}

impl Arena {
    /// Acquire a zero-filled arena of exactly `capacity` bytes.
    pub fn acquire(capacity: usize) -> Result<Self, PoolError> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(capacity)
            .map_err(|source| PoolError::ArenaAcquisition { capacity, source })?;
        buf.resize(capacity, 0);
        Ok(Self { buf })
    }

    /// Capacity in bytes (0 once detached).
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Whether this arena owns no buffer.
    #[must_use]
    pub fn is_detached(&self) -> bool {
        self.buf.is_empty()
    }

    /// Begin/end addresses, or `None` for a detached arena.
    #[must_use]
    pub fn bounds(&self) -> Option<ArenaBounds> {
        if self.is_detached() {
            return None;
        }
        let range = self.buf.as_ptr_range();
        Some(ArenaBounds {
            begin: range.start as usize,
            end: range.end as usize,
        })
    }

    /// Move the buffer out, leaving this arena detached.
    #[must_use]
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    /// Borrow a byte range of the arena.
    #[must_use]
    pub fn slice(&self, range: Range<usize>) -> Option<&[u8]> {
        self.buf.get(range)
    }

    /// Mutably borrow a byte range of the arena.
    #[must_use]
    pub fn slice_mut(&mut self, range: Range<usize>) -> Option<&mut [u8]> {
        self.buf.get_mut(range)
    }
}
