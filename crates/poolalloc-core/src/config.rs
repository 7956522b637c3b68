//! Pool configuration and capacity parsing.

use crate::constants::{DEFAULT_CAPACITY, MIN_CAPACITY};
use crate::error::PoolError;

/// Construction-time configuration of a pool.
///
/// The capacity is fixed once the arena is acquired; nothing grows it later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Arena capacity in bytes (0 = default).
    pub capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl PoolConfig {
    /// Create a configuration for the given capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self { capacity }
    }

    /// Normalize the configuration, applying defaults where values are zero.
    #[must_use]
    pub fn normalize(mut self) -> Self {
        if self.capacity == 0 {
            self.capacity = DEFAULT_CAPACITY;
        }
        self
    }

    /// Check that the capacity can host the initial region.
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.capacity < MIN_CAPACITY {
            return Err(PoolError::InvalidCapacity {
                capacity: self.capacity,
                minimum: MIN_CAPACITY,
            });
        }
        Ok(())
    }
}

/// Parse a capacity string (e.g., "10M", "512K", "4096").
///
/// An empty string parses to 0, which `PoolConfig::normalize` maps to the
/// default capacity.
///
/// # Errors
///
/// Returns an error string if the format is invalid or the number cannot be parsed.
pub fn parse_capacity(s: &str) -> Result<usize, String> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(0);
    }

    let (num_str, multiplier) = if let Some(n) = s.strip_suffix('G') {
        (n, 1024 * 1024 * 1024)
    } else if let Some(n) = s.strip_suffix('M') {
        (n, 1024 * 1024)
    } else if let Some(n) = s.strip_suffix('K') {
        (n, 1024)
    } else if let Some(n) = s.strip_suffix('B') {
        (n, 1)
    } else {
        (s, 1)
    };

    let value: usize = num_str
        .trim()
        .parse()
        .map_err(|e| format!("invalid capacity: {e}"))?;
    value
        .checked_mul(multiplier)
        .ok_or_else(|| format!("capacity overflows: {s}"))
}
