//! Constants for arena sizing and process exit codes.

use std::mem::size_of;

/// Default arena capacity in bytes (ten million).
pub const DEFAULT_CAPACITY: usize = 10_000_000;

/// Bytes reserved in front of every region's data area.
///
/// Four machine words: data offset, data size, busy flag (padded to a word)
/// and the offset of the next header. 32 bytes on 64-bit targets.
pub const HEADER_SIZE: usize = 4 * size_of::<usize>();

/// Smallest capacity that can host the initial region.
pub const MIN_CAPACITY: usize = HEADER_SIZE;

/// Exit codes for the workload replay tool.
pub mod exit_codes {
    /// Generic error.
    pub const ERROR_GENERIC: i32 = 1;
    /// Arena could not be acquired.
    pub const ERROR_ARENA: i32 = 2;
    /// Data or header chain corruption detected.
    pub const ERROR_CORRUPTION: i32 = 3;
    /// Invalid configuration.
    pub const ERROR_CONFIG: i32 = 4;
}
