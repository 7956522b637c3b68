//! # poolalloc-core
//!
//! Fixed-capacity pool allocator over a single owned arena.
//!
//! The arena is carved into regions, each preceded by a header. Allocation
//! walks the header chain first-fit, merging runs of free regions as it
//! reaches them, and splits the first region that fits. Release is
//! constant-time and leaves merging to the next allocation pass.
//!
//! # Example
//! ```
//! use poolalloc_core::PoolAllocator;
//!
//! let mut pool = PoolAllocator::<u64>::with_capacity(4096).unwrap();
//! let block = pool.allocate(16).unwrap().expect("non-empty request");
//! pool.write(block, 0, 42);
//! assert_eq!(pool.read(block, 0), Some(42));
//! pool.deallocate(block, 16);
//! ```
#![warn(missing_docs)]

pub mod allocator;
pub mod arena;
pub mod block;
pub(crate) mod chain;
pub mod config;
pub mod constants;
pub mod error;
pub mod stats;

// Re-exports
pub use allocator::{allocators_equal, allocators_not_equal, PoolAllocator};
pub use arena::ArenaBounds;
pub use block::{PoolPtr, RegionInfo};
pub use config::{parse_capacity, PoolConfig};
pub use constants::{exit_codes, DEFAULT_CAPACITY, HEADER_SIZE, MIN_CAPACITY};
pub use error::PoolError;
pub use stats::{AllocStats, PoolUsage};
