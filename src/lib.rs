//! Shared helpers for the workspace integration tests.

use poolalloc_core::{PoolAllocator, HEADER_SIZE};

/// Sum of header plus data bytes over the whole chain.
pub fn extent_sum<T>(pool: &PoolAllocator<T>) -> usize {
    pool.regions().iter().map(|r| HEADER_SIZE + r.size).sum()
}

/// Assert that the chain terminates, is contiguous and covers the arena.
pub fn assert_well_formed<T>(pool: &PoolAllocator<T>) {
    let regions = pool.regions();
    assert!(
        regions.len() <= pool.capacity() / HEADER_SIZE,
        "chain longer than the arena can hold"
    );
    let mut expected = 0;
    for region in &regions {
        assert_eq!(region.header, expected, "gap or overlap before {region:?}");
        assert_eq!(region.next, region.header + HEADER_SIZE + region.size);
        expected = region.next;
    }
    assert_eq!(expected, pool.capacity(), "chain does not reach the end");
    assert_eq!(extent_sum(pool), pool.capacity());
    if let Err(err) = pool.check_invariants() {
        panic!("invariant check failed: {err}");
    }
}
