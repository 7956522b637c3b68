//! Property-based tests for the pool allocator.
//!
//! Random allocate/deallocate sequences must keep the header chain
//! well-formed and never disturb live data.

use proptest::prelude::*;

use poolalloc_core::{PoolAllocator, PoolPtr, HEADER_SIZE};

const CAPACITY: usize = 16 * 1024;

#[derive(Debug, Clone)]
enum Op {
    Alloc(usize),
    Free(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0usize..200).prop_map(Op::Alloc),
        2 => any::<usize>().prop_map(Op::Free),
    ]
}

fn extent_sum<T>(pool: &PoolAllocator<T>) -> usize {
    pool.regions().iter().map(|r| HEADER_SIZE + r.size).sum()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Conservation and chain termination hold after every operation, and
    /// live blocks keep their contents.
    #[test]
    fn random_sequences_keep_invariants(ops in prop::collection::vec(op(), 1..200)) {
        let mut pool = PoolAllocator::<u32>::with_capacity(CAPACITY).unwrap();
        let mut live: Vec<(PoolPtr<u32>, u32)> = Vec::new();
        let mut stamp = 0u32;

        for op in ops {
            match op {
                Op::Alloc(n) => match pool.allocate(n) {
                    Ok(Some(ptr)) => {
                        stamp += 1;
                        for i in 0..n {
                            prop_assert!(pool.write(ptr, i, stamp));
                        }
                        live.push((ptr, stamp));
                    }
                    Ok(None) => prop_assert_eq!(n, 0),
                    Err(err) => prop_assert!(err.is_out_of_memory()),
                },
                Op::Free(pick) => {
                    if !live.is_empty() {
                        let (ptr, value) = live.swap_remove(pick % live.len());
                        for i in 0..ptr.len() {
                            prop_assert_eq!(pool.read(ptr, i), Some(value));
                        }
                        pool.deallocate(ptr, ptr.len());
                    }
                }
            }

            prop_assert_eq!(extent_sum(&pool), CAPACITY);
            prop_assert!(pool.regions().len() <= CAPACITY / HEADER_SIZE);
            prop_assert!(pool.check_invariants().is_ok());
        }

        for (ptr, value) in &live {
            for i in 0..ptr.len() {
                prop_assert_eq!(pool.read(*ptr, i), Some(*value));
            }
        }
    }

    /// A released block can be reallocated at the same or a smaller size.
    #[test]
    fn reuse_after_release(n in 1usize..500, shrink in 0usize..500) {
        let mut pool = PoolAllocator::<u64>::with_capacity(CAPACITY).unwrap();
        let ptr = pool.allocate(n).unwrap().unwrap();
        pool.deallocate(ptr, n);
        let m = n - shrink % n;
        let again = pool.allocate(m).unwrap().unwrap();
        prop_assert_eq!(again.offset(), ptr.offset());
    }

    /// Zero-length requests never change the chain.
    #[test]
    fn zero_request_is_idempotent(sizes in prop::collection::vec(1usize..100, 0..20)) {
        let mut pool = PoolAllocator::<u16>::with_capacity(CAPACITY).unwrap();
        for n in sizes {
            let _ = pool.allocate(n);
        }
        let before = pool.regions();
        prop_assert!(pool.allocate(0).unwrap().is_none());
        prop_assert_eq!(pool.regions(), before);
    }

    /// Requests larger than the arena fail and leave the chain untouched.
    #[test]
    fn oversized_requests_fail_cleanly(extra in 0usize..10_000, sizes in prop::collection::vec(1usize..100, 0..20)) {
        let mut pool = PoolAllocator::<u8>::with_capacity(CAPACITY).unwrap();
        for n in sizes {
            let _ = pool.allocate(n);
        }
        let before = pool.regions();
        let err = pool.allocate(CAPACITY + 1 + extra).unwrap_err();
        prop_assert!(err.is_out_of_memory());
        prop_assert_eq!(pool.regions(), before);
    }

    /// Two adjacent released blocks satisfy a request larger than either.
    #[test]
    fn adjacent_blocks_coalesce(a in 1usize..2000, b in 1usize..2000) {
        let mut pool = PoolAllocator::<u8>::with_capacity(CAPACITY).unwrap();
        let first = pool.allocate(a).unwrap().unwrap();
        let second = pool.allocate(b).unwrap().unwrap();
        // Pin the rest of the arena so only the merged pair can serve.
        let rest = pool.usage().largest_free;
        let _pin = pool.allocate(rest - 1).unwrap().unwrap();

        pool.deallocate(first, a);
        pool.deallocate(second, b);

        let request = a + b + HEADER_SIZE - 1;
        let merged = pool.allocate(request).unwrap().unwrap();
        prop_assert_eq!(merged.offset(), first.offset());
        prop_assert!(pool.check_invariants().is_ok());
    }
}
