#![no_main]

use libfuzzer_sys::fuzz_target;

use poolalloc_core::{PoolAllocator, PoolPtr};

fuzz_target!(|data: &[u8]| {
    let mut pool = match PoolAllocator::<u32>::with_capacity(8192) {
        Ok(pool) => pool,
        Err(_) => return,
    };
    let mut live: Vec<PoolPtr<u32>> = Vec::new();

    // Two bytes per op: high bit picks free vs alloc, the rest sizes it
    for chunk in data.chunks_exact(2) {
        let word = u16::from_le_bytes([chunk[0], chunk[1]]);
        if word & 0x8000 != 0 && !live.is_empty() {
            let ptr = live.swap_remove(usize::from(word) % live.len());
            pool.deallocate(ptr, ptr.len());
        } else {
            let n = usize::from(word & 0x0FFF);
            if let Ok(Some(ptr)) = pool.allocate(n) {
                live.push(ptr);
            }
        }
        assert!(pool.check_invariants().is_ok());
    }

    let usage = pool.usage();
    assert_eq!(
        usage.free_bytes + usage.busy_bytes + usage.header_bytes,
        8192
    );
});
