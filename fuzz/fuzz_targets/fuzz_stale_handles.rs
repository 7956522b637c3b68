#![no_main]

use libfuzzer_sys::fuzz_target;

use poolalloc_core::{PoolAllocator, PoolPtr};

fuzz_target!(|data: &[u8]| {
    let Ok(mut pool) = PoolAllocator::<u8>::with_capacity(4096) else {
        return;
    };
    let mut issued: Vec<PoolPtr<u8>> = Vec::new();

    // Release arbitrary previously issued handles, including repeats
    for &byte in data {
        if byte < 0x80 || issued.is_empty() {
            if let Ok(Some(ptr)) = pool.allocate(usize::from(byte) + 1) {
                issued.push(ptr);
            }
        } else {
            let ptr = issued[usize::from(byte) % issued.len()];
            let _ = pool.try_deallocate(ptr);
        }
        assert!(pool.check_invariants().is_ok());
    }
});
