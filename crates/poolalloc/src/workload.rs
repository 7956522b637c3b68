//! Seeded allocate/deallocate workload replay.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info};

use poolalloc_core::{PoolAllocator, PoolPtr};

/// Shape of a generated workload.
#[derive(Debug, Clone, Copy)]
pub struct WorkloadSpec {
    /// Number of operations to replay.
    pub ops: usize,
    /// Largest element count per allocation (requests range over `0..=max_elems`).
    pub max_elems: usize,
    /// Probability that an operation releases a live block.
    pub free_ratio: f64,
    /// Generator seed.
    pub seed: u64,
}

/// What happened during a replay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Outcome {
    /// Successful allocations.
    pub allocations: usize,
    /// Zero-length requests.
    pub empty_requests: usize,
    /// Allocations that ran out of memory.
    pub failures: usize,
    /// Blocks released during the replay.
    pub releases: usize,
    /// Live blocks whose contents changed before release.
    pub corrupted_blocks: usize,
    /// Most blocks live at once.
    pub peak_live: usize,
    /// Blocks still live when the replay ended.
    pub live_at_end: usize,
}

struct LiveBlock {
    ptr: PoolPtr<u64>,
    stamp: u64,
}

fn pattern(stamp: u64, index: usize) -> u64 {
    stamp.rotate_left(17) ^ index as u64
}

/// Replay a workload, stamping every block and checking the stamp on release.
pub fn replay(pool: &mut PoolAllocator<u64>, spec: &WorkloadSpec) -> Outcome {
    let mut rng = StdRng::seed_from_u64(spec.seed);
    let mut live: Vec<LiveBlock> = Vec::new();
    let mut outcome = Outcome::default();
    let mut next_stamp = 0u64;

    for _ in 0..spec.ops {
        if !live.is_empty() && rng.gen_bool(spec.free_ratio) {
            let block = live.swap_remove(rng.gen_range(0..live.len()));
            if !verify(pool, &block) {
                outcome.corrupted_blocks += 1;
            }
            pool.deallocate(block.ptr, block.ptr.len());
            outcome.releases += 1;
            continue;
        }

        let n = rng.gen_range(0..=spec.max_elems);
        match pool.allocate(n) {
            Ok(Some(ptr)) => {
                next_stamp += 1;
                let stamped = (0..n).all(|i| pool.write(ptr, i, pattern(next_stamp, i)));
                debug_assert!(stamped, "fresh block rejected its stamp");
                live.push(LiveBlock {
                    ptr,
                    stamp: next_stamp,
                });
                outcome.allocations += 1;
                outcome.peak_live = outcome.peak_live.max(live.len());
            }
            Ok(None) => outcome.empty_requests += 1,
            Err(err) => {
                debug!(n, error = %err, "allocation refused");
                outcome.failures += 1;
            }
        }
    }

    for block in &live {
        if !verify(pool, block) {
            outcome.corrupted_blocks += 1;
        }
    }
    outcome.live_at_end = live.len();

    info!(
        allocations = outcome.allocations,
        failures = outcome.failures,
        releases = outcome.releases,
        "replay finished"
    );
    outcome
}

fn verify(pool: &PoolAllocator<u64>, block: &LiveBlock) -> bool {
    (0..block.ptr.len()).all(|i| pool.read(block.ptr, i) == Some(pattern(block.stamp, i)))
}
