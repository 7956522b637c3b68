//! The header chain: first-fit search, squeeze and split.
//!
//! Headers are kept in a side table keyed by header offset. The chain itself
//! is the sequence obtained by following `next` from offset 0 until the end
//! sentinel (the arena capacity).
//!
//! ```text
//!  0                                                              end
//!  +--------+------+--------+-----------+--------+------+--------+
//!  | header | busy | header |   free    | header | free | ...    |
//!  +--------+------+--------+-----------+--------+------+--------+
//!      |               ^  |                 ^  |             ^
//!      +---- next -----+  +----- next ------+  +--- next ----+
//! ```
//!
//! Releasing a region never touches its neighbours. Runs of adjacent free
//! regions are collapsed lazily, by `squeeze`, when an allocation pass
//! reaches them.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, trace};

use crate::block::{BlockHeader, RegionInfo};
use crate::constants::HEADER_SIZE;
use crate::error::PoolError;
use crate::stats::AllocStats;

/// How a free region was turned busy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Placement {
    /// Exact-size busy region followed by a free remainder at `remainder`.
    Split { remainder: usize },
    /// The whole region became busy; `slack` bytes are internal fragmentation.
    Whole { slack: usize },
}

/// Outcome of placing a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Placed {
    /// Header offset of the busy region.
    pub at: usize,
    /// Tag issued to the busy region.
    pub tag: u64,
    /// Split decision taken.
    pub placement: Placement,
}

/// Source of busy-region tags, shared by every pool in the process so a
/// handle never matches a region of a pool that did not issue it. Starts at
/// 1; tag 0 marks a header that was never busy.
static NEXT_TAG: AtomicU64 = AtomicU64::new(1);

fn next_tag() -> u64 {
    NEXT_TAG.fetch_add(1, Ordering::Relaxed)
}

/// Side table of region headers.
#[derive(Debug, Default)]
pub(crate) struct HeaderChain {
    headers: BTreeMap<usize, BlockHeader>,
    end: usize,
}

impl HeaderChain {
    /// Chain holding one free region over `[0, capacity)`.
    ///
    /// `capacity` must be at least `HEADER_SIZE`.
    pub fn new(capacity: usize) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert(0, BlockHeader::free(0, capacity));
        Self {
            headers,
            end: capacity,
        }
    }

    /// End sentinel offset.
    pub fn end(&self) -> usize {
        self.end
    }

    /// Number of headers in the table.
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Iterate regions in chain order.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            chain: self,
            at: 0,
            remaining: self.headers.len(),
        }
    }

    /// First-fit search for a free region strictly larger than `bytes`.
    ///
    /// Every free region visited is squeezed before its size is tested, so a
    /// failed search leaves each free run collapsed into one region.
    pub fn first_fit(
        &mut self,
        bytes: usize,
        stats: &mut AllocStats,
    ) -> Option<(usize, BlockHeader)> {
        let mut it = 0;
        while it != self.end {
            let header = *self.headers.get(&it)?;
            if header.is_busy {
                it = header.next;
                continue;
            }

            stats.record_squeeze(self.squeeze(it));

            let header = *self.headers.get(&it)?;
            trace!(at = it, size = header.size, bytes, "visiting free region");
            if bytes < header.size {
                return Some((it, header));
            }
            it = header.next;
        }
        None
    }

    /// Merge the free region at `p` with every following contiguous free
    /// region. Returns the number of headers removed.
    pub fn squeeze(&mut self, p: usize) -> usize {
        let Some(first) = self.headers.get(&p).copied() else {
            return 0;
        };

        let mut it = p;
        while it != self.end {
            match self.headers.get(&it) {
                Some(header) if !header.is_busy => it = header.next,
                _ => break,
            }
        }

        if it == p || it == first.next {
            return 0;
        }

        let absorbed: Vec<usize> = self
            .headers
            .range(p + 1..it)
            .map(|(&at, _)| at)
            .collect();
        for at in &absorbed {
            self.headers.remove(at);
        }
        self.headers.insert(p, BlockHeader::free(p, it));

        debug!(at = p, next = it, merged = absorbed.len(), "squeezed free run");
        absorbed.len()
    }

    /// Turn the free region at `p` busy for a request of `bytes`.
    ///
    /// The region is split when the remainder can host a header of its own;
    /// otherwise the whole region is consumed.
    pub fn split(&mut self, p: usize, header: BlockHeader, bytes: usize) -> Placed {
        let q = header.next;
        let available = q - p;
        let tag = next_tag();

        let placement = if available >= (2 * HEADER_SIZE).saturating_add(bytes) {
            let r = p + HEADER_SIZE + bytes;
            self.headers.insert(p, BlockHeader::busy(p, bytes, r, tag));
            self.headers.insert(r, BlockHeader::free(r, q));
            debug!(at = p, bytes, remainder = r, "split region");
            Placement::Split { remainder: r }
        } else {
            let size = q - p - HEADER_SIZE;
            self.headers.insert(p, BlockHeader::busy(p, size, q, tag));
            debug!(at = p, bytes, size, "consumed whole region");
            Placement::Whole { slack: size - bytes }
        };

        Placed { at: p, tag, placement }
    }

    /// Mark the busy region whose data starts at `data` free.
    ///
    /// The size is recomputed from the distance to `next`; neighbours are
    /// left alone.
    pub fn release(&mut self, data: usize, tag: u64) -> Result<RegionInfo, PoolError> {
        let at = data
            .checked_sub(HEADER_SIZE)
            .ok_or(PoolError::InvalidHandle { offset: data })?;
        let header = self
            .headers
            .get_mut(&at)
            .ok_or(PoolError::InvalidHandle { offset: data })?;
        if !header.is_busy || header.tag != tag {
            return Err(PoolError::DoubleFree { offset: data });
        }

        *header = BlockHeader::free(at, header.next);
        Ok(header.info(at))
    }

    /// Busy header for a live handle.
    pub fn live(&self, data: usize, tag: u64) -> Option<&BlockHeader> {
        let at = data.checked_sub(HEADER_SIZE)?;
        self.headers
            .get(&at)
            .filter(|header| header.is_busy && header.tag == tag)
    }

    /// Verify chain termination, contiguity, size consistency and
    /// conservation.
    pub fn check(&self) -> Result<(), PoolError> {
        let mut it = 0;
        let mut visited = 0;
        let mut total = 0;

        while it != self.end {
            let header = self
                .headers
                .get(&it)
                .ok_or_else(|| PoolError::Corrupted(format!("missing header at offset {it}")))?;
            if header.data != it + HEADER_SIZE {
                return Err(PoolError::Corrupted(format!(
                    "header at {it} has data offset {}",
                    header.data
                )));
            }
            if header.next <= it || header.next > self.end {
                return Err(PoolError::Corrupted(format!(
                    "header at {it} links to {} outside ({it}, {}]",
                    header.next, self.end
                )));
            }
            if header.next - it != HEADER_SIZE + header.size {
                return Err(PoolError::Corrupted(format!(
                    "header at {it} records {} bytes but spans {}",
                    header.size,
                    header.next - it - HEADER_SIZE
                )));
            }
            total += HEADER_SIZE + header.size;
            visited += 1;
            it = header.next;
        }

        if visited != self.headers.len() {
            return Err(PoolError::Corrupted(format!(
                "{} headers unreachable from the chain start",
                self.headers.len() - visited
            )));
        }
        if total != self.end {
            return Err(PoolError::Corrupted(format!(
                "regions cover {total} of {} bytes",
                self.end
            )));
        }
        Ok(())
    }

    #[cfg(test)]
    fn insert_raw(&mut self, at: usize, header: BlockHeader) {
        self.headers.insert(at, header);
    }
}

/// Iterator over the chain, following `next` links.
pub(crate) struct Walk<'a> {
    chain: &'a HeaderChain,
    at: usize,
    remaining: usize,
}

impl Iterator for Walk<'_> {
    type Item = RegionInfo;

    fn next(&mut self) -> Option<RegionInfo> {
        if self.at == self.chain.end || self.remaining == 0 {
            return None;
        }
        let header = self.chain.headers.get(&self.at)?;
        let info = header.info(self.at);
        self.at = header.next;
        self.remaining -= 1;
        Some(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAP: usize = 1024;

    fn place(chain: &mut HeaderChain, bytes: usize) -> Placed {
        let mut stats = AllocStats::new();
        let (at, header) = chain.first_fit(bytes, &mut stats).unwrap();
        chain.split(at, header, bytes)
    }

    fn data_of(placed: &Placed) -> usize {
        placed.at + HEADER_SIZE
    }

    #[test]
    fn new_chain_is_one_free_region() {
        let chain = HeaderChain::new(CAP);
        let regions: Vec<_> = chain.walk().collect();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].header, 0);
        assert_eq!(regions[0].size, CAP - HEADER_SIZE);
        assert!(!regions[0].busy);
        assert_eq!(regions[0].next, CAP);
        chain.check().unwrap();
    }

    #[test]
    fn split_leaves_trailing_free_region() {
        let mut chain = HeaderChain::new(CAP);
        let placed = place(&mut chain, 100);
        assert_eq!(
            placed.placement,
            Placement::Split {
                remainder: HEADER_SIZE + 100
            }
        );

        let regions: Vec<_> = chain.walk().collect();
        assert_eq!(regions.len(), 2);
        assert!(regions[0].busy);
        assert_eq!(regions[0].size, 100);
        assert!(!regions[1].busy);
        assert_eq!(regions[1].size, CAP - 2 * HEADER_SIZE - 100);
        chain.check().unwrap();
    }

    #[test]
    fn small_remainder_is_consumed_whole() {
        let mut chain = HeaderChain::new(CAP);
        // Leaves fewer than HEADER_SIZE bytes after the busy region.
        let bytes = CAP - 2 * HEADER_SIZE + 1;
        let placed = place(&mut chain, bytes);
        assert_eq!(
            placed.placement,
            Placement::Whole {
                slack: CAP - HEADER_SIZE - bytes
            }
        );
        let regions: Vec<_> = chain.walk().collect();
        assert_eq!(regions.len(), 1);
        assert!(regions[0].busy);
        assert_eq!(regions[0].size, CAP - HEADER_SIZE);
        chain.check().unwrap();
    }

    #[test]
    fn exact_header_remainder_still_splits() {
        let mut chain = HeaderChain::new(CAP);
        let bytes = CAP - 2 * HEADER_SIZE;
        let placed = place(&mut chain, bytes);
        assert!(matches!(placed.placement, Placement::Split { .. }));
        let regions: Vec<_> = chain.walk().collect();
        assert_eq!(regions[1].size, 0);
        chain.check().unwrap();
    }

    #[test]
    fn request_equal_to_region_size_does_not_fit() {
        let mut chain = HeaderChain::new(CAP);
        let mut stats = AllocStats::new();
        assert!(chain.first_fit(CAP - HEADER_SIZE, &mut stats).is_none());
        assert!(chain.first_fit(CAP - HEADER_SIZE - 1, &mut stats).is_some());
    }

    #[test]
    fn release_recomputes_size_from_next() {
        let mut chain = HeaderChain::new(CAP);
        let placed = place(&mut chain, CAP - 2 * HEADER_SIZE + 1);
        let info = chain.release(data_of(&placed), placed.tag).unwrap();
        assert!(!info.busy);
        assert_eq!(info.size, CAP - HEADER_SIZE);
        assert_eq!(info.next, CAP);
        chain.check().unwrap();
    }

    #[test]
    fn release_does_not_merge() {
        let mut chain = HeaderChain::new(CAP);
        let a = place(&mut chain, 64);
        let b = place(&mut chain, 64);
        chain.release(data_of(&a), a.tag).unwrap();
        chain.release(data_of(&b), b.tag).unwrap();
        assert_eq!(chain.walk().count(), 3);
        assert!(chain.walk().all(|r| !r.busy));
    }

    #[test]
    fn release_rejects_stale_and_foreign_handles() {
        let mut chain = HeaderChain::new(CAP);
        let a = place(&mut chain, 64);
        assert!(matches!(
            chain.release(data_of(&a) + 8, a.tag),
            Err(PoolError::InvalidHandle { .. })
        ));
        assert!(matches!(
            chain.release(0, a.tag),
            Err(PoolError::InvalidHandle { offset: 0 })
        ));
        chain.release(data_of(&a), a.tag).unwrap();
        assert!(matches!(
            chain.release(data_of(&a), a.tag),
            Err(PoolError::DoubleFree { .. })
        ));

        // Same offset reissued under a new tag.
        let again = place(&mut chain, 64);
        assert_eq!(again.at, a.at);
        assert!(matches!(
            chain.release(data_of(&a), a.tag),
            Err(PoolError::DoubleFree { .. })
        ));
        assert!(chain.live(data_of(&again), again.tag).is_some());
    }

    #[test]
    fn tags_differ_across_chains() {
        let mut first = HeaderChain::new(CAP);
        let mut second = HeaderChain::new(CAP);
        let a = place(&mut first, 64);
        let b = place(&mut second, 64);
        assert_eq!(a.at, b.at);
        assert_ne!(a.tag, b.tag);
        assert!(second.live(data_of(&a), a.tag).is_none());
        assert!(matches!(
            second.release(data_of(&a), a.tag),
            Err(PoolError::DoubleFree { .. })
        ));
        assert!(second.live(data_of(&b), b.tag).is_some());
    }

    #[test]
    fn squeeze_merges_run_up_to_busy_boundary() {
        let mut chain = HeaderChain::new(CAP);
        let a = place(&mut chain, 16);
        let b = place(&mut chain, 16);
        let c = place(&mut chain, 16);
        let d = place(&mut chain, 16);
        chain.release(data_of(&a), a.tag).unwrap();
        chain.release(data_of(&b), b.tag).unwrap();
        chain.release(data_of(&c), c.tag).unwrap();

        let merged = chain.squeeze(0);
        assert_eq!(merged, 2);
        let regions: Vec<_> = chain.walk().collect();
        assert_eq!(regions.len(), 3);
        assert_eq!(regions[0].next, d.at);
        assert_eq!(regions[0].size, d.at - HEADER_SIZE);
        assert!(regions[1].busy);
        chain.check().unwrap();
    }

    #[test]
    fn squeeze_runs_to_end_sentinel() {
        let mut chain = HeaderChain::new(CAP);
        let a = place(&mut chain, 16);
        chain.release(data_of(&a), a.tag).unwrap();
        assert_eq!(chain.squeeze(0), 1);
        let regions: Vec<_> = chain.walk().collect();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].size, CAP - HEADER_SIZE);
    }

    #[test]
    fn squeeze_is_noop_before_busy_neighbour() {
        let mut chain = HeaderChain::new(CAP);
        let a = place(&mut chain, 16);
        let _b = place(&mut chain, 16);
        chain.release(data_of(&a), a.tag).unwrap();
        let before: Vec<_> = chain.walk().collect();
        assert_eq!(chain.squeeze(0), 0);
        let after: Vec<_> = chain.walk().collect();
        assert_eq!(before, after);
    }

    #[test]
    fn first_fit_skips_busy_and_small_regions() {
        let mut chain = HeaderChain::new(CAP);
        let a = place(&mut chain, 16);
        let _b = place(&mut chain, 64);
        chain.release(data_of(&a), a.tag).unwrap();

        let mut stats = AllocStats::new();
        let (at, _) = chain.first_fit(32, &mut stats).unwrap();
        assert!(at > a.at);
        let (at, _) = chain.first_fit(8, &mut stats).unwrap();
        assert_eq!(at, a.at);
    }

    #[test]
    fn check_detects_broken_links() {
        let mut chain = HeaderChain::new(CAP);
        chain.insert_raw(0, BlockHeader::free(0, CAP - 8));
        assert!(matches!(chain.check(), Err(PoolError::Corrupted(_))));

        let mut chain = HeaderChain::new(CAP);
        chain.insert_raw(512, BlockHeader::free(512, CAP));
        assert!(matches!(chain.check(), Err(PoolError::Corrupted(_))));
    }

    #[test]
    fn detached_chain_is_empty() {
        let mut chain = HeaderChain::default();
        let mut stats = AllocStats::new();
        assert_eq!(chain.walk().count(), 0);
        assert!(chain.first_fit(1, &mut stats).is_none());
        chain.check().unwrap();
    }
}
