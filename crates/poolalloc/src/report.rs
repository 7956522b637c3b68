//! Replay report and its text/JSON presentation.

use std::time::Duration;

use serde::Serialize;

use poolalloc_core::{AllocStats, PoolUsage, RegionInfo, HEADER_SIZE};

use crate::workload::Outcome;

/// Everything printed after a replay.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// Arena capacity in bytes.
    pub capacity: usize,
    /// Header size in bytes.
    pub header_size: usize,
    /// Workload seed.
    pub seed: u64,
    /// Operations replayed.
    pub ops: usize,
    /// Replay outcome.
    pub outcome: Outcome,
    /// Final chain summary.
    pub usage: PoolUsage,
    /// Allocator counters.
    pub stats: AllocStats,
    /// Wall-clock replay time, formatted.
    pub elapsed: String,
    /// Final regions (verbose mode only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regions: Option<Vec<RegionInfo>>,
}

impl Report {
    /// Assemble a report.
    #[must_use]
    pub fn new(
        seed: u64,
        ops: usize,
        outcome: Outcome,
        usage: PoolUsage,
        stats: AllocStats,
        elapsed: Duration,
    ) -> Self {
        Self {
            capacity: usage.capacity,
            header_size: HEADER_SIZE,
            seed,
            ops,
            outcome,
            usage,
            stats,
            elapsed: format_duration(elapsed),
            regions: None,
        }
    }

    /// Render as pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Render as human-readable text.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let o = &self.outcome;
        let u = &self.usage;
        let s = &self.stats;

        out.push_str(&format!(
            "Arena: {} bytes (header {} bytes)\n",
            format_number(self.capacity),
            self.header_size
        ));
        out.push_str(&format!(
            "Workload: {} ops, seed {}, {}\n",
            format_number(self.ops),
            self.seed,
            self.elapsed
        ));
        out.push_str(&format!(
            "Allocations: {} ok, {} out of memory, {} empty\n",
            o.allocations, o.failures, o.empty_requests
        ));
        out.push_str(&format!(
            "Releases: {} (peak live {}, live at end {})\n",
            o.releases, o.peak_live, o.live_at_end
        ));
        out.push_str(&format!(
            "Placement: {} splits, {} whole ({} slack bytes), {} squeezes merging {} headers\n",
            s.splits, s.whole_consumes, s.slack_bytes, s.squeezes, s.merged_headers
        ));
        out.push_str(&format!(
            "Regions: {} ({} busy, {} free)\n",
            u.regions, u.busy_regions, u.free_regions
        ));
        out.push_str(&format!(
            "Bytes: {} busy, {} free, {} headers, largest free {}\n",
            format_number(u.busy_bytes),
            format_number(u.free_bytes),
            format_number(u.header_bytes),
            format_number(u.largest_free)
        ));
        out.push_str(&format!("Corrupted blocks: {}\n", o.corrupted_blocks));

        if let Some(regions) = &self.regions {
            out.push_str(&format!("\n{:>10} {:>10} {:>10}  state\n", "header", "size", "next"));
            for r in regions {
                let state = if r.busy { "busy" } else { "free" };
                out.push_str(&format!(
                    "{:>10} {:>10} {:>10}  {state}\n",
                    r.header, r.size, r.next
                ));
            }
        }
        out
    }
}

/// Format a duration for display.
#[must_use]
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 0.001 {
        format!("{:.2}µs", secs * 1_000_000.0)
    } else if secs < 1.0 {
        format!("{:.2}ms", secs * 1000.0)
    } else {
        format!("{secs:.3}s")
    }
}

/// Format a number with thousand separators.
#[must_use]
pub fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}
