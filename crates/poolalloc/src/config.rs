//! Application configuration from CLI flags and environment.

use clap::Parser;

use poolalloc_core::{parse_capacity, PoolConfig};

/// poolalloc: replay allocation workloads against a fixed-capacity pool.
#[derive(Parser, Debug)]
#[command(name = "poolalloc", version, about)]
pub struct AppConfig {
    /// Arena capacity (e.g., "10M", "512K", "4096").
    #[arg(long, default_value = "", env = "POOLALLOC_CAPACITY")]
    pub capacity: String,

    /// Number of allocate/deallocate operations to replay.
    #[arg(long, default_value = "10000")]
    pub ops: usize,

    /// Largest element count requested by a single allocation.
    #[arg(long, default_value = "256")]
    pub max_elems: usize,

    /// Probability that an operation releases a live block (0.0 to 1.0).
    #[arg(long, default_value = "0.45")]
    pub free_ratio: f64,

    /// Seed for the workload generator.
    #[arg(long, default_value = "42", env = "POOLALLOC_SEED")]
    pub seed: u64,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,

    /// Verbose output (debug logging and per-region listing).
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet mode (no report on success).
    #[arg(short, long)]
    pub quiet: bool,
}

impl AppConfig {
    /// Parse CLI arguments.
    #[must_use]
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Build the pool configuration, applying the default capacity when none
    /// is given.
    pub fn pool_config(&self) -> Result<PoolConfig, String> {
        let capacity = parse_capacity(&self.capacity)?;
        Ok(PoolConfig::with_capacity(capacity).normalize())
    }

    /// Check workload parameters.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.free_ratio) {
            return Err(format!(
                "free ratio must be between 0 and 1, got {}",
                self.free_ratio
            ));
        }
        if self.max_elems == 0 {
            return Err("max elems must be at least 1".to_string());
        }
        Ok(())
    }
}
