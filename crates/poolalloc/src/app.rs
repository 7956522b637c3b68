//! Application entry point and dispatch.

use std::time::Instant;

use anyhow::{Context, Result};

use poolalloc_core::PoolAllocator;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::report::Report;
use crate::workload::{replay, WorkloadSpec};

/// Run the application.
pub fn run(config: &AppConfig) -> Result<()> {
    config.validate().map_err(AppError::Config)?;
    let pool_config = config.pool_config().map_err(AppError::Config)?;

    let mut pool = PoolAllocator::<u64>::from_config(&pool_config)
        .with_context(|| format!("creating a {}-byte pool", pool_config.capacity))?;

    let spec = WorkloadSpec {
        ops: config.ops,
        max_elems: config.max_elems,
        free_ratio: config.free_ratio,
        seed: config.seed,
    };

    let start = Instant::now();
    let outcome = replay(&mut pool, &spec);
    let elapsed = start.elapsed();

    pool.check_invariants().context("final invariant check")?;
    if outcome.corrupted_blocks > 0 {
        return Err(AppError::DataCorruption(outcome.corrupted_blocks).into());
    }

    let mut report = Report::new(
        config.seed,
        config.ops,
        outcome,
        pool.usage(),
        pool.stats().clone(),
        elapsed,
    );
    if config.verbose {
        report.regions = Some(pool.regions());
    }

    if config.quiet {
        return Ok(());
    }
    if config.json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report.to_text());
    }
    Ok(())
}
