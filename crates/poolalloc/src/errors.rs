//! Application errors and exit codes.

use poolalloc_core::{exit_codes, PoolError};

/// Failures raised by the application layer itself.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Invalid command-line or environment configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Live data changed while its block was busy.
    #[error("{0} blocks lost their contents while live")]
    DataCorruption(usize),
}

/// Map an error chain to a process exit code.
#[must_use]
pub fn exit_code(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(app) = cause.downcast_ref::<AppError>() {
            return match app {
                AppError::Config(_) => exit_codes::ERROR_CONFIG,
                AppError::DataCorruption(_) => exit_codes::ERROR_CORRUPTION,
            };
        }
        if let Some(pool) = cause.downcast_ref::<PoolError>() {
            return match pool {
                PoolError::ArenaAcquisition { .. } => exit_codes::ERROR_ARENA,
                PoolError::InvalidCapacity { .. } => exit_codes::ERROR_CONFIG,
                PoolError::Corrupted(_) => exit_codes::ERROR_CORRUPTION,
                PoolError::OutOfMemory { .. }
                | PoolError::InvalidHandle { .. }
                | PoolError::DoubleFree { .. } => exit_codes::ERROR_GENERIC,
            };
        }
    }
    exit_codes::ERROR_GENERIC
}
