//! poolalloc library: application logic for the workload replay tool.

pub mod app;
pub mod config;
pub mod errors;
pub mod report;
pub mod workload;
