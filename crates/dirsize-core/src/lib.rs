//! dirsize-core — shared library for the dirsize collector.
//!
//! Provides:
//! - `collector` — filesystem access, path resolution, depth expansion, tree scanning
//! - `model` — directory mappings, scan targets, metric points and batches
//! - `sink` — metric sinks (InfluxDB line protocol over HTTP, in-memory)
//! - `cycle` — one scan-and-report pass over all targets
//! - `scheduler` — fixed-interval, non-overlapping cycle driver
//! - `config` — TOML configuration loading and validation
//! - `fmt` — formatting helpers for log output

pub mod collector;
pub mod config;
pub mod cycle;
pub mod fmt;
pub mod model;
pub mod scheduler;
pub mod sink;

/// Crate version, reported by the daemon at startup.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
