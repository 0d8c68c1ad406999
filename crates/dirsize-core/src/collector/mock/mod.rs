//! Mock filesystem implementations for testing.
//!
//! This module provides `MockFs` and pre-built directory trees for testing
//! the expander and scanner without touching the real filesystem.

mod filesystem;
mod scenarios;

pub use filesystem::MockFs;
