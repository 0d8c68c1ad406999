//! Directory discovery and size collection.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     startup (once)                           │
//! │   config ──► PathResolver ──► SetExpander ──► [ScanTarget]   │
//! └──────────────────────────────────┬───────────────────────────┘
//!                                    │ read-only
//! ┌──────────────────────────────────▼───────────────────────────┐
//! │                     every cycle                              │
//! │                TreeScanner (per target)                      │
//! └──────────────────────────────────┬───────────────────────────┘
//!                                    │
//!                             ┌──────▼──────┐
//!                             │  FileSystem │ (trait)
//!                             └──────┬──────┘
//!                      ┌─────────────┴─────────────┐
//!               ┌──────▼──────┐             ┌──────▼──────┐
//!               │   RealFs    │             │   MockFs    │
//!               │  (std::fs)  │             │  (Testing)  │
//!               └─────────────┘             └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use std::path::Path;
//! use dirsize_core::collector::{MockFs, TreeScanner};
//!
//! let scanner = TreeScanner::new(MockFs::two_roots());
//! assert_eq!(scanner.scan_size(Path::new("/data/a")).unwrap(), 10);
//! ```

pub mod expander;
pub mod mock;
pub mod resolver;
pub mod scanner;
pub mod targets;
pub mod traits;

pub use expander::{ExpandError, SetExpander};
pub use mock::MockFs;
pub use resolver::{PathError, PathResolver};
pub use scanner::{ScanError, TreeScanner};
pub use targets::{TargetError, build_targets};
pub use traits::{EntryKind, EntryMeta, FileSystem, ListedEntry, RealFs};
