//! Data model shared by the collector, the cycle and the sinks.

mod point;

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

pub use point::{Batch, MEASUREMENT, MetricPoint, PointError, TagSet, derived_tags, merge_tag_sets};

/// A scan location and the name it is reported under.
///
/// `label` is what ends up in the point tags; `path` is what gets walked. They
/// differ when the scanned directory is a mount of some externally known path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryMapping {
    pub label: String,
    pub path: PathBuf,
}

impl DirectoryMapping {
    pub fn new(label: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            path: path.into(),
        }
    }

    /// Mapping whose label is the path itself.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            label: path.to_string_lossy().into_owned(),
            path,
        }
    }

    /// Mapping for the child entry `name`, both label and path extended.
    pub fn child(&self, name: &str) -> Self {
        Self {
            label: join_label(&self.label, name),
            path: self.path.join(name),
        }
    }
}

/// Joins a label with a child name using path semantics.
fn join_label(label: &str, name: &str) -> String {
    Path::new(label).join(name).to_string_lossy().into_owned()
}

/// Named group of mappings sharing a depth and extra tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectorySet {
    pub name: String,
    pub mappings: Vec<DirectoryMapping>,
    pub depth: usize,
    pub tags: TagSet,
}

/// One expanded mapping ready to be scanned every cycle.
///
/// The list of targets is built once at startup and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanTarget {
    pub mapping: DirectoryMapping,
    /// Name of the directory set, reported as the `set` tag.
    pub set: Option<String>,
    /// Set-level static tags.
    pub tags: TagSet,
}

impl ScanTarget {
    /// Target outside any directory set.
    pub fn plain(mapping: DirectoryMapping) -> Self {
        Self {
            mapping,
            set: None,
            tags: TagSet::new(),
        }
    }
}

/// Size of one mapping as measured in one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeSample {
    pub mapping: DirectoryMapping,
    pub bytes: u64,
    pub observed_at: DateTime<Utc>,
}
