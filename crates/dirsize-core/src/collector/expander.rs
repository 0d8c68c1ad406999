//! Depth expansion of directory mappings.
//!
//! Each round replaces every mapping with its immediate subdirectories, so after
//! `depth` rounds only the deepest generation remains. Runs once at startup.

use std::path::PathBuf;

use tracing::{debug, trace};

use crate::collector::traits::FileSystem;
use crate::model::DirectoryMapping;

/// Failure listing a directory during expansion. Fatal to startup.
#[derive(Debug)]
pub struct ExpandError {
    pub directory: PathBuf,
    pub source: std::io::Error,
}

impl std::fmt::Display for ExpandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cannot read directory {} for expansion: {}",
            self.directory.display(),
            self.source
        )
    }
}

impl std::error::Error for ExpandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Expands mappings into their subdirectories.
pub struct SetExpander<'a, F: FileSystem> {
    fs: &'a F,
}

impl<'a, F: FileSystem> SetExpander<'a, F> {
    pub fn new(fs: &'a F) -> Self {
        Self { fs }
    }

    /// Replaces each mapping with its subdirectories, `depth` times.
    ///
    /// Depth 0 returns the input unchanged. Children are visited in name order.
    pub fn expand(
        &self,
        mappings: &[DirectoryMapping],
        depth: usize,
    ) -> Result<Vec<DirectoryMapping>, ExpandError> {
        let mut current = mappings.to_vec();

        for level in 0..depth {
            let mut next = Vec::new();
            for mapping in &current {
                for name in self.child_dirs(mapping)? {
                    next.push(mapping.child(&name));
                }
            }
            debug!(
                "Expansion level {}: {} -> {} directories",
                level + 1,
                current.len(),
                next.len()
            );
            current = next;
        }

        Ok(current)
    }

    /// Names of the immediate subdirectories of `mapping.path`, sorted.
    fn child_dirs(&self, mapping: &DirectoryMapping) -> Result<Vec<String>, ExpandError> {
        let to_err = |source| ExpandError {
            directory: mapping.path.clone(),
            source,
        };

        let mut names = Vec::new();
        for entry in self.fs.read_dir(&mapping.path).map_err(to_err)? {
            if !entry.is_dir() {
                continue;
            }
            if let Some(name) = entry.path.file_name() {
                names.push(name.to_string_lossy().into_owned());
            }
        }
        names.sort();
        trace!("{}: {} subdirectories", mapping.path.display(), names.len());
        Ok(names)
    }
}
