//! In-memory mock filesystem for testing the expander and scanner.
//!
//! `MockFs` simulates a directory tree in memory, with optional per-path
//! failures and an artificial per-listing latency.

use crate::collector::traits::{EntryKind, EntryMeta, FileSystem, ListedEntry};
use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// In-memory filesystem for testing.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    /// Map from path to entry metadata. Directories have length 0.
    entries: BTreeMap<PathBuf, EntryMeta>,
    /// Paths whose metadata lookup and listing fail with the given error kind.
    failures: HashMap<PathBuf, io::ErrorKind>,
    /// Sleep applied to every `read_dir` call.
    latency: Option<Duration>,
}

impl MockFs {
    /// Creates a new empty mock filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a regular file of `len` bytes.
    ///
    /// Parent directories are automatically created.
    pub fn add_file(&mut self, path: impl AsRef<Path>, len: u64) {
        self.add_entry(path.as_ref(), EntryKind::File, len);
    }

    /// Adds a symlink whose own metadata reports `len` bytes (the target path length).
    pub fn add_symlink(&mut self, path: impl AsRef<Path>, len: u64) {
        self.add_entry(path.as_ref(), EntryKind::Symlink, len);
    }

    /// Adds an empty directory.
    pub fn add_dir(&mut self, path: impl AsRef<Path>) {
        self.add_entry(path.as_ref(), EntryKind::Dir, 0);
    }

    /// Makes every access to `path` fail with `kind`.
    ///
    /// The entry stays visible, with its kind, in its parent's listing, which
    /// mimics a file that becomes unreadable or vanishes between listing and stat.
    pub fn fail(&mut self, path: impl AsRef<Path>, kind: io::ErrorKind) {
        let path = path.as_ref().to_path_buf();
        if !self.entries.contains_key(&path) {
            self.add_file(&path, 0);
        }
        self.failures.insert(path, kind);
    }

    /// Delays every directory listing by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn add_entry(&mut self, path: &Path, kind: EntryKind, len: u64) {
        let mut parent = path.parent();
        while let Some(p) = parent {
            if !p.as_os_str().is_empty() {
                self.entries
                    .entry(p.to_path_buf())
                    .or_insert(EntryMeta {
                        kind: EntryKind::Dir,
                        len: 0,
                    });
            }
            parent = p.parent();
        }
        self.entries.insert(path.to_path_buf(), EntryMeta { kind, len });
    }

    fn check_failure(&self, path: &Path) -> io::Result<()> {
        match self.failures.get(path) {
            Some(kind) => Err(io::Error::new(
                *kind,
                format!("injected failure: {:?}", path),
            )),
            None => Ok(()),
        }
    }
}

impl FileSystem for MockFs {
    fn read_dir(&self, path: &Path) -> io::Result<Vec<ListedEntry>> {
        if let Some(latency) = self.latency {
            std::thread::sleep(latency);
        }
        self.check_failure(path)?;

        match self.entries.get(path) {
            Some(meta) if meta.is_dir() => {}
            Some(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::NotADirectory,
                    format!("not a directory: {:?}", path),
                ));
            }
            None => {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("directory not found: {:?}", path),
                ));
            }
        }

        Ok(self
            .entries
            .iter()
            .filter(|(p, _)| p.parent() == Some(path))
            .map(|(p, meta)| ListedEntry {
                path: p.clone(),
                kind: meta.kind,
            })
            .collect())
    }

    fn symlink_metadata(&self, path: &Path) -> io::Result<EntryMeta> {
        self.check_failure(path)?;
        self.entries.get(path).copied().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("entry not found: {:?}", path),
            )
        })
    }
}
