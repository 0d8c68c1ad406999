//! Abstractions for filesystem access to enable testing and mocking.
//!
//! The `FileSystem` trait allows the expander and scanner to walk the real
//! filesystem in production and an in-memory tree with injected failures in tests.

use std::io;
use std::path::{Path, PathBuf};

/// Kind of a directory entry, as reported without following symlinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Dir,
    File,
    Symlink,
    /// Sockets, fifos, device nodes.
    Other,
}

/// Metadata of a single entry, taken from `lstat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryMeta {
    pub kind: EntryKind,
    /// Logical byte length (not the allocated block size).
    pub len: u64,
}

impl EntryMeta {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }
}

impl From<std::fs::FileType> for EntryKind {
    fn from(file_type: std::fs::FileType) -> Self {
        if file_type.is_symlink() {
            EntryKind::Symlink
        } else if file_type.is_dir() {
            EntryKind::Dir
        } else if file_type.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        }
    }
}

impl From<&std::fs::Metadata> for EntryMeta {
    fn from(meta: &std::fs::Metadata) -> Self {
        Self {
            kind: EntryKind::from(meta.file_type()),
            len: meta.len(),
        }
    }
}

/// One entry of a directory listing.
///
/// `kind` comes from the listing itself, so it is known even when the entry
/// cannot be stat'ed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedEntry {
    pub path: PathBuf,
    pub kind: EntryKind,
}

impl ListedEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }
}

/// Abstraction for filesystem operations.
///
/// Implementations must never follow symlinks in `symlink_metadata`.
pub trait FileSystem: Send + Sync {
    /// Lists entries in a directory.
    ///
    /// # Arguments
    /// * `path` - Path to the directory
    ///
    /// # Returns
    /// The entries with their full paths and kinds (symlinks not followed),
    /// or an I/O error.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<ListedEntry>>;

    /// Returns metadata for `path` without following a trailing symlink.
    fn symlink_metadata(&self, path: &Path) -> io::Result<EntryMeta>;
}

/// Real filesystem implementation that delegates to `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    /// Creates a new `RealFs` instance.
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFs {
    fn read_dir(&self, path: &Path) -> io::Result<Vec<ListedEntry>> {
        let entries = std::fs::read_dir(path)?;
        let mut listed = Vec::new();
        for entry in entries {
            let entry = entry?;
            // DirEntry::file_type does not traverse symlinks.
            let kind = EntryKind::from(entry.file_type()?);
            listed.push(ListedEntry {
                path: entry.path(),
                kind,
            });
        }
        Ok(listed)
    }

    fn symlink_metadata(&self, path: &Path) -> io::Result<EntryMeta> {
        std::fs::symlink_metadata(path).map(|meta| EntryMeta::from(&meta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_real_fs_read_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a"), b"abc").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let fs = RealFs::new();
        let mut entries = fs.read_dir(dir.path()).unwrap();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        assert_eq!(
            entries,
            vec![
                ListedEntry {
                    path: dir.path().join("a"),
                    kind: EntryKind::File,
                },
                ListedEntry {
                    path: dir.path().join("sub"),
                    kind: EntryKind::Dir,
                },
            ]
        );
    }

    #[test]
    fn test_real_fs_symlink_metadata() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a"), b"abcde").unwrap();

        let fs = RealFs::new();
        let file = fs.symlink_metadata(&dir.path().join("a")).unwrap();
        assert_eq!(file.kind, EntryKind::File);
        assert_eq!(file.len, 5);

        let root = fs.symlink_metadata(dir.path()).unwrap();
        assert!(root.is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn test_real_fs_does_not_follow_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("target")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("target"), dir.path().join("link")).unwrap();

        let fs = RealFs::new();
        let meta = fs.symlink_metadata(&dir.path().join("link")).unwrap();
        assert_eq!(meta.kind, EntryKind::Symlink);

        let listed = fs.read_dir(dir.path()).unwrap();
        let link = listed
            .iter()
            .find(|e| e.path == dir.path().join("link"))
            .unwrap();
        assert_eq!(link.kind, EntryKind::Symlink);
    }

    #[test]
    fn test_real_fs_not_found() {
        let fs = RealFs::new();
        let result = fs.symlink_metadata(Path::new("/nonexistent/path/12345"));
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
    }
}
