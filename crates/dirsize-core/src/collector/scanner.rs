//! Recursive size computation of a single directory tree.

use std::path::{Path, PathBuf};

use tracing::trace;

use crate::collector::traits::FileSystem;

/// A traversal failure that aborted one tree scan.
#[derive(Debug)]
pub struct ScanError {
    /// Entry that could not be read.
    pub path: PathBuf,
    pub source: std::io::Error,
}

impl std::fmt::Display for ScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cannot read {}: {}", self.path.display(), self.source)
    }
}

impl std::error::Error for ScanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Computes total logical size of directory subtrees.
///
/// Directories contribute nothing themselves; files, symlinks (by their own
/// metadata) and other non-directory entries contribute their length. Any
/// error aborts the whole scan: a partially walked tree is never reported.
#[derive(Debug, Clone)]
pub struct TreeScanner<F: FileSystem> {
    fs: F,
}

impl<F: FileSystem> TreeScanner<F> {
    pub fn new(fs: F) -> Self {
        Self { fs }
    }

    /// Returns the total size in bytes of the tree rooted at `root`.
    pub fn scan_size(&self, root: &Path) -> Result<u64, ScanError> {
        trace!("Scanning {}", root.display());

        let mut total: u64 = 0;
        let mut entries: u64 = 0;
        let mut stack = vec![root.to_path_buf()];

        while let Some(path) = stack.pop() {
            let meta = self
                .fs
                .symlink_metadata(&path)
                .map_err(|source| ScanError {
                    path: path.clone(),
                    source,
                })?;
            entries += 1;

            if meta.is_dir() {
                let children = self.fs.read_dir(&path).map_err(|source| ScanError {
                    path: path.clone(),
                    source,
                })?;
                stack.extend(children.into_iter().map(|entry| entry.path));
            } else {
                total = total.saturating_add(meta.len);
            }
        }

        trace!(
            "Scanned {}: {} entries, {} bytes",
            root.display(),
            entries,
            total
        );
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;
    use crate::collector::traits::RealFs;
    use std::io;

    #[test]
    fn test_scan_files_and_empty_subdir() {
        let mut fs = MockFs::new();
        fs.add_file("/d/a", 100);
        fs.add_file("/d/b", 250);
        fs.add_file("/d/c", 0);
        fs.add_dir("/d/empty");

        let scanner = TreeScanner::new(fs);
        assert_eq!(scanner.scan_size(Path::new("/d")).unwrap(), 350);
    }

    #[test]
    fn test_scan_nested() {
        let scanner = TreeScanner::new(MockFs::two_roots());
        assert_eq!(scanner.scan_size(Path::new("/data/a")).unwrap(), 10);
        assert_eq!(scanner.scan_size(Path::new("/data/b")).unwrap(), 20);
        assert_eq!(scanner.scan_size(Path::new("/data")).unwrap(), 30);
    }

    #[test]
    fn test_scan_counts_symlink_itself() {
        let mut fs = MockFs::new();
        fs.add_file("/d/big", 1000);
        fs.add_symlink("/d/link-to-big", 6);

        let scanner = TreeScanner::new(fs);
        assert_eq!(scanner.scan_size(Path::new("/d")).unwrap(), 1006);
    }

    #[test]
    fn test_scan_root_file() {
        let mut fs = MockFs::new();
        fs.add_file("/d/only", 7);
        let scanner = TreeScanner::new(fs);
        assert_eq!(scanner.scan_size(Path::new("/d/only")).unwrap(), 7);
    }

    #[test]
    fn test_scan_unreadable_entry_aborts() {
        let mut fs = MockFs::two_roots();
        fs.fail("/data/a/logs/old/1.gz", io::ErrorKind::PermissionDenied);

        let scanner = TreeScanner::new(fs);
        let err = scanner.scan_size(Path::new("/data/a")).unwrap_err();
        assert_eq!(err.path, PathBuf::from("/data/a/logs/old/1.gz"));
        assert_eq!(err.source.kind(), io::ErrorKind::PermissionDenied);

        // Sibling tree is unaffected.
        assert_eq!(scanner.scan_size(Path::new("/data/b")).unwrap(), 20);
    }

    #[test]
    fn test_scan_unlistable_dir_aborts() {
        let mut fs = MockFs::two_roots();
        fs.fail("/data/b/src", io::ErrorKind::PermissionDenied);
        let scanner = TreeScanner::new(fs);
        assert!(scanner.scan_size(Path::new("/data/b")).is_err());
    }

    #[test]
    fn test_scan_missing_root() {
        let scanner = TreeScanner::new(MockFs::new());
        let err = scanner.scan_size(Path::new("/nope")).unwrap_err();
        assert_eq!(err.source.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_scan_real_tree() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a"), vec![0u8; 100]).unwrap();
        std::fs::write(dir.path().join("b"), vec![0u8; 250]).unwrap();
        std::fs::write(dir.path().join("c"), b"").unwrap();
        std::fs::create_dir(dir.path().join("empty")).unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("d"), vec![0u8; 50]).unwrap();

        let scanner = TreeScanner::new(RealFs::new());
        assert_eq!(scanner.scan_size(dir.path()).unwrap(), 400);
    }
}
