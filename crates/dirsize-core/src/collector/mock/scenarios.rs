//! Pre-built mock directory trees for testing.

use super::filesystem::MockFs;

impl MockFs {
    /// Two project roots with a fixed layout:
    ///
    /// ```text
    /// /data/a            10 bytes total
    /// /data/a/logs/app.log   4
    /// /data/a/logs/old/1.gz  6
    /// /data/a/empty/
    /// /data/b            20 bytes total
    /// /data/b/readme         5
    /// /data/b/src/main.rs   15
    /// ```
    pub fn two_roots() -> Self {
        let mut fs = Self::new();
        fs.add_file("/data/a/logs/app.log", 4);
        fs.add_file("/data/a/logs/old/1.gz", 6);
        fs.add_dir("/data/a/empty");
        fs.add_file("/data/b/readme", 5);
        fs.add_file("/data/b/src/main.rs", 15);
        fs
    }

    /// A uniform tree under `root`: every directory down to `levels` has
    /// `fan_out` subdirectories named `d0..dN` and one 1-byte file.
    pub fn uniform_tree(root: &str, fan_out: usize, levels: usize) -> Self {
        let mut fs = Self::new();
        fs.add_dir(root);
        let mut frontier = vec![std::path::PathBuf::from(root)];
        for _ in 0..levels {
            let mut next = Vec::with_capacity(frontier.len() * fan_out);
            for dir in &frontier {
                fs.add_file(dir.join("f"), 1);
                for i in 0..fan_out {
                    let child = dir.join(format!("d{}", i));
                    fs.add_dir(&child);
                    next.push(child);
                }
            }
            frontier = next;
        }
        fs
    }
}
