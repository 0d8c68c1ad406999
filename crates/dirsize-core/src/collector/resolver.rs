//! Normalization of configured directory references.
//!
//! `~` is replaced by the home directory wherever it occurs, then the path is
//! made absolute and lexically cleaned. Symlinks are left untouched.

use std::path::{Component, Path, PathBuf};

/// Home-directory marker substituted during resolution.
pub const HOME_MARKER: char = '~';

/// Error resolving a configured path.
#[derive(Debug)]
pub enum PathError {
    /// The input was empty after trimming.
    Empty,
    /// `~` was used but the home directory is unknown.
    HomeUnavailable(String),
    /// The current directory is needed for a relative path and cannot be read.
    CurrentDir(String, std::io::Error),
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::Empty => write!(f, "empty directory path"),
            PathError::HomeUnavailable(raw) => write!(
                f,
                "cannot replace '~' in '{}': home directory is unknown",
                raw
            ),
            PathError::CurrentDir(raw, e) => {
                write!(f, "cannot make '{}' absolute: {}", raw, e)
            }
        }
    }
}

impl std::error::Error for PathError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PathError::CurrentDir(_, e) => Some(e),
            _ => None,
        }
    }
}

/// Resolves raw configured paths into absolute, cleaned paths.
#[derive(Debug, Clone, Default)]
pub struct PathResolver {
    home: Option<PathBuf>,
    cwd: Option<PathBuf>,
}

impl PathResolver {
    /// Resolver using `$HOME` and the process working directory.
    pub fn from_env() -> Self {
        Self {
            home: std::env::var_os("HOME")
                .filter(|h| !h.is_empty())
                .map(PathBuf::from),
            cwd: None,
        }
    }

    /// Overrides the home directory.
    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    /// Overrides the base for relative paths.
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Resolves `raw` to an absolute path.
    pub fn resolve(&self, raw: &str) -> Result<PathBuf, PathError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PathError::Empty);
        }

        let expanded = if trimmed.contains(HOME_MARKER) {
            let home = self
                .home
                .as_ref()
                .ok_or_else(|| PathError::HomeUnavailable(trimmed.to_string()))?;
            trimmed.replace(HOME_MARKER, &home.to_string_lossy())
        } else {
            trimmed.to_string()
        };

        let path = PathBuf::from(&expanded);
        let absolute = if path.is_absolute() {
            path
        } else {
            let base = match &self.cwd {
                Some(cwd) => cwd.clone(),
                None => std::env::current_dir()
                    .map_err(|e| PathError::CurrentDir(expanded.clone(), e))?,
            };
            base.join(path)
        };

        Ok(clean(&absolute))
    }
}

/// Lexically removes `.` and resolves `..` against preceding components.
fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Never pops past the root.
                if out.file_name().is_some() {
                    out.pop();
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
