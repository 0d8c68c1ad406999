//! Builds the fixed list of scan targets from configuration.

use tracing::{debug, info};

use crate::collector::expander::{ExpandError, SetExpander};
use crate::collector::resolver::{PathError, PathResolver};
use crate::collector::traits::FileSystem;
use crate::config::{Config, DirectoryConfig};
use crate::model::{DirectoryMapping, DirectorySet, ScanTarget, TagSet};

/// Startup failure while building targets.
#[derive(Debug)]
pub enum TargetError {
    Path(PathError),
    Expand(ExpandError),
}

impl std::fmt::Display for TargetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetError::Path(e) => write!(f, "{}", e),
            TargetError::Expand(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for TargetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TargetError::Path(e) => Some(e),
            TargetError::Expand(e) => Some(e),
        }
    }
}

impl From<PathError> for TargetError {
    fn from(e: PathError) -> Self {
        TargetError::Path(e)
    }
}

impl From<ExpandError> for TargetError {
    fn from(e: ExpandError) -> Self {
        TargetError::Expand(e)
    }
}

/// Resolves a configured directory into a mapping.
///
/// Bare paths are reported under their resolved path. Explicit labels are kept
/// verbatim since they name a location outside this host's filesystem view.
pub fn resolve_mapping(
    resolver: &PathResolver,
    entry: &DirectoryConfig,
) -> Result<DirectoryMapping, PathError> {
    let path = resolver.resolve(entry.path())?;
    Ok(match entry.label().map(str::trim).filter(|l| !l.is_empty()) {
        Some(label) => DirectoryMapping::new(label, path),
        None => DirectoryMapping::from_path(path),
    })
}

/// Resolves all directories of a configured set.
pub fn resolve_set(
    resolver: &PathResolver,
    name: &str,
    entries: &[DirectoryConfig],
    depth: usize,
    tags: TagSet,
) -> Result<DirectorySet, PathError> {
    let mappings = entries
        .iter()
        .map(|entry| resolve_mapping(resolver, entry))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(DirectorySet {
        name: name.to_string(),
        mappings,
        depth,
        tags,
    })
}

/// Resolves and expands every configured directory, once.
///
/// Top-level directories use the global depth and carry no `set` tag; each
/// directory set is expanded with its own depth and tagged with its name.
pub fn build_targets<F: FileSystem>(
    config: &Config,
    resolver: &PathResolver,
    fs: &F,
) -> Result<Vec<ScanTarget>, TargetError> {
    let expander = SetExpander::new(fs);
    let mut targets = Vec::new();

    if !config.directories.is_empty() {
        let roots = config
            .directories
            .iter()
            .map(|entry| resolve_mapping(resolver, entry))
            .collect::<Result<Vec<_>, _>>()?;
        for mapping in &roots {
            debug!("Directory {} -> {}", mapping.label, mapping.path.display());
        }
        let expanded = expander.expand(&roots, config.depth)?;
        info!(
            "Expanded {} directories to depth {}: {} targets",
            roots.len(),
            config.depth,
            expanded.len()
        );
        targets.extend(expanded.into_iter().map(ScanTarget::plain));
    }

    for set_config in &config.sets {
        let set = resolve_set(
            resolver,
            &set_config.name,
            &set_config.directories,
            config.set_depth(set_config),
            set_config.tags.clone(),
        )?;
        let expanded = expander.expand(&set.mappings, set.depth)?;
        info!(
            "Expanded set '{}' ({} directories) to depth {}: {} targets",
            set.name,
            set.mappings.len(),
            set.depth,
            expanded.len()
        );
        targets.extend(expanded.into_iter().map(|mapping| ScanTarget {
            mapping,
            set: Some(set.name.clone()),
            tags: set.tags.clone(),
        }));
    }

    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;
    use std::io;
    use std::path::PathBuf;

    fn config(body: &str) -> Config {
        let content = format!(
            "{}\n[influx]\naddress = \"http://localhost:8086\"\ndatabase = \"m\"\n",
            body
        );
        Config::parse(&content).unwrap()
    }

    fn resolver() -> PathResolver {
        PathResolver::default().with_home("/data").with_cwd("/")
    }

    #[test]
    fn test_plain_directories_depth_zero() {
        let config = config("directories = [\"~/a\", \"/data/b/\"]");
        let targets = build_targets(&config, &resolver(), &MockFs::two_roots()).unwrap();
        assert_eq!(
            targets,
            vec![
                ScanTarget::plain(DirectoryMapping::from_path("/data/a")),
                ScanTarget::plain(DirectoryMapping::from_path("/data/b")),
            ]
        );
    }

    #[test]
    fn test_labelled_mapping_keeps_label() {
        let config = config(
            "directories = [{ label = \"/exports/b\", path = \"/data/b\" }]\n[reporting]\ndepth = 1",
        );
        let targets = build_targets(&config, &resolver(), &MockFs::two_roots()).unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].mapping.label, "/exports/b/src");
        assert_eq!(targets[0].mapping.path, PathBuf::from("/data/b/src"));
    }

    #[test]
    fn test_sets_expand_with_own_depth() {
        let config = config(
            "directories = [\"/data/b\"]\n\
             [[sets]]\nname = \"logs\"\ndepth = 1\ntags = { kind = \"log\" }\ndirectories = [\"/data/a/logs\"]",
        );
        let targets = build_targets(&config, &resolver(), &MockFs::two_roots()).unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].set, None);
        assert_eq!(targets[1].set.as_deref(), Some("logs"));
        assert_eq!(targets[1].mapping.path, PathBuf::from("/data/a/logs/old"));
        assert_eq!(targets[1].tags.get("kind").unwrap(), "log");
    }

    #[test]
    fn test_unreadable_root_is_fatal() {
        let mut fs = MockFs::two_roots();
        fs.fail("/data/a", io::ErrorKind::PermissionDenied);
        let config = config("directories = [\"/data/a\"]\n[reporting]\ndepth = 1");
        let err = build_targets(&config, &resolver(), &fs).unwrap_err();
        assert!(matches!(err, TargetError::Expand(_)));
    }

    #[test]
    fn test_unknown_home_is_fatal() {
        let config = config("directories = [\"~/a\"]");
        let resolver = PathResolver::default().with_cwd("/");
        let err = build_targets(&config, &resolver, &MockFs::two_roots()).unwrap_err();
        assert!(matches!(err, TargetError::Path(PathError::HomeUnavailable(_))));
    }
}
