//! Collector configuration.
//!
//! Read from a TOML file, validated once, then optionally overridden from the
//! command line before the target list is built.
//!
//! ```toml
//! dry_run = false
//! directories = ["~/data", { label = "/exports/a", path = "/mnt/a" }]
//!
//! [logging]
//! level = "info"
//!
//! [influx]
//! address = "http://localhost:8086"
//! database = "metrics"
//!
//! [reporting]
//! interval_secs = 10
//! depth = 0
//! tags = { env = "prod" }
//!
//! [[sets]]
//! name = "media"
//! depth = 1
//! directories = ["/srv/media"]
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::Level;

use crate::model::TagSet;

/// Default reporting interval.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);
/// Default HTTP timeout for sink writes.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Error loading or validating configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file cannot be read.
    Read(PathBuf, std::io::Error),
    /// Config file is not valid TOML or has unexpected fields.
    Parse(PathBuf, toml::de::Error),
    /// Required keys are absent.
    MissingKeys(Vec<&'static str>),
    /// A value is present but unusable.
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read(path, e) => {
                write!(f, "cannot read config file {}: {}", path.display(), e)
            }
            ConfigError::Parse(path, e) => {
                write!(f, "error parsing config file {}: {}", path.display(), e)
            }
            ConfigError::MissingKeys(keys) => {
                write!(f, "missing keys in config: {}", keys.join(","))
            }
            ConfigError::Invalid(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// A configured directory: either a bare path or a label/path pair.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum DirectoryConfig {
    Path(String),
    Mapping(LabelledDirectory),
}

/// `{ path = "...", label = "..." }` form of a directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LabelledDirectory {
    pub path: String,
    #[serde(default)]
    pub label: Option<String>,
}

impl DirectoryConfig {
    pub fn path(&self) -> &str {
        match self {
            DirectoryConfig::Path(path) => path,
            DirectoryConfig::Mapping(entry) => &entry.path,
        }
    }

    /// Explicit label, if one was configured.
    pub fn label(&self) -> Option<&str> {
        match self {
            DirectoryConfig::Path(_) => None,
            DirectoryConfig::Mapping(entry) => entry.label.as_deref(),
        }
    }
}

/// A named directory set as written in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetConfig {
    pub name: String,
    /// Falls back to `reporting.depth` when absent.
    #[serde(default)]
    pub depth: Option<usize>,
    #[serde(default)]
    pub tags: TagSet,
    #[serde(default)]
    pub directories: Vec<DirectoryConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    #[serde(default, alias = "is_dry")]
    dry_run: bool,
    #[serde(default)]
    logging: LoggingSection,
    #[serde(default)]
    influx: InfluxSection,
    #[serde(default)]
    reporting: ReportingSection,
    #[serde(default)]
    directories: Vec<DirectoryConfig>,
    #[serde(default)]
    sets: Vec<SetConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LoggingSection {
    level: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct InfluxSection {
    address: Option<String>,
    database: Option<String>,
    username: Option<String>,
    password: Option<String>,
    retention_policy: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ReportingSection {
    interval_secs: Option<u64>,
    #[serde(default)]
    depth: usize,
    #[serde(default)]
    tags: TagSet,
}

/// Connection settings for the InfluxDB sink.
#[derive(Clone)]
pub struct InfluxSettings {
    pub address: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub retention_policy: Option<String>,
    pub timeout: Duration,
}

impl std::fmt::Debug for InfluxSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InfluxSettings")
            .field("address", &self.address)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("retention_policy", &self.retention_policy)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub influx: InfluxSettings,
    pub interval: Duration,
    pub depth: usize,
    pub dry_run: bool,
    pub log_level: Level,
    /// Static tags added to every point.
    pub tags: TagSet,
    pub directories: Vec<DirectoryConfig>,
    pub sets: Vec<SetConfig>,
}

impl Config {
    /// Reads and validates a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        Self::parse(&content).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parses and validates config file content.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let file: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        Self::validate(file)
    }

    fn validate(file: FileConfig) -> Result<Self, ConfigError> {
        let mut missing = Vec::new();
        let address = non_empty(file.influx.address);
        let database = non_empty(file.influx.database);
        if database.is_none() {
            missing.push("influx.database");
        }
        if address.is_none() {
            missing.push("influx.address");
        }
        if file.directories.is_empty() && file.sets.is_empty() {
            missing.push("directories");
        }
        let (Some(address), Some(database)) = (address, database) else {
            return Err(ConfigError::MissingKeys(missing));
        };
        if !missing.is_empty() {
            return Err(ConfigError::MissingKeys(missing));
        }

        let interval = match file.reporting.interval_secs {
            Some(0) => {
                return Err(ConfigError::Invalid(
                    "reporting.interval_secs must be greater than zero".into(),
                ));
            }
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_INTERVAL,
        };

        validate_tags("reporting.tags", &file.reporting.tags)?;

        let mut names = HashSet::new();
        for set in &file.sets {
            if set.name.trim().is_empty() {
                return Err(ConfigError::Invalid("directory set with empty name".into()));
            }
            if !names.insert(set.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate directory set '{}'",
                    set.name
                )));
            }
            if set.directories.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "directory set '{}' has no directories",
                    set.name
                )));
            }
            validate_tags(&format!("sets.{}.tags", set.name), &set.tags)?;
        }

        Ok(Self {
            influx: InfluxSettings {
                address,
                database,
                username: non_empty(file.influx.username),
                password: file.influx.password,
                retention_policy: non_empty(file.influx.retention_policy),
                timeout: file
                    .influx
                    .timeout_secs
                    .map(Duration::from_secs)
                    .unwrap_or(DEFAULT_TIMEOUT),
            },
            interval,
            depth: file.reporting.depth,
            dry_run: file.dry_run,
            log_level: parse_level(file.logging.level.as_deref()),
            tags: file.reporting.tags,
            directories: file.directories,
            sets: file.sets,
        })
    }

    /// Depth used for `set`, honoring the global default.
    pub fn set_depth(&self, set: &SetConfig) -> usize {
        set.depth.unwrap_or(self.depth)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_tags(section: &str, tags: &TagSet) -> Result<(), ConfigError> {
    for (key, value) in tags {
        if key.is_empty() || value.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "{}: tag keys and values must not be empty",
                section
            )));
        }
    }
    Ok(())
}

/// Maps a configured level name to a tracing level; unknown names mean info.
fn parse_level(level: Option<&str>) -> Level {
    match level.map(|l| l.trim().to_ascii_lowercase()).as_deref() {
        Some("trace") => Level::TRACE,
        Some("debug") => Level::DEBUG,
        Some("warn") | Some("warning") => Level::WARN,
        Some("error") | Some("fatal") | Some("panic") => Level::ERROR,
        _ => Level::INFO,
    }
}
