//! Metric points and batches.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::Path;

/// Measurement name of every point produced by the collector.
pub const MEASUREMENT: &str = "directory_size_in_bytes";

/// Tag set with unique keys, iterated in key order.
pub type TagSet = BTreeMap<String, String>;

/// Error building a single point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointError {
    EmptyMeasurement,
    EmptyTagKey,
    /// Tag with this key has an empty value.
    EmptyTagValue(String),
    /// Measurement contains a line break or ends with a backslash.
    UnencodableMeasurement(String),
    /// Tag key or value contains a line break or ends with a backslash.
    UnencodableTag(String),
    /// Value does not fit a signed 64-bit integer field.
    ValueOutOfRange(u64),
}

impl std::fmt::Display for PointError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PointError::EmptyMeasurement => write!(f, "measurement name is empty"),
            PointError::EmptyTagKey => write!(f, "tag key is empty"),
            PointError::EmptyTagValue(key) => write!(f, "tag '{}' has an empty value", key),
            PointError::UnencodableMeasurement(m) => {
                write!(f, "measurement {:?} cannot be encoded as line protocol", m)
            }
            PointError::UnencodableTag(key) => {
                write!(f, "tag {:?} cannot be encoded as line protocol", key)
            }
            PointError::ValueOutOfRange(v) => {
                write!(f, "value {} exceeds the integer field range", v)
            }
        }
    }
}

impl std::error::Error for PointError {}

/// A single measurement of one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricPoint {
    measurement: String,
    tags: TagSet,
    value: u64,
    timestamp: DateTime<Utc>,
}

impl MetricPoint {
    /// Builds a validated point.
    pub fn new(
        measurement: impl Into<String>,
        tags: TagSet,
        value: u64,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, PointError> {
        let measurement = measurement.into();
        if measurement.is_empty() {
            return Err(PointError::EmptyMeasurement);
        }
        if !encodable(&measurement) {
            return Err(PointError::UnencodableMeasurement(measurement));
        }
        for (key, val) in &tags {
            if key.is_empty() {
                return Err(PointError::EmptyTagKey);
            }
            if val.is_empty() {
                return Err(PointError::EmptyTagValue(key.clone()));
            }
            if !encodable(key) || !encodable(val) {
                return Err(PointError::UnencodableTag(key.clone()));
            }
        }
        if value > i64::MAX as u64 {
            return Err(PointError::ValueOutOfRange(value));
        }
        Ok(Self {
            measurement,
            tags,
            value,
            timestamp,
        })
    }

    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Line protocol has no escape for line breaks, and a trailing backslash
/// would escape the following separator.
fn encodable(s: &str) -> bool {
    !s.contains(['\n', '\r']) && !s.ends_with('\\')
}

/// Merges tag sets left to right; later sets win on key collision.
pub fn merge_tag_sets(sets: &[&TagSet]) -> TagSet {
    let mut merged = TagSet::new();
    for set in sets {
        for (k, v) in set.iter() {
            merged.insert(k.clone(), v.clone());
        }
    }
    merged
}

/// Tags derived from a mapping label: `absolute_path`, `directory_path`, `base_path`.
///
/// For the root path both parent and leaf are reported as the path itself.
pub fn derived_tags(label: &str) -> TagSet {
    let path = Path::new(label);
    let directory_path = path
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| label.to_string());
    let base_path = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| label.to_string());

    TagSet::from([
        ("absolute_path".to_string(), label.to_string()),
        ("directory_path".to_string(), directory_path),
        ("base_path".to_string(), base_path),
    ])
}

/// Points produced by one cycle, written with one sink call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    pub database: String,
    pub retention_policy: Option<String>,
    pub points: Vec<MetricPoint>,
}

impl Batch {
    pub fn new(database: impl Into<String>, retention_policy: Option<String>) -> Self {
        Self {
            database: database.into(),
            retention_policy,
            points: Vec::new(),
        }
    }

    pub fn add_point(&mut self, point: MetricPoint) {
        self.points.push(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> TagSet {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_derived_tags() {
        let t = derived_tags("/a/b");
        assert_eq!(t.get("absolute_path").unwrap(), "/a/b");
        assert_eq!(t.get("directory_path").unwrap(), "/a");
        assert_eq!(t.get("base_path").unwrap(), "b");
    }

    #[test]
    fn test_derived_tags_root() {
        let t = derived_tags("/");
        assert_eq!(t.get("absolute_path").unwrap(), "/");
        assert_eq!(t.get("directory_path").unwrap(), "/");
        assert_eq!(t.get("base_path").unwrap(), "/");
    }

    #[test]
    fn test_merge_keeps_both_and_later_wins() {
        let statics = tags(&[("env", "prod"), ("absolute_path", "bogus")]);
        let derived = derived_tags("/a/b");

        let merged = merge_tag_sets(&[&statics, &derived]);
        assert_eq!(merged.get("env").unwrap(), "prod");
        assert_eq!(merged.get("absolute_path").unwrap(), "/a/b");
        assert_eq!(merged.len(), 4);
    }

    #[test]
    fn test_point_rejects_empty_tag_value() {
        let result = MetricPoint::new(MEASUREMENT, tags(&[("env", "")]), 1, Utc::now());
        assert_eq!(result.unwrap_err(), PointError::EmptyTagValue("env".into()));
    }

    #[test]
    fn test_point_rejects_line_breaks_and_trailing_backslash() {
        let at = Utc::now();
        let result = MetricPoint::new(MEASUREMENT, tags(&[("absolute_path", "/d/evil\nname")]), 5, at);
        assert_eq!(result.unwrap_err(), PointError::UnencodableTag("absolute_path".into()));

        let result = MetricPoint::new(MEASUREMENT, tags(&[("base_path", "trail\\")]), 7, at);
        assert_eq!(result.unwrap_err(), PointError::UnencodableTag("base_path".into()));

        let result = MetricPoint::new(MEASUREMENT, tags(&[("k\r", "v")]), 7, at);
        assert_eq!(result.unwrap_err(), PointError::UnencodableTag("k\r".into()));

        let result = MetricPoint::new("size\n", TagSet::new(), 7, at);
        assert_eq!(
            result.unwrap_err(),
            PointError::UnencodableMeasurement("size\n".into())
        );

        // Backslashes elsewhere are escaped as usual.
        assert!(MetricPoint::new(MEASUREMENT, tags(&[("p", "C:\\dir")]), 7, at).is_ok());
    }

    #[test]
    fn test_point_rejects_out_of_range_value() {
        let result = MetricPoint::new(MEASUREMENT, TagSet::new(), u64::MAX, Utc::now());
        assert_eq!(result.unwrap_err(), PointError::ValueOutOfRange(u64::MAX));
    }

    #[test]
    fn test_point_accepts_max_integer() {
        let point = MetricPoint::new(MEASUREMENT, TagSet::new(), i64::MAX as u64, Utc::now()).unwrap();
        assert_eq!(point.value(), i64::MAX as u64);
        assert_eq!(point.measurement(), MEASUREMENT);
    }
}
