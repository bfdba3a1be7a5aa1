//! Build records and build lists.

use crate::error::{ReconcileError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Four-part build version, `major.minor.maint.build`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub maint: u32,
    pub build: u32,
}

impl Version {
    pub fn new(major: u32, minor: u32, maint: u32, build: u32) -> Self {
        Self {
            major,
            minor,
            maint,
            build,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}.{}", self.major, self.minor, self.maint, self.build)
    }
}

impl FromStr for Version {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let parts = s
            .trim()
            .split('.')
            .map(|p| p.trim().parse::<u32>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| format!("invalid version {s:?}: {e}"))?;
        match parts.as_slice() {
            &[major, minor, maint, build] => Ok(Self::new(major, minor, maint, build)),
            _ => Err(format!("invalid version {s:?}: expected four parts")),
        }
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct VersionParts {
    major: u32,
    minor: u32,
    maint: u32,
    build: u32,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum VersionRepr {
    Text(String),
    Parts(VersionParts),
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match VersionRepr::deserialize(deserializer)? {
            VersionRepr::Text(text) => text.parse().map_err(serde::de::Error::custom),
            VersionRepr::Parts(p) => Ok(Self::new(p.major, p.minor, p.maint, p.build)),
        }
    }
}

/// One captured build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Build {
    pub hash: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub version: Version,
    /// Build kind, e.g. `Player` or `Studio`.
    #[serde(rename = "Type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_hash: Option<String>,
}

impl Build {
    pub fn new(hash: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self {
            hash: hash.into(),
            date,
            version: Version::default(),
            kind: None,
            secondary_hash: None,
        }
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Builds without a kind match every filter.
    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind.as_deref().is_none_or(|k| k == kind)
    }
}

/// A list of builds, read either as a bare array or as a
/// `{Schema, Domain, Builds}` document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BuildList {
    #[serde(default)]
    pub schema: u32,
    #[serde(default)]
    pub domain: String,
    pub builds: Vec<Build>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BuildListRepr {
    Bare(Vec<Build>),
    Document(BuildList),
}

impl BuildList {
    pub fn new(builds: Vec<Build>) -> Self {
        Self {
            builds,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        Ok(match serde_json::from_str(json)? {
            BuildListRepr::Bare(builds) => Self::new(builds),
            BuildListRepr::Document(list) => list,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ReconcileError::BuildList {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_json(&text).map_err(|e| ReconcileError::BuildList {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.builds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builds.is_empty()
    }

    /// Builds of the given kind, newest first. Equal dates keep list order.
    pub fn ordered(&self, kind: Option<&str>) -> Vec<Build> {
        order(&self.builds, kind)
    }
}

/// Filter by kind and sort newest first, stably.
pub fn order(builds: &[Build], kind: Option<&str>) -> Vec<Build> {
    let mut ordered: Vec<Build> = builds
        .iter()
        .filter(|b| kind.is_none_or(|k| b.is_kind(k)))
        .cloned()
        .collect();
    ordered.sort_by(|a, b| b.date.cmp(&a.date));
    ordered
}
