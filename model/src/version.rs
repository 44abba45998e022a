use crate::error::{self, Result};
use lazy_static::lazy_static;
use regex::Regex;
use snafu::{ensure, ResultExt};
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

const RELEASE_PATTERN_REGEX: &str =
    r"^[vV]?(\d+)(?:\.(\d+))?(?:\.(\d+))?(?:-([0-9A-Za-z.-]+))?(?:\+[0-9A-Za-z.-]+)?$";

lazy_static! {
    static ref REGEX: Regex = {
        #[allow(clippy::unwrap_used)]
        Regex::new(RELEASE_PATTERN_REGEX).unwrap()
    };
}

/// The version of a Harvester cluster, as reported by its `server-version` setting.
///
/// Releases compare by their `(major, minor, patch)` tuple only, so `v1.2.0-rc1` and `v1.2.0`
/// select the same manager variants. Anything that does not look like a release (for example
/// `master-4a2b1c-head`) is a development build and orders above every release.
#[derive(Debug, Clone)]
pub enum ClusterVersion {
    Release(semver::Version),
    Development(String),
}

impl ClusterVersion {
    pub fn parse(version: &str) -> Result<Self> {
        let version = version.trim();
        ensure!(!version.is_empty(), error::EmptyVersionSnafu);
        let captures = match REGEX.captures(version) {
            None => return Ok(ClusterVersion::Development(version.to_string())),
            Some(captures) => captures,
        };
        let part = |i: usize| captures.get(i).map(|m| m.as_str()).unwrap_or("0");
        let mut normalized = format!("{}.{}.{}", part(1), part(2), part(3));
        if let Some(pre) = captures.get(4) {
            normalized.push('-');
            normalized.push_str(pre.as_str());
        }
        let release = semver::Version::parse(&normalized).context(error::InvalidVersionSnafu {
            version: version.to_string(),
        })?;
        Ok(ClusterVersion::Release(release))
    }

    /// A release version with no pre-release tag.
    pub fn release(major: u64, minor: u64, patch: u64) -> Self {
        ClusterVersion::Release(semver::Version::new(major, minor, patch))
    }

    pub fn is_development(&self) -> bool {
        matches!(self, ClusterVersion::Development(_))
    }

    fn rank(&self) -> (u8, u64, u64, u64) {
        match self {
            ClusterVersion::Release(v) => (0, v.major, v.minor, v.patch),
            ClusterVersion::Development(_) => (1, 0, 0, 0),
        }
    }
}

impl Default for ClusterVersion {
    fn default() -> Self {
        ClusterVersion::release(0, 0, 0)
    }
}

impl PartialEq for ClusterVersion {
    fn eq(&self, other: &Self) -> bool {
        self.rank() == other.rank()
    }
}

impl Eq for ClusterVersion {}

impl PartialOrd for ClusterVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ClusterVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl FromStr for ClusterVersion {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Display for ClusterVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ClusterVersion::Release(v) => write!(f, "v{}", v),
            ClusterVersion::Development(s) => write!(f, "{}", s),
        }
    }
}
