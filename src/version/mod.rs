// src/version/mod.rs

//! Version handling and range matching for package dependencies
//!
//! Content package versions are free-form (`1.0`, `6.4.2`, `2.1.0-SNAPSHOT`).
//! They are normalized to semver for comparison, mirroring how dependency
//! ranges are written in `META-INF/vault/properties.xml`:
//!
//! - `1.0` → any version `>= 1.0`
//! - `[1.0,2.0)` → `>= 1.0` and `< 2.0`
//! - `(,1.5]` → `<= 1.5`
//! - `[1.2]` → exactly `1.2`
//! - empty → any version

use crate::error::{Error, Result};
use semver::{Prerelease, Version};
use std::cmp::Ordering;
use std::fmt;

/// A parsed package version
#[derive(Debug, Clone)]
pub struct PackageVersion {
    raw: String,
}

impl PackageVersion {
    /// Parse a version string; only the empty string is rejected
    pub fn parse(s: &str) -> Result<Self> {
        let raw = s.trim();
        if raw.is_empty() {
            return Err(Error::ParseError("Empty version string".to_string()));
        }
        Ok(Self {
            raw: raw.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether the version starts with a numeric segment (`1`, `2.0-SNAPSHOT`)
    ///
    /// Versions that do not (`latest`, `foo`) all normalize to `0.0.0`.
    pub fn is_numeric(&self) -> bool {
        self.raw
            .split(['.', '-'])
            .next()
            .is_some_and(|first| first.parse::<u64>().is_ok())
    }

    /// Convert to a semver::Version for comparison
    ///
    /// Versions that are not semver-compliant are normalized:
    /// leading numeric segments become major.minor.patch (missing ones are 0)
    /// and anything after the first `-` becomes the pre-release qualifier.
    fn to_semver(&self) -> Version {
        if let Ok(v) = Version::parse(&self.raw) {
            return v;
        }

        let (numbers, qualifier) = match self.raw.split_once('-') {
            Some((n, q)) => (n, Some(q)),
            None => (self.raw.as_str(), None),
        };

        let parts: Vec<&str> = numbers.split('.').collect();
        let major = parts.first().and_then(|s| s.parse::<u64>().ok()).unwrap_or(0);
        let minor = parts.get(1).and_then(|s| s.parse::<u64>().ok()).unwrap_or(0);
        let patch = parts.get(2).and_then(|s| s.parse::<u64>().ok()).unwrap_or(0);

        let mut version = Version::new(major, minor, patch);
        if let Some(qualifier) = qualifier
            && let Ok(pre) = Prerelease::new(qualifier)
        {
            version.pre = pre;
        }
        version
    }

    /// Compare two versions by their normalized form
    pub fn compare(&self, other: &PackageVersion) -> Ordering {
        self.to_semver().cmp(&other.to_semver())
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl PartialEq for PackageVersion {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl Eq for PackageVersion {}

impl Ord for PackageVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl PartialOrd for PackageVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// One end of a version range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeBound {
    pub version: PackageVersion,
    pub inclusive: bool,
}

/// A range of acceptable versions for a dependency
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VersionRange {
    pub low: Option<RangeBound>,
    pub high: Option<RangeBound>,
}

impl VersionRange {
    /// Range accepting every version
    pub fn any() -> Self {
        Self::default()
    }

    /// Parse a range expression
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        if s.is_empty() {
            return Ok(Self::any());
        }

        let opening = s.chars().next();
        if !matches!(opening, Some('[') | Some('(')) {
            // A bare version is a lower bound
            return Ok(Self {
                low: Some(RangeBound {
                    version: PackageVersion::parse(s)?,
                    inclusive: true,
                }),
                high: None,
            });
        }

        let closing = s.chars().last();
        if s.len() < 2 || !matches!(closing, Some(']') | Some(')')) {
            return Err(Error::ParseError(format!("Unterminated version range '{}'", s)));
        }

        let low_inclusive = opening == Some('[');
        let high_inclusive = closing == Some(']');
        let inner = &s[1..s.len() - 1];

        let bound = |text: &str, inclusive: bool| -> Result<Option<RangeBound>> {
            let text = text.trim();
            if text.is_empty() {
                Ok(None)
            } else {
                Ok(Some(RangeBound {
                    version: PackageVersion::parse(text)?,
                    inclusive,
                }))
            }
        };

        match inner.split_once(',') {
            Some((low, high)) => Ok(Self {
                low: bound(low, low_inclusive)?,
                high: bound(high, high_inclusive)?,
            }),
            None => {
                // "[1.0]" pins a single version
                let exact = PackageVersion::parse(inner)?;
                Ok(Self {
                    low: Some(RangeBound {
                        version: exact.clone(),
                        inclusive: true,
                    }),
                    high: Some(RangeBound {
                        version: exact,
                        inclusive: true,
                    }),
                })
            }
        }
    }

    /// Check whether the range is unbounded on both sides
    pub fn is_any(&self) -> bool {
        self.low.is_none() && self.high.is_none()
    }

    /// Check if a version lies within this range
    pub fn satisfies(&self, version: &PackageVersion) -> bool {
        let above_low = match &self.low {
            None => true,
            Some(b) if b.inclusive => version >= &b.version,
            Some(b) => version > &b.version,
        };
        let below_high = match &self.high {
            None => true,
            Some(b) if b.inclusive => version <= &b.version,
            Some(b) => version < &b.version,
        };
        above_low && below_high
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.low, &self.high) {
            (None, None) => Ok(()),
            (Some(low), None) if low.inclusive => write!(f, "{}", low.version),
            (low, high) => {
                write!(f, "{}", if low.as_ref().is_some_and(|b| b.inclusive) { '[' } else { '(' })?;
                if let Some(low) = low {
                    write!(f, "{}", low.version)?;
                }
                write!(f, ",")?;
                if let Some(high) = high {
                    write!(f, "{}", high.version)?;
                }
                write!(f, "{}", if high.as_ref().is_some_and(|b| b.inclusive) { ']' } else { ')' })
            }
        }
    }
}
