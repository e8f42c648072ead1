// src/packages/id.rs

//! Package coordinates and dependency references

use crate::error::{Error, Result};
use crate::version::{PackageVersion, VersionRange};
use std::fmt;

/// Unique coordinate of a content package: `group:name:version`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageId {
    pub group: String,
    pub name: String,
    pub version: String,
}

impl PackageId {
    pub fn new(group: impl Into<String>, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            version: version.into(),
        }
    }

    /// Parse `group:name[:version]`
    pub fn parse(s: &str) -> Result<Self> {
        let mut parts = s.trim().splitn(3, ':');
        let group = parts.next().unwrap_or_default();
        let name = parts
            .next()
            .ok_or_else(|| Error::ParseError(format!("Invalid package id '{}'", s)))?;
        let version = parts.next().unwrap_or_default();
        Ok(Self::new(group, name, version))
    }

    /// Parsed version, if the id carries one
    pub fn package_version(&self) -> Option<PackageVersion> {
        PackageVersion::parse(&self.version).ok()
    }

    /// The version-less part of the coordinate
    pub fn key(&self) -> (String, String) {
        (self.group.clone(), self.name.clone())
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.name, self.version)
    }
}

/// A dependency on another package, matched by group, name and version range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub group: String,
    pub name: String,
    pub range: VersionRange,
}

impl Dependency {
    /// Parse `[group:]name[:range]`
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::ParseError("Empty dependency".to_string()));
        }

        let mut parts = s.splitn(3, ':');
        let first = parts.next().unwrap_or_default();
        let (group, name, range) = match (parts.next(), parts.next()) {
            (None, _) => ("", first, ""),
            (Some(name), None) => (first, name, ""),
            (Some(name), Some(range)) => (first, name, range),
        };

        if name.is_empty() {
            return Err(Error::ParseError(format!("Dependency '{}' has no name", s)));
        }

        Ok(Self {
            group: group.to_string(),
            name: name.to_string(),
            range: VersionRange::parse(range)?,
        })
    }

    /// Parse the comma separated `dependencies` package property
    ///
    /// Commas inside a range (`[1.0,2.0)`) do not separate dependencies.
    pub fn parse_list(s: &str) -> Result<Vec<Self>> {
        let mut deps = Vec::new();
        let mut depth = 0usize;
        let mut start = 0usize;

        for (i, c) in s.char_indices() {
            match c {
                '[' | '(' => depth += 1,
                ']' | ')' => depth = depth.saturating_sub(1),
                ',' if depth == 0 => {
                    let item = s[start..i].trim();
                    if !item.is_empty() {
                        deps.push(Self::parse(item)?);
                    }
                    start = i + 1;
                }
                _ => {}
            }
        }

        let last = s[start..].trim();
        if !last.is_empty() {
            deps.push(Self::parse(last)?);
        }

        Ok(deps)
    }

    /// Check whether a package satisfies this dependency
    pub fn matches(&self, id: &PackageId) -> bool {
        if self.group != id.group || self.name != id.name {
            return false;
        }
        match id.package_version() {
            Some(version) => self.range.satisfies(&version),
            None => self.range.is_any(),
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.name)?;
        if !self.range.is_any() {
            write!(f, ":{}", self.range)?;
        }
        Ok(())
    }
}
