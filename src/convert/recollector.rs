// src/convert/recollector.rs

//! Discovery of nested content packages
//!
//! Input packages often embed several versions of the same sub-package.
//! Before anything is converted, every nested package is recorded by group
//! and name, keeping only the newest version. During conversion a nested
//! package is processed only if it is the recorded one.

use crate::error::Result;
use crate::handlers::{EntryPattern, SUB_PACKAGE_PATTERN};
use crate::packages::id::PackageId;
use crate::packages::traits::PackageArchive;
use crate::version::PackageVersion;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Shared table of nested packages: (group, name) → (id, entry path)
#[derive(Debug, Clone, Default)]
pub struct SubPackageIndex {
    inner: Arc<RwLock<HashMap<(String, String), (PackageId, String)>>>,
}

impl SubPackageIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a nested package unless a newer version is already known
    ///
    /// Returns whether `path` is now the recorded location for the package.
    pub fn record(&self, id: &PackageId, path: &str) -> bool {
        let mut index = self.inner.write();

        if let Some((existing, existing_path)) = index.get(&id.key())
            && !supersedes(id, existing)
        {
            debug!("{} at {} is not newer than {} at {}", id, path, existing, existing_path);
            return false;
        }

        if let Some((superseded, _)) = index.insert(id.key(), (id.clone(), path.to_string())) {
            debug!("{} supersedes {}", id, superseded);
        }
        true
    }

    /// Whether a nested package at `path` is to be converted
    pub fn contains_path(&self, path: &str) -> bool {
        self.inner.read().values().any(|(_, p)| p == path)
    }

    /// Recorded location of a package
    #[cfg(test)]
    pub fn path_for(&self, group: &str, name: &str) -> Option<String> {
        self.inner
            .read()
            .get(&(group.to_string(), name.to_string()))
            .map(|(_, path)| path.clone())
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

/// Whether `candidate` replaces `existing` in the index
///
/// Only versions starting with a number are compared. Such a version always
/// wins against one that does not; between two non-numeric versions the
/// later sighting wins.
fn supersedes(candidate: &PackageId, existing: &PackageId) -> bool {
    let numeric = |id: &PackageId| id.package_version().filter(PackageVersion::is_numeric);
    match (numeric(candidate), numeric(existing)) {
        (Some(candidate), Some(existing)) => candidate > existing,
        (Some(_), None) => true,
        (None, Some(_)) => false,
        (None, None) => true,
    }
}

/// Walks packages and records every nested package into an index
pub struct SubPackageRecollector {
    pattern: EntryPattern,
    index: SubPackageIndex,
}

impl SubPackageRecollector {
    pub fn new(index: SubPackageIndex) -> Result<Self> {
        Ok(Self {
            pattern: EntryPattern::new(SUB_PACKAGE_PATTERN)?,
            index,
        })
    }

    pub fn index(&self) -> &SubPackageIndex {
        &self.index
    }

    /// Record all packages nested in `archive`, at any depth
    pub fn recollect(&self, archive: &dyn PackageArchive) -> Result<()> {
        for path in archive.entries() {
            if !self.pattern.matches(&path) {
                continue;
            }

            let mut sub_package = archive.open_sub_package(&path)?;
            debug!("Found sub content-package {} at {}", sub_package.id(), path);
            self.index.record(sub_package.id(), &path);

            let result = self.recollect(sub_package.as_ref());
            if let Err(e) = sub_package.close() {
                debug!("Failed to close sub package {}: {}", path, e);
            }
            result?;
        }

        Ok(())
    }
}
