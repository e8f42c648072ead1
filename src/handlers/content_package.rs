// src/handlers/content_package.rs

//! Content packages nested below `/etc/packages`

use super::{EntryHandler, EntryPattern};
use crate::convert::ContentPackageConverter;
use crate::error::Result;
use crate::packages::traits::PackageArchive;
use tracing::debug;

/// Entry paths of nested content packages
pub const SUB_PACKAGE_PATTERN: &str = r"/jcr_root/etc/packages/.+\.(?:zip|tar|tgz)";

/// Opens a nested package and converts it as part of its parent
pub struct ContentPackageEntryHandler {
    pattern: EntryPattern,
}

impl ContentPackageEntryHandler {
    pub fn new() -> Result<Self> {
        Ok(Self {
            pattern: EntryPattern::new(SUB_PACKAGE_PATTERN)?,
        })
    }
}

impl EntryHandler for ContentPackageEntryHandler {
    fn name(&self) -> &'static str {
        "content-package"
    }

    fn matches(&self, path: &str) -> bool {
        self.pattern.matches(path)
    }

    fn handle(
        &self,
        path: &str,
        archive: &dyn PackageArchive,
        converter: &mut ContentPackageConverter,
    ) -> Result<()> {
        let mut sub_package = archive.open_sub_package(path)?;
        let result = converter.process_sub_package(path, sub_package.as_ref());

        if let Err(e) = sub_package.close() {
            debug!("Failed to close sub package {}: {}", path, e);
        }

        result
    }
}
