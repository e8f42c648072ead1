// src/packages/traits.rs

//! Common traits for content package archives

use crate::error::Result;
use crate::packages::id::{Dependency, PackageId};
use crate::packages::metadata::{PackageProperties, WorkspaceFilter};
use std::path::Path;

/// An opened content package
///
/// Entry paths are absolute inside the archive (`/jcr_root/apps/foo/.content.xml`,
/// `/META-INF/vault/properties.xml`).
pub trait PackageArchive {
    /// Package coordinates as declared in its properties
    fn id(&self) -> &PackageId;

    /// Declared package properties
    fn properties(&self) -> &PackageProperties;

    /// Declared dependencies on other packages
    fn dependencies(&self) -> &[Dependency];

    /// Declared workspace filter
    fn filter(&self) -> &WorkspaceFilter;

    /// All file entries in traversal order
    fn entries(&self) -> Vec<String>;

    /// Read the content of one entry
    fn read_entry(&self, path: &str) -> Result<Vec<u8>>;

    /// Open an entry that is itself a content package
    fn open_sub_package(&self, path: &str) -> Result<Box<dyn PackageArchive>>;

    /// Human readable origin of the package (file path or parent entry)
    fn source(&self) -> &str;

    /// Release the archive; the package must not be read afterwards
    fn close(&mut self) -> Result<()>;
}

/// Opens content packages from the filesystem
pub trait PackageOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn PackageArchive>>;
}
