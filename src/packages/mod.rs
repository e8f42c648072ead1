// src/packages/mod.rs

//! Content package support
//!
//! A content package is an archive with vault metadata under `META-INF/vault`
//! and repository content under `jcr_root`. Readers implement the
//! `PackageArchive` trait; `TarPackage` is the bundled implementation.

pub mod archive_utils;
pub mod id;
pub mod metadata;
pub mod tarball;
pub mod traits;

pub use id::{Dependency, PackageId};
pub use metadata::{PackageProperties, WorkspaceFilter};
pub use tarball::{TarPackage, TarPackageOpener};
pub use traits::{PackageArchive, PackageOpener};
