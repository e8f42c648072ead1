// src/lib.rs

//! Content package converter
//!
//! Converts content packages (vault archives with `META-INF/vault` metadata
//! and `jcr_root` content) into feature models.
//!
//! # Architecture
//!
//! - Ordering: input packages are linearized by their declared dependencies,
//!   cycles abort the run
//! - Dispatch: every archive entry goes to the first matching entry handler,
//!   unclaimed entries are reassembled into a new content package
//! - Repoinit: service users, ACLs, privileges and node types found in a
//!   package are rendered into a repository initialization script
//! - Sub-packages: nested packages are converted with their parent, only the
//!   newest version of each is kept

pub mod acl;
pub mod artifacts;
pub mod assembler;
pub mod config;
pub mod convert;
mod error;
pub mod features;
pub mod filter;
pub mod handlers;
pub mod packages;
pub mod version;
pub mod xml;

pub use acl::{Acl, AclManager, DefaultAclManager, PrimaryTypeResolver};
pub use artifacts::{ArtifactsDeployer, LocalArtifactsDeployer};
pub use assembler::PackageAssembler;
pub use config::ConverterConfig;
pub use convert::{ContentPackageConverter, SubPackageIndex};
pub use error::{Error, Result};
pub use features::{ArtifactId, DefaultFeaturesManager, Feature, FeaturesManager};
pub use filter::ResourceFilter;
pub use handlers::{EntryHandler, EntryHandlersManager};
pub use packages::{Dependency, PackageArchive, PackageId, TarPackage};
pub use version::{PackageVersion, VersionRange};
