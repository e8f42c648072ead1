// src/convert/mod.rs
//! Conversion orchestration
//!
//! `ContentPackageConverter` drives the whole run; `order` linearizes the
//! input packages by dependency and `recollector` decides which nested
//! packages take part in the conversion.

mod converter;
pub mod order;
pub mod recollector;

pub use converter::{ContentPackageConverter, DEFAULT_VERSION, PACKAGE_CLASSIFIER, ZIP_TYPE};
pub use order::{OrderNode, linearize};
pub use recollector::{SubPackageIndex, SubPackageRecollector};
