// src/handlers/node_types.rs

//! Node type definitions in CND notation

use super::{EntryHandler, EntryPattern};
use crate::convert::ContentPackageConverter;
use crate::error::Result;
use crate::packages::traits::PackageArchive;
use tracing::debug;

/// Default location of node type definitions in a package
pub const DEFAULT_CND_PATTERN: &str = r"/META-INF/vault/nodetypes\.cnd";

/// Turns every line of a CND file into a node type registration sentence
///
/// Packages may declare further CND locations through the `cndPattern`
/// property; the converter registers one extra handler per pattern.
pub struct NodeTypesEntryHandler {
    pattern: EntryPattern,
}

impl NodeTypesEntryHandler {
    pub fn new() -> Result<Self> {
        Self::with_pattern(DEFAULT_CND_PATTERN)
    }

    pub fn with_pattern(pattern: &str) -> Result<Self> {
        Ok(Self {
            pattern: EntryPattern::new(pattern)?,
        })
    }
}

impl EntryHandler for NodeTypesEntryHandler {
    fn name(&self) -> &'static str {
        "node-types"
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
        let content = archive.read_entry(path)?;
        let text = String::from_utf8_lossy(&content);

        let mut count = 0;
        for line in text.lines() {
            converter.acl_manager_mut().add_nodetype_registration_sentence(line);
            count += 1;
        }

        debug!("{} node type lines read from {}", count, path);
        Ok(())
    }
}
