// src/handlers/privileges.rs

//! Custom privilege declarations (`META-INF/vault/privileges.xml`)

use super::{EntryHandler, EntryPattern};
use crate::convert::ContentPackageConverter;
use crate::error::{Error, Result};
use crate::packages::traits::PackageArchive;
use crate::xml::parse_document;
use tracing::debug;

pub struct PrivilegesEntryHandler {
    pattern: EntryPattern,
}

impl PrivilegesEntryHandler {
    pub fn new() -> Result<Self> {
        Ok(Self {
            pattern: EntryPattern::new(r"/META-INF/vault/privileges\.xml")?,
        })
    }
}

impl EntryHandler for PrivilegesEntryHandler {
    fn name(&self) -> &'static str {
        "privileges"
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
        let root = parse_document(&content)
            .map_err(|e| Error::ParseError(format!("Invalid privileges {}: {}", path, e)))?;

        for privilege in root.children_named("privilege") {
            if let Some(name) = privilege.attribute("name").filter(|n| !n.is_empty()) {
                debug!("Privilege {} declared in {}", name, archive.source());
                converter.acl_manager_mut().add_privilege(name);
            }
        }

        Ok(())
    }
}
