// src/handlers/system_users.rs

//! Service user declarations under `/home/users`

use super::{EntryHandler, EntryPattern};
use crate::convert::ContentPackageConverter;
use crate::error::{Error, Result};
use crate::packages::traits::PackageArchive;
use crate::xml::{jcr_value, parse_document};
use tracing::debug;

const REP_SYSTEM_USER: &str = "rep:SystemUser";
const REP_AUTHORIZABLE_ID: &str = "rep:authorizableId";

/// Registers the `rep:authorizableId` of every `rep:SystemUser` node
pub struct SystemUsersEntryHandler {
    pattern: EntryPattern,
}

impl SystemUsersEntryHandler {
    pub fn new() -> Result<Self> {
        Ok(Self {
            pattern: EntryPattern::new(r"/jcr_root/home/users/.*/\.content\.xml")?,
        })
    }
}

impl EntryHandler for SystemUsersEntryHandler {
    fn name(&self) -> &'static str {
        "system-users"
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
            .map_err(|e| Error::ParseError(format!("Invalid user node {}: {}", path, e)))?;

        let is_system_user = root
            .attribute("jcr:primaryType")
            .is_some_and(|t| jcr_value(t) == REP_SYSTEM_USER);
        if root.name != "jcr:root" || !is_system_user {
            debug!("{} does not declare a service user", path);
            return Ok(());
        }

        if let Some(id) = root.attribute(REP_AUTHORIZABLE_ID).filter(|id| !id.is_empty())
            && converter.acl_manager_mut().add_system_user(id)
        {
            debug!("Service user {} found in {}", id, path);
        }

        Ok(())
    }
}
