// src/handlers/rep_policy.rs

//! Access control policies (`_rep_policy.xml`)
//!
//! A policy node lists access control entries as children typed
//! `rep:GrantACE` or `rep:DenyACE`. Restrictions are stored in an optional
//! `rep:Restrictions` child:
//!
//! ```xml
//! <jcr:root jcr:primaryType="rep:ACL">
//!     <allow jcr:primaryType="rep:GrantACE"
//!            rep:principalName="acme-reader"
//!            rep:privileges="{Name}[jcr:read]">
//!         <rep:restrictions jcr:primaryType="rep:Restrictions" rep:glob="*/oak:index/*"/>
//!     </allow>
//! </jcr:root>
//! ```

use super::{EntryHandler, EntryPattern};
use crate::acl::Acl;
use crate::convert::ContentPackageConverter;
use crate::error::{Error, Result};
use crate::packages::traits::PackageArchive;
use crate::xml::{XmlElement, jcr_value, parse_document};
use tracing::{debug, warn};

const JCR_PRIMARY_TYPE: &str = "jcr:primaryType";
const REP_GRANT_ACE: &str = "rep:GrantACE";
const REP_DENY_ACE: &str = "rep:DenyACE";
const REP_RESTRICTIONS: &str = "rep:Restrictions";
const REP_PRINCIPAL_NAME: &str = "rep:principalName";
const REP_PRIVILEGES: &str = "rep:privileges";

/// Records one ACL per access control entry of a policy
pub struct RepPolicyEntryHandler {
    pattern: EntryPattern,
}

impl RepPolicyEntryHandler {
    pub fn new() -> Result<Self> {
        Ok(Self {
            pattern: EntryPattern::new(r"/jcr_root(.*/)_rep_policy\.xml")?,
        })
    }

    /// Repository path the policy protects
    fn protected_path(&self, path: &str) -> Option<String> {
        let captures = self.pattern.captures(path)?;
        let parent = captures.get(1)?.as_str();
        let trimmed = parent.trim_end_matches('/');
        Some(if trimmed.is_empty() { "/".to_string() } else { trimmed.to_string() })
    }
}

fn primary_type(element: &XmlElement) -> Option<&str> {
    element.attribute(JCR_PRIMARY_TYPE).map(jcr_value)
}

/// `name,value` pairs of a `rep:Restrictions` node
fn restrictions(ace: &XmlElement) -> Vec<String> {
    ace.children
        .iter()
        .filter(|c| primary_type(c) == Some(REP_RESTRICTIONS))
        .flat_map(|c| c.attributes.iter())
        .filter(|(name, _)| name.as_str() != JCR_PRIMARY_TYPE && !name.starts_with("xmlns"))
        .map(|(name, value)| format!("{},{}", name, jcr_value(value)))
        .collect()
}

impl EntryHandler for RepPolicyEntryHandler {
    fn name(&self) -> &'static str {
        "rep-policy"
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
        let protected = self
            .protected_path(path)
            .ok_or_else(|| Error::ParseError(format!("{} is not a policy entry", path)))?;

        let content = archive.read_entry(path)?;
        let root = parse_document(&content)
            .map_err(|e| Error::ParseError(format!("Invalid policy {}: {}", path, e)))?;

        for ace in &root.children {
            let operation = match primary_type(ace) {
                Some(REP_GRANT_ACE) => "allow",
                Some(REP_DENY_ACE) => "deny",
                _ => continue,
            };

            let Some(principal) = ace.attribute(REP_PRINCIPAL_NAME) else {
                warn!("Access control entry <{}> in {} has no principal, skipping", ace.name, path);
                continue;
            };
            let privileges = ace.attribute(REP_PRIVILEGES).map(jcr_value).unwrap_or_default();

            let mut acl = Acl::new(operation, privileges, &protected);
            acl.restrictions = restrictions(ace);

            debug!("{} {} on {} for {}", operation, privileges, protected, principal);
            converter.acl_manager_mut().add_acl(principal, acl);
        }

        Ok(())
    }
}
