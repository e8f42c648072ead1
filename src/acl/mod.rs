// src/acl/mod.rs

//! Service users, ACLs and the repoinit script
//!
//! While a package is traversed, handlers report service users, access
//! control entries, node type definitions and privileges to an `AclManager`.
//! After traversal the manager renders everything into one repoinit script:
//!
//! ```text
//! register privilege acme:publish
//! create path (sling:Folder) /content
//! create path (sling:Folder) /content/acme
//! create service user acme-reader
//! set ACL for acme-reader
//! allow jcr:read on /content/acme
//! end
//! ```

mod manager;

pub use manager::DefaultAclManager;

use crate::error::Result;
use crate::features::{EXTENSION_NAME_REPOINIT, Extension, Feature};

/// Node type used for `create path` when the output holds no definition
pub const DEFAULT_TYPE: &str = "sling:Folder";

/// One access control entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acl {
    pub operation: String,
    pub privileges: String,
    pub path: String,
    pub restrictions: Vec<String>,
}

impl Acl {
    pub fn new(operation: &str, privileges: &str, path: &str) -> Self {
        Self {
            operation: operation.to_string(),
            privileges: privileges.to_string(),
            path: path.to_string(),
            restrictions: Vec::new(),
        }
    }

    pub fn with_restriction(mut self, restriction: &str) -> Self {
        self.restrictions.push(restriction.to_string());
        self
    }
}

/// Looks up the declared node type of a repository path in the converted output
pub trait PrimaryTypeResolver {
    fn primary_type(&self, repository_path: &str) -> Result<Option<String>>;
}

/// Collects access control facts for one package and renders them
pub trait AclManager {
    /// Register a service user; returns whether it was newly added
    fn add_system_user(&mut self, system_user: &str) -> bool;

    /// Record an ACL for a principal
    fn add_acl(&mut self, system_user: &str, acl: Acl);

    /// Record one line of a node type definition (empty for a blank line)
    fn add_nodetype_registration_sentence(&mut self, sentence: &str);

    fn add_privilege(&mut self, privilege: &str);

    /// Render the repoinit script, `None` when there is nothing to declare
    fn render(&mut self, resolver: &dyn PrimaryTypeResolver) -> Result<Option<String>>;

    /// Render and attach the script to `feature` as the repoinit extension
    fn add_repoinit_extension(
        &mut self,
        resolver: &dyn PrimaryTypeResolver,
        feature: &mut Feature,
    ) -> Result<()> {
        if let Some(text) = self.render(resolver)? {
            feature
                .extensions
                .push(Extension::text(EXTENSION_NAME_REPOINIT, true, text));
        }
        Ok(())
    }

    /// Forget the state of the package just converted
    fn reset(&mut self);
}
