// src/acl/manager.rs

//! Default repoinit generation

use super::{Acl, AclManager, DEFAULT_TYPE, PrimaryTypeResolver};
use crate::error::Result;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Repoinit generator with two tiers of service user tracking
///
/// `seen_system_users` spans the manager's whole lifetime and is never reset,
/// while `system_users` only holds users first seen in the current package.
/// A user already registered while converting an earlier package is therefore
/// never created again; its ACLs in later packages are still rendered, just
/// without a `create service user` line.
#[derive(Debug, Default)]
pub struct DefaultAclManager {
    seen_system_users: HashSet<String>,
    system_users: Vec<String>,
    acls: HashMap<String, Vec<Acl>>,
    acl_order: Vec<String>,
    nodetype_sentences: Vec<String>,
    privileges: Vec<String>,
}

impl DefaultAclManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure every ancestor of the given ACL paths exists before use
    fn add_paths(
        acls: &[Acl],
        resolver: &dyn PrimaryTypeResolver,
        created_paths: &mut HashSet<String>,
        script: &mut String,
    ) -> Result<()> {
        if acls.is_empty() {
            return Ok(());
        }

        let mut paths = BTreeSet::new();
        for acl in acls {
            collect_path_hierarchy(&acl.path, created_paths, &mut paths);
        }

        for path in paths {
            let node_type = resolver
                .primary_type(&path)?
                .unwrap_or_else(|| DEFAULT_TYPE.to_string());
            script.push_str(&format!("create path ({}) {}\n", node_type, path));
        }

        Ok(())
    }

    fn add_acl_statement(script: &mut String, system_user: &str, acls: &[Acl]) {
        if acls.is_empty() {
            return;
        }

        script.push_str(&format!("set ACL for {}\n", system_user));

        for acl in acls {
            script.push_str(&format!("{} {} on {}", acl.operation, acl.privileges, acl.path));
            if !acl.restrictions.is_empty() {
                script.push_str(&format!(" restriction({})", acl.restrictions.join(",")));
            }
            script.push('\n');
        }

        script.push_str("end\n");
    }
}

/// Add `path` and its ancestors (excluding the root) not created yet
fn collect_path_hierarchy(path: &str, created_paths: &mut HashSet<String>, paths: &mut BTreeSet<String>) {
    let mut current = path;

    while !current.is_empty() && current != "/" {
        if created_paths.insert(current.to_string()) {
            paths.insert(current.to_string());
        }

        match current.rfind('/') {
            Some(index) if index > 0 => current = &current[..index],
            _ => break,
        }
    }
}

impl AclManager for DefaultAclManager {
    fn add_system_user(&mut self, system_user: &str) -> bool {
        if system_user.is_empty() || !self.seen_system_users.insert(system_user.to_string()) {
            return false;
        }
        self.system_users.push(system_user.to_string());
        true
    }

    fn add_acl(&mut self, system_user: &str, acl: Acl) {
        if !self.acl_order.iter().any(|u| u == system_user) {
            self.acl_order.push(system_user.to_string());
        }
        self.acls.entry(system_user.to_string()).or_default().push(acl);
    }

    fn add_nodetype_registration_sentence(&mut self, sentence: &str) {
        self.nodetype_sentences.push(sentence.to_string());
    }

    fn add_privilege(&mut self, privilege: &str) {
        if !self.privileges.iter().any(|p| p == privilege) {
            self.privileges.push(privilege.to_string());
        }
    }

    fn render(&mut self, resolver: &dyn PrimaryTypeResolver) -> Result<Option<String>> {
        let mut script = String::new();

        for privilege in &self.privileges {
            script.push_str(&format!("register privilege {}\n", privilege));
        }

        if !self.nodetype_sentences.is_empty() {
            script.push_str("register nodetypes\n<<===\n");
            for sentence in &self.nodetype_sentences {
                if sentence.is_empty() {
                    script.push('\n');
                } else {
                    script.push_str(&format!("<< {}\n", sentence));
                }
            }
            script.push_str("===>>\n");
        }

        let mut created_paths = HashSet::new();

        // Users created by this package: paths first, then the user, then its ACLs
        for system_user in &self.system_users {
            let acls = self.acls.remove(system_user).unwrap_or_default();

            Self::add_paths(&acls, resolver, &mut created_paths, &mut script)?;
            script.push_str(&format!("create service user {}\n", system_user));
            Self::add_acl_statement(&mut script, system_user, &acls);
        }

        // Users created by an earlier package only get their ACLs.
        // Principals never registered as service users are dropped.
        for system_user in &self.acl_order {
            if !self.seen_system_users.contains(system_user) {
                continue;
            }
            let Some(acls) = self.acls.get(system_user) else {
                continue;
            };

            Self::add_paths(acls, resolver, &mut created_paths, &mut script)?;
            Self::add_acl_statement(&mut script, system_user, acls);
        }

        if script.is_empty() {
            Ok(None)
        } else {
            Ok(Some(script))
        }
    }

    fn reset(&mut self) {
        self.system_users.clear();
        self.acls.clear();
        self.acl_order.clear();
        self.nodetype_sentences.clear();
        self.privileges.clear();
    }
}
