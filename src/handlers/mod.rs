// src/handlers/mod.rs

//! Entry handlers
//!
//! Each archive entry is routed to the first registered handler whose pattern
//! matches the whole entry path. Entries no handler claims are copied into the
//! assembled output package by the converter.

mod configurations;
mod content_package;
mod node_types;
mod privileges;
mod rep_policy;
mod system_users;

pub use configurations::ConfigurationEntryHandler;
pub use content_package::{ContentPackageEntryHandler, SUB_PACKAGE_PATTERN};
pub use node_types::{DEFAULT_CND_PATTERN, NodeTypesEntryHandler};
pub use privileges::PrivilegesEntryHandler;
pub use rep_policy::RepPolicyEntryHandler;
pub use system_users::SystemUsersEntryHandler;

use crate::convert::ContentPackageConverter;
use crate::error::Result;
use crate::packages::traits::PackageArchive;
use regex::{Captures, Regex};
use std::sync::Arc;

/// Interprets one kind of archive entry
pub trait EntryHandler: Send + Sync {
    /// Short name used in log output
    fn name(&self) -> &'static str;

    /// Whether this handler takes care of the entry at `path`
    fn matches(&self, path: &str) -> bool;

    /// Process the entry
    fn handle(
        &self,
        path: &str,
        archive: &dyn PackageArchive,
        converter: &mut ContentPackageConverter,
    ) -> Result<()>;
}

/// A regex that must match an entry path as a whole
#[derive(Debug, Clone)]
pub struct EntryPattern {
    regex: Regex,
}

impl EntryPattern {
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self {
            regex: Regex::new(&format!("^(?:{})$", pattern))?,
        })
    }

    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    pub fn captures<'p>(&self, path: &'p str) -> Option<Captures<'p>> {
        self.regex.captures(path)
    }
}

/// Ordered table of entry handlers
pub struct EntryHandlersManager {
    handlers: Vec<Arc<dyn EntryHandler>>,
}

impl EntryHandlersManager {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Create a table holding the built-in handlers
    pub fn with_builtins() -> Result<Self> {
        let mut manager = Self::new();
        manager.add_entry_handler(Arc::new(ContentPackageEntryHandler::new()?));
        manager.add_entry_handler(Arc::new(SystemUsersEntryHandler::new()?));
        manager.add_entry_handler(Arc::new(RepPolicyEntryHandler::new()?));
        manager.add_entry_handler(Arc::new(PrivilegesEntryHandler::new()?));
        manager.add_entry_handler(Arc::new(NodeTypesEntryHandler::new()?));
        manager.add_entry_handler(Arc::new(ConfigurationEntryHandler::new()?));
        Ok(manager)
    }

    /// Append a handler; it is consulted after all earlier ones
    pub fn add_entry_handler(&mut self, handler: Arc<dyn EntryHandler>) {
        tracing::debug!("Registered entry handler {}", handler.name());
        self.handlers.push(handler);
    }

    /// First handler matching `path`, in registration order
    pub fn entry_handler_for(&self, path: &str) -> Option<Arc<dyn EntryHandler>> {
        self.handlers.iter().find(|h| h.matches(path)).cloned()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for EntryHandlersManager {
    fn default() -> Self {
        Self::new()
    }
}
