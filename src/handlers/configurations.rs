// src/handlers/configurations.rs

//! OSGi configurations stored as `.cfg.json` files
//!
//! Configurations live in `config` folders below `/apps` or `/libs`. A folder
//! named `config.<runmode>` scopes them to a run mode, which puts them in the
//! run-mode specific feature.

use super::{EntryHandler, EntryPattern};
use crate::convert::ContentPackageConverter;
use crate::error::{Error, Result};
use crate::packages::traits::PackageArchive;
use serde_json::Value;
use tracing::debug;

pub struct ConfigurationEntryHandler {
    pattern: EntryPattern,
}

impl ConfigurationEntryHandler {
    pub fn new() -> Result<Self> {
        Ok(Self {
            pattern: EntryPattern::new(
                r"/jcr_root/(?:apps|libs)/.+/config(?:\.(?P<runmode>[^/]+))?/(?P<pid>[^/]+)\.cfg\.json",
            )?,
        })
    }
}

impl EntryHandler for ConfigurationEntryHandler {
    fn name(&self) -> &'static str {
        "configurations"
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
        let captures = self
            .pattern
            .captures(path)
            .ok_or_else(|| Error::ParseError(format!("{} is not a configuration entry", path)))?;
        let pid = captures.name("pid").map(|m| m.as_str()).unwrap_or_default();
        let run_mode = captures.name("runmode").map(|m| m.as_str());

        let content = archive.read_entry(path)?;
        let properties = match serde_json::from_slice::<Value>(&content)? {
            Value::Object(properties) => properties,
            other => {
                return Err(Error::ParseError(format!(
                    "Configuration {} must be a JSON object, found {}",
                    path, other
                )));
            }
        };

        debug!(
            "Configuration {} ({} properties) for run mode {}",
            pid,
            properties.len(),
            run_mode.unwrap_or("<all>")
        );
        converter
            .features_manager_mut()
            .add_configuration(run_mode, pid, properties)
    }
}
