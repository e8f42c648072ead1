// src/filter.rs

//! User supplied resource filtering

use crate::error::Result;
use crate::handlers::EntryPattern;

/// Entry paths the user does not allow in converted packages
///
/// A path is filtered out when any pattern matches it as a whole.
#[derive(Debug, Clone, Default)]
pub struct ResourceFilter {
    patterns: Vec<EntryPattern>,
}

impl ResourceFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let mut filter = Self::new();
        for pattern in patterns {
            filter.add_filtering_pattern(pattern.as_ref())?;
        }
        Ok(filter)
    }

    pub fn add_filtering_pattern(&mut self, pattern: &str) -> Result<()> {
        self.patterns.push(EntryPattern::new(pattern)?);
        Ok(())
    }

    pub fn is_filtered_out(&self, path: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(path))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
