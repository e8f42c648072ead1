// src/packages/metadata.rs

//! Vault package metadata: `META-INF/vault/properties.xml` and `filter.xml`

use crate::error::{Error, Result};
use crate::packages::id::{Dependency, PackageId};
use crate::xml::parse_document;
use quick_xml::escape::escape;
use std::collections::BTreeMap;
use std::fmt;

pub const PROPERTIES_PATH: &str = "/META-INF/vault/properties.xml";
pub const FILTER_PATH: &str = "/META-INF/vault/filter.xml";

pub const NAME_GROUP: &str = "group";
pub const NAME_NAME: &str = "name";
pub const NAME_VERSION: &str = "version";
pub const NAME_DEPENDENCIES: &str = "dependencies";
pub const NAME_CND_PATTERN: &str = "cndPattern";
pub const NAME_DESCRIPTION: &str = "description";

/// Declared package properties
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageProperties {
    entries: BTreeMap<String, String>,
}

impl PackageProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the Java XML-properties format used by vault packages
    ///
    /// ```text
    /// <properties>
    ///   <entry key="group">my/group</entry>
    ///   <entry key="name">my-package</entry>
    /// </properties>
    /// ```
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let root = parse_document(bytes)?;
        if root.name != "properties" {
            return Err(Error::ParseError(format!(
                "Expected <properties> root element, found <{}>",
                root.name
            )));
        }

        let mut entries = BTreeMap::new();
        for entry in root.children_named("entry") {
            if let Some(key) = entry.attribute("key") {
                entries.insert(key.to_string(), entry.text.trim().to_string());
            }
        }

        Ok(Self { entries })
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    /// Property value, treating blank values as absent
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn group(&self) -> Option<&str> {
        self.get(NAME_GROUP)
    }

    pub fn name(&self) -> Option<&str> {
        self.get(NAME_NAME)
    }

    pub fn version(&self) -> Option<&str> {
        self.get(NAME_VERSION)
    }

    pub fn cnd_pattern(&self) -> Option<&str> {
        self.get(NAME_CND_PATTERN)
    }

    /// Package id; absent coordinates become empty strings
    pub fn id(&self) -> PackageId {
        PackageId::new(
            self.group().unwrap_or_default(),
            self.name().unwrap_or_default(),
            self.version().unwrap_or_default(),
        )
    }

    pub fn dependencies(&self) -> Result<Vec<Dependency>> {
        match self.get(NAME_DEPENDENCIES) {
            Some(deps) => Dependency::parse_list(deps),
            None => Ok(Vec::new()),
        }
    }

    pub fn to_xml(&self) -> String {
        let mut xml = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\"?>\n\
             <!DOCTYPE properties SYSTEM \"http://java.sun.com/dtd/properties.dtd\">\n\
             <properties>\n",
        );
        for (key, value) in &self.entries {
            xml.push_str(&format!("<entry key=\"{}\">{}</entry>\n", escape(key), escape(value)));
        }
        xml.push_str("</properties>\n");
        xml
    }
}

impl fmt::Display for PackageProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (key, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", key, value)?;
        }
        write!(f, "}}")
    }
}

/// Include or exclude rule inside a filter set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterRule {
    pub include: bool,
    pub pattern: String,
}

/// All rules rooted at one repository path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSet {
    pub root: String,
    pub rules: Vec<FilterRule>,
}

/// Workspace filter declaring which repository subtrees a package covers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkspaceFilter {
    pub filter_sets: Vec<FilterSet>,
}

impl WorkspaceFilter {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let root = parse_document(bytes)?;
        let mut filter_sets = Vec::new();

        for filter in root.children_named("filter") {
            let Some(root_path) = filter.attribute("root") else {
                continue;
            };

            let rules = filter
                .children
                .iter()
                .filter_map(|rule| {
                    let include = match rule.name.as_str() {
                        "include" => true,
                        "exclude" => false,
                        _ => return None,
                    };
                    rule.attribute("pattern").map(|pattern| FilterRule {
                        include,
                        pattern: pattern.to_string(),
                    })
                })
                .collect();

            filter_sets.push(FilterSet {
                root: root_path.to_string(),
                rules,
            });
        }

        Ok(Self { filter_sets })
    }

    pub fn roots(&self) -> impl Iterator<Item = &str> {
        self.filter_sets.iter().map(|s| s.root.as_str())
    }

    /// Add the filter sets of `other` whose root is not covered yet
    pub fn merge(&mut self, other: &WorkspaceFilter) {
        for set in &other.filter_sets {
            if !self.filter_sets.iter().any(|s| s.root == set.root) {
                self.filter_sets.push(set.clone());
            }
        }
    }

    pub fn to_xml(&self) -> String {
        let mut xml = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<workspaceFilter version=\"1.0\">\n",
        );
        for set in &self.filter_sets {
            if set.rules.is_empty() {
                xml.push_str(&format!("    <filter root=\"{}\"/>\n", escape(&set.root)));
                continue;
            }
            xml.push_str(&format!("    <filter root=\"{}\">\n", escape(&set.root)));
            for rule in &set.rules {
                let tag = if rule.include { "include" } else { "exclude" };
                xml.push_str(&format!("        <{} pattern=\"{}\"/>\n", tag, escape(&rule.pattern)));
            }
            xml.push_str("    </filter>\n");
        }
        xml.push_str("</workspaceFilter>\n");
        xml
    }
}
