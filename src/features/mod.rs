// src/features/mod.rs

//! Feature model: the converted output of one content package
//!
//! A feature carries an artifact id, the artifacts it references, OSGi
//! configurations, and named extensions. The `repoinit` text extension holds
//! the generated repository initialization script.

mod manager;

pub use manager::DefaultFeaturesManager;

use crate::error::Result;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Name of the repository initialization extension
pub const EXTENSION_NAME_REPOINIT: &str = "repoinit";

/// Artifact type of serialized feature models
pub const FEATURE_TYPE: &str = "slingosgifeature";

/// Maven-style artifact coordinates
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactId {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub classifier: Option<String>,
    pub artifact_type: Option<String>,
}

impl ArtifactId {
    pub fn new(group_id: &str, artifact_id: &str, version: &str) -> Self {
        Self {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
            version: version.to_string(),
            classifier: None,
            artifact_type: None,
        }
    }

    pub fn with_classifier(mut self, classifier: &str) -> Self {
        self.classifier = Some(classifier.to_string());
        self
    }

    pub fn with_type(mut self, artifact_type: &str) -> Self {
        self.artifact_type = Some(artifact_type.to_string());
        self
    }

    /// Type, defaulting to `jar` like Maven does
    pub fn type_or_default(&self) -> &str {
        self.artifact_type.as_deref().unwrap_or("jar")
    }
}

impl fmt::Display for ArtifactId {
    /// `group:artifact:version` or `group:artifact:type:classifier:version`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.classifier {
            Some(classifier) => write!(
                f,
                "{}:{}:{}:{}:{}",
                self.group_id,
                self.artifact_id,
                self.type_or_default(),
                classifier,
                self.version
            ),
            None if self.artifact_type.is_some() => write!(
                f,
                "{}:{}:{}:{}",
                self.group_id,
                self.artifact_id,
                self.type_or_default(),
                self.version
            ),
            None => write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version),
        }
    }
}

/// Type tag of text extensions in the feature model
pub const EXTENSION_TYPE_TEXT: &str = "TEXT";

/// A named text extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    pub name: String,
    pub required: bool,
    pub text: String,
}

impl Extension {
    pub fn text(name: &str, required: bool, text: String) -> Self {
        Self {
            name: name.to_string(),
            required,
            text,
        }
    }
}

/// A feature model
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: ArtifactId,
    pub artifacts: Vec<ArtifactId>,
    pub configurations: BTreeMap<String, Map<String, Value>>,
    pub extensions: Vec<Extension>,
}

impl Feature {
    pub fn new(id: ArtifactId) -> Self {
        Self {
            id,
            artifacts: Vec::new(),
            configurations: BTreeMap::new(),
            extensions: Vec::new(),
        }
    }

    pub fn extension(&self, name: &str) -> Option<&Extension> {
        self.extensions.iter().find(|e| e.name == name)
    }

    /// JSON document in the feature model layout
    ///
    /// Extensions are keyed as `name:TYPE|required`.
    pub fn to_json(&self) -> Value {
        let mut doc = Map::new();
        doc.insert("id".to_string(), Value::String(self.id.to_string()));

        if !self.artifacts.is_empty() {
            let artifacts = self
                .artifacts
                .iter()
                .map(|a| {
                    let mut entry = Map::new();
                    entry.insert("id".to_string(), Value::String(a.to_string()));
                    Value::Object(entry)
                })
                .collect();
            doc.insert("artifacts".to_string(), Value::Array(artifacts));
        }

        if !self.configurations.is_empty() {
            let configurations = self
                .configurations
                .iter()
                .map(|(pid, props)| (pid.clone(), Value::Object(props.clone())))
                .collect();
            doc.insert("configurations".to_string(), Value::Object(configurations));
        }

        for extension in &self.extensions {
            let key = format!("{}:{}|{}", extension.name, EXTENSION_TYPE_TEXT, extension.required);
            let lines = extension
                .text
                .lines()
                .map(|l| Value::String(l.to_string()))
                .collect();
            doc.insert(key, Value::Array(lines));
        }

        Value::Object(doc)
    }
}

/// Builds and persists the feature model of the package being converted
pub trait FeaturesManager {
    /// Start a new target feature, discarding the previous one
    fn init(&mut self, group_id: &str, artifact_id: &str, version: &str);

    fn target_feature(&self) -> Result<&Feature>;

    fn target_feature_mut(&mut self) -> Result<&mut Feature>;

    /// Add an artifact to the target feature or to a run-mode feature
    fn add_artifact(&mut self, run_mode: Option<&str>, id: ArtifactId) -> Result<()>;

    /// Add an OSGi configuration to the target feature or to a run-mode feature
    fn add_configuration(
        &mut self,
        run_mode: Option<&str>,
        pid: &str,
        properties: Map<String, Value>,
    ) -> Result<()>;

    /// Persist the target feature and all run-mode features
    fn serialize(&mut self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_id_display() {
        let id = ArtifactId::new("org.acme", "content", "1.0");
        assert_eq!(id.to_string(), "org.acme:content:1.0");

        let id = id.with_classifier("cp2fm-converted").with_type("zip");
        assert_eq!(id.to_string(), "org.acme:content:zip:cp2fm-converted:1.0");

        let id = ArtifactId::new("org.acme", "content", "1.0").with_type(FEATURE_TYPE);
        assert_eq!(id.to_string(), "org.acme:content:slingosgifeature:1.0");
    }

    #[test]
    fn test_feature_json_layout() {
        let mut feature = Feature::new(ArtifactId::new("org.acme", "content", "1.0"));
        feature
            .artifacts
            .push(ArtifactId::new("org.acme", "content", "1.0").with_classifier("c").with_type("zip"));
        feature.extensions.push(Extension::text(
            EXTENSION_NAME_REPOINIT,
            true,
            "create service user svc\n".to_string(),
        ));

        let json = feature.to_json();
        assert_eq!(json["id"], "org.acme:content:1.0");
        assert_eq!(json["artifacts"][0]["id"], "org.acme:content:zip:c:1.0");
        assert_eq!(json["repoinit:TEXT|true"][0], "create service user svc");
        assert!(json.get("configurations").is_none());
    }
}
