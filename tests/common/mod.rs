// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use cpconvert::ConverterConfig;
use cpconvert::packages::metadata::{FILTER_PATH, PROPERTIES_PATH, PackageProperties};
use cpconvert::packages::tarball::write_package;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Builds content package archives in memory
#[derive(Debug, Clone, Default)]
pub struct PackageBuilder {
    properties: Option<PackageProperties>,
    filter_roots: Vec<String>,
    entries: Vec<(String, Vec<u8>)>,
}

impl PackageBuilder {
    pub fn new(group: &str, name: &str, version: &str) -> Self {
        let mut properties = PackageProperties::new().with("group", group).with("name", name);
        if !version.is_empty() {
            properties.set("version", version);
        }
        Self {
            properties: Some(properties),
            ..Default::default()
        }
    }

    /// Package without `META-INF/vault/properties.xml`
    pub fn without_properties() -> Self {
        Self::default()
    }

    pub fn property(mut self, key: &str, value: &str) -> Self {
        if let Some(properties) = self.properties.as_mut() {
            properties.set(key, value);
        }
        self
    }

    pub fn dependencies(self, dependencies: &str) -> Self {
        self.property("dependencies", dependencies)
    }

    pub fn filter_root(mut self, root: &str) -> Self {
        self.filter_roots.push(root.to_string());
        self
    }

    pub fn entry(mut self, path: &str, content: impl AsRef<[u8]>) -> Self {
        self.entries.push((path.to_string(), content.as_ref().to_vec()));
        self
    }

    /// Service user node plus a policy granting it `privileges` on `path`
    pub fn service_user_with_grant(self, user: &str, path: &str, privileges: &str) -> Self {
        self.entry(
            &format!("/jcr_root/home/users/system/{}/.content.xml", user),
            system_user_xml(user),
        )
        .entry(
            &format!("/jcr_root{}/_rep_policy.xml", path),
            policy_xml(user, privileges),
        )
    }

    pub fn build(&self) -> Vec<u8> {
        let mut contents: Vec<(String, Vec<u8>)> = Vec::new();

        if let Some(properties) = &self.properties {
            contents.push((PROPERTIES_PATH.to_string(), properties.to_xml().into_bytes()));
        }

        if !self.filter_roots.is_empty() {
            let filters: String = self
                .filter_roots
                .iter()
                .map(|root| format!("  <filter root=\"{}\"/>\n", root))
                .collect();
            let xml = format!("<workspaceFilter version=\"1.0\">\n{}</workspaceFilter>\n", filters);
            contents.push((FILTER_PATH.to_string(), xml.into_bytes()));
        }

        contents.extend(self.entries.iter().cloned());

        let mut bytes = Vec::new();
        write_package(
            &mut bytes,
            contents.iter().map(|(p, c)| (p.as_str(), c.as_slice())),
        )
        .unwrap();
        bytes
    }

    /// Write the package to `dir/file_name` and return its path
    pub fn write_to(&self, dir: &Path, file_name: &str) -> PathBuf {
        let path = dir.join(file_name);
        std::fs::write(&path, self.build()).unwrap();
        path
    }
}

pub fn system_user_xml(user: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<jcr:root xmlns:jcr="http://www.jcp.org/jcr/1.0" xmlns:rep="internal"
    jcr:primaryType="rep:SystemUser"
    rep:authorizableId="{user}"
    rep:principalName="{user}"/>
"#
    )
}

pub fn policy_xml(principal: &str, privileges: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<jcr:root xmlns:jcr="http://www.jcp.org/jcr/1.0" xmlns:rep="internal"
    jcr:primaryType="rep:ACL">
    <allow
        jcr:primaryType="rep:GrantACE"
        rep:principalName="{principal}"
        rep:privileges="{{Name}}[{privileges}]"/>
</jcr:root>
"#
    )
}

/// Temporary workspace with `input/` for packages and a config writing below it
///
/// Returns (TempDir, config) - keep the TempDir alive to prevent cleanup.
pub fn setup_workspace() -> (TempDir, ConverterConfig) {
    let temp_dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(temp_dir.path().join("input")).unwrap();

    let config = ConverterConfig {
        output_dir: temp_dir.path().join("features"),
        artifacts_dir: Some(temp_dir.path().join("artifacts")),
        ..ConverterConfig::default()
    };
    (temp_dir, config)
}

/// Parsed feature model written for `name`
pub fn read_feature(config: &ConverterConfig, file_name: &str) -> serde_json::Value {
    let path = config.output_dir.join(file_name);
    let content = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("feature {} not readable: {}", path.display(), e));
    serde_json::from_str(&content).unwrap()
}

/// Repoinit lines of a feature model, empty when it has no repoinit extension
pub fn repoinit_lines(feature: &serde_json::Value) -> Vec<String> {
    feature
        .get("repoinit:TEXT|true")
        .and_then(|v| v.as_array())
        .map(|lines| {
            lines
                .iter()
                .map(|l| l.as_str().unwrap_or_default().to_string())
                .collect()
        })
        .unwrap_or_default()
}
