// src/features/manager.rs

//! Feature manager writing feature models as JSON files

use super::{ArtifactId, FEATURE_TYPE, Feature, FeaturesManager};
use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Writes `<artifact>.json` plus `<artifact>-<runmode>.json` per run mode
pub struct DefaultFeaturesManager {
    output_dir: PathBuf,
    target: Option<Feature>,
    run_modes: BTreeMap<String, Feature>,
}

impl DefaultFeaturesManager {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            target: None,
            run_modes: BTreeMap::new(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Run-mode specific feature, if any content targeted that run mode
    pub fn run_mode(&self, run_mode: &str) -> Option<&Feature> {
        self.run_modes.get(run_mode)
    }

    /// Target feature or the feature of the given run mode, created on demand
    fn feature_for(&mut self, run_mode: Option<&str>) -> Result<&mut Feature> {
        let target_id = self.target_feature()?.id.clone();

        match run_mode {
            None => self.target_feature_mut(),
            Some(run_mode) => {
                let id = target_id.with_classifier(run_mode);
                Ok(self
                    .run_modes
                    .entry(run_mode.to_string())
                    .or_insert_with(|| Feature::new(id)))
            }
        }
    }

    fn write_feature(&self, feature: &Feature, file_name: &str) -> Result<()> {
        let path = self.output_dir.join(file_name);
        let json = serde_json::to_string_pretty(&feature.to_json())?;
        fs::write(&path, json)
            .map_err(|e| Error::IoError(format!("Failed to write {}: {}", path.display(), e)))?;
        info!("Feature {} written to {}", feature.id, path.display());
        Ok(())
    }
}

impl FeaturesManager for DefaultFeaturesManager {
    fn init(&mut self, group_id: &str, artifact_id: &str, version: &str) {
        let id = ArtifactId::new(group_id, artifact_id, version).with_type(FEATURE_TYPE);
        debug!("Initializing feature {}", id);
        self.target = Some(Feature::new(id));
        self.run_modes.clear();
    }

    fn target_feature(&self) -> Result<&Feature> {
        self.target
            .as_ref()
            .ok_or_else(|| Error::StateError("feature manager used before init".to_string()))
    }

    fn target_feature_mut(&mut self) -> Result<&mut Feature> {
        self.target
            .as_mut()
            .ok_or_else(|| Error::StateError("feature manager used before init".to_string()))
    }

    fn add_artifact(&mut self, run_mode: Option<&str>, id: ArtifactId) -> Result<()> {
        let feature = self.feature_for(run_mode)?;
        if !feature.artifacts.contains(&id) {
            feature.artifacts.push(id);
        }
        Ok(())
    }

    fn add_configuration(
        &mut self,
        run_mode: Option<&str>,
        pid: &str,
        properties: Map<String, Value>,
    ) -> Result<()> {
        let feature = self.feature_for(run_mode)?;
        feature.configurations.insert(pid.to_string(), properties);
        Ok(())
    }

    fn serialize(&mut self) -> Result<()> {
        let target = self.target_feature()?;
        fs::create_dir_all(&self.output_dir).map_err(|e| {
            Error::IoError(format!(
                "Failed to create output directory {}: {}",
                self.output_dir.display(),
                e
            ))
        })?;

        let artifact_id = target.id.artifact_id.clone();
        self.write_feature(target, &format!("{}.json", artifact_id))?;

        for (run_mode, feature) in &self.run_modes {
            self.write_feature(feature, &format!("{}-{}.json", artifact_id, run_mode))?;
        }

        Ok(())
    }
}
