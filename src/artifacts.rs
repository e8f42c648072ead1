// src/artifacts.rs

//! Deployment of converted artifacts into a Maven-style repository layout

use crate::error::{Error, Result};
use crate::features::ArtifactId;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Stores a built artifact under its coordinates
pub trait ArtifactsDeployer {
    fn deploy(&self, artifact: &Path, id: &ArtifactId) -> Result<PathBuf>;
}

/// Deploys into `<base>/<group as path>/<artifact>/<version>/`
#[derive(Debug, Clone)]
pub struct LocalArtifactsDeployer {
    base_dir: PathBuf,
}

impl LocalArtifactsDeployer {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Location of an artifact inside the repository
    pub fn artifact_path(&self, id: &ArtifactId) -> PathBuf {
        let mut dir = self.base_dir.clone();
        for segment in id.group_id.split('.').filter(|s| !s.is_empty()) {
            dir.push(segment);
        }
        dir.push(&id.artifact_id);
        dir.push(&id.version);

        let file_name = match &id.classifier {
            Some(classifier) => format!(
                "{}-{}-{}.{}",
                id.artifact_id,
                id.version,
                classifier,
                id.type_or_default()
            ),
            None => format!("{}-{}.{}", id.artifact_id, id.version, id.type_or_default()),
        };
        dir.join(file_name)
    }
}

impl ArtifactsDeployer for LocalArtifactsDeployer {
    fn deploy(&self, artifact: &Path, id: &ArtifactId) -> Result<PathBuf> {
        let target = self.artifact_path(id);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::IoError(format!("Failed to create directory {}: {}", parent.display(), e))
            })?;
        }

        fs::copy(artifact, &target).map_err(|e| {
            Error::IoError(format!(
                "Failed to deploy {} to {}: {}",
                artifact.display(),
                target.display(),
                e
            ))
        })?;

        info!("Deployed {} to {}", id, target.display());
        Ok(target)
    }
}
