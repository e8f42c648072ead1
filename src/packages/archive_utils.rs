// src/packages/archive_utils.rs

//! Helpers shared by archive readers and writers

use crate::error::{Error, Result};
use std::path::{Component, Path, PathBuf};

/// Gzip magic bytes
const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// Check if content is gzip compressed
pub fn is_gzip(content: &[u8]) -> bool {
    content.len() >= 2 && content[0..2] == GZIP_MAGIC
}

/// Normalize an archive entry path to absolute form (`./jcr_root/a` → `/jcr_root/a`)
pub fn normalize_entry_path(path: &str) -> String {
    let trimmed = path.trim_start_matches("./").trim_start_matches('/');
    format!("/{}", trimmed.trim_end_matches('/'))
}

/// Map an absolute entry path below `base`, rejecting path traversal
pub fn entry_file(base: &Path, entry_path: &str) -> Result<PathBuf> {
    let mut resolved = base.to_path_buf();

    for component in Path::new(entry_path.trim_start_matches('/')).components() {
        match component {
            Component::Normal(c) => resolved.push(c),
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(Error::InvalidInput(format!(
                    "Entry path '{}' escapes the package root",
                    entry_path
                )));
            }
            Component::RootDir | Component::Prefix(_) => {}
        }
    }

    Ok(resolved)
}
