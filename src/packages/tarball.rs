// src/packages/tarball.rs

//! Tar based content packages
//!
//! Packages are plain or gzip-compressed tarballs laid out like a vault
//! package (`META-INF/vault/...` plus `jcr_root/...`). The whole archive is
//! read into memory on open; content packages are small compared to the
//! bundles they reference.

use crate::error::{Error, Result};
use crate::packages::archive_utils::{is_gzip, normalize_entry_path};
use crate::packages::id::{Dependency, PackageId};
use crate::packages::metadata::{FILTER_PATH, PROPERTIES_PATH, PackageProperties, WorkspaceFilter};
use crate::packages::traits::{PackageArchive, PackageOpener};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::collections::BTreeMap;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use tar::{Archive, Builder, Header};
use tracing::debug;

/// A content package backed by an in-memory tar archive
#[derive(Debug)]
pub struct TarPackage {
    id: PackageId,
    properties: PackageProperties,
    dependencies: Vec<Dependency>,
    filter: WorkspaceFilter,
    entries: BTreeMap<String, Vec<u8>>,
    source: String,
    closed: bool,
}

impl TarPackage {
    /// Open a package file from disk
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)
            .map_err(|e| Error::IoError(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_bytes(&bytes, path.display().to_string())
    }

    /// Read a package from tar or tar.gz bytes
    pub fn from_bytes(bytes: &[u8], source: impl Into<String>) -> Result<Self> {
        let source = source.into();
        let reader: Box<dyn Read + '_> = if is_gzip(bytes) {
            Box::new(GzDecoder::new(bytes))
        } else {
            Box::new(bytes)
        };

        let mut archive = Archive::new(reader);
        let mut entries = Vec::new();

        let tar_entries = archive
            .entries()
            .map_err(|e| Error::ParseError(format!("Invalid package archive {}: {}", source, e)))?;

        for entry in tar_entries {
            let mut entry = entry
                .map_err(|e| Error::ParseError(format!("Corrupt entry in {}: {}", source, e)))?;

            if !entry.header().entry_type().is_file() {
                continue;
            }

            let path = entry.path()?.to_string_lossy().into_owned();
            let mut content = Vec::new();
            entry.read_to_end(&mut content)?;
            entries.push((path, content));
        }

        Self::from_entries(entries, source)
    }

    /// Build a package from already extracted entries
    pub fn from_entries(
        entries: impl IntoIterator<Item = (String, Vec<u8>)>,
        source: impl Into<String>,
    ) -> Result<Self> {
        let source = source.into();
        let entries: BTreeMap<String, Vec<u8>> = entries
            .into_iter()
            .map(|(path, content)| (normalize_entry_path(&path), content))
            .collect();

        let properties = match entries.get(PROPERTIES_PATH) {
            Some(content) => PackageProperties::parse(content)?,
            None => {
                debug!("{} has no {}, assuming empty properties", source, PROPERTIES_PATH);
                PackageProperties::default()
            }
        };

        let filter = match entries.get(FILTER_PATH) {
            Some(content) => WorkspaceFilter::parse(content)?,
            None => WorkspaceFilter::default(),
        };

        Ok(Self {
            id: properties.id(),
            dependencies: properties.dependencies()?,
            properties,
            filter,
            entries,
            source,
            closed: false,
        })
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::IoError(format!("Package {} is already closed", self.source)));
        }
        Ok(())
    }
}

impl PackageArchive for TarPackage {
    fn id(&self) -> &PackageId {
        &self.id
    }

    fn properties(&self) -> &PackageProperties {
        &self.properties
    }

    fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    fn filter(&self) -> &WorkspaceFilter {
        &self.filter
    }

    fn entries(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn read_entry(&self, path: &str) -> Result<Vec<u8>> {
        self.ensure_open()?;
        self.entries
            .get(path)
            .cloned()
            .ok_or_else(|| Error::IoError(format!("Entry {} not found in {}", path, self.source)))
    }

    fn open_sub_package(&self, path: &str) -> Result<Box<dyn PackageArchive>> {
        let content = self.read_entry(path)?;
        let package = TarPackage::from_bytes(&content, format!("{}!{}", self.source, path))?;
        Ok(Box::new(package))
    }

    fn source(&self) -> &str {
        &self.source
    }

    fn close(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.entries.clear();
        self.closed = true;
        Ok(())
    }
}

/// Opens tar / tar.gz content packages
///
/// In strict mode an archive without vault properties is rejected instead of
/// being read with empty metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct TarPackageOpener {
    strict: bool,
}

impl TarPackageOpener {
    pub fn new(strict: bool) -> Self {
        Self { strict }
    }
}

impl PackageOpener for TarPackageOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn PackageArchive>> {
        let package = TarPackage::from_path(path)?;
        if self.strict && !package.entries.contains_key(PROPERTIES_PATH) {
            return Err(Error::InvalidInput(format!(
                "{} is not a content package, {} is missing",
                path.display(),
                PROPERTIES_PATH
            )));
        }
        Ok(Box::new(package))
    }
}

/// Write entries as a gzip-compressed tarball
pub fn write_package<'a, W: Write>(
    writer: W,
    entries: impl IntoIterator<Item = (&'a str, &'a [u8])>,
) -> Result<()> {
    let encoder = GzEncoder::new(writer, Compression::default());
    let mut builder = Builder::new(encoder);

    for (path, content) in entries {
        let mut header = Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, path.trim_start_matches('/'), content)?;
    }

    builder.into_inner()?.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn properties(group: &str, name: &str, version: &str) -> Vec<u8> {
        PackageProperties::new()
            .with("group", group)
            .with("name", name)
            .with("version", version)
            .to_xml()
            .into_bytes()
    }

    #[test]
    fn test_from_bytes_reads_written_package() {
        let props = properties("acme", "content", "1.0");
        let mut bytes = Vec::new();
        write_package(
            &mut bytes,
            vec![
                (PROPERTIES_PATH, props.as_slice()),
                ("/jcr_root/apps/acme/.content.xml", b"<jcr:root/>".as_slice()),
            ],
        )
        .unwrap();

        let package = TarPackage::from_bytes(&bytes, "test.tgz").unwrap();
        assert_eq!(package.id(), &PackageId::new("acme", "content", "1.0"));
        assert_eq!(
            package.entries(),
            vec![PROPERTIES_PATH.to_string(), "/jcr_root/apps/acme/.content.xml".to_string()]
        );
        assert_eq!(package.read_entry("/jcr_root/apps/acme/.content.xml").unwrap(), b"<jcr:root/>");
    }

    #[test]
    fn test_missing_properties_gives_empty_id() {
        let package = TarPackage::from_entries(
            vec![("jcr_root/apps/x".to_string(), b"x".to_vec())],
            "memory",
        )
        .unwrap();
        assert_eq!(package.id(), &PackageId::new("", "", ""));
        assert!(package.dependencies().is_empty());
    }

    #[test]
    fn test_open_sub_package() {
        let inner_props = properties("acme", "inner", "2.0");
        let mut inner = Vec::new();
        write_package(&mut inner, vec![(PROPERTIES_PATH, inner_props.as_slice())]).unwrap();

        let outer = TarPackage::from_entries(
            vec![
                (PROPERTIES_PATH.to_string(), properties("acme", "outer", "1.0")),
                ("/jcr_root/etc/packages/acme/inner-2.0.zip".to_string(), inner),
            ],
            "outer.tgz",
        )
        .unwrap();

        let sub = outer.open_sub_package("/jcr_root/etc/packages/acme/inner-2.0.zip").unwrap();
        assert_eq!(sub.id(), &PackageId::new("acme", "inner", "2.0"));
        assert_eq!(sub.source(), "outer.tgz!/jcr_root/etc/packages/acme/inner-2.0.zip");
    }

    #[test]
    fn test_strict_opener_requires_properties() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("plain.tgz");
        let mut bytes = Vec::new();
        write_package(&mut bytes, vec![("/jcr_root/apps/x.txt", b"x".as_slice())]).unwrap();
        fs::write(&path, bytes).unwrap();

        assert!(TarPackageOpener::default().open(&path).is_ok());
        let err = TarPackageOpener::new(true).open(&path).err().unwrap();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_closed_package_rejects_reads() {
        let mut package = TarPackage::from_entries(
            vec![(PROPERTIES_PATH.to_string(), properties("acme", "content", "1.0"))],
            "memory",
        )
        .unwrap();

        package.close().unwrap();
        assert!(package.read_entry(PROPERTIES_PATH).is_err());
        assert!(package.close().is_err());
    }
}
