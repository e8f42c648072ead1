// src/assembler.rs

//! Assembly of the converted content package
//!
//! Every entry no specialized handler claims ends up here. Entries are staged
//! in a temporary directory so later steps (repoinit path types) can inspect
//! what the output will contain, then packed into a single archive.

use crate::acl::PrimaryTypeResolver;
use crate::error::{Error, Result};
use crate::packages::archive_utils::entry_file;
use crate::packages::metadata::{FILTER_PATH, PROPERTIES_PATH, PackageProperties, WorkspaceFilter};
use crate::packages::tarball::write_package;
use crate::packages::traits::PackageArchive;
use crate::xml::{jcr_value, parse_document};
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use tracing::debug;

const CONTENT_XML_FILE_NAME: &str = ".content.xml";
const JCR_ROOT: &str = "/jcr_root";

/// Collects unclaimed entries into a new content package
pub struct PackageAssembler {
    work_dir: TempDir,
    properties: PackageProperties,
    filter: WorkspaceFilter,
    entries: BTreeSet<String>,
}

impl PackageAssembler {
    /// Start assembling a package carrying the metadata of `package`
    pub fn create(package: &dyn PackageArchive) -> Result<Self> {
        let work_dir = TempDir::new()
            .map_err(|e| Error::IoError(format!("Failed to create assembler directory: {}", e)))?;

        Ok(Self {
            work_dir,
            properties: package.properties().clone(),
            filter: package.filter().clone(),
            entries: BTreeSet::new(),
        })
    }

    /// Stage one entry
    pub fn add_entry(&mut self, path: &str, content: &[u8]) -> Result<()> {
        let file = entry_file(self.work_dir.path(), path)?;
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&file, content)
            .map_err(|e| Error::IoError(format!("Failed to stage entry {}: {}", path, e)))?;

        debug!("Entry {} added to the assembled package", path);
        self.entries.insert(path.to_string());
        Ok(())
    }

    /// Default handling for entries no other handler claims: copy as-is
    pub fn handle(&mut self, path: &str, archive: &dyn PackageArchive) -> Result<()> {
        let content = archive.read_entry(path)?;
        self.add_entry(path, &content)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains(path)
    }

    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn filter(&self) -> &WorkspaceFilter {
        &self.filter
    }

    /// Staged location of a repository path (`/apps/x` → `<work>/jcr_root/apps/x`)
    pub fn repository_entry(&self, repository_path: &str) -> Result<PathBuf> {
        entry_file(self.work_dir.path(), &format!("{}{}", JCR_ROOT, repository_path))
    }

    pub fn merge_filters(&mut self, filter: &WorkspaceFilter) {
        self.filter.merge(filter);
    }

    /// Pack all staged entries into one archive and return its location
    ///
    /// The vault metadata is regenerated from the (possibly merged) properties
    /// and filter, replacing whatever copy was staged.
    pub fn create_package(&self) -> Result<PathBuf> {
        let mut contents: Vec<(String, Vec<u8>)> = vec![
            (PROPERTIES_PATH.to_string(), self.properties.to_xml().into_bytes()),
            (FILTER_PATH.to_string(), self.filter.to_xml().into_bytes()),
        ];

        for path in &self.entries {
            if path == PROPERTIES_PATH || path == FILTER_PATH {
                continue;
            }
            let file = entry_file(self.work_dir.path(), path)?;
            contents.push((path.clone(), fs::read(&file)?));
        }

        let name = self.properties.name().unwrap_or("content-package");
        let version = self.properties.version().unwrap_or("0.0.0");
        let output = self.work_dir.path().join(format!("{}-{}.package", name, version));

        let file = fs::File::create(&output)
            .map_err(|e| Error::IoError(format!("Failed to create {}: {}", output.display(), e)))?;
        write_package(
            file,
            contents.iter().map(|(path, content)| (path.as_str(), content.as_slice())),
        )?;

        debug!("Assembled package with {} entries at {}", contents.len(), output.display());
        Ok(output)
    }

    /// Metadata-only copy of a package
    ///
    /// Nested packages are replaced by this copy in the output: their content
    /// has been converted, only their vault metadata is kept.
    pub fn create_synthetic(package: &dyn PackageArchive) -> Result<Vec<u8>> {
        let mut contents: Vec<(String, Vec<u8>)> = vec![
            (PROPERTIES_PATH.to_string(), package.properties().to_xml().into_bytes()),
            (FILTER_PATH.to_string(), package.filter().to_xml().into_bytes()),
        ];

        for path in package.entries() {
            if path.starts_with("/META-INF/") && path != PROPERTIES_PATH && path != FILTER_PATH {
                contents.push((path.clone(), package.read_entry(&path)?));
            }
        }

        let mut bytes = Vec::new();
        write_package(
            &mut bytes,
            contents.iter().map(|(path, content)| (path.as_str(), content.as_slice())),
        )?;
        Ok(bytes)
    }
}

impl PrimaryTypeResolver for PackageAssembler {
    fn primary_type(&self, repository_path: &str) -> Result<Option<String>> {
        let content_xml = self.repository_entry(repository_path)?.join(CONTENT_XML_FILE_NAME);
        if !content_xml.is_file() {
            return Ok(None);
        }

        let bytes = fs::read(&content_xml)?;
        let root = parse_document(&bytes).map_err(|e| {
            Error::ParseError(format!(
                "A fatal error occurred while parsing the '{}' file: {}",
                content_xml.display(),
                e
            ))
        })?;

        Ok(root.attribute("jcr:primaryType").map(|t| jcr_value(t).to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packages::tarball::TarPackage;

    fn source_package() -> TarPackage {
        let props = PackageProperties::new()
            .with("group", "acme")
            .with("name", "content")
            .with("version", "1.0");
        TarPackage::from_entries(
            vec![
                (PROPERTIES_PATH.to_string(), props.to_xml().into_bytes()),
                ("/META-INF/vault/definition/.content.xml".to_string(), b"<jcr:root/>".to_vec()),
                ("/jcr_root/apps/acme/file.txt".to_string(), b"hello".to_vec()),
            ],
            "source",
        )
        .unwrap()
    }

    #[test]
    fn test_handle_copies_entry() {
        let package = source_package();
        let mut assembler = PackageAssembler::create(&package).unwrap();

        assembler.handle("/jcr_root/apps/acme/file.txt", &package).unwrap();

        assert!(assembler.contains("/jcr_root/apps/acme/file.txt"));
        let staged = assembler.repository_entry("/apps/acme/file.txt").unwrap();
        assert_eq!(fs::read(staged).unwrap(), b"hello");
    }

    #[test]
    fn test_create_package_regenerates_metadata() {
        let package = source_package();
        let mut assembler = PackageAssembler::create(&package).unwrap();
        assembler.handle("/jcr_root/apps/acme/file.txt", &package).unwrap();
        assembler.merge_filters(&WorkspaceFilter::parse(br#"<workspaceFilter><filter root="/apps/acme"/></workspaceFilter>"#).unwrap());

        let output = assembler.create_package().unwrap();
        let assembled = TarPackage::from_path(&output).unwrap();

        assert_eq!(assembled.id(), package.id());
        assert_eq!(assembled.filter().roots().collect::<Vec<_>>(), vec!["/apps/acme"]);
        assert_eq!(assembled.read_entry("/jcr_root/apps/acme/file.txt").unwrap(), b"hello");
    }

    #[test]
    fn test_create_synthetic_keeps_only_metadata() {
        let package = source_package();
        let bytes = PackageAssembler::create_synthetic(&package).unwrap();
        let synthetic = TarPackage::from_bytes(&bytes, "synthetic").unwrap();

        assert_eq!(synthetic.id(), package.id());
        assert!(synthetic.entries().contains(&"/META-INF/vault/definition/.content.xml".to_string()));
        assert!(!synthetic.entries().iter().any(|e| e.starts_with("/jcr_root")));
    }

    #[test]
    fn test_primary_type_lookup() {
        let package = source_package();
        let mut assembler = PackageAssembler::create(&package).unwrap();
        assembler
            .add_entry(
                "/jcr_root/content/acme/.content.xml",
                br#"<jcr:root xmlns:jcr="http://www.jcp.org/jcr/1.0" jcr:primaryType="{Name}sling:OrderedFolder"/>"#,
            )
            .unwrap();

        assert_eq!(
            assembler.primary_type("/content/acme").unwrap(),
            Some("sling:OrderedFolder".to_string())
        );
        assert_eq!(assembler.primary_type("/content").unwrap(), None);
        assert_eq!(assembler.primary_type("/content/missing").unwrap(), None);
    }
}
