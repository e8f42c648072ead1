// src/convert/converter.rs
//! Content package to feature model converter
//!
//! Conversion runs in two passes. The first pass opens every input package,
//! records the sub-packages nested in it and orders the inputs by their
//! declared dependencies. The second pass converts the packages in that order:
//! every entry is dispatched to an entry handler, the leftovers are assembled
//! into a new content package, and the collected service users and ACLs are
//! rendered into the repoinit extension of the package's feature model.

use crate::acl::{AclManager, DefaultAclManager};
use crate::artifacts::{ArtifactsDeployer, LocalArtifactsDeployer};
use crate::assembler::PackageAssembler;
use crate::config::ConverterConfig;
use crate::convert::order::{OrderNode, linearize};
use crate::convert::recollector::{SubPackageIndex, SubPackageRecollector};
use crate::error::{Error, Result};
use crate::features::{ArtifactId, DefaultFeaturesManager, FeaturesManager};
use crate::filter::ResourceFilter;
use crate::handlers::{EntryHandlersManager, NodeTypesEntryHandler};
use crate::packages::metadata::{NAME_GROUP, NAME_NAME};
use crate::packages::tarball::TarPackageOpener;
use crate::packages::traits::{PackageArchive, PackageOpener};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Classifier of the deployed leftover package
pub const PACKAGE_CLASSIFIER: &str = "cp2fm-converted";

/// Artifact type of the deployed leftover package
pub const ZIP_TYPE: &str = "zip";

/// Version used when a package does not declare one
pub const DEFAULT_VERSION: &str = "0.0.0";

const META_INF: &str = "/META-INF/";

/// Converts content packages into feature models
pub struct ContentPackageConverter {
    opener: Box<dyn PackageOpener>,
    handlers: EntryHandlersManager,
    acl_manager: Box<dyn AclManager>,
    features_manager: Box<dyn FeaturesManager>,
    deployer: Box<dyn ArtifactsDeployer>,
    resource_filter: Option<ResourceFilter>,
    recollector: SubPackageRecollector,
    main_assembler: Option<PackageAssembler>,
    cnd_patterns: HashSet<String>,
}

impl ContentPackageConverter {
    /// Create a converter with the built-in handlers and the default
    /// package opener and ACL manager
    pub fn new(
        features_manager: Box<dyn FeaturesManager>,
        deployer: Box<dyn ArtifactsDeployer>,
    ) -> Result<Self> {
        Ok(Self {
            opener: Box::new(TarPackageOpener::default()),
            handlers: EntryHandlersManager::with_builtins()?,
            acl_manager: Box::new(DefaultAclManager::new()),
            features_manager,
            deployer,
            resource_filter: None,
            recollector: SubPackageRecollector::new(SubPackageIndex::new())?,
            main_assembler: None,
            cnd_patterns: HashSet::new(),
        })
    }

    /// Create a converter writing features and artifacts where `config` says
    pub fn from_config(config: &ConverterConfig) -> Result<Self> {
        let mut converter = Self::new(
            Box::new(DefaultFeaturesManager::new(&config.output_dir)),
            Box::new(LocalArtifactsDeployer::new(config.artifacts_dir())),
        )?
        .with_opener(Box::new(TarPackageOpener::new(config.strict_validation)));

        if !config.filtering_patterns.is_empty() {
            converter = converter
                .with_resource_filter(ResourceFilter::from_patterns(&config.filtering_patterns)?);
        }

        Ok(converter)
    }

    pub fn with_opener(mut self, opener: Box<dyn PackageOpener>) -> Self {
        self.opener = opener;
        self
    }

    pub fn with_acl_manager(mut self, acl_manager: Box<dyn AclManager>) -> Self {
        self.acl_manager = acl_manager;
        self
    }

    pub fn with_resource_filter(mut self, resource_filter: ResourceFilter) -> Self {
        self.resource_filter = Some(resource_filter);
        self
    }

    pub fn acl_manager_mut(&mut self) -> &mut dyn AclManager {
        self.acl_manager.as_mut()
    }

    pub fn features_manager(&self) -> &dyn FeaturesManager {
        self.features_manager.as_ref()
    }

    pub fn features_manager_mut(&mut self) -> &mut dyn FeaturesManager {
        self.features_manager.as_mut()
    }

    pub fn handlers(&self) -> &EntryHandlersManager {
        &self.handlers
    }

    pub fn handlers_mut(&mut self) -> &mut EntryHandlersManager {
        &mut self.handlers
    }

    /// Nested packages recorded by the first pass
    pub fn sub_packages(&self) -> &SubPackageIndex {
        self.recollector.index()
    }

    /// Assembler of the package currently being converted
    pub fn main_assembler(&self) -> Option<&PackageAssembler> {
        self.main_assembler.as_ref()
    }

    fn main_assembler_mut(&mut self) -> Result<&mut PackageAssembler> {
        self.main_assembler
            .as_mut()
            .ok_or_else(|| Error::StateError("no package is being converted".to_string()))
    }

    /// Convert the given package files
    ///
    /// Fails on the first error; packages converted before it keep their
    /// written output.
    pub fn convert(&mut self, packages: &[PathBuf]) -> Result<()> {
        let ordered = self.first_pass(packages)?;
        self.second_pass(ordered)
    }

    /// Open all packages, record their sub-packages and order them
    fn first_pass(&mut self, paths: &[PathBuf]) -> Result<Vec<Box<dyn PackageArchive>>> {
        let mut opened: Vec<Box<dyn PackageArchive>> = Vec::with_capacity(paths.len());

        if let Err(e) = self.read_packages(paths, &mut opened) {
            opened.iter_mut().for_each(|p| close_quietly(p.as_mut()));
            return Err(e);
        }

        info!(
            "Ordering input content-package(s) {}...",
            opened.iter().map(|p| p.id().to_string()).collect::<Vec<_>>().join(", ")
        );

        let order = {
            let nodes: Vec<OrderNode<'_>> = opened
                .iter()
                .map(|p| OrderNode {
                    id: p.id(),
                    dependencies: p.dependencies(),
                })
                .collect();
            linearize(&nodes)
        };

        let order = match order {
            Ok(order) => order,
            Err(e) => {
                opened.iter_mut().for_each(|p| close_quietly(p.as_mut()));
                return Err(e);
            }
        };

        let mut slots: Vec<Option<Box<dyn PackageArchive>>> = opened.into_iter().map(Some).collect();
        let ordered: Vec<Box<dyn PackageArchive>> =
            order.into_iter().filter_map(|i| slots[i].take()).collect();

        info!(
            "New content-package(s) order: {}",
            ordered.iter().map(|p| p.id().to_string()).collect::<Vec<_>>().join(", ")
        );

        Ok(ordered)
    }

    fn read_packages(
        &mut self,
        paths: &[PathBuf],
        opened: &mut Vec<Box<dyn PackageArchive>>,
    ) -> Result<()> {
        for path in paths {
            if !path.is_file() {
                return Err(Error::InvalidInput(format!(
                    "File {} does not exist or it is a directory",
                    path.display()
                )));
            }

            info!("Reading content-package '{}'...", path.display());

            let package = self.opener.open(path)?;
            opened.push(package);

            // nested packages, so outdated duplicates can be skipped later
            if let Some(package) = opened.last() {
                self.recollector.recollect(package.as_ref())?;
            }

            info!("content-package '{}' successfully read!", path.display());
        }

        Ok(())
    }

    /// Convert the ordered packages one by one
    fn second_pass(&mut self, packages: Vec<Box<dyn PackageArchive>>) -> Result<()> {
        let mut packages = packages.into_iter();

        while let Some(mut package) = packages.next() {
            let result = self.convert_package(package.as_ref());

            self.acl_manager.reset();
            self.main_assembler = None;
            close_quietly(package.as_mut());

            if let Err(e) = result {
                packages.for_each(|mut p| close_quietly(p.as_mut()));
                return Err(e);
            }
        }

        Ok(())
    }

    fn convert_package(&mut self, package: &dyn PackageArchive) -> Result<()> {
        self.main_assembler = Some(PackageAssembler::create(package)?);

        let id = package.id();
        let group = required(&id.group, NAME_GROUP, package)?.replace('/', ".");
        let name = required(&id.name, NAME_NAME, package)?;
        let version = if id.version.is_empty() {
            DEFAULT_VERSION
        } else {
            id.version.as_str()
        };

        self.features_manager.init(&group, name, version);

        info!("Converting content-package '{}'...", id);

        self.traverse(package)?;

        // everything no handler claimed becomes a new content package
        let assembler = self
            .main_assembler
            .as_ref()
            .ok_or_else(|| Error::StateError("no package is being converted".to_string()))?;
        let assembled = assembler.create_package()?;

        let target = self.features_manager.target_feature()?.id.clone();
        let artifact = ArtifactId::new(&target.group_id, &target.artifact_id, &target.version)
            .with_classifier(PACKAGE_CLASSIFIER)
            .with_type(ZIP_TYPE);

        self.deployer.deploy(&assembled, &artifact)?;
        self.features_manager.add_artifact(None, artifact)?;

        let feature = self.features_manager.target_feature_mut()?;
        self.acl_manager.add_repoinit_extension(assembler, feature)?;

        info!("Conversion complete!");

        self.features_manager.serialize()
    }

    /// Dispatch every entry of `package`
    ///
    /// A `cndPattern` property registers an extra node type handler before
    /// the entries are visited; it stays registered for later packages.
    pub fn traverse(&mut self, package: &dyn PackageArchive) -> Result<()> {
        self.traverse_entries(package, false)
    }

    fn traverse_entries(&mut self, package: &dyn PackageArchive, nested: bool) -> Result<()> {
        if let Some(pattern) = package.properties().cnd_pattern()
            && !self.cnd_patterns.contains(pattern)
        {
            debug!("Registering node type handler for pattern {}", pattern);
            self.handlers
                .add_entry_handler(Arc::new(NodeTypesEntryHandler::with_pattern(pattern)?));
            self.cnd_patterns.insert(pattern.to_string());
        }

        for path in package.entries() {
            self.dispatch_entry(&path, package, nested)?;
        }

        Ok(())
    }

    /// Route one entry to its handler, or to the assembler when none matches
    pub fn dispatch(&mut self, path: &str, archive: &dyn PackageArchive) -> Result<()> {
        self.dispatch_entry(path, archive, false)
    }

    fn dispatch_entry(&mut self, path: &str, archive: &dyn PackageArchive, nested: bool) -> Result<()> {
        if let Some(filter) = &self.resource_filter
            && filter.is_filtered_out(path)
        {
            return Err(Error::PolicyViolation {
                path: path.to_string(),
                properties: archive.properties().to_string(),
            });
        }

        match self.handlers.entry_handler_for(path) {
            Some(handler) => {
                debug!("Entry {} handled by {}", path, handler.name());
                handler.handle(path, archive, self)
            }
            // nested vault metadata only goes into the synthetic copy
            None if nested && path.starts_with(META_INF) => {
                debug!("Skipping metadata entry {} of sub content-package {}", path, archive.id());
                Ok(())
            }
            None => self.main_assembler_mut()?.handle(path, archive),
        }
    }

    /// Convert a nested package as part of the current package
    ///
    /// Packages superseded by a newer nested version are skipped. Otherwise
    /// their entries are dispatched like the parent's, their filter is merged
    /// into the output, and a metadata-only copy replaces them at `path`.
    /// `META-INF` entries no handler claims are left out of the output so the
    /// parent's vault metadata is kept.
    pub fn process_sub_package(&mut self, path: &str, package: &dyn PackageArchive) -> Result<()> {
        if !self.sub_packages().contains_path(path) {
            warn!("Sub content-package {} is filtered out, so it won't be processed.", path);
            return Ok(());
        }

        info!("Processing sub content-package {} ({})", path, package.id());

        self.traverse_entries(package, true)?;

        let synthetic = PackageAssembler::create_synthetic(package)?;
        let assembler = self.main_assembler_mut()?;
        assembler.merge_filters(package.filter());
        assembler.add_entry(path, &synthetic)
    }
}

/// Non-empty package property or `MissingMetadata`
fn required<'a>(value: &'a str, property: &str, package: &dyn PackageArchive) -> Result<&'a str> {
    if value.is_empty() {
        return Err(Error::MissingMetadata {
            property: property.to_string(),
            package: package.source().to_string(),
        });
    }
    Ok(value)
}

fn close_quietly(package: &mut dyn PackageArchive) {
    if let Err(e) = package.close() {
        debug!("Failed to close content-package {}: {}", package.source(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{NoPrimaryTypes, converter, package};
    use crate::packages::id::{Dependency, PackageId};
    use crate::packages::metadata::{PROPERTIES_PATH, PackageProperties, WorkspaceFilter};
    use crate::packages::tarball::TarPackage;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    type Closed = Arc<Mutex<Vec<String>>>;

    /// In-memory package that records when it is closed
    struct StubPackage {
        id: PackageId,
        properties: PackageProperties,
        filter: WorkspaceFilter,
        entries: Vec<(String, Option<Vec<u8>>)>,
        fail_close: bool,
        closed: Closed,
    }

    impl StubPackage {
        fn new(name: &str, closed: &Closed) -> Self {
            let properties = PackageProperties::new()
                .with("group", "acme")
                .with("name", name)
                .with("version", "1.0");
            Self {
                id: properties.id(),
                properties,
                filter: WorkspaceFilter::default(),
                entries: Vec::new(),
                fail_close: false,
                closed: Arc::clone(closed),
            }
        }

        /// Add an entry; `None` content cannot be read
        fn entry(mut self, path: &str, content: Option<&str>) -> Self {
            self.entries
                .push((path.to_string(), content.map(|c| c.as_bytes().to_vec())));
            self
        }

        fn failing_close(mut self) -> Self {
            self.fail_close = true;
            self
        }
    }

    impl PackageArchive for StubPackage {
        fn id(&self) -> &PackageId {
            &self.id
        }

        fn properties(&self) -> &PackageProperties {
            &self.properties
        }

        fn dependencies(&self) -> &[Dependency] {
            &[]
        }

        fn filter(&self) -> &WorkspaceFilter {
            &self.filter
        }

        fn entries(&self) -> Vec<String> {
            self.entries.iter().map(|(path, _)| path.clone()).collect()
        }

        fn read_entry(&self, path: &str) -> Result<Vec<u8>> {
            match self.entries.iter().find(|(p, _)| p == path) {
                Some((_, Some(content))) => Ok(content.clone()),
                _ => Err(Error::IoError(format!("Unreadable entry {}", path))),
            }
        }

        fn open_sub_package(&self, path: &str) -> Result<Box<dyn PackageArchive>> {
            Err(Error::InvalidInput(format!("{} is not a package", path)))
        }

        fn source(&self) -> &str {
            &self.id.name
        }

        fn close(&mut self) -> Result<()> {
            self.closed.lock().push(self.id.name.clone());
            if self.fail_close {
                return Err(Error::IoError("archive already released".to_string()));
            }
            Ok(())
        }
    }

    /// Hands out prepared stubs by file path
    struct StubOpener {
        packages: Mutex<HashMap<PathBuf, StubPackage>>,
    }

    impl PackageOpener for StubOpener {
        fn open(&self, path: &Path) -> Result<Box<dyn PackageArchive>> {
            self.packages
                .lock()
                .remove(path)
                .map(|p| Box::new(p) as Box<dyn PackageArchive>)
                .ok_or_else(|| Error::InvalidInput(format!("No stub for {}", path.display())))
        }
    }

    /// Placeholder input files plus a converter opening the stubs behind them
    fn stub_converter(
        dir: &TempDir,
        packages: Vec<StubPackage>,
    ) -> (ContentPackageConverter, Vec<PathBuf>) {
        let mut paths = Vec::new();
        let mut by_path = HashMap::new();
        for package in packages {
            let path = dir.path().join(format!("{}.zip", package.id.name));
            fs::write(&path, b"stub").unwrap();
            paths.push(path.clone());
            by_path.insert(path, package);
        }

        let converter = converter(dir).with_opener(Box::new(StubOpener {
            packages: Mutex::new(by_path),
        }));
        (converter, paths)
    }

    #[test]
    fn test_unclaimed_entry_needs_a_package_in_conversion() {
        let dir = TempDir::new().unwrap();
        let mut converter = converter(&dir);
        let archive = package(&[("/jcr_root/apps/acme/file.txt", b"x")]);

        let err = converter.dispatch("/jcr_root/apps/acme/file.txt", &archive).unwrap_err();
        assert!(matches!(err, Error::StateError(_)));
    }

    #[test]
    fn test_unclaimed_entry_goes_to_assembler() {
        let dir = TempDir::new().unwrap();
        let mut converter = converter(&dir);
        let archive = package(&[("/jcr_root/apps/acme/file.txt", b"x")]);
        converter.main_assembler = Some(PackageAssembler::create(&archive).unwrap());

        converter.dispatch("/jcr_root/apps/acme/file.txt", &archive).unwrap();

        let assembler = converter.main_assembler().unwrap();
        assert!(assembler.contains("/jcr_root/apps/acme/file.txt"));
    }

    #[test]
    fn test_filtered_entry_is_a_policy_violation() {
        let dir = TempDir::new().unwrap();
        let mut converter = converter(&dir)
            .with_resource_filter(ResourceFilter::from_patterns(&[".*\\.bak"]).unwrap());
        let archive = package(&[("/jcr_root/apps/acme/file.bak", b"x")]);

        let err = converter.dispatch("/jcr_root/apps/acme/file.bak", &archive).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Path '/jcr_root/apps/acme/file.bak' in archive {group=acme, name=content, version=1.0} \
             not allowed by user configuration, please check configured filtering patterns"
        );
    }

    #[test]
    fn test_unrecorded_sub_package_is_skipped() {
        let dir = TempDir::new().unwrap();
        let mut converter = converter(&dir);
        let parent = package(&[("/jcr_root/apps/acme/file.txt", b"x")]);
        let nested = package(&[("/jcr_root/apps/nested/file.txt", b"y")]);
        converter.main_assembler = Some(PackageAssembler::create(&parent).unwrap());

        converter
            .process_sub_package("/jcr_root/etc/packages/acme/nested.zip", &nested)
            .unwrap();

        let assembler = converter.main_assembler().unwrap();
        assert_eq!(assembler.entries().count(), 0);
    }

    #[test]
    fn test_cnd_pattern_handler_stays_registered() {
        let dir = TempDir::new().unwrap();
        let mut converter = converter(&dir);
        let builtins = converter.handlers().len();

        let archive = TarPackage::from_entries(
            vec![(
                PROPERTIES_PATH.to_string(),
                PackageProperties::new()
                    .with("group", "acme")
                    .with("name", "types")
                    .with("cndPattern", r"/jcr_root/apps/.+\.cnd")
                    .to_xml()
                    .into_bytes(),
            )],
            "memory",
        )
        .unwrap();
        converter.main_assembler = Some(PackageAssembler::create(&archive).unwrap());
        converter.traverse(&archive).unwrap();

        assert_eq!(converter.handlers().len(), builtins + 1);
        let handler = converter
            .handlers()
            .entry_handler_for("/jcr_root/apps/acme/page.cnd")
            .unwrap();
        assert_eq!(handler.name(), "node-types");
    }

    #[test]
    fn test_cnd_pattern_registered_once() {
        let dir = TempDir::new().unwrap();
        let mut converter = converter(&dir);
        let builtins = converter.handlers().len();

        let archive = TarPackage::from_entries(
            vec![(
                PROPERTIES_PATH.to_string(),
                PackageProperties::new()
                    .with("group", "acme")
                    .with("name", "types")
                    .with("cndPattern", r"/jcr_root/apps/.+\.cnd")
                    .to_xml()
                    .into_bytes(),
            )],
            "memory",
        )
        .unwrap();
        converter.main_assembler = Some(PackageAssembler::create(&archive).unwrap());

        converter.traverse(&archive).unwrap();
        converter.traverse(&archive).unwrap();

        assert_eq!(converter.handlers().len(), builtins + 1);
    }

    #[test]
    fn test_close_failure_is_swallowed() {
        let dir = TempDir::new().unwrap();
        let closed = Closed::default();
        let (mut converter, paths) =
            stub_converter(&dir, vec![StubPackage::new("content", &closed).failing_close()]);

        converter.convert(&paths).unwrap();

        assert_eq!(*closed.lock(), vec!["content".to_string()]);
        assert!(dir.path().join("features/content.json").exists());
    }

    #[test]
    fn test_failed_package_resets_state_and_closes_the_rest() {
        let dir = TempDir::new().unwrap();
        let closed = Closed::default();
        let broken = StubPackage::new("broken", &closed)
            .entry(
                "/jcr_root/home/users/system/svc/.content.xml",
                Some(r#"<jcr:root xmlns:jcr="http://www.jcp.org/jcr/1.0" jcr:primaryType="rep:SystemUser" rep:authorizableId="svc"/>"#),
            )
            .entry(
                "/jcr_root/content/acme/_rep_policy.xml",
                Some(r#"<jcr:root xmlns:jcr="http://www.jcp.org/jcr/1.0" jcr:primaryType="rep:ACL"><allow jcr:primaryType="rep:GrantACE" rep:principalName="svc" rep:privileges="{Name}[jcr:read]"/></jcr:root>"#),
            )
            .entry("/jcr_root/apps/acme/truncated.txt", None);
        let (mut converter, paths) = stub_converter(
            &dir,
            vec![
                StubPackage::new("first", &closed),
                broken,
                StubPackage::new("last", &closed),
            ],
        );

        let err = converter.convert(&paths).unwrap_err();
        assert!(matches!(err, Error::IoError(_)));

        assert_eq!(converter.acl_manager_mut().render(&NoPrimaryTypes).unwrap(), None);
        assert!(converter.main_assembler().is_none());

        let mut closed = closed.lock().clone();
        closed.sort();
        assert_eq!(closed, vec!["broken", "first", "last"]);

        assert!(dir.path().join("features/first.json").exists());
        assert!(!dir.path().join("features/last.json").exists());
    }
}
