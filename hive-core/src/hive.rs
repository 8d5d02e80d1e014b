//! ExtensionHive - loads a batch of packages into one extension registry

use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use hive_extension_api::{Capability, TypeDescriptor};

use crate::controller::PackageController;
use crate::environment::PackageEnvironment;
use crate::error::PackageError;
use crate::loader::{LoadContext, UnloadHandle};
use crate::progress::ProgressSink;
use crate::reference::{PackageReference, ReferenceMap};
use crate::scanner::scan_types;

/// Reserved id of the host's built-in package
pub const BUILTIN_ID: Uuid = Uuid::from_u128(0x97d297d2_df6f_4c85_9d07_86bc64a041a6);

/// A discovered extension type and the package it came from
#[derive(Debug, Clone)]
pub struct RegisteredExtension {
    package_id: Uuid,
    descriptor: TypeDescriptor,
    context: Arc<LoadContext>,
}

impl RegisteredExtension {
    pub fn package_id(&self) -> Uuid {
        self.package_id
    }

    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    pub fn full_name(&self) -> &str {
        self.descriptor.full_name()
    }
}

/// Immutable snapshot of the extension types of one batch
#[derive(Debug)]
pub struct ExtensionRegistry<C> {
    generation: u64,
    entries: Vec<RegisteredExtension>,
    _capability: PhantomData<fn() -> C>,
}

impl<C: Capability> ExtensionRegistry<C> {
    fn new(generation: u64, entries: Vec<RegisteredExtension>) -> Self {
        Self {
            generation,
            entries,
            _capability: PhantomData,
        }
    }

    /// Incremented for every installed batch
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Entries in registration order: ascending package id, built-in last
    pub fn entries(&self) -> &[RegisteredExtension] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry with the given full name
    pub fn find(&self, full_name: &str) -> Option<&RegisteredExtension> {
        self.entries
            .iter()
            .find(|entry| entry.full_name() == full_name)
    }
}

/// An instantiated extension.
///
/// Keeps the package it was built from loaded for as long as it lives.
pub struct ExtensionInstance<C: Capability> {
    // Dropped before the context that holds its code
    instance: Box<C::Instance>,
    _context: Arc<LoadContext>,
}

impl<C: Capability> Deref for ExtensionInstance<C> {
    type Target = C::Instance;

    fn deref(&self) -> &Self::Target {
        &self.instance
    }
}

/// A package that could not be loaded
#[derive(Debug)]
pub struct LoadFailure {
    pub id: Uuid,
    pub reference: PackageReference,
    pub error: PackageError,
}

/// Outcome of [`ExtensionHive::load_packages`]
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Ids of the loaded packages, in load order
    pub loaded: Vec<Uuid>,
    /// Packages that were skipped
    pub failed: Vec<LoadFailure>,
}

struct LoadedPackage {
    id: Uuid,
    controller: PackageController,
}

/// Restores and loads packages, then exposes the types that provide
/// capability `C`.
pub struct ExtensionHive<C: Capability> {
    environment: Arc<PackageEnvironment>,
    packages: Vec<LoadedPackage>,
    registry: Arc<ExtensionRegistry<C>>,
}

impl<C: Capability> ExtensionHive<C> {
    pub fn new(environment: Arc<PackageEnvironment>) -> Self {
        Self {
            environment,
            packages: Vec::new(),
            registry: Arc::new(ExtensionRegistry::new(0, Vec::new())),
        }
    }

    pub fn environment(&self) -> &Arc<PackageEnvironment> {
        &self.environment
    }

    /// Replace the current batch with the given packages plus the host's
    /// built-in one.
    ///
    /// Packages are processed one at a time in ascending id order, the
    /// built-in package last. A package that fails is logged, reported and
    /// left out. If `cancel` fires, everything loaded so far is unloaded,
    /// the registry stays empty and [`PackageError::Cancelled`] is returned.
    pub async fn load_packages(
        &mut self,
        references: &ReferenceMap,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<LoadReport, PackageError> {
        let generation = self.registry.generation();

        if !self.packages.is_empty() || !self.registry.is_empty() {
            tracing::debug!(generation, "Unloading previous batch");
            self.unload();
        }

        let mut batch: Vec<(Uuid, PackageReference)> = references
            .iter()
            .filter(|(id, _)| {
                let reserved = **id == BUILTIN_ID;
                if reserved {
                    tracing::warn!(id = %id, "Package reference uses the reserved built-in id, skipping");
                }
                !reserved
            })
            .map(|(id, reference)| (*id, reference.clone()))
            .collect();
        batch.push((BUILTIN_ID, PackageReference::builtin()));

        let total = batch.len() as f64;
        let mut report = LoadReport::default();
        let mut loaded = Vec::new();
        let mut entries = Vec::new();

        for (index, (id, reference)) in batch.into_iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(Self::abort(loaded, entries));
            }

            let span = tracing::info_span!("package", id = %id, provider = %reference.provider);
            match self.load_one(id, reference.clone(), cancel).instrument(span).await {
                Ok((package, context, types)) => {
                    entries.extend(types.into_iter().map(|descriptor| RegisteredExtension {
                        package_id: id,
                        descriptor,
                        context: Arc::clone(&context),
                    }));
                    report.loaded.push(id);
                    loaded.push(package);
                }
                Err(e) if e.is_cancelled() => {
                    return Err(Self::abort(loaded, entries));
                }
                Err(e) => {
                    tracing::error!(
                        id = %id,
                        provider = %reference.provider,
                        error = %e,
                        "Failed to load package"
                    );
                    report.failed.push(LoadFailure {
                        id,
                        reference,
                        error: e,
                    });
                }
            }

            progress.report((index + 1) as f64 / total);
        }

        self.packages = loaded;
        self.registry = Arc::new(ExtensionRegistry::new(generation + 1, entries));

        tracing::info!(
            generation = generation + 1,
            loaded = report.loaded.len(),
            failed = report.failed.len(),
            extensions = self.registry.len(),
            "Extension registry updated"
        );

        Ok(report)
    }

    async fn load_one(
        &self,
        id: Uuid,
        reference: PackageReference,
        cancel: &CancellationToken,
    ) -> Result<(LoadedPackage, Arc<LoadContext>, Vec<TypeDescriptor>), PackageError> {
        let mut controller = PackageController::new(reference, Arc::clone(&self.environment));
        let context = controller
            .load(&self.environment.cache_root, cancel)
            .await?;

        let descriptors = match context.types() {
            Ok(descriptors) => descriptors,
            Err(e) => {
                drop(context);
                controller.unload()?;
                return Err(e);
            }
        };

        let types = scan_types::<C>(context.name(), descriptors);
        tracing::debug!(count = types.len(), "Discovered extension types");

        Ok((LoadedPackage { id, controller }, context, types))
    }

    fn abort(loaded: Vec<LoadedPackage>, entries: Vec<RegisteredExtension>) -> PackageError {
        tracing::info!(loaded = loaded.len(), "Package loading cancelled, unloading batch");
        drop(entries);
        for mut package in loaded {
            if let Err(e) = package.controller.unload() {
                tracing::warn!(id = %package.id, error = %e, "Failed to unload package");
            }
        }
        PackageError::Cancelled
    }

    /// All discovered extension types; empty before the first batch
    pub fn get_extensions(&self) -> impl Iterator<Item = &TypeDescriptor> + '_ {
        self.registry.entries().iter().map(RegisteredExtension::descriptor)
    }

    /// Id of the package that provides the named type
    pub fn get_package_reference_id(&self, full_name: &str) -> Result<Uuid, PackageError> {
        self.resolve(full_name).map(RegisteredExtension::package_id)
    }

    /// Build a fresh instance of the named type
    pub fn get_instance(&self, full_name: &str) -> Result<ExtensionInstance<C>, PackageError> {
        let entry = self.resolve(full_name)?;

        let instance =
            entry
                .descriptor()
                .construct::<C>()
                .map_err(|e| PackageError::Instantiation {
                    name: full_name.to_string(),
                    reason: e.to_string(),
                })?;

        Ok(ExtensionInstance {
            instance,
            _context: Arc::clone(&entry.context),
        })
    }

    /// The current registry snapshot
    pub fn snapshot(&self) -> Arc<ExtensionRegistry<C>> {
        Arc::clone(&self.registry)
    }

    /// Ids of the currently loaded packages, in load order
    pub fn loaded_packages(&self) -> Vec<Uuid> {
        self.packages.iter().map(|package| package.id).collect()
    }

    /// Clear the registry and unload every package.
    ///
    /// Each returned handle reports when its package was reclaimed.
    pub fn unload(&mut self) -> Vec<UnloadHandle> {
        self.registry = Arc::new(ExtensionRegistry::new(
            self.registry.generation(),
            Vec::new(),
        ));

        self.packages
            .drain(..)
            .filter_map(|mut package| match package.controller.unload() {
                Ok(handle) => Some(handle),
                Err(e) => {
                    tracing::warn!(id = %package.id, error = %e, "Failed to unload package");
                    None
                }
            })
            .collect()
    }

    fn resolve(&self, full_name: &str) -> Result<&RegisteredExtension, PackageError> {
        self.registry
            .find(full_name)
            .ok_or_else(|| PackageError::ExtensionNotFound {
                name: full_name.to_string(),
                capability: C::NAME.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::loader::RegisterFn;
    use crate::progress::NoProgress;
    use hive_extension_api::{Describe, DescribeCapability, ExtensionError, ExtensionRegistrar};
    use tempfile::TempDir;

    struct Version;

    impl Describe for Version {
        fn describe(&self) -> String {
            "host 1.0".into()
        }
    }

    fn builtin() -> RegisterFn {
        Arc::new(|registrar: &mut ExtensionRegistrar| {
            registrar
                .register::<DescribeCapability, _>("host.Version", || Box::new(Version))
                .register_fallible::<DescribeCapability, _>("host.Broken", || {
                    Err(ExtensionError::custom("not configured"))
                })
                .register::<DescribeCapability, _>("host.Panics", || panic!("boom"));
        })
    }

    fn hive(cache: &TempDir) -> ExtensionHive<DescribeCapability> {
        let environment = PackageEnvironment::new(cache.path()).with_builtin(builtin());
        ExtensionHive::new(Arc::new(environment))
    }

    #[test]
    fn test_builtin_id() {
        assert_eq!(
            BUILTIN_ID.to_string(),
            "97d297d2-df6f-4c85-9d07-86bc64a041a6"
        );
    }

    #[tokio::test]
    async fn test_empty_before_load() {
        let cache = TempDir::new().unwrap();
        let hive = hive(&cache);
        assert_eq!(hive.get_extensions().count(), 0);
        assert_eq!(hive.snapshot().generation(), 0);

        let err = hive.get_package_reference_id("host.Version").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_builtin_only_batch() {
        let cache = TempDir::new().unwrap();
        let mut hive = hive(&cache);

        let report = hive
            .load_packages(&ReferenceMap::new(), &NoProgress, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.loaded, vec![BUILTIN_ID]);
        assert!(report.failed.is_empty());
        assert_eq!(hive.loaded_packages(), vec![BUILTIN_ID]);
        assert_eq!(
            hive.get_package_reference_id("host.Version").unwrap(),
            BUILTIN_ID
        );

        let instance = hive.get_instance("host.Version").unwrap();
        assert_eq!(instance.describe(), "host 1.0");
    }

    #[tokio::test]
    async fn test_get_instance_errors() {
        let cache = TempDir::new().unwrap();
        let mut hive = hive(&cache);
        hive.load_packages(&ReferenceMap::new(), &NoProgress, &CancellationToken::new())
            .await
            .unwrap();

        let err = hive.get_instance("host.Missing").err().unwrap();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = hive.get_instance("host.Broken").err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Instantiation);
        assert!(err.to_string().contains("not configured"));

        let err = hive.get_instance("host.Panics").err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Instantiation);
    }

    #[tokio::test]
    async fn test_reserved_id_is_skipped() {
        let cache = TempDir::new().unwrap();
        let mut hive = hive(&cache);
        let mut references = ReferenceMap::new();
        references.insert(BUILTIN_ID, PackageReference::new("local"));

        let report = hive
            .load_packages(&references, &NoProgress, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.loaded, vec![BUILTIN_ID]);
        assert!(report.failed.is_empty());
    }

    #[tokio::test]
    async fn test_reload_increments_generation_and_releases_previous() {
        let cache = TempDir::new().unwrap();
        let mut hive = hive(&cache);
        let cancel = CancellationToken::new();

        hive.load_packages(&ReferenceMap::new(), &NoProgress, &cancel)
            .await
            .unwrap();
        let first = hive.snapshot();
        assert_eq!(first.generation(), 1);
        drop(first);

        hive.load_packages(&ReferenceMap::new(), &NoProgress, &cancel)
            .await
            .unwrap();
        assert_eq!(hive.snapshot().generation(), 2);
        assert_eq!(hive.loaded_packages().len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let cache = TempDir::new().unwrap();
        let mut hive = hive(&cache);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = hive
            .load_packages(&ReferenceMap::new(), &NoProgress, &cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(hive.get_extensions().count(), 0);
        assert!(hive.loaded_packages().is_empty());
    }

    #[tokio::test]
    async fn test_unload_reports_reclamation() {
        let cache = TempDir::new().unwrap();
        let mut hive = hive(&cache);
        hive.load_packages(&ReferenceMap::new(), &NoProgress, &CancellationToken::new())
            .await
            .unwrap();

        let instance = hive.get_instance("host.Version").unwrap();
        let handles = hive.unload();
        assert_eq!(handles.len(), 1);
        assert!(!handles[0].is_reclaimed(), "instance keeps the package alive");

        drop(instance);
        assert!(handles[0].is_reclaimed());
        assert_eq!(hive.get_extensions().count(), 0);
    }
}
