//! Per-reference package lifecycle
//!
//! A [`PackageController`] takes one [`PackageReference`] through
//! version listing, restore, load and unload. It loads at most once and
//! unloads at most once, in that order.

mod cache;
mod git_tag;
mod local;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use hive_extension_api::ArtifactManifest;

use crate::environment::PackageEnvironment;
use crate::error::PackageError;
use crate::loader::{LoadContext, UnloadHandle};
use crate::reference::{PackageReference, Provider};

pub use git_tag::strip_credentials;

/// Version reported for the host's built-in extensions
pub const BUILTIN_VERSION: &str = "current";

/// Lifecycle state of a [`PackageController`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Unloaded,
    Loading,
    Loaded,
    Unloading,
    /// Unloaded after a successful load; terminal
    Released,
    /// A load attempt failed; terminal
    Failed,
}

impl ControllerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unloaded => "unloaded",
            Self::Loading => "loading",
            Self::Loaded => "loaded",
            Self::Unloading => "unloading",
            Self::Released => "released",
            Self::Failed => "failed",
        }
    }
}

/// Drives one package reference through its lifecycle
pub struct PackageController {
    reference: PackageReference,
    environment: Arc<PackageEnvironment>,
    state: ControllerState,
    context: Option<Arc<LoadContext>>,
}

impl PackageController {
    pub fn new(reference: PackageReference, environment: Arc<PackageEnvironment>) -> Self {
        Self {
            reference,
            environment,
            state: ControllerState::Unloaded,
            context: None,
        }
    }

    pub fn reference(&self) -> &PackageReference {
        &self.reference
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// The load context while loaded
    pub fn context(&self) -> Option<&Arc<LoadContext>> {
        self.context.as_ref()
    }

    /// Available versions, newest first
    pub async fn list_versions(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, PackageError> {
        let provider = self.reference.provider()?;
        tracing::debug!(provider = %provider, "Listing package versions");

        match provider {
            Provider::Builtin => Ok(vec![BUILTIN_VERSION.to_string()]),
            Provider::Local => local::list_versions(&self.reference, cancel).await,
            Provider::GitTag => {
                git_tag::list_versions(&self.reference, &self.environment, cancel).await
            }
        }
    }

    /// Make sure the package is built into the cache and return its directory.
    ///
    /// Restoring an already restored package does nothing.
    pub async fn restore(
        &self,
        cache_root: &Path,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, PackageError> {
        let provider = self.reference.provider()?;
        let provider_root = cache_root.join(provider.as_str());
        tracing::debug!(
            provider = %provider,
            root = %provider_root.display(),
            "Restoring package"
        );

        match provider {
            Provider::Builtin => Ok(provider_root),
            Provider::Local => {
                local::restore(&self.reference, &self.environment, &provider_root, cancel).await
            }
            Provider::GitTag => {
                git_tag::restore(&self.reference, &self.environment, &provider_root, cancel).await
            }
        }
    }

    /// Restore the package if necessary and load it in a fresh context
    pub async fn load(
        &mut self,
        cache_root: &Path,
        cancel: &CancellationToken,
    ) -> Result<Arc<LoadContext>, PackageError> {
        if self.state != ControllerState::Unloaded {
            return Err(PackageError::LoadState {
                operation: "load",
                state: self.state.as_str(),
            });
        }

        self.state = ControllerState::Loading;

        match self.open(cache_root, cancel).await {
            Ok(context) => {
                let context = Arc::new(context);
                self.context = Some(Arc::clone(&context));
                self.state = ControllerState::Loaded;
                tracing::debug!(module = %context.name(), "Package loaded");
                Ok(context)
            }
            Err(e) => {
                self.state = ControllerState::Failed;
                Err(e)
            }
        }
    }

    async fn open(
        &self,
        cache_root: &Path,
        cancel: &CancellationToken,
    ) -> Result<LoadContext, PackageError> {
        if self.reference.provider()? == Provider::Builtin {
            return Ok(LoadContext::builtin(self.environment.builtin.clone()));
        }

        let restored = self.restore(cache_root, cancel).await?;

        if cancel.is_cancelled() {
            return Err(PackageError::Cancelled);
        }

        let manifest_path = cache::find_manifest(&restored)?;
        let manifest = ArtifactManifest::load(&manifest_path)?;
        let entry = ArtifactManifest::entry_library_path(&manifest_path).ok_or_else(|| {
            PackageError::restore(format!(
                "cannot derive entry module from {}",
                manifest_path.display()
            ))
        })?;
        let dependencies = manifest.dependency_paths(&manifest_path);

        tracing::debug!(
            entry = %entry.display(),
            dependencies = dependencies.len(),
            "Opening entry module"
        );
        let module = self.environment.loader.open(&entry, &dependencies)?;

        Ok(LoadContext::new(module, Some(entry)))
    }

    /// Release the controller's hold on the load context.
    ///
    /// The context is reclaimed once every other reference to it (registry
    /// entries, instances' owners) is gone; the returned handle observes
    /// that.
    pub fn unload(&mut self) -> Result<UnloadHandle, PackageError> {
        let context = match (self.state, self.context.take()) {
            (ControllerState::Loaded, Some(context)) => context,
            (state, context) => {
                self.context = context;
                return Err(PackageError::LoadState {
                    operation: "unload",
                    state: state.as_str(),
                });
            }
        };

        self.state = ControllerState::Unloading;
        let handle = UnloadHandle::new(&context);
        drop(context);
        self.state = ControllerState::Released;

        tracing::debug!(module = %handle.name(), "Package unloaded");
        Ok(handle)
    }
}

impl std::fmt::Debug for PackageController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageController")
            .field("reference", &self.reference)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
