//! Isolated module loading
//!
//! A [`LoadContext`] owns one loaded module and everything it pulled in. It
//! lives behind an `Arc`: the owning controller holds one reference and
//! every registry entry discovered from the module holds another, so the
//! module's code stays mapped exactly as long as something can still call
//! into it. Unloading drops the controller's reference and hands out an
//! [`UnloadHandle`] that observes the context through a `Weak`.

use libloading::{Library, Symbol};
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::time::Duration;

use hive_extension_api::{
    API_VERSION, API_VERSION_SYMBOL, ExtensionRegistrar, REGISTER_OK, REGISTER_PANICKED,
    REGISTER_SYMBOL, TypeDescriptor,
};

use crate::error::PackageError;

/// Registration function for the host's built-in extensions
pub type RegisterFn = Arc<dyn Fn(&mut ExtensionRegistrar) + Send + Sync>;

/// A module opened by a [`ModuleLoader`]
pub trait LoadedModule: Send + Sync {
    /// Module name, e.g. the entry library's stem
    fn name(&self) -> &str;

    /// Ask the module to describe the types it exports
    fn register(&self, registrar: &mut ExtensionRegistrar) -> Result<(), PackageError>;
}

/// Opens an entry module together with its private dependency closure
pub trait ModuleLoader: Send + Sync {
    fn open(
        &self,
        entry: &Path,
        dependencies: &[PathBuf],
    ) -> Result<Box<dyn LoadedModule>, PackageError>;
}

/// Isolation context of one loaded package
pub struct LoadContext {
    module: Box<dyn LoadedModule>,
    location: Option<PathBuf>,
}

impl LoadContext {
    pub fn new(module: Box<dyn LoadedModule>, location: Option<PathBuf>) -> Self {
        Self { module, location }
    }

    /// Context wrapping the host's own code
    pub fn builtin(register: Option<RegisterFn>) -> Self {
        Self::new(Box::new(BuiltinModule { register }), None)
    }

    pub fn name(&self) -> &str {
        self.module.name()
    }

    /// Entry library path, `None` for the built-in context
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    /// Enumerate the types the module exports
    pub fn types(&self) -> Result<Vec<TypeDescriptor>, PackageError> {
        let mut registrar = ExtensionRegistrar::new();

        std::panic::catch_unwind(AssertUnwindSafe(|| self.module.register(&mut registrar)))
            .map_err(|_| {
                PackageError::restore(format!(
                    "module '{}' panicked during registration",
                    self.name()
                ))
            })??;

        Ok(registrar.into_types())
    }
}

impl Drop for LoadContext {
    fn drop(&mut self) {
        tracing::debug!(module = %self.module.name(), "Releasing load context");
    }
}

impl std::fmt::Debug for LoadContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadContext")
            .field("name", &self.name())
            .field("location", &self.location)
            .finish()
    }
}

/// Tracks whether an unloaded context has been reclaimed
#[derive(Debug, Clone)]
pub struct UnloadHandle {
    name: String,
    context: Weak<LoadContext>,
}

impl UnloadHandle {
    pub(crate) fn new(context: &Arc<LoadContext>) -> Self {
        Self {
            name: context.name().to_string(),
            context: Arc::downgrade(context),
        }
    }

    /// Name of the unloaded module
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True once nothing references the context any more
    pub fn is_reclaimed(&self) -> bool {
        self.context.strong_count() == 0
    }

    /// Poll until the context is reclaimed, at most `attempts` times.
    ///
    /// Returns whether reclamation was observed.
    pub async fn wait_for_reclamation(&self, attempts: usize, interval: Duration) -> bool {
        for attempt in 0..attempts {
            if self.is_reclaimed() {
                return true;
            }
            tracing::trace!(module = %self.name, attempt, "Load context still referenced");
            tokio::time::sleep(interval).await;
        }
        self.is_reclaimed()
    }
}

/// The host's own code, wrapped as a module
struct BuiltinModule {
    register: Option<RegisterFn>,
}

impl LoadedModule for BuiltinModule {
    fn name(&self) -> &str {
        "builtin"
    }

    fn register(&self, registrar: &mut ExtensionRegistrar) -> Result<(), PackageError> {
        if let Some(register) = &self.register {
            register(registrar);
        }
        Ok(())
    }
}

/// Loads extensions as native dynamic libraries
#[derive(Debug, Default, Clone, Copy)]
pub struct DylibLoader;

impl ModuleLoader for DylibLoader {
    fn open(
        &self,
        entry: &Path,
        dependencies: &[PathBuf],
    ) -> Result<Box<dyn LoadedModule>, PackageError> {
        if !entry.is_file() {
            return Err(PackageError::PathNotFound {
                path: entry.to_path_buf(),
            });
        }

        // Private dependencies first so the entry library resolves against them
        let mut loaded_dependencies = Vec::with_capacity(dependencies.len());
        for dependency in dependencies {
            tracing::debug!(library = %dependency.display(), "Loading private dependency");
            // SAFETY: the library comes from a restored package the host asked to load.
            loaded_dependencies.push(unsafe { Library::new(dependency)? });
        }

        // SAFETY: as above; initializers of the entry library run here.
        let library = unsafe { Library::new(entry)? };

        // SAFETY: the symbol is generated by `export_extensions!` with this signature.
        let api_version_fn: Symbol<extern "C" fn() -> u32> =
            unsafe { library.get(API_VERSION_SYMBOL)? };

        let found = api_version_fn();
        if found != API_VERSION {
            return Err(PackageError::ApiVersionMismatch {
                expected: API_VERSION,
                found,
            });
        }

        let name = entry
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(|stem| stem.strip_prefix(std::env::consts::DLL_PREFIX).unwrap_or(stem))
            .unwrap_or("extension")
            .to_string();

        Ok(Box::new(DylibModule {
            name,
            library,
            _dependencies: loaded_dependencies,
        }))
    }
}

/// A loaded extension library.
///
/// Fields drop in declaration order: the entry library is closed before the
/// dependencies it links against.
struct DylibModule {
    name: String,
    library: Library,
    _dependencies: Vec<Library>,
}

impl LoadedModule for DylibModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn register(&self, registrar: &mut ExtensionRegistrar) -> Result<(), PackageError> {
        // SAFETY: the symbol is generated by `export_extensions!` with this signature.
        let register_fn: Symbol<extern "C" fn(*mut ExtensionRegistrar) -> i32> =
            unsafe { self.library.get(REGISTER_SYMBOL)? };

        registration_status(&self.name, register_fn(registrar))
    }
}

/// Map the status returned by `_hive_extension_register`
fn registration_status(module: &str, status: i32) -> Result<(), PackageError> {
    match status {
        REGISTER_OK => Ok(()),
        REGISTER_PANICKED => Err(PackageError::restore(format!(
            "module '{module}' panicked during registration"
        ))),
        other => Err(PackageError::restore(format!(
            "module '{module}' failed to register its types (status {other})"
        ))),
    }
}
