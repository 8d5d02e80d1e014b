//! Artifact manifest
//!
//! A restored package contains exactly one `<module>.extension.toml` file.
//! Its file name names the entry module: the library
//! `{DLL_PREFIX}<module>{DLL_SUFFIX}` sitting next to it. The body lists the
//! module's private dependency closure, relative to the manifest directory.
//!
//! ```toml
//! name = "hello-extension"
//! version = "0.1.0"
//! dependencies = ["deps/libgreeting.so"]
//! ```

use serde::{Deserialize, Serialize};
use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::path::{Path, PathBuf};

use crate::ExtensionError;

/// File name suffix that identifies an artifact manifest
pub const MANIFEST_SUFFIX: &str = ".extension.toml";

/// Parsed artifact manifest
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    /// Human-readable package name
    #[serde(default)]
    pub name: Option<String>,
    /// Package version as reported by the build
    #[serde(default)]
    pub version: Option<String>,
    /// Private libraries the entry module depends on
    #[serde(default)]
    pub dependencies: Vec<PathBuf>,
}

impl ArtifactManifest {
    /// Load a manifest from a TOML file
    pub fn load(path: &Path) -> Result<Self, ExtensionError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse a manifest from TOML text
    pub fn parse(content: &str) -> Result<Self, ExtensionError> {
        toml::from_str(content).map_err(|e| ExtensionError::manifest(e.to_string()))
    }

    /// Check whether `path` looks like an artifact manifest
    pub fn is_manifest_file(path: &Path) -> bool {
        Self::module_name(path).is_some()
    }

    /// Extract the entry module name from a manifest path
    ///
    /// `out/hello_extension.extension.toml` → `hello_extension`
    pub fn module_name(path: &Path) -> Option<&str> {
        path.file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.strip_suffix(MANIFEST_SUFFIX))
            .filter(|module| !module.is_empty())
    }

    /// Derive the entry library path from a manifest path
    pub fn entry_library_path(path: &Path) -> Option<PathBuf> {
        let module = Self::module_name(path)?;
        let dir = path.parent().unwrap_or_else(|| Path::new(""));
        Some(dir.join(library_file_name(module)))
    }

    /// Manifest file name for a module
    pub fn file_name_for(module: &str) -> String {
        format!("{module}{MANIFEST_SUFFIX}")
    }

    /// Resolve dependency paths relative to the manifest's directory
    pub fn dependency_paths(&self, manifest_path: &Path) -> Vec<PathBuf> {
        let dir = manifest_path.parent().unwrap_or_else(|| Path::new(""));
        self.dependencies.iter().map(|dep| dir.join(dep)).collect()
    }
}

/// Platform library file name for a module, e.g. `libhello.so`
pub fn library_file_name(module: &str) -> String {
    format!("{DLL_PREFIX}{module}{DLL_SUFFIX}")
}
