//! Package references
//!
//! A [`PackageReference`] says where an extension's code comes from. It is a
//! plain value: the provider tag is stored verbatim and only parsed, together
//! with the configuration keys an operation needs, when that operation runs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::PackageError;

/// Map of package reference id to reference, iterated in ascending id order
pub type ReferenceMap = BTreeMap<Uuid, PackageReference>;

/// Configuration key: root directory of a `local` package
pub const PATH_KEY: &str = "path";
/// Configuration key: version subdirectory of a `local` package
pub const VERSION_KEY: &str = "version";
/// Configuration key: build entry point, relative to the source tree
pub const ENTRYPOINT_KEY: &str = "entrypoint";
/// Configuration key: repository URL of a `git-tag` package
pub const REPOSITORY_KEY: &str = "repository";
/// Configuration key: tag of a `git-tag` package
pub const TAG_KEY: &str = "tag";

/// Source kind of a package reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    /// The host's own, already linked code
    Builtin,
    /// Versioned source trees below a local directory
    Local,
    /// Tags of a git repository
    GitTag,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Builtin => "builtin",
            Provider::Local => "local",
            Provider::GitTag => "git-tag",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = PackageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "builtin" => Ok(Provider::Builtin),
            "local" => Ok(Provider::Local),
            "git-tag" => Ok(Provider::GitTag),
            other => Err(PackageError::UnsupportedProvider {
                provider: other.to_string(),
            }),
        }
    }
}

/// A package reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PackageReference {
    /// The provider which loads the package
    pub provider: String,
    /// Provider-specific configuration
    #[serde(default)]
    pub configuration: BTreeMap<String, String>,
}

impl PackageReference {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            configuration: BTreeMap::new(),
        }
    }

    /// Reference to the host's built-in extensions
    pub fn builtin() -> Self {
        Self::new(Provider::Builtin.as_str())
    }

    /// Add a configuration entry
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.configuration.insert(key.into(), value.into());
        self
    }

    /// Parse the provider tag
    pub fn provider(&self) -> Result<Provider, PackageError> {
        self.provider.parse()
    }

    /// Look up a configuration value that the current operation requires
    pub fn require(&self, key: &'static str) -> Result<&str, PackageError> {
        self.configuration
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| PackageError::MissingKey {
                provider: self.provider.clone(),
                key,
            })
    }

    /// Like [`require`](Self::require), for values used as one directory
    /// name: no separators, not empty, not `.` or `..`
    pub fn require_segment(&self, key: &'static str) -> Result<&str, PackageError> {
        let value = self.require(key)?;
        if !is_path_segment(value) {
            return Err(PackageError::InvalidConfig(format!(
                "The '{key}' parameter of the {} package reference must be a single path segment, got '{value}'",
                self.provider
            )));
        }
        Ok(value)
    }
}

/// Check that `value` names exactly one normal path component
pub(crate) fn is_path_segment(value: &str) -> bool {
    let mut components = Path::new(value).components();
    !value.contains(['/', '\\', '\0'])
        && matches!(components.next(), Some(Component::Normal(_)))
        && components.next().is_none()
}
