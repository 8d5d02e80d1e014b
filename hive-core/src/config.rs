//! Host configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::builder::CommandBuilder;
use crate::environment::PackageEnvironment;
use crate::loader::RegisterFn;

/// Effective hive configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct HiveConfig {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub git: GitConfig,

    #[serde(default)]
    pub build: CommandBuilder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root of the restore cache
    pub cache_dir: PathBuf,

    /// Location of the package reference document
    pub references_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            cache_dir: hive_paths::packages_dir(),
            references_file: hive_paths::references_file(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitConfig {
    /// Program invoked for git operations
    pub program: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            program: "git".to_string(),
        }
    }
}

impl HiveConfig {
    /// Package environment described by this configuration
    pub fn environment(&self, builtin: Option<RegisterFn>) -> PackageEnvironment {
        let environment = PackageEnvironment::new(&self.paths.cache_dir)
            .with_git_program(&self.git.program)
            .with_builder(std::sync::Arc::new(self.build.clone()));

        match builtin {
            Some(register) => environment.with_builtin(register),
            None => environment,
        }
    }
}
