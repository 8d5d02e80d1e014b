//! Collaborators shared by all package controllers

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::builder::{CommandBuilder, PackageBuilder};
use crate::loader::{DylibLoader, ModuleLoader, RegisterFn};

/// Where packages are restored to and the tools used to get them there
#[derive(Clone)]
pub struct PackageEnvironment {
    /// Root of the restore cache
    pub cache_root: PathBuf,
    /// Program invoked for `git` operations
    pub git_program: String,
    /// Turns package sources into deployable directories
    pub builder: Arc<dyn PackageBuilder>,
    /// Opens restored entry modules
    pub loader: Arc<dyn ModuleLoader>,
    /// Registration function of the host's built-in extensions
    pub builtin: Option<RegisterFn>,
}

impl PackageEnvironment {
    /// Environment with the default tools: `git`, `sh {entrypoint} {output}`
    /// and native dynamic libraries.
    pub fn new(cache_root: impl Into<PathBuf>) -> Self {
        Self {
            cache_root: cache_root.into(),
            git_program: "git".to_string(),
            builder: Arc::new(CommandBuilder::default()),
            loader: Arc::new(DylibLoader),
            builtin: None,
        }
    }

    pub fn with_git_program(mut self, program: impl Into<String>) -> Self {
        self.git_program = program.into();
        self
    }

    pub fn with_builder(mut self, builder: Arc<dyn PackageBuilder>) -> Self {
        self.builder = builder;
        self
    }

    pub fn with_loader(mut self, loader: Arc<dyn ModuleLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_builtin(mut self, register: RegisterFn) -> Self {
        self.builtin = Some(register);
        self
    }
}

impl fmt::Debug for PackageEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackageEnvironment")
            .field("cache_root", &self.cache_root)
            .field("git_program", &self.git_program)
            .field("builtin", &self.builtin.is_some())
            .finish_non_exhaustive()
    }
}
