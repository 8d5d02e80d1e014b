//! Shared fixtures for hive-core integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hive_core::{LoadedModule, ModuleLoader, PackageEnvironment, PackageError, RegisterFn};
use hive_extension_api::{
    ArtifactManifest, Describe, DescribeCapability, ExtensionRegistrar, library_file_name,
};

/// Module loader that hands out in-process registration functions by
/// module name instead of opening libraries.
#[derive(Default, Clone)]
pub struct StaticLoader {
    modules: HashMap<String, RegisterFn>,
}

impl StaticLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module(mut self, name: &str, register: RegisterFn) -> Self {
        self.modules.insert(name.to_string(), register);
        self
    }
}

impl ModuleLoader for StaticLoader {
    fn open(
        &self,
        entry: &Path,
        _dependencies: &[PathBuf],
    ) -> Result<Box<dyn LoadedModule>, PackageError> {
        if !entry.is_file() {
            return Err(PackageError::PathNotFound {
                path: entry.to_path_buf(),
            });
        }

        let file_name = entry
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default();
        let (name, register) = self
            .modules
            .iter()
            .find(|(name, _)| library_file_name(name) == file_name)
            .ok_or_else(|| PackageError::PathNotFound {
                path: entry.to_path_buf(),
            })?;

        Ok(Box::new(StaticModule {
            name: name.clone(),
            register: Arc::clone(register),
        }))
    }
}

struct StaticModule {
    name: String,
    register: RegisterFn,
}

impl LoadedModule for StaticModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn register(&self, registrar: &mut ExtensionRegistrar) -> Result<(), PackageError> {
        (self.register)(registrar);
        Ok(())
    }
}

/// `Describe` implementation returning a fixed text
pub struct Fixed(pub &'static str);

impl Describe for Fixed {
    fn describe(&self) -> String {
        self.0.to_string()
    }
}

/// Registration function exporting one `Describe` type
pub fn describe_module(type_name: &'static str, text: &'static str) -> RegisterFn {
    Arc::new(move |registrar: &mut ExtensionRegistrar| {
        registrar.register::<DescribeCapability, _>(type_name, move || Box::new(Fixed(text)));
    })
}

/// Environment rooted at `cache` that loads modules through `loader`
pub fn environment(cache: &Path, loader: StaticLoader) -> Arc<PackageEnvironment> {
    Arc::new(
        PackageEnvironment::new(cache)
            .with_loader(Arc::new(loader))
            .with_builtin(describe_module("host.Version", "host 1.0")),
    )
}

/// Build script that emits `module`'s library and manifest into `$1`.
///
/// Every run appends a line to `counter`.
pub fn build_script(module: &str, counter: &Path) -> String {
    format!(
        "set -e\n\
         echo built >> '{counter}'\n\
         touch \"$1/{library}\"\n\
         printf 'name = \"{module}\"\\n' > \"$1/{manifest}\"\n",
        counter = counter.display(),
        library = library_file_name(module),
        manifest = ArtifactManifest::file_name_for(module),
    )
}

/// Create `root/<version>/build.sh` for a local package
pub fn local_package(root: &Path, version: &str, script: &str) {
    let dir = root.join(version);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("build.sh"), script).unwrap();
}

/// Number of builds recorded in `counter`
pub fn build_count(counter: &Path) -> usize {
    std::fs::read_to_string(counter)
        .map(|content| content.lines().count())
        .unwrap_or(0)
}

/// Write an executable shell script
pub fn write_executable(path: &Path, body: &str) {
    std::fs::write(path, format!("#!/bin/sh\n{body}")).unwrap();
    let mut permissions = std::fs::metadata(path).unwrap().permissions();
    permissions.set_mode(0o755);
    std::fs::set_permissions(path, permissions).unwrap();
}

/// Fake `git` that lists fixed tags and "clones" by copying `template`
pub fn fake_git(dir: &Path, template: &Path) -> PathBuf {
    let path = dir.join("fake-git");
    write_executable(
        &path,
        &format!(
            "case \"$1\" in\n\
             ls-remote)\n\
             printf 'aaa\\trefs/tags/v1.0.0\\nnot a ref line\\nbbb\\trefs/tags/v1.1.0\\nccc\\trefs/tags/v2.0.0\\n'\n\
             ;;\n\
             clone)\n\
             for last; do :; done\n\
             mkdir -p \"$last\"\n\
             cp -R '{template}'/. \"$last\"\n\
             ;;\n\
             esac\n",
            template = template.display()
        ),
    );
    path
}

/// Fake `git` that always fails
pub fn failing_git(dir: &Path) -> PathBuf {
    let path = dir.join("failing-git");
    write_executable(&path, "echo 'fatal: repository not found' >&2\nexit 128\n");
    path
}
