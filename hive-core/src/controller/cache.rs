//! Restore cache entries
//!
//! A cache entry is the directory `cache_root/<provider>/<source>/<version>`.
//! It counts as restored when it exists, is non-empty and holds exactly one
//! artifact manifest somewhere below it.

use std::path::{Component, Path, PathBuf};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;

use hive_extension_api::ArtifactManifest;

use crate::error::PackageError;
use crate::reference::is_path_segment;

/// Directory of the cache entry `provider_root/<source>/<version>`.
///
/// Both names must be single path segments, so the entry always lies below
/// `provider_root`.
pub(crate) fn entry_dir(
    provider_root: &Path,
    source: &str,
    version: &str,
) -> Result<PathBuf, PackageError> {
    for segment in [source, version] {
        if !is_path_segment(segment) {
            return Err(PackageError::InvalidConfig(format!(
                "'{segment}' cannot be used as a cache directory name"
            )));
        }
    }
    Ok(provider_root.join(source).join(version))
}

/// All artifact manifests below `dir`, in a stable order
pub(crate) fn find_manifests(dir: &Path) -> Result<Vec<PathBuf>, PackageError> {
    let mut manifests = Vec::new();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| PackageError::Io(e.into()))?;
        if entry.file_type().is_file() && ArtifactManifest::is_manifest_file(entry.path()) {
            manifests.push(entry.into_path());
        }
    }

    Ok(manifests)
}

/// The single artifact manifest below `dir`
pub(crate) fn find_manifest(dir: &Path) -> Result<PathBuf, PackageError> {
    let mut manifests = find_manifests(dir)?;
    if manifests.len() != 1 {
        return Err(PackageError::restore(format!(
            "manifest missing or ambiguous in {} ({} found)",
            dir.display(),
            manifests.len()
        )));
    }
    Ok(manifests.remove(0))
}

/// Check whether `dir` is a complete cache entry
pub(crate) fn is_restored(dir: &Path) -> Result<bool, PackageError> {
    if !dir.is_dir() {
        return Ok(false);
    }
    if std::fs::read_dir(dir)?.next().is_none() {
        return Ok(false);
    }
    Ok(find_manifests(dir)?.len() == 1)
}

/// Make room for a fresh restore of `dir`, which must lie below `root`
pub(crate) async fn clear(root: &Path, dir: &Path) -> Result<(), PackageError> {
    if dir == root || !dir.starts_with(root) || !is_normalized(dir) {
        return Err(PackageError::restore(format!(
            "refusing to remove {}: not inside the cache {}",
            dir.display(),
            root.display()
        )));
    }

    if dir.exists() {
        tracing::debug!(dir = %dir.display(), "Clearing incomplete cache entry");
        tokio::fs::remove_dir_all(dir).await?;
    }
    Ok(())
}

/// Remove a cache entry after a failed restore, logging instead of failing
pub(crate) async fn discard(root: &Path, dir: &Path) {
    if let Err(e) = clear(root, dir).await {
        tracing::warn!(dir = %dir.display(), error = %e, "Failed to remove cache entry");
    }
}

fn is_normalized(path: &Path) -> bool {
    !path
        .components()
        .any(|component| matches!(component, Component::ParentDir | Component::CurDir))
}

/// Create a scratch directory removed when the handle is dropped
pub(crate) fn scratch_dir(prefix: &str) -> Result<TempDir, PackageError> {
    Ok(tempfile::Builder::new().prefix(prefix).tempdir()?)
}

/// Copy the contents of `from` into `to`, creating `to`
pub(crate) async fn install(
    from: &Path,
    to: &Path,
    cancel: &CancellationToken,
) -> Result<(), PackageError> {
    let from = from.to_path_buf();
    let to = to.to_path_buf();
    let cancel = cancel.clone();

    tokio::task::spawn_blocking(move || copy_dir(&from, &to, &cancel))
        .await
        .map_err(|e| PackageError::Io(std::io::Error::other(e)))?
}

fn copy_dir(from: &Path, to: &Path, cancel: &CancellationToken) -> Result<(), PackageError> {
    std::fs::create_dir_all(to)?;

    for entry in WalkDir::new(from).min_depth(1) {
        if cancel.is_cancelled() {
            return Err(PackageError::Cancelled);
        }

        let entry = entry.map_err(|e| PackageError::Io(std::io::Error::other(e)))?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(|e| PackageError::Io(std::io::Error::other(e)))?;
        let target = to.join(relative);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &target)?;
        }
    }

    Ok(())
}
