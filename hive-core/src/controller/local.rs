//! `local` provider: versioned source trees below a directory
//!
//! ```text
//! <path>/
//!   v0.1.0/<entrypoint>
//!   v0.2.0/<entrypoint>
//! ```

use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::cache;
use crate::builder::BuildRequest;
use crate::environment::PackageEnvironment;
use crate::error::PackageError;
use crate::reference::{ENTRYPOINT_KEY, PATH_KEY, PackageReference, VERSION_KEY};

/// Version subdirectories of `path`, newest (lexicographically greatest) first
pub(super) async fn list_versions(
    reference: &PackageReference,
    cancel: &CancellationToken,
) -> Result<Vec<String>, PackageError> {
    let path = Path::new(reference.require(PATH_KEY)?);

    if !path.is_dir() {
        return Err(PackageError::PathNotFound {
            path: path.to_path_buf(),
        });
    }

    let mut versions = Vec::new();
    let mut entries = tokio::fs::read_dir(path).await?;

    while let Some(entry) = entries.next_entry().await? {
        if cancel.is_cancelled() {
            return Err(PackageError::Cancelled);
        }

        if !entry.file_type().await?.is_dir() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        tracing::debug!(version = %name, "Found package version");
        versions.push(name);
    }

    versions.sort_unstable_by(|a, b| b.cmp(a));
    Ok(versions)
}

/// Stable cache key of a local package root
pub(crate) fn source_key(path: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, path.as_bytes())
}

/// Build `path/version` into `cache_root/<key>/<version>` unless restored
pub(super) async fn restore(
    reference: &PackageReference,
    environment: &PackageEnvironment,
    cache_root: &Path,
    cancel: &CancellationToken,
) -> Result<PathBuf, PackageError> {
    let path = reference.require(PATH_KEY)?;
    let version = reference.require_segment(VERSION_KEY)?;
    let entrypoint = reference.require(ENTRYPOINT_KEY)?;

    let source_dir = Path::new(path).join(version);
    if !source_dir.is_dir() {
        return Err(PackageError::PathNotFound { path: source_dir });
    }

    let target_dir = cache::entry_dir(cache_root, &source_key(path).to_string(), version)?;

    if cache::is_restored(&target_dir)? {
        tracing::debug!(dir = %target_dir.display(), "Package is already restored");
        return Ok(target_dir);
    }

    cache::clear(cache_root, &target_dir).await?;

    let output = cache::scratch_dir("hive-build-")?;
    let result = async {
        environment
            .builder
            .build(
                BuildRequest {
                    source_dir: &source_dir,
                    entrypoint: &source_dir.join(entrypoint),
                    output_dir: output.path(),
                    origin: path,
                },
                cancel,
            )
            .await?;

        cache::install(output.path(), &target_dir, cancel).await
    }
    .await;

    if let Err(e) = result {
        cache::discard(cache_root, &target_dir).await;
        return Err(e);
    }

    Ok(target_dir)
}
