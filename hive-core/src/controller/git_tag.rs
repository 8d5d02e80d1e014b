//! `git-tag` provider: tags of a git repository

use std::path::{Path, PathBuf};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::cache;
use crate::builder::BuildRequest;
use crate::environment::PackageEnvironment;
use crate::error::PackageError;
use crate::process::run_tool;
use crate::reference::{ENTRYPOINT_KEY, PackageReference, REPOSITORY_KEY, TAG_KEY};

const REFS_PREFIX: &str = "refs/tags/";

/// Tags of the repository, newest first
pub(super) async fn list_versions(
    reference: &PackageReference,
    environment: &PackageEnvironment,
    cancel: &CancellationToken,
) -> Result<Vec<String>, PackageError> {
    let repository = require_repository(reference)?;

    let mut command = Command::new(&environment.git_program);
    command
        .args(["ls-remote", "--tags", "--sort=v:refname", "--refs", "--"])
        .arg(repository);

    let stdout = run_tool(
        command,
        || {
            format!(
                "Unable to find tags for repository {}",
                strip_credentials(repository)
            )
        },
        cancel,
    )
    .await?;

    let mut tags = parse_tag_refs(&stdout);
    tags.reverse();
    Ok(tags)
}

/// The repository URL; values git would parse as options are rejected
fn require_repository(reference: &PackageReference) -> Result<&str, PackageError> {
    let repository = reference.require(REPOSITORY_KEY)?;
    if repository.starts_with('-') {
        return Err(PackageError::InvalidConfig(format!(
            "The '{REPOSITORY_KEY}' parameter must not start with '-', got '{}'",
            strip_credentials(repository)
        )));
    }
    Ok(repository)
}

/// Extract tag names from `git ls-remote` output, keeping their order
pub(crate) fn parse_tag_refs(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let tag = line
                .split('\t')
                .nth(1)
                .and_then(|reference| reference.trim_end().strip_prefix(REFS_PREFIX))
                .filter(|tag| !tag.is_empty());

            if tag.is_none() {
                tracing::warn!(line = %line, "Unable to extract tag from ref");
            }
            tag.map(str::to_string)
        })
        .collect()
}

/// Remove user name and password from a repository URL.
///
/// Inputs that don't parse as URLs (scp-style remotes, plain paths) are
/// returned unchanged.
pub fn strip_credentials(repository: &str) -> String {
    match Url::parse(repository) {
        Ok(mut url) => {
            // Only fails for URLs that cannot carry credentials anyway
            let _ = url.set_username("");
            let _ = url.set_password(None);
            url.to_string()
        }
        Err(_) => repository.to_string(),
    }
}

/// Cache directory name of a repository
pub(crate) fn source_key(repository: &str) -> String {
    strip_credentials(repository)
        .replace("://", "_")
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Clone `tag`, build it and copy the result into
/// `cache_root/<repository>/<tag>` unless already restored
pub(super) async fn restore(
    reference: &PackageReference,
    environment: &PackageEnvironment,
    cache_root: &Path,
    cancel: &CancellationToken,
) -> Result<PathBuf, PackageError> {
    let repository = require_repository(reference)?;
    let tag = reference.require_segment(TAG_KEY)?;
    let entrypoint = reference.require(ENTRYPOINT_KEY)?;

    let target_dir = cache::entry_dir(cache_root, &source_key(repository), tag)?;

    if cache::is_restored(&target_dir)? {
        tracing::debug!(dir = %target_dir.display(), "Package is already restored");
        return Ok(target_dir);
    }

    cache::clear(cache_root, &target_dir).await?;

    let origin = strip_credentials(repository);
    let clone = cache::scratch_dir("hive-clone-")?;
    let output = cache::scratch_dir("hive-build-")?;

    let result = async {
        let mut command = Command::new(&environment.git_program);
        command
            .args(["clone", "--depth", "1", "--branch", tag, "--recurse-submodules", "--"])
            .arg(repository)
            .arg(clone.path());

        tracing::debug!(repository = %origin, tag = %tag, "Cloning repository");
        run_tool(
            command,
            || format!("Unable to clone repository {origin}"),
            cancel,
        )
        .await?;

        environment
            .builder
            .build(
                BuildRequest {
                    source_dir: clone.path(),
                    entrypoint: &clone.path().join(entrypoint),
                    output_dir: output.path(),
                    origin: &origin,
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
