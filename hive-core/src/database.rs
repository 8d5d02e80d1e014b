//! Storage of the package reference document

use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::PackageError;

/// Reads and replaces the serialized reference document as a whole
#[async_trait]
pub trait ReferenceDatabase: Send + Sync {
    /// The stored document, or `None` if nothing was stored yet
    async fn try_read(&self) -> Result<Option<String>, PackageError>;

    /// Replace the stored document
    async fn write(&self, content: &str) -> Result<(), PackageError>;
}

/// Stores the document in a single file.
///
/// Writes go to a temporary file in the same directory that is then renamed
/// over the document, so readers never observe a partial document.
#[derive(Debug, Clone)]
pub struct FileReferenceDatabase {
    path: PathBuf,
}

impl FileReferenceDatabase {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Database at the default location in the user's config directory
    pub fn default_location() -> Self {
        Self::new(hive_paths::references_file())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ReferenceDatabase for FileReferenceDatabase {
    async fn try_read(&self) -> Result<Option<String>, PackageError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(None),
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, content: &str) -> Result<(), PackageError> {
        let path = self.path.clone();
        let content = content.to_string();

        tokio::task::spawn_blocking(move || write_atomic(&path, &content))
            .await
            .map_err(|e| PackageError::Io(std::io::Error::other(e)))?
    }
}

fn write_atomic(path: &Path, content: &str) -> Result<(), PackageError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(content.as_bytes())?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| PackageError::Io(e.error))?;

    tracing::debug!(path = %path.display(), "Reference document written");
    Ok(())
}
