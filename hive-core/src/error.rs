//! Package management error types

use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur while managing packages and extensions
#[derive(Error, Debug)]
pub enum PackageError {
    /// A required configuration key is missing from a package reference
    #[error("The '{key}' parameter is missing in the {provider} package reference")]
    MissingKey { provider: String, key: &'static str },

    /// The provider of a package reference is unknown
    #[error("The provider '{provider}' is not supported")]
    UnsupportedProvider { provider: String },

    /// A configuration value is present but unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A file or directory does not exist
    #[error("Path not found: {path}")]
    PathNotFound { path: PathBuf },

    /// No loaded extension has the requested name
    #[error("Could not find extension '{name}' of capability '{capability}'")]
    ExtensionNotFound { name: String, capability: String },

    /// No package reference has the requested id
    #[error("Package reference '{id}' not found")]
    PackageNotFound { id: Uuid },

    /// An external command exited unsuccessfully
    #[error("{context}. Reason: {stderr}")]
    ExternalTool {
        tool: String,
        context: String,
        stderr: String,
    },

    /// An external command could not be located
    #[error("Required tool '{tool}' is not installed or not on PATH")]
    ToolNotInstalled { tool: String },

    /// A restored package is unusable
    #[error("Restore error: {0}")]
    Restore(String),

    /// The artifact manifest could not be read
    #[error("Manifest error: {0}")]
    Manifest(#[from] hive_extension_api::ExtensionError),

    /// API version mismatch between host and extension
    #[error("API version mismatch: host expects {expected}, extension has {found}")]
    ApiVersionMismatch { expected: u32, found: u32 },

    /// Failed to load a dynamic library
    #[error("Failed to load extension library: {0}")]
    Library(#[from] libloading::Error),

    /// A controller operation was called in the wrong state
    #[error("Cannot {operation} package: controller is {state}")]
    LoadState {
        operation: &'static str,
        state: &'static str,
    },

    /// An extension constructor failed
    #[error("Failed to instantiate extension '{name}': {reason}")]
    Instantiation { name: String, reason: String },

    /// The operation was cancelled
    #[error("Operation cancelled")]
    Cancelled,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Reference document (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification of [`PackageError`]s
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    NotFound,
    ExternalTool,
    Restore,
    LoadState,
    Instantiation,
    Cancelled,
    Io,
}

impl PackageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingKey { .. } | Self::UnsupportedProvider { .. } | Self::InvalidConfig(_) => {
                ErrorKind::Configuration
            }
            Self::PathNotFound { .. }
            | Self::ExtensionNotFound { .. }
            | Self::PackageNotFound { .. } => ErrorKind::NotFound,
            Self::ExternalTool { .. } | Self::ToolNotInstalled { .. } => ErrorKind::ExternalTool,
            Self::Restore(_)
            | Self::Manifest(_)
            | Self::ApiVersionMismatch { .. }
            | Self::Library(_) => ErrorKind::Restore,
            Self::LoadState { .. } => ErrorKind::LoadState,
            Self::Instantiation { .. } => ErrorKind::Instantiation,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Io(_) | Self::Json(_) => ErrorKind::Io,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub(crate) fn restore(message: impl Into<String>) -> Self {
        Self::Restore(message.into())
    }
}
