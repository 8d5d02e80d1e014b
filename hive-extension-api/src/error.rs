//! Error types for extension authors

use thiserror::Error;

/// Errors raised by extension code or while reading extension artifacts
#[derive(Error, Debug)]
pub enum ExtensionError {
    /// The artifact manifest could not be parsed
    #[error("Manifest error: {0}")]
    Manifest(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A constructor reported a failure
    #[error("Construction of '{name}' failed: {reason}")]
    Construction { name: String, reason: String },

    /// The type does not implement the requested capability
    #[error("Type '{name}' does not provide capability '{capability}'")]
    CapabilityMismatch { name: String, capability: String },

    /// The type provides the capability but cannot be built without arguments
    #[error("Type '{name}' has no parameterless constructor")]
    NoDefaultConstructor { name: String },

    /// Custom error with message
    #[error("{0}")]
    Custom(String),
}

impl ExtensionError {
    /// Create a custom error with a message
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }

    /// Create a manifest error
    pub fn manifest(message: impl Into<String>) -> Self {
        Self::Manifest(message.into())
    }
}
