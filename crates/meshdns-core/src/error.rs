//! Error types for the mesh DNS sync
//!
//! This module defines all error types used throughout the workspace.

use std::fmt;
use thiserror::Error;

/// Result type alias for mesh DNS operations
pub type Result<T> = std::result::Result<T, Error>;

/// The provider call that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderOperation {
    /// Listing the records of a zone
    List,
    /// Creating a record
    Create,
    /// Updating an existing record
    Update,
    /// Deleting a record
    Delete,
}

impl fmt::Display for ProviderOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderOperation::List => "list",
            ProviderOperation::Create => "create",
            ProviderOperation::Update => "update",
            ProviderOperation::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Core error type for the mesh DNS sync
#[derive(Error, Debug)]
pub enum Error {
    /// The mesh device directory could not be read
    #[error("Device directory unavailable: {0}")]
    DirectoryUnavailable(String),

    /// A DNS provider call failed
    #[error("Provider {provider} failed to {operation} {name}: {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Which call failed
        operation: ProviderOperation,
        /// Record name (or zone name for listings)
        name: String,
        /// Underlying cause
        message: String,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The run did not finish within its time budget
    #[error("Sync run timed out after {0} seconds")]
    Timeout(u64),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a directory error
    pub fn directory(msg: impl Into<String>) -> Self {
        Self::DirectoryUnavailable(msg.into())
    }

    /// Create a provider error for a single call
    pub fn provider(
        provider: impl Into<String>,
        operation: ProviderOperation,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Provider {
            provider: provider.into(),
            operation,
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether this error aborts a whole run rather than a single operation
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::DirectoryUnavailable(_) | Error::Config(_) | Error::Timeout(_) => true,
            Error::Provider { operation, .. } => *operation == ProviderOperation::List,
            _ => false,
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
