//! Error types for reading and validating daemon configuration.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure to read a configuration file.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The file could not be opened or read.
    #[error("failed to read motion configuration at {}: {source}", path.display())]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// The first rule a configuration violates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid motion configuration key '{key}': {reason}")]
pub struct ValidationError {
    key: &'static str,
    reason: &'static str,
}

impl ValidationError {
    pub(crate) const fn new(key: &'static str, reason: &'static str) -> Self {
        Self { key, reason }
    }

    /// Key that failed validation.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        self.key
    }

    /// Why the key was rejected.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        self.reason
    }
}

/// Errors produced by [`crate::load`].
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be read.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// The file was read but violates a required-key rule.
    #[error("{}: {source}", path.display())]
    Invalid {
        /// Path of the rejected file.
        path: PathBuf,
        /// The violated rule.
        #[source]
        source: ValidationError,
    },
}

impl LoadError {
    /// Returns the validation failure, if this is one.
    #[must_use]
    pub const fn validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Invalid { source, .. } => Some(source),
            Self::Parse(_) => None,
        }
    }
}
