use thiserror::Error;

use crate::error::ErrorKind;

/// Errors raised while talking to the daemon's webcontrol interface.
#[derive(Debug, Error)]
pub enum WebControlError {
    /// A key or value used characters outside `[A-Za-z0-9_.-]`.
    #[error("'{token}' contains characters outside [A-Za-z0-9_.-]")]
    InvalidToken {
        /// Offending token.
        token: String,
    },
    /// The key is read-only.
    #[error("key '{key}' cannot be changed at runtime")]
    NotSettable {
        /// Rejected key.
        key: String,
    },
    /// The webcontrol base address could not be formed.
    #[error("invalid webcontrol address: {source}")]
    Address {
        /// Underlying URL error.
        #[source]
        source: url::ParseError,
    },
    /// The HTTP client could not be constructed.
    #[error("failed to build webcontrol HTTP client: {source}")]
    Client {
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },
    /// The request failed before a response was read.
    #[error("webcontrol request to {url} failed: {source}")]
    Request {
        /// Requested URL.
        url: String,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },
    /// The daemon answered with a non-success status.
    #[error("webcontrol request to {url} returned HTTP {status}")]
    Status {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },
    /// The daemon did not echo the update back.
    #[error("webcontrol did not confirm setting '{key}' to '{value}'")]
    Rejected {
        /// Key being set.
        key: String,
        /// Value being set.
        value: String,
    },
    /// The daemon did not report the key.
    #[error("webcontrol did not report key '{key}'")]
    NotFound {
        /// Queried key.
        key: String,
    },
    /// The key was reported with a value of the wrong type.
    #[error("webcontrol reported unexpected value '{value}' for '{key}'")]
    UnexpectedValue {
        /// Queried key.
        key: String,
        /// Reported value in its native form.
        value: String,
    },
}

impl WebControlError {
    /// Classifies the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidToken { .. } => ErrorKind::InvalidInput,
            Self::NotSettable { .. } => ErrorKind::Permission,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Address { .. } => ErrorKind::Config,
            Self::Client { .. }
            | Self::Request { .. }
            | Self::Status { .. }
            | Self::Rejected { .. }
            | Self::UnexpectedValue { .. } => ErrorKind::Remote,
        }
    }
}
