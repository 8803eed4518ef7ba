//! Unified error type for the inspection pipeline.
//!
//! Every stage has its own error enum; [`PeekError`] folds them together so a
//! caller can report any failure through one type and branch on its
//! [`ErrorKind`]. The first error encountered ends the pipeline.

use std::fmt;

use snafu::prelude::*;

use crate::{client::ClientError, decode::DecodeError, fetch::FetchError, locator::LocatorError};

/// Result alias for the full pipeline.
pub type PeekResult<T> = Result<T, PeekError>;

/// The failure taxonomy. Every kind is fatal to an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The locator string is malformed.
    InvalidLocator,
    /// No credentials could be discovered from the environment.
    CredentialsMissing,
    /// The store rejected the credentials, or the profile is unusable.
    AuthenticationFailed,
    /// The connectivity probe failed before the store answered.
    ConnectivityFailed,
    /// The object key does not exist.
    ObjectNotFound,
    /// The container does not exist.
    ContainerNotFound,
    /// Reading the object is not authorized.
    AccessDenied,
    /// Any other store-reported failure.
    StorageError,
    /// A read failed before the store answered.
    TransportError,
    /// The payload is not a valid columnar file.
    DecodeError,
}

impl ErrorKind {
    /// Name of the kind as used in diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidLocator => "InvalidLocator",
            ErrorKind::CredentialsMissing => "CredentialsMissing",
            ErrorKind::AuthenticationFailed => "AuthenticationFailed",
            ErrorKind::ConnectivityFailed => "ConnectivityFailed",
            ErrorKind::ObjectNotFound => "ObjectNotFound",
            ErrorKind::ContainerNotFound => "ContainerNotFound",
            ErrorKind::AccessDenied => "AccessDenied",
            ErrorKind::StorageError => "StorageError",
            ErrorKind::TransportError => "TransportError",
            ErrorKind::DecodeError => "DecodeError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Any failure of the inspection pipeline.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum PeekError {
    /// Locator parsing failed.
    #[snafu(context(false), display("{source}"))]
    Locator {
        /// Underlying parse error.
        source: LocatorError,
    },

    /// Client construction or the connectivity probe failed.
    #[snafu(context(false), display("{source}"))]
    Client {
        /// Underlying client error.
        source: ClientError,
    },

    /// Reading the object failed.
    #[snafu(context(false), display("{source}"))]
    Fetch {
        /// Underlying fetch error.
        source: FetchError,
    },

    /// The fetched payload could not be decoded.
    #[snafu(display("Error reading parquet file {locator}: {source}"))]
    Decode {
        /// The object that was being decoded.
        locator: String,
        /// Underlying decode error.
        source: DecodeError,
    },
}

impl PeekError {
    /// Taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PeekError::Locator { .. } => ErrorKind::InvalidLocator,
            PeekError::Client { source } => source.kind(),
            PeekError::Fetch { source } => source.kind(),
            PeekError::Decode { .. } => ErrorKind::DecodeError,
        }
    }
}
