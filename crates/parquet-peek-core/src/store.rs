//! The object store seam.
//!
//! [`ObjectSource`] is the narrow interface the pipeline needs from a store:
//! a cheap connectivity probe and a full-object read. The S3 implementation
//! lives in [`crate::client`]; tests substitute in-memory sources.
//!
//! Implementations report failures as a [`StoreFailure`], a store-neutral
//! description of what went wrong. Classification into the typed error
//! taxonomy happens in [`crate::client`] (probe) and [`crate::fetch`] (read).

use std::fmt;

use async_trait::async_trait;
use aws_sdk_s3::{
    config::http::HttpResponse,
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
};
use bytes::Bytes;

use crate::locator::Locator;

/// A store-level failure, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreFailure {
    /// The store answered with an error response.
    Service {
        /// HTTP status of the response, when known.
        status: Option<u16>,
        /// Store error code such as `NoSuchKey`.
        code: Option<String>,
        /// Store-provided message.
        message: String,
    },
    /// The request could not be built or signed; nothing was sent.
    Request {
        /// Description of the failure.
        message: String,
    },
    /// No response was obtained (timeout, connection failure, broken body).
    Transport {
        /// Description of the failure.
        message: String,
    },
}

impl StoreFailure {
    /// Convenience constructor for a service response.
    pub fn service(status: u16, code: Option<&str>, message: impl Into<String>) -> Self {
        StoreFailure::Service {
            status: Some(status),
            code: code.map(str::to_string),
            message: message.into(),
        }
    }

    /// Convenience constructor for a transport failure.
    pub fn transport(message: impl Into<String>) -> Self {
        StoreFailure::Transport {
            message: message.into(),
        }
    }

    /// Describe an AWS SDK error without losing the status code or the
    /// store's error code.
    pub fn from_sdk<E>(err: &SdkError<E, HttpResponse>) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error + 'static,
    {
        match err {
            SdkError::ServiceError(service) => {
                let inner = service.err();
                StoreFailure::Service {
                    status: Some(service.raw().status().as_u16()),
                    code: inner.code().map(str::to_string),
                    message: inner
                        .message()
                        .map(str::to_string)
                        .unwrap_or_else(|| DisplayErrorContext(err).to_string()),
                }
            }
            SdkError::ResponseError(response) => StoreFailure::Service {
                status: Some(response.raw().status().as_u16()),
                code: None,
                message: DisplayErrorContext(err).to_string(),
            },
            SdkError::ConstructionFailure(_) => StoreFailure::Request {
                message: DisplayErrorContext(err).to_string(),
            },
            _ => StoreFailure::Transport {
                message: DisplayErrorContext(err).to_string(),
            },
        }
    }
}

impl fmt::Display for StoreFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreFailure::Service {
                status,
                code,
                message,
            } => {
                match (status, code) {
                    (Some(s), Some(c)) => write!(f, "{c} (HTTP {s})")?,
                    (Some(s), None) => write!(f, "HTTP {s}")?,
                    (None, Some(c)) => write!(f, "{c}")?,
                    (None, None) => write!(f, "service error")?,
                }
                if !message.is_empty() {
                    write!(f, ": {message}")?;
                }
                Ok(())
            }
            StoreFailure::Request { message } => write!(f, "request not sent: {message}"),
            StoreFailure::Transport { message } => write!(f, "transport failure: {message}"),
        }
    }
}

/// A store that can serve whole objects.
#[async_trait]
pub trait ObjectSource: Send + Sync {
    /// Short description used in diagnostics (e.g. region and credentials).
    fn describe(&self) -> String;

    /// Minimal authenticated round trip used to fail fast before any data
    /// transfer.
    async fn probe(&self) -> Result<(), StoreFailure>;

    /// Read the complete payload of the object named by `locator`.
    async fn get_object(&self, locator: &Locator) -> Result<Bytes, StoreFailure>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_code_and_status() {
        let f = StoreFailure::service(404, Some("NoSuchKey"), "The specified key does not exist.");
        assert_eq!(
            f.to_string(),
            "NoSuchKey (HTTP 404): The specified key does not exist."
        );

        let f = StoreFailure::service(403, None, "");
        assert_eq!(f.to_string(), "HTTP 403");

        let f = StoreFailure::transport("connection reset");
        assert_eq!(f.to_string(), "transport failure: connection reset");
    }
}
