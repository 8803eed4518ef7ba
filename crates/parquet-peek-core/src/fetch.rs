//! Full-object retrieval with a typed error taxonomy.
//!
//! Each attempt performs exactly one complete read of the object; there are
//! no range reads. Store failures are mapped into [`FetchError`]. Only
//! [`FetchError::Transport`] is ever retried, and only when the
//! [`RetryPolicy`] allows it (the default allows no retries).

use std::time::Duration;

use bytes::Bytes;
use log::{debug, warn};
use snafu::prelude::*;

use crate::{
    error::ErrorKind,
    locator::Locator,
    store::{ObjectSource, StoreFailure},
};

/// Result alias for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// The payload of one object, held fully in memory until decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawObject {
    bytes: Bytes,
    size: u64,
}

impl RawObject {
    /// Wrap a fetched payload.
    pub fn new(bytes: Bytes) -> Self {
        let size = bytes.len() as u64;
        Self { bytes, size }
    }

    /// Payload size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Borrow the payload.
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Take the payload.
    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

/// Errors raised while reading an object.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum FetchError {
    /// The key does not exist in the container.
    #[snafu(display("Parquet file not found: s3://{container}/{key}"))]
    ObjectNotFound {
        /// Container name.
        container: String,
        /// Object key.
        key: String,
    },

    /// The container does not exist.
    #[snafu(display("S3 bucket not found: {container}"))]
    ContainerNotFound {
        /// Container name.
        container: String,
    },

    /// The caller is not authorized to read the object.
    #[snafu(display("Access denied to s3://{container}/{key}. Check your permissions."))]
    AccessDenied {
        /// Container name.
        container: String,
        /// Object key.
        key: String,
    },

    /// Any other failure reported by the store.
    #[snafu(display("S3 error reading s3://{container}/{key}: {failure}"))]
    Storage {
        /// Container name.
        container: String,
        /// Object key.
        key: String,
        /// What the store reported.
        failure: StoreFailure,
    },

    /// No store response was obtained.
    #[snafu(display(
        "Network failure reading s3://{container}/{key} after {attempts} attempt(s): {message}"
    ))]
    Transport {
        /// Container name.
        container: String,
        /// Object key.
        key: String,
        /// Description of the failure.
        message: String,
        /// Number of attempts made.
        attempts: u32,
    },
}

impl FetchError {
    /// Taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::ObjectNotFound { .. } => ErrorKind::ObjectNotFound,
            FetchError::ContainerNotFound { .. } => ErrorKind::ContainerNotFound,
            FetchError::AccessDenied { .. } => ErrorKind::AccessDenied,
            FetchError::Storage { .. } => ErrorKind::StorageError,
            FetchError::Transport { .. } => ErrorKind::TransportError,
        }
    }

    /// Build an error from a store failure observed while reading `locator`.
    pub fn from_store_failure(failure: StoreFailure, locator: &Locator) -> Self {
        let container = locator.container().to_string();
        let key = locator.key().to_string();

        let kind = match &failure {
            StoreFailure::Transport { .. } => ErrorKind::TransportError,
            StoreFailure::Request { .. } => ErrorKind::StorageError,
            StoreFailure::Service { status, code, .. } => match (code.as_deref(), *status) {
                (Some("NoSuchKey" | "NotFound"), _) | (None, Some(404)) => ErrorKind::ObjectNotFound,
                (Some("NoSuchBucket"), _) => ErrorKind::ContainerNotFound,
                (Some("AccessDenied" | "AllAccessDisabled"), _) | (None, Some(403)) => {
                    ErrorKind::AccessDenied
                }
                _ => ErrorKind::StorageError,
            },
        };

        match kind {
            ErrorKind::ObjectNotFound => FetchError::ObjectNotFound { container, key },
            ErrorKind::ContainerNotFound => FetchError::ContainerNotFound { container },
            ErrorKind::AccessDenied => FetchError::AccessDenied { container, key },
            ErrorKind::TransportError => FetchError::Transport {
                container,
                key,
                message: match failure {
                    StoreFailure::Transport { message } => message,
                    other => other.to_string(),
                },
                attempts: 1,
            },
            _ => FetchError::Storage {
                container,
                key,
                failure,
            },
        }
    }
}

/// Bounded exponential backoff for transport failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Zero disables retrying.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Policy allowing `max_retries` retries with default delays.
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (zero-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Read the whole object named by `locator`.
///
/// # Errors
///
/// Returns the classified [`FetchError`] for the first non-retryable failure,
/// or the last transport failure once retries are exhausted.
pub async fn fetch_object<S>(
    source: &S,
    locator: &Locator,
    retry: &RetryPolicy,
) -> FetchResult<RawObject>
where
    S: ObjectSource + ?Sized,
{
    let mut attempt: u32 = 0;
    loop {
        debug!(
            "GET {locator} via {} (attempt {})",
            source.describe(),
            attempt + 1
        );

        let failure = match source.get_object(locator).await {
            Ok(bytes) => return Ok(RawObject::new(bytes)),
            Err(failure) => failure,
        };

        let mut err = FetchError::from_store_failure(failure, locator);
        if let FetchError::Transport { attempts, .. } = &mut err {
            *attempts = attempt + 1;
        }

        if err.kind() != ErrorKind::TransportError || attempt >= retry.max_retries {
            return Err(err);
        }

        let delay = retry.backoff(attempt);
        warn!(
            "Transient failure reading {locator}, retrying in {}ms: {err}",
            delay.as_millis()
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
