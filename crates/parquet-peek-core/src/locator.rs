//! Parsing of user-facing object locators.
//!
//! A locator names exactly one object in the store:
//!
//! ```text
//! s3://<container>/<key>
//! ```
//!
//! The key is kept verbatim, including any `/` separators it contains. No
//! percent-decoding or normalization is applied.

use std::fmt;

use snafu::prelude::*;

/// URL scheme prefix accepted by [`Locator::parse`].
pub const SCHEME_PREFIX: &str = "s3://";

/// Errors produced while parsing a locator string.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum LocatorError {
    /// The input does not describe a single object in the store.
    #[snafu(display("Invalid locator '{locator}': {reason}"))]
    InvalidLocator {
        /// The raw input string.
        locator: String,
        /// What was wrong with it.
        reason: &'static str,
    },
}

/// A parsed `(container, key)` pair identifying one remote object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    container: String,
    key: String,
}

impl Locator {
    /// Parse `s3://container/key` into its parts.
    ///
    /// Fails with [`LocatorError::InvalidLocator`] if the scheme prefix is
    /// missing, or if either the container or the key segment is empty.
    pub fn parse(input: &str) -> Result<Self, LocatorError> {
        let rest = input.strip_prefix(SCHEME_PREFIX).context(InvalidLocatorSnafu {
            locator: input,
            reason: "must start with 's3://'",
        })?;

        let (container, key) = rest.split_once('/').unwrap_or((rest, ""));

        ensure!(
            !container.is_empty(),
            InvalidLocatorSnafu {
                locator: input,
                reason: "bucket name is empty; expected s3://bucket/key",
            }
        );
        ensure!(
            !key.is_empty(),
            InvalidLocatorSnafu {
                locator: input,
                reason: "object key is empty; expected s3://bucket/key",
            }
        );

        Ok(Self {
            container: container.to_string(),
            key: key.to_string(),
        })
    }

    /// The bucket holding the object.
    pub fn container(&self) -> &str {
        &self.container
    }

    /// The object key within the container.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SCHEME_PREFIX}{}/{}", self.container, self.key)
    }
}
