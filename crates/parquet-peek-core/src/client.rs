//! Authenticated S3 client construction.
//!
//! [`connect`] turns a [`CredentialStrategy`] and a [`ClientConfig`] into a
//! verified [`StorageClient`]:
//!
//! 1. Load the AWS SDK configuration for the region, selecting the named
//!    profile when the strategy asks for one. The ambient strategy uses the
//!    SDK's default provider chain (environment, web identity, container or
//!    instance role, ...).
//! 2. Resolve credentials once, so a missing or broken credential source is
//!    reported before any request is made.
//! 3. Probe the store with `ListBuckets` to fail fast on rejected credentials,
//!    a wrong region, or an unreachable endpoint.
//!
//! The SDK's own retries are disabled: a failure is reported as-is, and any
//! retrying is decided by [`crate::fetch::RetryPolicy`].

use std::{fmt, time::Duration};

use async_trait::async_trait;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_credential_types::provider::ProvideCredentials;
use aws_sdk_s3::{Client, config::Region};
use aws_smithy_types::{retry::RetryConfig, timeout::TimeoutConfig};
use bytes::Bytes;
use log::{debug, info};
use snafu::prelude::*;

use crate::{
    error::ErrorKind,
    locator::Locator,
    store::{ObjectSource, StoreFailure},
};

/// Region used when none is configured.
pub const DEFAULT_REGION: &str = "il-central-1";

/// Profile name used by the profile strategy when none is configured.
pub const DEFAULT_PROFILE: &str = "default";

/// Result alias for client construction.
pub type ClientResult<T> = Result<T, ClientError>;

/// How credentials are obtained. Chosen once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialStrategy {
    /// A named profile from the shared AWS config/credentials files.
    Profile {
        /// Profile name.
        name: String,
    },
    /// Credentials supplied implicitly by the execution environment.
    AmbientRole,
}

impl CredentialStrategy {
    /// Profile strategy for `name`.
    pub fn profile(name: impl Into<String>) -> Self {
        CredentialStrategy::Profile { name: name.into() }
    }

    /// Short name of the strategy (`profile` or `role`).
    pub fn mode(&self) -> &'static str {
        match self {
            CredentialStrategy::Profile { .. } => "profile",
            CredentialStrategy::AmbientRole => "role",
        }
    }
}

impl Default for CredentialStrategy {
    fn default() -> Self {
        CredentialStrategy::profile(DEFAULT_PROFILE)
    }
}

impl fmt::Display for CredentialStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialStrategy::Profile { name } => write!(f, "profile '{name}'"),
            CredentialStrategy::AmbientRole => write!(f, "ambient role credentials"),
        }
    }
}

/// Connection settings independent of the credential strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Region the client is bound to.
    pub region: String,
    /// Optional S3-compatible endpoint (e.g. MinIO); enables path-style
    /// addressing.
    pub endpoint_url: Option<String>,
    /// Optional per-operation timeout.
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            endpoint_url: None,
            timeout: None,
        }
    }
}

/// Errors raised while building or verifying a client.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ClientError {
    /// The ambient provider chain produced no credentials.
    #[snafu(display(
        "AWS credentials not found using {strategy}. Please configure your credentials: {reason}"
    ))]
    CredentialsMissing {
        /// Strategy in use.
        strategy: String,
        /// Provider-chain explanation.
        reason: String,
    },

    /// The store rejected the probe, or the named profile is unusable.
    #[snafu(display("Failed to authenticate to S3 in {region} using {strategy}: {reason}"))]
    AuthenticationFailed {
        /// Region the client is bound to.
        region: String,
        /// Strategy in use.
        strategy: String,
        /// Store or provider explanation.
        reason: String,
    },

    /// The probe failed before the store answered.
    #[snafu(display("Failed to connect to S3 in {region}: {reason}"))]
    ConnectivityFailed {
        /// Region the client is bound to.
        region: String,
        /// Transport explanation.
        reason: String,
    },
}

impl ClientError {
    /// Taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::CredentialsMissing { .. } => ErrorKind::CredentialsMissing,
            ClientError::AuthenticationFailed { .. } => ErrorKind::AuthenticationFailed,
            ClientError::ConnectivityFailed { .. } => ErrorKind::ConnectivityFailed,
        }
    }
}

/// An S3 client bound to one region and one credential strategy.
#[derive(Debug, Clone)]
pub struct StorageClient {
    client: Client,
    region: String,
    strategy: CredentialStrategy,
}

impl StorageClient {
    /// Region the client is bound to.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Strategy the client authenticates with.
    pub fn strategy(&self) -> &CredentialStrategy {
        &self.strategy
    }
}

#[async_trait]
impl ObjectSource for StorageClient {
    fn describe(&self) -> String {
        format!("S3 ({}, {})", self.region, self.strategy)
    }

    async fn probe(&self) -> Result<(), StoreFailure> {
        self.client
            .list_buckets()
            .send()
            .await
            .map(|_| ())
            .map_err(|e| StoreFailure::from_sdk(&e))
    }

    async fn get_object(&self, locator: &Locator) -> Result<Bytes, StoreFailure> {
        let response = self
            .client
            .get_object()
            .bucket(locator.container())
            .key(locator.key())
            .send()
            .await
            .map_err(|e| StoreFailure::from_sdk(&e))?;

        if let Some(len) = response.content_length() {
            debug!("{locator}: content-length {len}");
        }

        let body = response
            .body
            .collect()
            .await
            .map_err(|e| StoreFailure::transport(format!("failed to read S3 body: {e}")))?;

        Ok(body.into_bytes())
    }
}

/// Build a client for `strategy`, resolve its credentials, and verify it with
/// a connectivity probe.
///
/// # Errors
///
/// - [`ClientError::CredentialsMissing`] when the ambient strategy finds no
///   credentials.
/// - [`ClientError::AuthenticationFailed`] when the named profile cannot
///   produce credentials or the store rejects the probe.
/// - [`ClientError::ConnectivityFailed`] when the probe gets no answer.
pub async fn connect(
    strategy: &CredentialStrategy,
    config: &ClientConfig,
) -> ClientResult<StorageClient> {
    let sdk_config = load_sdk_config(strategy, config).await;
    resolve_credentials(strategy, config, &sdk_config).await?;

    let client = StorageClient {
        client: build_s3_client(&sdk_config, config),
        region: config.region.clone(),
        strategy: strategy.clone(),
    };

    verify_connectivity(&client, strategy, &config.region).await?;
    info!(
        "Successfully connected to S3 using {} mode ({strategy}, region {})",
        strategy.mode(),
        config.region
    );
    Ok(client)
}

async fn load_sdk_config(strategy: &CredentialStrategy, config: &ClientConfig) -> SdkConfig {
    let mut loader =
        aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));

    if let CredentialStrategy::Profile { name } = strategy {
        loader = loader.profile_name(name);
    }

    loader.load().await
}

async fn resolve_credentials(
    strategy: &CredentialStrategy,
    config: &ClientConfig,
    sdk_config: &SdkConfig,
) -> ClientResult<()> {
    let outcome = match sdk_config.credentials_provider() {
        Some(provider) => provider
            .provide_credentials()
            .await
            .map(|_| ())
            .map_err(|e| aws_sdk_s3::error::DisplayErrorContext(e).to_string()),
        None => Err("no credentials provider is configured".to_string()),
    };

    outcome.map_err(|reason| credential_failure(strategy, &config.region, reason))?;
    debug!("Resolved credentials using {strategy}");
    Ok(())
}

/// Classify a credential resolution failure. Only the ambient strategy
/// reports missing credentials; a named profile that cannot produce
/// credentials is an authentication failure.
fn credential_failure(strategy: &CredentialStrategy, region: &str, reason: String) -> ClientError {
    match strategy {
        CredentialStrategy::AmbientRole => CredentialsMissingSnafu {
            strategy: strategy.to_string(),
            reason,
        }
        .build(),
        CredentialStrategy::Profile { .. } => AuthenticationFailedSnafu {
            region,
            strategy: strategy.to_string(),
            reason,
        }
        .build(),
    }
}

fn build_s3_client(sdk_config: &SdkConfig, config: &ClientConfig) -> Client {
    let mut builder =
        aws_sdk_s3::config::Builder::from(sdk_config).retry_config(RetryConfig::disabled());

    if let Some(endpoint) = &config.endpoint_url {
        builder = builder.endpoint_url(endpoint).force_path_style(true);
    }

    if let Some(timeout) = config.timeout {
        let timeout_config = TimeoutConfig::builder().operation_timeout(timeout).build();
        builder = builder.timeout_config(timeout_config);
    }

    Client::from_conf(builder.build())
}

/// Run the probe and classify its failure.
pub async fn verify_connectivity<S>(
    source: &S,
    strategy: &CredentialStrategy,
    region: &str,
) -> ClientResult<()>
where
    S: ObjectSource + ?Sized,
{
    debug!("Probing {}", source.describe());
    match source.probe().await {
        Ok(()) => Ok(()),
        Err(failure @ StoreFailure::Service { .. }) => AuthenticationFailedSnafu {
            region,
            strategy: strategy.to_string(),
            reason: failure.to_string(),
        }
        .fail(),
        Err(failure) => ConnectivityFailedSnafu {
            region,
            reason: failure.to_string(),
        }
        .fail(),
    }
}
