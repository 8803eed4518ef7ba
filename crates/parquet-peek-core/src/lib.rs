//! Core pipeline for previewing a single Parquet object stored in S3.
//!
//! The crate is organized leaves-first:
//!
//! - [`locator`] parses `s3://bucket/key` strings.
//! - [`client`] builds an authenticated, probed S3 client from a
//!   [`CredentialStrategy`] (named profile or ambient role).
//! - [`store`] defines the [`ObjectSource`] seam between the pipeline and the
//!   store.
//! - [`fetch`] reads a whole object and maps store failures into a typed
//!   taxonomy.
//! - [`decode`] turns Parquet bytes into a [`Table`], regardless of origin.
//! - [`summary`] derives counts, a memory estimate and a bounded preview.
//! - [`inspect`] chains the stages.
//!
//! Everything happens in memory for a single object: there is no streaming,
//! no caching and no write path.
#![deny(missing_docs)]

pub mod client;
pub mod decode;
pub mod error;
pub mod fetch;
pub mod inspect;
pub mod locator;
pub mod store;
pub mod summary;
pub mod table;

pub use client::{ClientConfig, ClientError, CredentialStrategy, StorageClient, connect};
pub use decode::{DecodeError, decode_parquet};
pub use error::{ErrorKind, PeekError, PeekResult};
pub use fetch::{FetchError, RawObject, RetryPolicy, fetch_object};
pub use inspect::{InspectOptions, Inspection, inspect};
pub use locator::{Locator, LocatorError};
pub use store::{ObjectSource, StoreFailure};
pub use summary::{ColumnSummary, Preview, PreviewRow, Summary};
pub use table::{Column, ColumnType, Table, Value};
