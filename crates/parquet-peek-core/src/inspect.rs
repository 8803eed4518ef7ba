//! The fetch → decode → summarize pipeline.
//!
//! Stages run strictly one after the other: the object is fully buffered
//! before decoding starts, and the decoded table is summarized only once
//! decoding has finished. The first failing stage ends the run.
//!
//! Decoding and summarizing are CPU-bound and run on Tokio's blocking pool,
//! so a caller racing [`inspect`] against an interrupt can still observe the
//! interrupt while a large file is being decoded. Dropping the future
//! abandons the blocking work's result.

use bytes::Bytes;
use log::info;
use snafu::prelude::*;

use crate::{
    decode::{CorruptSnafu, DecodeResult, decode_parquet},
    error::{DecodeSnafu, PeekResult},
    fetch::{RetryPolicy, fetch_object},
    locator::Locator,
    store::ObjectSource,
    summary::{self, DEFAULT_SHOW_ROWS, MAX_CELL_WIDTH, Preview, Summary},
    table::Table,
};

/// Knobs for one inspection run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectOptions {
    /// Number of leading rows to render.
    pub show_rows: usize,
    /// Maximum rendered width of a cell.
    pub max_cell_width: usize,
    /// Retry policy for transport failures during the fetch.
    pub retry: RetryPolicy,
}

impl Default for InspectOptions {
    fn default() -> Self {
        Self {
            show_rows: DEFAULT_SHOW_ROWS,
            max_cell_width: MAX_CELL_WIDTH,
            retry: RetryPolicy::default(),
        }
    }
}

/// Everything the report needs about one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inspection {
    /// The object that was inspected.
    pub locator: Locator,
    /// Size of the fetched payload in bytes.
    pub object_size: u64,
    /// Shape, memory estimate and column statistics.
    pub summary: Summary,
    /// Leading rows.
    pub preview: Preview,
}

/// Summary and preview of an already decoded table.
pub fn describe_table(table: &Table, options: &InspectOptions) -> (Summary, Preview) {
    let summary = summary::summarize(table);
    let preview = summary::preview_with_width(table, options.show_rows, options.max_cell_width);
    (summary, preview)
}

/// Decode `bytes` and describe the result, independent of where the bytes
/// came from.
pub fn describe_bytes(bytes: Bytes, options: &InspectOptions) -> DecodeResult<(Summary, Preview)> {
    let table = decode_parquet(bytes)?;
    Ok(describe_table(&table, options))
}

/// Fetch the object named by `locator` from `source`, decode it, and build
/// its summary and preview.
///
/// # Errors
///
/// Returns the first [`crate::PeekError`] raised by the fetch or decode stage.
pub async fn inspect<S>(
    source: &S,
    locator: &Locator,
    options: &InspectOptions,
) -> PeekResult<Inspection>
where
    S: ObjectSource + ?Sized,
{
    info!("Reading parquet file from {locator}");
    let raw = fetch_object(source, locator, &options.retry).await?;
    let object_size = raw.size();

    let bytes = raw.into_bytes();
    let work_options = options.clone();
    let described = tokio::task::spawn_blocking(move || describe_bytes(bytes, &work_options))
        .await
        .unwrap_or_else(|join_err| {
            CorruptSnafu {
                reason: join_err.to_string(),
            }
            .fail()
        });
    let (summary, preview) = described.context(DecodeSnafu {
        locator: locator.to_string(),
    })?;
    info!(
        "Successfully read parquet file with {} rows and {} columns",
        summary.row_count, summary.column_count
    );

    Ok(Inspection {
        locator: locator.clone(),
        object_size,
        summary,
        preview,
    })
}
