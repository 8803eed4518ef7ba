//! Parquet decoding into the in-memory [`Table`] model.
//!
//! The decoder is storage-agnostic: it takes the complete file as an
//! in-memory [`Bytes`] buffer, whatever its origin (S3, local file, test
//! fixture). Parquet keeps its metadata in a footer at the end of the file,
//! so the whole payload must be available before decoding starts.
//!
//! Values are converted according to the Arrow type declared by the file
//! schema; nothing is re-inferred from content. Dictionary-encoded columns
//! are unpacked to their value type. Types without a dedicated [`Value`]
//! variant (dates, decimals, nested types, ...) are kept in their canonical
//! text form as [`Value::Other`].

use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
};

use arrow::{
    array::{Array, ArrayRef, AsArray, RecordBatch},
    datatypes::{
        ArrowPrimitiveType, DataType, Float16Type, Float32Type, Float64Type, Int8Type,
        Int16Type, Int32Type, Int64Type, TimeUnit, TimestampMicrosecondType,
        TimestampMillisecondType, TimestampNanosecondType, TimestampSecondType, UInt8Type,
        UInt16Type, UInt32Type, UInt64Type,
    },
    error::ArrowError,
    util::display::{ArrayFormatter, FormatOptions},
};
use bytes::Bytes;
use log::debug;
use parquet::{arrow::arrow_reader::ParquetRecordBatchReaderBuilder, errors::ParquetError};
use snafu::{Backtrace, prelude::*};

use crate::table::{Column, ColumnType, Table, TableError, TimestampUnit, Value};

/// Result alias for decoding.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Errors raised while turning bytes into a [`Table`].
///
/// A failed decode never yields a partially populated table.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DecodeError {
    /// The footer or schema could not be read (bad magic, truncated file,
    /// corrupt metadata, or a schema the Arrow reader cannot map).
    #[snafu(display("Not a readable Parquet file: {source}"))]
    Open {
        /// Underlying Parquet error.
        source: ParquetError,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },

    /// Column data could not be decoded into a record batch.
    #[snafu(display("Failed to decode record batch: {source}"))]
    ReadBatch {
        /// Underlying Arrow error.
        source: ArrowError,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },

    /// A column could not be converted into cell values.
    #[snafu(display("Cannot decode column '{column}' of type {data_type}: {reason}"))]
    UnsupportedColumn {
        /// Column name.
        column: String,
        /// Declared Arrow type.
        data_type: String,
        /// Why conversion failed.
        reason: String,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },

    /// The reader gave up on malformed content (corrupt pages, encodings or
    /// metadata) without producing a regular error.
    #[snafu(display("Corrupt Parquet data: {reason}"))]
    Corrupt {
        /// What the reader reported.
        reason: String,
    },

    /// Decoded columns disagree on row count.
    #[snafu(display("Decoded columns are inconsistent: {source}"))]
    Shape {
        /// Underlying shape error.
        source: TableError,
    },
}

impl DecodeError {
    /// Human-readable description of why decoding failed.
    pub fn reason(&self) -> String {
        self.to_string()
    }
}

/// Decode a complete Parquet file held in memory.
///
/// # Errors
///
/// Returns [`DecodeError`] if `bytes` is not a valid Parquet file, is
/// truncated, or contains data the reader cannot convert. Reader panics on
/// corrupt content are caught and reported as [`DecodeError::Corrupt`].
pub fn decode_parquet(bytes: Bytes) -> DecodeResult<Table> {
    panic::catch_unwind(AssertUnwindSafe(|| read_table(bytes))).unwrap_or_else(|payload| {
        CorruptSnafu {
            reason: panic_reason(payload.as_ref()),
        }
        .fail()
    })
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "reader aborted on malformed input".to_string()
    }
}

fn read_table(bytes: Bytes) -> DecodeResult<Table> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(bytes).context(OpenSnafu)?;

    let file_meta = builder.metadata().file_metadata();
    debug!(
        "parquet footer: version={}, rows={}, row_groups={}, created_by={}",
        file_meta.version(),
        file_meta.num_rows(),
        builder.metadata().num_row_groups(),
        file_meta.created_by().unwrap_or("<unknown>"),
    );

    let schema = builder.schema().clone();
    let reader = builder.build().context(OpenSnafu)?;

    let mut values: Vec<Vec<Option<Value>>> = vec![Vec::new(); schema.fields().len()];

    for batch in reader {
        let batch: RecordBatch = batch.context(ReadBatchSnafu)?;
        for ((field, array), out) in schema
            .fields()
            .iter()
            .zip(batch.columns())
            .zip(values.iter_mut())
        {
            out.extend(array_values(field.name(), array)?);
        }
    }

    let columns = schema
        .fields()
        .iter()
        .zip(values)
        .map(|(field, values)| {
            Column::new(
                field.name().as_str(),
                column_type_for(field.data_type()),
                field.data_type().to_string(),
                values,
            )
        })
        .collect();

    Table::try_new(columns).context(ShapeSnafu)
}

/// Map a declared Arrow type onto the semantic column type.
pub fn column_type_for(data_type: &DataType) -> ColumnType {
    match data_type {
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => ColumnType::Int,
        DataType::Float16 | DataType::Float32 | DataType::Float64 => ColumnType::Float,
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => ColumnType::String,
        DataType::Boolean => ColumnType::Boolean,
        DataType::Timestamp(_, _) => ColumnType::Timestamp,
        DataType::Binary
        | DataType::LargeBinary
        | DataType::BinaryView
        | DataType::FixedSizeBinary(_) => ColumnType::Binary,
        DataType::Dictionary(_, value_type) => column_type_for(value_type),
        _ => ColumnType::Other,
    }
}

fn unsupported(column: &str, array: &dyn Array, reason: impl Into<String>) -> DecodeError {
    UnsupportedColumnSnafu {
        column,
        data_type: array.data_type().to_string(),
        reason: reason.into(),
    }
    .build()
}

fn primitive_values<T: ArrowPrimitiveType>(
    column: &str,
    array: &dyn Array,
    to_value: impl Fn(T::Native) -> Value,
) -> DecodeResult<Vec<Option<Value>>> {
    let typed = array
        .as_primitive_opt::<T>()
        .ok_or_else(|| mismatch(column, array))?;
    Ok(typed.iter().map(|v| v.map(&to_value)).collect())
}

fn timestamp_values<T: ArrowPrimitiveType<Native = i64>>(
    column: &str,
    array: &dyn Array,
    unit: TimestampUnit,
    timezone: Option<&str>,
) -> DecodeResult<Vec<Option<Value>>> {
    primitive_values::<T>(column, array, |epoch| Value::Timestamp {
        epoch,
        unit,
        timezone: timezone.map(str::to_string),
    })
}

fn owned_str(v: Option<&str>) -> Option<Value> {
    v.map(|s| Value::String(s.to_string()))
}

fn owned_bytes(v: Option<&[u8]>) -> Option<Value> {
    v.map(|b| Value::Binary(b.to_vec()))
}

fn mismatch(column: &str, array: &dyn Array) -> DecodeError {
    unsupported(column, array, "array does not match its declared type")
}

/// Convert one Arrow array into nullable cell values.
fn array_values(column: &str, array: &ArrayRef) -> DecodeResult<Vec<Option<Value>>> {
    let array = array.as_ref();

    match array.data_type() {
        DataType::Int8 => primitive_values::<Int8Type>(column, array, |v| Value::Int(v.into())),
        DataType::Int16 => primitive_values::<Int16Type>(column, array, |v| Value::Int(v.into())),
        DataType::Int32 => primitive_values::<Int32Type>(column, array, |v| Value::Int(v.into())),
        DataType::Int64 => primitive_values::<Int64Type>(column, array, Value::Int),
        DataType::UInt8 => primitive_values::<UInt8Type>(column, array, |v| Value::Int(v.into())),
        DataType::UInt16 => {
            primitive_values::<UInt16Type>(column, array, |v| Value::Int(v.into()))
        }
        DataType::UInt32 => {
            primitive_values::<UInt32Type>(column, array, |v| Value::Int(v.into()))
        }
        DataType::UInt64 => primitive_values::<UInt64Type>(column, array, Value::UInt),
        DataType::Float16 => {
            primitive_values::<Float16Type>(column, array, |v| Value::Float(v.to_f64()))
        }
        DataType::Float32 => {
            primitive_values::<Float32Type>(column, array, |v| Value::Float(v.into()))
        }
        DataType::Float64 => primitive_values::<Float64Type>(column, array, Value::Float),
        DataType::Boolean => {
            let typed = array
                .as_boolean_opt()
                .ok_or_else(|| mismatch(column, array))?;
            Ok(typed.iter().map(|v| v.map(Value::Boolean)).collect())
        }
        DataType::Utf8 => {
            let typed = array
                .as_string_opt::<i32>()
                .ok_or_else(|| mismatch(column, array))?;
            Ok(typed.iter().map(owned_str).collect())
        }
        DataType::LargeUtf8 => {
            let typed = array
                .as_string_opt::<i64>()
                .ok_or_else(|| mismatch(column, array))?;
            Ok(typed.iter().map(owned_str).collect())
        }
        DataType::Utf8View => {
            let typed = array
                .as_string_view_opt()
                .ok_or_else(|| mismatch(column, array))?;
            Ok(typed.iter().map(owned_str).collect())
        }
        DataType::Binary => {
            let typed = array
                .as_binary_opt::<i32>()
                .ok_or_else(|| mismatch(column, array))?;
            Ok(typed.iter().map(owned_bytes).collect())
        }
        DataType::LargeBinary => {
            let typed = array
                .as_binary_opt::<i64>()
                .ok_or_else(|| mismatch(column, array))?;
            Ok(typed.iter().map(owned_bytes).collect())
        }
        DataType::BinaryView => {
            let typed = array
                .as_binary_view_opt()
                .ok_or_else(|| mismatch(column, array))?;
            Ok(typed.iter().map(owned_bytes).collect())
        }
        DataType::FixedSizeBinary(_) => {
            let typed = array
                .as_fixed_size_binary_opt()
                .ok_or_else(|| mismatch(column, array))?;
            Ok(typed.iter().map(owned_bytes).collect())
        }
        DataType::Timestamp(unit, tz) => {
            let tz = tz.as_deref();
            match unit {
                TimeUnit::Second => timestamp_values::<TimestampSecondType>(
                    column,
                    array,
                    TimestampUnit::Seconds,
                    tz,
                ),
                TimeUnit::Millisecond => timestamp_values::<TimestampMillisecondType>(
                    column,
                    array,
                    TimestampUnit::Millis,
                    tz,
                ),
                TimeUnit::Microsecond => timestamp_values::<TimestampMicrosecondType>(
                    column,
                    array,
                    TimestampUnit::Micros,
                    tz,
                ),
                TimeUnit::Nanosecond => timestamp_values::<TimestampNanosecondType>(
                    column,
                    array,
                    TimestampUnit::Nanos,
                    tz,
                ),
            }
        }
        DataType::Dictionary(_, value_type) => {
            let unpacked = arrow::compute::cast(array, value_type)
                .map_err(|e| unsupported(column, array, e.to_string()))?;
            array_values(column, &unpacked)
        }
        _ => rendered_values(column, array),
    }
}

/// Fallback for types without a dedicated variant: keep the canonical text
/// produced by Arrow's display formatter.
fn rendered_values(column: &str, array: &dyn Array) -> DecodeResult<Vec<Option<Value>>> {
    let options = FormatOptions::default();
    let formatter = ArrayFormatter::try_new(array, &options)
        .map_err(|e| unsupported(column, array, e.to_string()))?;
    let nulls = array.logical_nulls();

    (0..array.len())
        .map(|idx| {
            if nulls.as_ref().is_some_and(|n| n.is_null(idx)) {
                return Ok(None);
            }
            formatter
                .value(idx)
                .try_to_string()
                .map(|s| Some(Value::Other(s)))
                .map_err(|e| unsupported(column, array, e.to_string()))
        })
        .collect()
}
