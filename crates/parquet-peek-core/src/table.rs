//! In-memory, column-oriented representation of a decoded file.
//!
//! A [`Table`] is an ordered list of [`Column`]s that all hold the same number
//! of values. Each value is an `Option<Value>`: `None` is the missing-value
//! sentinel and is never conflated with a legitimate zero or empty value.

use std::fmt;

use snafu::prelude::*;

/// Semantic type of a column, derived from the type declared in the file schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// Signed or unsigned integers of any width.
    Int,
    /// Floating point numbers of any width.
    Float,
    /// UTF-8 strings.
    String,
    /// Booleans.
    Boolean,
    /// Instants with an epoch offset and unit.
    Timestamp,
    /// Opaque byte strings.
    Binary,
    /// Anything else (dates, decimals, nested types, ...), kept in rendered form.
    Other,
}

impl ColumnType {
    /// Short lowercase name used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Int => "int",
            ColumnType::Float => "float",
            ColumnType::String => "string",
            ColumnType::Boolean => "boolean",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Binary => "binary",
            ColumnType::Other => "other",
        }
    }

    /// Whether every value of this type occupies the same number of bytes.
    pub fn is_fixed_width(&self) -> bool {
        matches!(
            self,
            ColumnType::Int | ColumnType::Float | ColumnType::Boolean | ColumnType::Timestamp
        )
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolution of a timestamp's epoch offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimestampUnit {
    /// Seconds since the Unix epoch.
    Seconds,
    /// Milliseconds since the Unix epoch.
    Millis,
    /// Microseconds since the Unix epoch.
    Micros,
    /// Nanoseconds since the Unix epoch.
    Nanos,
}

/// A single non-null cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Signed integer.
    Int(i64),
    /// Unsigned integer that may not fit in `i64`.
    UInt(u64),
    /// Floating point number.
    Float(f64),
    /// UTF-8 string.
    String(String),
    /// Boolean.
    Boolean(bool),
    /// Instant as stored in the file: epoch offset plus unit, with the
    /// declared timezone (if any).
    Timestamp {
        /// Offset from the Unix epoch in `unit`.
        epoch: i64,
        /// Resolution of `epoch`.
        unit: TimestampUnit,
        /// Timezone declared on the column, if the column is zone-aware.
        timezone: Option<String>,
    },
    /// Raw bytes.
    Binary(Vec<u8>),
    /// Canonical text form of a value whose type has no dedicated variant.
    Other(String),
}

/// A named, typed column of nullable values.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column name as declared in the schema.
    pub name: String,
    /// Semantic type.
    pub column_type: ColumnType,
    /// The physical/logical type as declared in the file, for display.
    pub declared_type: String,
    /// One entry per row; `None` marks a missing value.
    pub values: Vec<Option<Value>>,
}

impl Column {
    /// Build a column from its parts.
    pub fn new(
        name: impl Into<String>,
        column_type: ColumnType,
        declared_type: impl Into<String>,
        values: Vec<Option<Value>>,
    ) -> Self {
        Self {
            name: name.into(),
            column_type,
            declared_type: declared_type.into(),
            values,
        }
    }

    /// Number of values (rows) in the column.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the column holds no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of missing values.
    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_none()).count()
    }
}

/// Errors raised when assembling a [`Table`] from columns.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TableError {
    /// Columns disagree on the number of rows.
    #[snafu(display(
        "Column '{column}' has {actual} values but the table has {expected} rows"
    ))]
    RaggedColumn {
        /// Offending column name.
        column: String,
        /// Row count established by the first column.
        expected: usize,
        /// Row count of the offending column.
        actual: usize,
    },
}

/// An ordered set of equally long columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    /// Assemble a table, checking that every column has the same length.
    ///
    /// A table with no columns has zero rows.
    pub fn try_new(columns: Vec<Column>) -> Result<Self, TableError> {
        let row_count = columns.first().map(Column::len).unwrap_or(0);
        for col in &columns {
            ensure!(
                col.len() == row_count,
                RaggedColumnSnafu {
                    column: col.name.clone(),
                    expected: row_count,
                    actual: col.len(),
                }
            );
        }
        Ok(Self { columns, row_count })
    }

    /// Columns in schema order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Number of rows (the table's cardinality).
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}
