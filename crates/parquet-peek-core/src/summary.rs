//! Read-only statistics and bounded previews derived from a [`Table`].
//!
//! Nothing in this module mutates the table. All functions are infallible
//! for any well-formed table and any `show_rows`, including zero.

use chrono::{DateTime, Utc};

use crate::table::{Column, ColumnType, Table, TimestampUnit, Value};

/// Default number of preview rows.
pub const DEFAULT_SHOW_ROWS: usize = 10;

/// Maximum rendered width of a preview cell, in characters.
pub const MAX_CELL_WIDTH: usize = 50;

/// Marker appended to cells cut at the maximum width.
pub const ELLIPSIS: &str = "...";

/// Maximum number of decimal places used when rendering floats.
pub const FLOAT_MAX_DECIMALS: usize = 6;

/// Text used for missing values in previews.
pub const NULL_CELL: &str = "null";

/// Bytes charged per value of a fixed-width 64-bit type.
const WIDE_VALUE_BYTES: u64 = 8;
/// Bytes charged per boolean value.
const BOOL_VALUE_BYTES: u64 = 1;
/// Bytes charged per slot of a variable-length column for its offset.
const OFFSET_BYTES: u64 = 8;

/// Per-column statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSummary {
    /// Column name.
    pub name: String,
    /// Semantic type.
    pub dtype: ColumnType,
    /// Type as declared in the file.
    pub declared_type: String,
    /// Number of present values.
    pub non_null_count: usize,
    /// Number of missing values.
    pub null_count: usize,
}

/// Shape, memory estimate and per-column counts of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    /// Exact number of rows.
    pub row_count: usize,
    /// Exact number of columns.
    pub column_count: usize,
    /// Best-effort estimate of the in-memory size, see [`estimate_memory`].
    pub memory_estimate_bytes: u64,
    /// Per-column statistics in schema order.
    pub columns: Vec<ColumnSummary>,
}

impl Summary {
    /// Look up a column's statistics by name.
    pub fn column(&self, name: &str) -> Option<&ColumnSummary> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Memory estimate in mebibytes.
    pub fn memory_estimate_mib(&self) -> f64 {
        self.memory_estimate_bytes as f64 / (1024.0 * 1024.0)
    }
}

/// One preview row: its position in the file and its rendered cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewRow {
    /// Zero-based row position in file order.
    pub index: usize,
    /// Rendered cell values, one per column.
    pub cells: Vec<String>,
}

/// The first rows of a table, rendered for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    /// Column names in schema order.
    pub columns: Vec<String>,
    /// Rendered rows in file order.
    pub rows: Vec<PreviewRow>,
    /// Row count of the whole table.
    pub total_rows: usize,
}

impl Preview {
    /// Rows of the table that are not part of the preview.
    pub fn omitted_rows(&self) -> usize {
        self.total_rows.saturating_sub(self.rows.len())
    }

    /// Note stating how many rows were left out, if any were.
    pub fn truncation_note(&self) -> Option<String> {
        match self.omitted_rows() {
            0 => None,
            n => Some(format!("... and {} more rows", format_count(n as u64))),
        }
    }
}

/// Compute shape, memory estimate and null counts.
pub fn summarize(table: &Table) -> Summary {
    let columns = table
        .columns()
        .iter()
        .map(|col| {
            let null_count = col.null_count();
            ColumnSummary {
                name: col.name.clone(),
                dtype: col.column_type,
                declared_type: col.declared_type.clone(),
                non_null_count: col.len() - null_count,
                null_count,
            }
        })
        .collect();

    Summary {
        row_count: table.row_count(),
        column_count: table.column_count(),
        memory_estimate_bytes: estimate_memory(table),
        columns,
    }
}

/// Estimate the in-memory footprint of a table, in bytes.
///
/// This follows a columnar layout model and is an approximation, not a
/// measurement of actual process memory:
///
/// - int, float and timestamp values cost 8 bytes per slot, booleans 1 byte;
/// - string, binary and other values cost their encoded length plus an
///   8-byte offset per slot (null slots still pay the offset);
/// - every column pays a validity bitmap of `ceil(rows / 8)` bytes.
pub fn estimate_memory(table: &Table) -> u64 {
    table.columns().iter().map(column_memory).sum()
}

fn column_memory(col: &Column) -> u64 {
    let slots = col.len() as u64;
    let validity = slots.div_ceil(8);

    let data = match col.column_type {
        ColumnType::Boolean => slots * BOOL_VALUE_BYTES,
        ColumnType::Int | ColumnType::Float | ColumnType::Timestamp => slots * WIDE_VALUE_BYTES,
        ColumnType::String | ColumnType::Binary | ColumnType::Other => {
            let payload: u64 = col.values.iter().flatten().map(value_len).sum();
            payload + slots * OFFSET_BYTES
        }
    };

    data + validity
}

fn value_len(value: &Value) -> u64 {
    match value {
        Value::String(s) | Value::Other(s) => s.len() as u64,
        Value::Binary(b) => b.len() as u64,
        Value::Boolean(_) => BOOL_VALUE_BYTES,
        Value::Int(_) | Value::UInt(_) | Value::Float(_) | Value::Timestamp { .. } => {
            WIDE_VALUE_BYTES
        }
    }
}

/// Render the first `show_rows` rows with the default cell width.
pub fn preview(table: &Table, show_rows: usize) -> Preview {
    preview_with_width(table, show_rows, MAX_CELL_WIDTH)
}

/// Render the first `show_rows` rows, cutting cells to `max_cell_width`
/// characters. Widths below the length of [`ELLIPSIS`] are raised to it.
pub fn preview_with_width(table: &Table, show_rows: usize, max_cell_width: usize) -> Preview {
    let take = show_rows.min(table.row_count());
    let max_cell_width = max_cell_width.max(ELLIPSIS.len());

    let rows = (0..take)
        .map(|index| PreviewRow {
            index,
            cells: table
                .columns()
                .iter()
                .map(|col| truncate_cell(render_cell(col.values[index].as_ref()), max_cell_width))
                .collect(),
        })
        .collect();

    Preview {
        columns: table.columns().iter().map(|c| c.name.clone()).collect(),
        rows,
        total_rows: table.row_count(),
    }
}

/// Canonical string form of a nullable cell.
pub fn render_cell(value: Option<&Value>) -> String {
    let Some(value) = value else {
        return NULL_CELL.to_string();
    };

    match value {
        Value::Int(v) => v.to_string(),
        Value::UInt(v) => v.to_string(),
        Value::Float(v) => format_compact_float(*v, FLOAT_MAX_DECIMALS),
        Value::Boolean(v) => v.to_string(),
        Value::String(s) | Value::Other(s) => escape_control(s),
        Value::Timestamp {
            epoch,
            unit,
            timezone,
        } => format_timestamp(*epoch, *unit, timezone.is_some()),
        Value::Binary(b) => {
            let mut out = String::with_capacity(2 + b.len() * 2);
            out.push_str("0x");
            for byte in b {
                out.push_str(&format!("{byte:02x}"));
            }
            out
        }
    }
}

/// Cut `cell` to at most `max_width` characters, marking the cut with
/// [`ELLIPSIS`].
pub fn truncate_cell(cell: String, max_width: usize) -> String {
    if cell.chars().count() <= max_width {
        return cell;
    }
    let keep = max_width.saturating_sub(ELLIPSIS.len());
    let mut out: String = cell.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}

fn escape_control(s: &str) -> String {
    if !s.contains(['\n', '\r', '\t']) {
        return s.to_string();
    }
    s.replace('\n', "\\n").replace('\r', "\\r").replace('\t', "\\t")
}

fn format_timestamp(epoch: i64, unit: TimestampUnit, zoned: bool) -> String {
    let dt: Option<DateTime<Utc>> = match unit {
        TimestampUnit::Seconds => DateTime::from_timestamp(epoch, 0),
        TimestampUnit::Millis => DateTime::from_timestamp_millis(epoch),
        TimestampUnit::Micros => DateTime::from_timestamp_micros(epoch),
        TimestampUnit::Nanos => Some(DateTime::from_timestamp_nanos(epoch)),
    };

    match dt {
        Some(dt) => {
            let mut s = dt.format("%Y-%m-%d %H:%M:%S%.f").to_string();
            if zoned {
                s.push_str(" UTC");
            }
            s
        }
        // Outside chrono's range; show the raw offset instead.
        None => format!("{epoch} ({unit:?} since epoch)"),
    }
}

/// Format a float with at most `max_decimals` decimals, trimming trailing
/// zeros. Non-finite values use their standard spelling.
pub fn format_compact_float(value: f64, max_decimals: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let prec = max_decimals.min(15);
    let mut s = format!("{value:.prec$}");
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }

    if s == "-0" {
        s.clear();
        s.push('0');
    }

    s
}

/// Format an integer with `,` thousands separators.
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
