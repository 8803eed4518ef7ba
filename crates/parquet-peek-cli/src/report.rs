use std::{fmt::Write as _, io::Write};

use parquet_peek_core::{Inspection, summary::format_count};
use snafu::ResultExt;
use tabled::{
    builder::Builder,
    settings::{Style, object::Rows, style::LineText, width::MinWidth},
};

use crate::error::{CliResult, WriteReportSnafu};

/// Width of the `=` rules around section titles.
const RULE_WIDTH: usize = 80;

/// Caption drawn into the top border of a report table.
#[derive(Debug, Clone, Copy)]
enum Caption {
    Columns,
    Rows,
}

impl Caption {
    fn text(self) -> &'static str {
        match self {
            Caption::Columns => " Columns ",
            Caption::Rows => " Rows ",
        }
    }
}

/// Left inset of the caption, counted from the top-left corner.
const CAPTION_INSET: usize = 1;

fn captioned_table(caption: Caption, header: Vec<String>, rows: Vec<Vec<String>>) -> String {
    let text = caption.text();
    // Corner, inset, caption, at least one border cell, corner.
    let min_width = 1 + CAPTION_INSET + text.len() + 2;

    let mut builder = Builder::default();
    builder.push_record(header);
    rows.into_iter().for_each(|row| builder.push_record(row));

    let mut table = builder.build();
    table
        .with(Style::rounded())
        .with(MinWidth::new(min_width))
        .with(LineText::new(text, Rows::first()).offset(CAPTION_INSET))
        // The caption pass recomputes widths; widen again.
        .with(MinWidth::new(min_width));
    table.to_string()
}

fn section(out: &mut String, title: &str) {
    let rule = "=".repeat(RULE_WIDTH);
    let _ = write!(out, "\n{rule}\n{title}\n{rule}\n");
}

fn column_table(inspection: &Inspection) -> String {
    let header = ["Column", "Type", "Declared Type", "Non-Null Count", "Null Count"]
        .map(String::from)
        .to_vec();
    let rows: Vec<Vec<String>> = inspection
        .summary
        .columns
        .iter()
        .map(|c| {
            vec![
                c.name.clone(),
                c.dtype.to_string(),
                c.declared_type.clone(),
                format_count(c.non_null_count as u64),
                format_count(c.null_count as u64),
            ]
        })
        .collect();
    captioned_table(Caption::Columns, header, rows)
}

fn preview_table(inspection: &Inspection) -> String {
    let preview = &inspection.preview;

    // The first column carries the row position and has no title.
    let header = std::iter::once(String::new())
        .chain(preview.columns.iter().cloned())
        .collect();
    let rows = preview
        .rows
        .iter()
        .map(|row| {
            std::iter::once(row.index.to_string())
                .chain(row.cells.iter().cloned())
                .collect()
        })
        .collect();

    captioned_table(Caption::Rows, header, rows)
}

/// Render the whole report into one string.
pub fn render(inspection: &Inspection) -> String {
    let summary = &inspection.summary;
    let preview = &inspection.preview;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Object: {} ({} bytes)",
        inspection.locator,
        format_count(inspection.object_size)
    );

    section(&mut out, "DATAFRAME INFORMATION");
    let _ = writeln!(
        out,
        "Shape: {} rows × {} columns",
        format_count(summary.row_count as u64),
        format_count(summary.column_count as u64)
    );
    let _ = writeln!(out, "Memory usage: {:.2} MB", summary.memory_estimate_mib());

    section(&mut out, "COLUMN INFORMATION");
    if summary.columns.is_empty() {
        out.push_str("(no columns)\n");
    } else {
        out.push_str(&column_table(inspection));
        out.push('\n');
    }

    section(&mut out, &format!("FIRST {} ROWS", preview.rows.len()));
    if preview.columns.is_empty() {
        out.push_str("(no columns)\n");
    } else {
        out.push_str(&preview_table(inspection));
        out.push('\n');
        if preview.total_rows == 0 {
            out.push_str("(no rows)\n");
        }
    }

    if let Some(note) = preview.truncation_note() {
        let _ = write!(out, "\n{note}\n");
    }

    out
}

/// Render the report, then write it in one piece.
pub fn write_report<W: Write>(inspection: &Inspection, out: &mut W) -> CliResult<()> {
    let rendered = render(inspection);
    out.write_all(rendered.as_bytes()).context(WriteReportSnafu)?;
    out.flush().context(WriteReportSnafu)
}
