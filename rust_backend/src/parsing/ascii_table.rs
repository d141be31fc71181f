use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

use crate::core::table::{Column, ColumnData, Table};
use crate::parsing::tokenizer::{join_fields, split_rows};

/// Parse an astropy `ascii.commented_header` table from a file.
pub fn parse_commented_header_file(path: &Path) -> Result<Table> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read table file: {}", path.display()))?;
    parse_commented_header_str(&content)
        .with_context(|| format!("Failed to parse commented-header table: {}", path.display()))
}

/// Parse an astropy `ascii.commented_header` table from a string.
///
/// The first line starting with `#` carries the column names; any further
/// comment lines are ignored. Data rows are whitespace-delimited.
pub fn parse_commented_header_str(content: &str) -> Result<Table> {
    let mut header: Option<&str> = None;
    let mut data_lines = Vec::new();

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(comment) = trimmed.strip_prefix('#') {
            if header.is_none() {
                header = Some(comment);
            }
            continue;
        }
        if header.is_none() {
            bail!("Data row found before the commented header line");
        }
        data_lines.push(trimmed);
    }

    let header = header.context("Table has no commented header line")?;
    let names = split_rows(&[header], b' ')?
        .into_iter()
        .next()
        .unwrap_or_default();
    if names.is_empty() {
        bail!("Commented header line has no column names");
    }

    let rows = split_rows(&data_lines, b' ')?;
    columns_from_rows(&names, rows)
}

/// Assemble typed columns from row-major tokens, inferring each column's type.
pub(crate) fn columns_from_rows(names: &[String], rows: Vec<Vec<String>>) -> Result<Table> {
    let mut cells: Vec<Vec<String>> = names.iter().map(|_| Vec::with_capacity(rows.len())).collect();

    for (index, row) in rows.into_iter().enumerate() {
        if row.len() != names.len() {
            bail!(
                "Row {} has {} values, header has {} columns",
                index + 1,
                row.len(),
                names.len()
            );
        }
        for (column, value) in cells.iter_mut().zip(row) {
            column.push(value);
        }
    }

    let columns = names
        .iter()
        .zip(cells)
        .map(|(name, tokens)| Column::new(name.clone(), ColumnData::infer(tokens)))
        .collect();

    Table::from_columns(columns).context("Inconsistent column lengths")
}

/// Render a table in `ascii.commented_header` layout.
pub fn to_commented_header_string(table: &Table) -> String {
    let mut out = String::new();
    out.push_str("# ");
    out.push_str(&join_fields(&table.column_names(), ' '));
    out.push('\n');

    for row in 0..table.len() {
        out.push_str(&join_fields(&table.row_cells(row), ' '));
        out.push('\n');
    }
    out
}

/// Write a table in `ascii.commented_header` layout, overwriting `path`.
pub fn write_commented_header_file(table: &Table, path: &Path) -> Result<()> {
    fs::write(path, to_commented_header_string(table))
        .with_context(|| format!("Failed to write table file: {}", path.display()))
}
