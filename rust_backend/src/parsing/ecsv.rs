//! Reader and writer for astropy's Enhanced CSV (ECSV 1.0) tables.
//!
//! An ECSV file starts with a `# %ECSV 1.0` banner and a YAML header, every
//! line prefixed with `# `. Only the parts of the header that shape the data
//! are interpreted: the top-level `delimiter` and the `datatype` list
//! (`name`, `unit`, `datatype`), in either flow (`- {name: ra, unit: deg}`) or
//! block style. The first non-comment line holds the column names.

use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::core::table::{parse_float_cell, Column, ColumnData, Table};
use crate::parsing::tokenizer::{join_fields, split_rows};

const ECSV_BANNER: &str = "%ECSV";

/// Column description from the `datatype` list of the header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EcsvColumnSpec {
    pub name: String,
    pub unit: Option<String>,
    pub datatype: Option<String>,
}

/// Interpreted portion of an ECSV header.
#[derive(Debug, Clone, PartialEq)]
pub struct EcsvHeader {
    pub version: String,
    pub delimiter: u8,
    pub columns: Vec<EcsvColumnSpec>,
}

/// Parse an ECSV table from a file.
pub fn parse_ecsv_file(path: &Path) -> Result<Table> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read ECSV file: {}", path.display()))?;
    parse_ecsv_str(&content).with_context(|| format!("Failed to parse ECSV table: {}", path.display()))
}

/// Parse an ECSV table from a string.
pub fn parse_ecsv_str(content: &str) -> Result<Table> {
    let mut header_lines = Vec::new();
    let mut body_lines = Vec::new();

    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match line.strip_prefix('#') {
            Some(rest) if body_lines.is_empty() => {
                header_lines.push(rest.strip_prefix(' ').unwrap_or(rest))
            }
            Some(_) => {}
            None => body_lines.push(line),
        }
    }

    let header = parse_header(&header_lines)?;
    let mut rows = split_rows(&body_lines, header.delimiter)?.into_iter();
    let names = rows.next().context("ECSV table has no column-name line")?;

    if !header.columns.is_empty() {
        let declared: Vec<&str> = header.columns.iter().map(|c| c.name.as_str()).collect();
        if declared != names.iter().map(String::as_str).collect::<Vec<_>>() {
            bail!(
                "Column names {:?} do not match header datatype list {:?}",
                names,
                declared
            );
        }
    }

    let specs: HashMap<&str, &EcsvColumnSpec> =
        header.columns.iter().map(|c| (c.name.as_str(), c)).collect();

    let mut cells: Vec<Vec<String>> = names.iter().map(|_| Vec::new()).collect();
    for (index, row) in rows.enumerate() {
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

    let mut columns = Vec::with_capacity(names.len());
    for (name, tokens) in names.iter().zip(cells) {
        let spec = specs.get(name.as_str());
        let datatype = spec.and_then(|s| s.datatype.as_deref());
        let data = typed_column(name, datatype, tokens)?;
        let mut column = Column::new(name.clone(), data);
        if let Some(datatype) = datatype {
            column = column.with_datatype(datatype);
        }
        column.unit = spec.and_then(|s| s.unit.clone());
        columns.push(column);
    }

    Table::from_columns(columns).context("Inconsistent column lengths")
}

/// Reads tokens as the declared datatype. Empty tokens are masked cells: NaN
/// in float columns, `""` in string-like ones. A masked integer column is
/// widened to `f64` so the mask survives as NaN.
fn typed_column(name: &str, datatype: Option<&str>, tokens: Vec<String>) -> Result<ColumnData> {
    let Some(datatype) = datatype else {
        return Ok(ColumnData::infer(tokens));
    };

    let integer = datatype.starts_with("int") || datatype.starts_with("uint");
    let masked = tokens.iter().any(String::is_empty);

    if integer && !masked {
        let values = tokens
            .iter()
            .map(|t| t.parse::<i64>())
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Column '{}' declared {} has non-integer values", name, datatype))?;
        Ok(ColumnData::Int(values))
    } else if integer || datatype.starts_with("float") {
        let readable = |t: &str| match (t.is_empty(), integer) {
            (true, _) => true,
            (false, true) => t.parse::<i64>().is_ok(),
            (false, false) => t.parse::<f64>().is_ok(),
        };
        if let Some(bad) = tokens.iter().find(|t| !readable(t.as_str())) {
            let kind = if integer { "non-integer" } else { "non-numeric" };
            bail!("Column '{}' declared {} has {} value '{}'", name, datatype, kind, bad);
        }
        Ok(ColumnData::Float(tokens.iter().map(|t| parse_float_cell(t)).collect()))
    } else {
        Ok(ColumnData::Str(tokens))
    }
}

/// Interpret the YAML header lines (comment prefix already removed).
pub fn parse_header(lines: &[&str]) -> Result<EcsvHeader> {
    let banner = lines.first().context("Missing ECSV banner line")?;
    let version = banner
        .trim()
        .strip_prefix(ECSV_BANNER)
        .map(|v| v.trim().to_string())
        .with_context(|| format!("Not an ECSV file, first line is '{}'", banner.trim()))?;

    let mut delimiter = b' ';
    let mut columns: Vec<EcsvColumnSpec> = Vec::new();
    let mut in_datatype = false;

    for line in lines.iter().skip(1) {
        let indent = line.len() - line.trim_start().len();
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed == "---" {
            continue;
        }

        if indent == 0 && !trimmed.starts_with('-') {
            in_datatype = trimmed == "datatype:";
            if let Some(value) = trimmed.strip_prefix("delimiter:") {
                delimiter = parse_delimiter(value)?;
            }
            continue;
        }

        if !in_datatype {
            continue;
        }

        if let Some(item) = trimmed.strip_prefix('-') {
            let item = item.trim();
            let mut spec = EcsvColumnSpec::default();
            if let Some(flow) = item.strip_prefix('{') {
                for pair in flow.trim_end_matches('}').split(',') {
                    apply_key_value(&mut spec, pair);
                }
            } else {
                apply_key_value(&mut spec, item);
            }
            columns.push(spec);
        } else if let Some(spec) = columns.last_mut() {
            apply_key_value(spec, trimmed);
        }
    }

    if let Some(unnamed) = columns.iter().position(|c| c.name.is_empty()) {
        bail!("Datatype entry {} has no name", unnamed + 1);
    }

    Ok(EcsvHeader {
        version,
        delimiter,
        columns,
    })
}

fn apply_key_value(spec: &mut EcsvColumnSpec, pair: &str) {
    let Some((key, value)) = pair.split_once(':') else {
        return;
    };
    let value = unquote(value.trim()).to_string();
    match key.trim() {
        "name" => spec.name = value,
        "unit" => spec.unit = Some(value),
        "datatype" => spec.datatype = Some(value),
        _ => {}
    }
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .or_else(|| value.strip_prefix('"').and_then(|v| v.strip_suffix('"')))
        .unwrap_or(value)
}

fn parse_delimiter(value: &str) -> Result<u8> {
    match unquote(value.trim()) {
        "," => Ok(b','),
        " " | "" => Ok(b' '),
        other => bail!("Unsupported ECSV delimiter '{}'", other),
    }
}

/// Render a table as ECSV 1.0 with a space delimiter.
pub fn to_ecsv_string(table: &Table) -> String {
    let mut out = String::new();
    out.push_str("# %ECSV 1.0\n");
    out.push_str("# ---\n");
    out.push_str("# datatype:\n");
    for column in table.columns() {
        let name = yaml_scalar(&column.name);
        match &column.unit {
            Some(unit) => out.push_str(&format!(
                "# - {{name: {}, unit: {}, datatype: {}}}\n",
                name,
                yaml_scalar(unit),
                column.datatype()
            )),
            None => out.push_str(&format!(
                "# - {{name: {}, datatype: {}}}\n",
                name,
                column.datatype()
            )),
        }
    }
    out.push_str("# schema: astropy-2.0\n");

    out.push_str(&join_fields(&table.column_names(), ' '));
    out.push('\n');
    for row in 0..table.len() {
        out.push_str(&join_fields(&table.row_cells(row), ' '));
        out.push('\n');
    }
    out
}

fn yaml_scalar(value: &str) -> String {
    let plain = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '/' | '-'));
    if plain {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', "''"))
    }
}

/// Write a table as ECSV, overwriting `path`.
pub fn write_ecsv_file(table: &Table, path: &Path) -> Result<()> {
    fs::write(path, to_ecsv_string(table))
        .with_context(|| format!("Failed to write ECSV file: {}", path.display()))
}
