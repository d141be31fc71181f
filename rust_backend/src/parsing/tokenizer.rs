//! Field splitting and quoting shared by the ASCII table formats.

use anyhow::{bail, Context, Result};
use std::borrow::Cow;

/// Splits delimited text rows into fields.
///
/// Fields may be wrapped in double quotes (doubled quotes escape a quote).
/// With a space delimiter, runs of spaces and tabs outside quotes count as a
/// single separator, matching astropy's basic readers, while a quoted empty
/// field (`""`) is still a field. Other delimiters keep empty fields.
pub fn split_rows(rows: &[&str], delimiter: u8) -> Result<Vec<Vec<String>>> {
    if delimiter == b' ' {
        return rows
            .iter()
            .enumerate()
            .map(|(index, row)| {
                split_whitespace_row(row).with_context(|| format!("Malformed row {}", index + 1))
            })
            .collect();
    }

    let mut text = String::with_capacity(rows.iter().map(|r| r.len() + 1).sum());
    for row in rows {
        text.push_str(row.trim_end_matches('\r'));
        text.push('\n');
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .quote(b'"')
        .double_quote(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut out = Vec::with_capacity(rows.len());
    for (index, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Malformed row {}", index + 1))?;
        out.push(record.iter().map(str::to_string).collect());
    }
    Ok(out)
}

fn split_whitespace_row(row: &str) -> Result<Vec<String>> {
    let mut fields = Vec::new();
    let mut chars = row.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        if chars.peek().is_none() {
            return Ok(fields);
        }

        let mut field = String::new();
        let mut quoted = false;
        while let Some(c) = chars.next() {
            match c {
                '"' if quoted && chars.next_if_eq(&'"').is_some() => field.push('"'),
                '"' => quoted = !quoted,
                c if c.is_whitespace() && !quoted => break,
                c => field.push(c),
            }
        }
        if quoted {
            bail!("Unterminated quoted field in '{}'", row.trim());
        }
        fields.push(field);
    }
}

/// Quotes a field when it would otherwise not survive [`split_rows`].
pub fn quote_field(field: &str, delimiter: char) -> Cow<'_, str> {
    let needs_quotes = field.is_empty()
        || field.contains('"')
        || field.contains(delimiter)
        || field.chars().any(char::is_whitespace);

    if needs_quotes {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// Joins fields into one output row.
pub fn join_fields<S: AsRef<str>>(fields: &[S], delimiter: char) -> String {
    fields
        .iter()
        .map(|f| quote_field(f.as_ref(), delimiter))
        .collect::<Vec<_>>()
        .join(&delimiter.to_string())
}
