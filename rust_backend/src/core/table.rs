//! In-memory astronomical tables.
//!
//! A [`Table`] is an ordered set of named columns, each optionally tagged with a
//! physical unit. It is the in-memory form of the ASCII and ECSV catalogs read
//! and written by the driver (galaxy catalogs, void hole catalogs) and carries
//! no knowledge of what the columns mean.

use std::fmt;

/// Errors raised by table access and mutation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TableError {
    #[error("Missing column '{0}'")]
    MissingColumn(String),

    #[error("Column '{name}' has {actual} rows, table has {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("Column '{0}' is not numeric")]
    NotNumeric(String),
}

/// Storage for a single column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Int(Vec<i64>),
    Float(Vec<f64>),
    Str(Vec<String>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Int(v) => v.len(),
            ColumnData::Float(v) => v.len(),
            ColumnData::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// ECSV datatype name for this storage.
    pub fn datatype(&self) -> &'static str {
        match self {
            ColumnData::Int(_) => "int64",
            ColumnData::Float(_) => "float64",
            ColumnData::Str(_) => "string",
        }
    }

    /// Infers the narrowest storage able to hold every token.
    ///
    /// Tokens are tried as `i64`, then `f64`, then kept as strings, the same
    /// order astropy's ASCII readers use for type guessing. Empty tokens are
    /// masked cells: they become NaN in a numeric column, which forces an
    /// otherwise integral column to `f64`. A column of only empty tokens stays
    /// a string column.
    pub fn infer(tokens: Vec<String>) -> Self {
        let present = tokens.iter().filter(|t| !t.is_empty()).count();
        if present == 0 {
            return ColumnData::Str(tokens);
        }

        if present == tokens.len() && tokens.iter().all(|t| t.parse::<i64>().is_ok()) {
            return ColumnData::Int(tokens.iter().filter_map(|t| t.parse().ok()).collect());
        }
        let numeric = tokens
            .iter()
            .filter(|t| !t.is_empty())
            .all(|t| t.parse::<f64>().is_ok());
        if numeric {
            return ColumnData::Float(tokens.iter().map(|t| parse_float_cell(t)).collect());
        }
        ColumnData::Str(tokens)
    }

    /// Formats one cell for text output.
    ///
    /// Integral floats keep a decimal point (`1.0`, not `1`) so that a written
    /// table re-reads with the same column types.
    pub fn format_cell(&self, row: usize) -> String {
        match self {
            ColumnData::Int(v) => v[row].to_string(),
            ColumnData::Float(v) => format_float(v[row]),
            ColumnData::Str(v) => v[row].clone(),
        }
    }
}

/// Parses a float cell, reading an empty (masked) cell as NaN.
pub(crate) fn parse_float_cell(token: &str) -> f64 {
    if token.is_empty() {
        f64::NAN
    } else {
        token.parse().unwrap_or(f64::NAN)
    }
}

fn format_float(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value.is_infinite() {
        let text = if value > 0.0 { "inf" } else { "-inf" };
        text.to_string()
    } else {
        format!("{:?}", value)
    }
}

/// A named, optionally unit-tagged column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub unit: Option<String>,
    /// ECSV datatype declared by the source file when the storage alone does
    /// not name it (`bool`, `float32`, `int32`, ...).
    pub datatype: Option<String>,
    pub data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            unit: None,
            datatype: None,
            data,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Tags the column with a declared datatype.
    ///
    /// The tag is dropped when it matches the storage's own datatype or when
    /// the storage cannot carry it (an integer type over `f64` values, say).
    pub fn with_datatype(mut self, datatype: impl Into<String>) -> Self {
        let datatype = datatype.into();
        let fits = match &self.data {
            ColumnData::Int(_) => datatype.starts_with("int") || datatype.starts_with("uint"),
            ColumnData::Float(_) => datatype.starts_with("float"),
            ColumnData::Str(_) => {
                !(datatype.starts_with("int")
                    || datatype.starts_with("uint")
                    || datatype.starts_with("float"))
            }
        };
        self.datatype = (fits && datatype != self.data.datatype()).then_some(datatype);
        self
    }

    /// Datatype written to ECSV headers.
    pub fn datatype(&self) -> &str {
        self.datatype.as_deref().unwrap_or(self.data.datatype())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the column as `f64` values, widening integer columns.
    pub fn to_f64(&self) -> Result<Vec<f64>, TableError> {
        match &self.data {
            ColumnData::Float(v) => Ok(v.clone()),
            ColumnData::Int(v) => Ok(v.iter().map(|&x| x as f64).collect()),
            ColumnData::Str(_) => Err(TableError::NotNumeric(self.name.clone())),
        }
    }
}

/// Ordered collection of equal-length columns.
///
/// # Examples
///
/// ```
/// use vast_rust::core::table::{Column, ColumnData, Table};
///
/// let mut table = Table::new();
/// table.add_column(Column::new("ra", ColumnData::Float(vec![10.0, 20.0]))).unwrap();
/// table.add_column(Column::new("vflag", ColumnData::Int(vec![-9, -9]))).unwrap();
///
/// assert_eq!(table.len(), 2);
/// assert_eq!(table.column_names(), vec!["ra", "vflag"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from columns, checking that all have the same length.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self, TableError> {
        let mut table = Table::new();
        for column in columns {
            table.add_column(column)?;
        }
        Ok(table)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Result<&Column, TableError> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))
    }

    /// Numeric values of `name` as `f64`.
    pub fn f64_values(&self, name: &str) -> Result<Vec<f64>, TableError> {
        self.column(name)?.to_f64()
    }

    /// Adds a column, replacing (in place) any existing column with the same name.
    pub fn add_column(&mut self, column: Column) -> Result<(), TableError> {
        let (expected, actual) = (self.len(), column.len());
        if !self.columns.is_empty() && actual != expected {
            let replaces_only_column =
                self.columns.len() == 1 && self.columns[0].name == column.name;
            if !replaces_only_column {
                return Err(TableError::LengthMismatch {
                    name: column.name,
                    expected,
                    actual,
                });
            }
        }

        match self.columns.iter_mut().find(|c| c.name == column.name) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
        Ok(())
    }

    /// Formatted cells of one row, in column order.
    pub fn row_cells(&self, row: usize) -> Vec<String> {
        self.columns.iter().map(|c| c.data.format_cell(row)).collect()
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Table length={} columns=[{}]>",
            self.len(),
            self.column_names().join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_infer_prefers_int_then_float_then_string() {
        assert_eq!(
            ColumnData::infer(tokens(&["1", "-2", "3"])),
            ColumnData::Int(vec![1, -2, 3])
        );
        assert_eq!(
            ColumnData::infer(tokens(&["1", "2.5", "nan"])).datatype(),
            "float64"
        );
        assert_eq!(
            ColumnData::infer(tokens(&["1", "NGC 1234"])).datatype(),
            "string"
        );
    }

    #[test]
    fn test_integral_float_keeps_decimal_point() {
        let data = ColumnData::Float(vec![1.0, 0.114, f64::NAN, 1e20]);
        assert_eq!(data.format_cell(0), "1.0");
        assert_eq!(data.format_cell(1), "0.114");
        assert_eq!(data.format_cell(2), "nan");
        assert_eq!(data.format_cell(3).parse::<f64>().unwrap(), 1e20);
    }

    #[test]
    fn test_add_column_replaces_in_place() {
        let mut table = Table::from_columns(vec![
            Column::new("ra", ColumnData::Float(vec![1.0, 2.0])),
            Column::new("vflag", ColumnData::Int(vec![0, 1])),
            Column::new("dec", ColumnData::Float(vec![3.0, 4.0])),
        ])
        .unwrap();

        table
            .add_column(Column::new("vflag", ColumnData::Int(vec![-9, -9])))
            .unwrap();

        assert_eq!(table.column_names(), vec!["ra", "vflag", "dec"]);
        assert_eq!(
            table.column("vflag").unwrap().data,
            ColumnData::Int(vec![-9, -9])
        );
    }

    #[test]
    fn test_add_column_rejects_length_mismatch() {
        let mut table =
            Table::from_columns(vec![Column::new("ra", ColumnData::Float(vec![1.0, 2.0]))])
                .unwrap();
        let err = table
            .add_column(Column::new("dec", ColumnData::Float(vec![1.0])))
            .unwrap_err();
        assert_eq!(
            err,
            TableError::LengthMismatch {
                name: "dec".to_string(),
                expected: 2,
                actual: 1,
            }
        );
        assert_eq!(err.to_string(), "Column 'dec' has 1 rows, table has 2");
        assert_eq!(table.column_names(), vec!["ra"]);
    }

    /// A single-column table may have its only column swapped for a longer one
    #[test]
    fn test_add_column_replaces_only_column_of_any_length() {
        let mut table =
            Table::from_columns(vec![Column::new("ra", ColumnData::Float(vec![1.0]))]).unwrap();
        table
            .add_column(Column::new("ra", ColumnData::Float(vec![1.0, 2.0, 3.0])))
            .unwrap();
        assert_eq!(table.len(), 3);
    }

    /// Empty cells are masked values, not separators or zeros
    #[test]
    fn test_infer_reads_empty_cells_as_missing() {
        match ColumnData::infer(tokens(&["1", "", "3"])) {
            ColumnData::Float(values) => {
                assert_eq!(values[0], 1.0);
                assert!(values[1].is_nan());
                assert_eq!(values[2], 3.0);
            }
            other => panic!("expected float column, got {:?}", other),
        }
        assert_eq!(
            ColumnData::infer(tokens(&["", "b"])),
            ColumnData::Str(tokens(&["", "b"]))
        );
        assert_eq!(
            ColumnData::infer(tokens(&["", ""])),
            ColumnData::Str(tokens(&["", ""]))
        );
    }

    #[test]
    fn test_declared_datatype_kept_only_when_storage_fits() {
        let flag = Column::new("is_main", ColumnData::Str(tokens(&["True", "False"])))
            .with_datatype("bool");
        assert_eq!(flag.datatype(), "bool");

        let z = Column::new("redshift", ColumnData::Float(vec![0.1])).with_datatype("float32");
        assert_eq!(z.datatype.as_deref(), Some("float32"));

        let same = Column::new("ra", ColumnData::Float(vec![0.1])).with_datatype("float64");
        assert_eq!(same.datatype, None);

        // A masked int64 column is stored as f64 and written back as float64
        let masked = Column::new("id", ColumnData::Float(vec![f64::NAN])).with_datatype("int64");
        assert_eq!(masked.datatype(), "float64");
    }

    #[test]
    fn test_f64_values_widens_ints_and_rejects_strings() {
        let table = Table::from_columns(vec![
            Column::new("n", ColumnData::Int(vec![1, 2])),
            Column::new("name", ColumnData::Str(tokens(&["a", "b"]))),
        ])
        .unwrap();

        assert_eq!(table.f64_values("n").unwrap(), vec![1.0, 2.0]);
        assert_eq!(
            table.f64_values("name").unwrap_err(),
            TableError::NotNumeric("name".to_string())
        );
        assert_eq!(
            table.f64_values("redshift").unwrap_err(),
            TableError::MissingColumn("redshift".to_string())
        );
    }
}
