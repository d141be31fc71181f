//! Domain vocabulary shared by both pipelines.
//!
//! These are the small value types the driver itself reasons about: which
//! distance metric is in use, which table format a catalog is stored in, the
//! environment codes returned by the classifier, and the void hole catalog
//! read back from disk.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::table::{Table, TableError};

/// How galaxy distances are derived from redshift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Comoving distance integrated by the library for the configured cosmology.
    Comoving,
    /// Hubble-law distance `c z / H`.
    Redshift,
}

impl DistanceMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceMetric::Comoving => "comoving",
            DistanceMetric::Redshift => "redshift",
        }
    }
}

impl Default for DistanceMetric {
    fn default() -> Self {
        DistanceMetric::Comoving
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistanceMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "comoving" => Ok(DistanceMetric::Comoving),
            "redshift" => Ok(DistanceMetric::Redshift),
            other => Err(format!(
                "Unknown distance metric: {}. Use 'comoving' or 'redshift'",
                other
            )),
        }
    }
}

/// On-disk layout of a catalog table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableFormat {
    /// astropy `ascii.commented_header`
    CommentedHeader,
    /// astropy `ascii.ecsv`
    Ecsv,
}

impl TableFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableFormat::CommentedHeader => "commented_header",
            TableFormat::Ecsv => "ecsv",
        }
    }
}

impl Default for TableFormat {
    fn default() -> Self {
        TableFormat::CommentedHeader
    }
}

impl fmt::Display for TableFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().trim_start_matches("ascii.") {
            "commented_header" => Ok(TableFormat::CommentedHeader),
            "ecsv" => Ok(TableFormat::Ecsv),
            other => Err(format!(
                "Unsupported table format: {}. Use 'commented_header' or 'ecsv'",
                other
            )),
        }
    }
}

/// Large-scale environment of a galaxy.
///
/// The integer codes are the ones written to the `vflag` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VFlag {
    /// Distance was not positive, so the galaxy was never classified.
    Unclassified,
    Wall,
    Void,
    /// Inside the survey but too close to its boundary to decide.
    Edge,
    OutsideSurvey,
}

impl VFlag {
    pub const fn code(self) -> i64 {
        match self {
            VFlag::Unclassified => -9,
            VFlag::Wall => 0,
            VFlag::Void => 1,
            VFlag::Edge => 2,
            VFlag::OutsideSurvey => 9,
        }
    }

    /// Maps a raw classifier code back to a flag; unknown codes yield `None`.
    ///
    /// # Examples
    ///
    /// ```
    /// use vast_rust::core::domain::VFlag;
    ///
    /// assert_eq!(VFlag::from_code(1), Some(VFlag::Void));
    /// assert_eq!(VFlag::from_code(-9), Some(VFlag::Unclassified));
    /// assert_eq!(VFlag::from_code(5), None);
    /// ```
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            -9 => Some(VFlag::Unclassified),
            0 => Some(VFlag::Wall),
            1 => Some(VFlag::Void),
            2 => Some(VFlag::Edge),
            9 => Some(VFlag::OutsideSurvey),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            VFlag::Unclassified => "unclassified",
            VFlag::Wall => "wall",
            VFlag::Void => "void",
            VFlag::Edge => "edge",
            VFlag::OutsideSurvey => "outside survey",
        }
    }
}

/// Minimum and maximum galaxy distance (Mpc/h) covered by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceLimits {
    pub min: f64,
    pub max: f64,
}

impl DistanceLimits {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

impl fmt::Display for DistanceLimits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

/// Number of hole-grid cells along each Cartesian axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridShape(pub [usize; 3]);

impl GridShape {
    pub fn cell_count(&self) -> usize {
        self.0.iter().product()
    }
}

impl fmt::Display for GridShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.0[0], self.0[1], self.0[2])
    }
}

const RADIUS_COLUMNS: [&str; 2] = ["R", "radius"];
const VOID_ID_COLUMNS: [&str; 2] = ["voidID", "flag"];

/// Catalog of void holes: the maximal spheres and the void each belongs to.
///
/// Columns `x`, `y`, `z` give the sphere centre in Mpc/h. The radius column is
/// `R` (older catalogs) or `radius`; the void identifier is `voidID` or `flag`.
#[derive(Debug, Clone, PartialEq)]
pub struct VoidCatalog {
    table: Table,
    radius_column: &'static str,
    void_id_column: &'static str,
}

impl VoidCatalog {
    /// Wraps a hole table after checking the required columns are present.
    pub fn from_table(table: Table) -> Result<Self, TableError> {
        for name in ["x", "y", "z"] {
            table.column(name)?;
        }
        let radius_column = first_present(&table, &RADIUS_COLUMNS)?;
        let void_id_column = first_present(&table, &VOID_ID_COLUMNS)?;

        Ok(Self {
            table,
            radius_column,
            void_id_column,
        })
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn radius_column(&self) -> &str {
        self.radius_column
    }

    pub fn void_id_column(&self) -> &str {
        self.void_id_column
    }

    /// Number of holes (spheres), not distinct voids.
    pub fn hole_count(&self) -> usize {
        self.table.len()
    }
}

fn first_present(table: &Table, candidates: &[&'static str]) -> Result<&'static str, TableError> {
    candidates
        .iter()
        .copied()
        .find(|name| table.has_column(name))
        .ok_or_else(|| TableError::MissingColumn(candidates.join("' or '")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::table::{Column, ColumnData};

    fn holes(radius: &str, id: &str) -> Table {
        Table::from_columns(vec![
            Column::new("x", ColumnData::Float(vec![1.0])),
            Column::new("y", ColumnData::Float(vec![2.0])),
            Column::new("z", ColumnData::Float(vec![3.0])),
            Column::new(radius, ColumnData::Float(vec![10.0])),
            Column::new(id, ColumnData::Int(vec![0])),
        ])
        .unwrap()
    }

    #[test]
    fn test_distance_metric_parsing() {
        assert_eq!("comoving".parse(), Ok(DistanceMetric::Comoving));
        assert_eq!("Redshift".parse(), Ok(DistanceMetric::Redshift));
        assert!("luminosity".parse::<DistanceMetric>().is_err());
    }

    #[test]
    fn test_table_format_accepts_astropy_prefix() {
        assert_eq!("ascii.ecsv".parse(), Ok(TableFormat::Ecsv));
        assert_eq!(
            "commented_header".parse(),
            Ok(TableFormat::CommentedHeader)
        );
        assert!("fits".parse::<TableFormat>().is_err());
    }

    #[test]
    fn test_vflag_codes_round_trip() {
        for flag in [
            VFlag::Unclassified,
            VFlag::Wall,
            VFlag::Void,
            VFlag::Edge,
            VFlag::OutsideSurvey,
        ] {
            assert_eq!(VFlag::from_code(flag.code()), Some(flag));
        }
    }

    #[test]
    fn test_void_catalog_accepts_both_column_conventions() {
        let legacy = VoidCatalog::from_table(holes("R", "voidID")).unwrap();
        assert_eq!(legacy.radius_column(), "R");
        assert_eq!(legacy.void_id_column(), "voidID");

        let current = VoidCatalog::from_table(holes("radius", "flag")).unwrap();
        assert_eq!(current.radius_column(), "radius");
        assert_eq!(current.void_id_column(), "flag");
        assert_eq!(current.hole_count(), 1);
    }

    #[test]
    fn test_void_catalog_requires_radius() {
        let err = VoidCatalog::from_table(holes("size", "flag")).unwrap_err();
        assert_eq!(err, TableError::MissingColumn("R' or 'radius".to_string()));
    }

    #[test]
    fn test_grid_shape_display() {
        let shape = GridShape([10, 20, 30]);
        assert_eq!(shape.to_string(), "(10, 20, 30)");
        assert_eq!(shape.cell_count(), 6000);
    }
}
