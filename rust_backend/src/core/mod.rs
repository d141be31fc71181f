//! Core types for the VAST driver.
//!
//! This module defines the value types both pipelines share: catalog tables,
//! distance metrics and table formats, environment flags, and the survey to
//! Cartesian coordinate conversion.

pub mod coordinates;
pub mod domain;
pub mod table;

pub use coordinates::{AngleUnit, CartesianPosition};
pub use domain::{DistanceLimits, DistanceMetric, GridShape, TableFormat, VFlag, VoidCatalog};
pub use table::{Column, ColumnData, Table, TableError};
