use anyhow::{Context, Result};
use std::path::Path;

use crate::core::domain::{TableFormat, VoidCatalog};
use crate::core::table::Table;
use crate::parsing::{ascii_table, ecsv};

/// Unified interface for reading and writing catalog tables
pub struct CatalogLoader;

impl CatalogLoader {
    /// Load a catalog table stored in `format`
    pub fn load(path: &Path, format: TableFormat) -> Result<Table> {
        match format {
            TableFormat::CommentedHeader => ascii_table::parse_commented_header_file(path),
            TableFormat::Ecsv => ecsv::parse_ecsv_file(path),
        }
    }

    /// Write a catalog table in `format`, overwriting any existing file
    pub fn save(table: &Table, path: &Path, format: TableFormat) -> Result<()> {
        match format {
            TableFormat::CommentedHeader => ascii_table::write_commented_header_file(table, path),
            TableFormat::Ecsv => ecsv::write_ecsv_file(table, path),
        }
    }

    /// Load a void hole catalog (commented-header layout, as VoidFinder writes it)
    pub fn load_void_catalog(path: &Path) -> Result<VoidCatalog> {
        let table = ascii_table::parse_commented_header_file(path)?;
        VoidCatalog::from_table(table)
            .with_context(|| format!("Invalid void catalog: {}", path.display()))
    }
}
