//! Parsers for astronomical catalog tables.
//!
//! This module reads and writes the two text layouts the VAST workflow uses
//! for galaxy and void catalogs.
//!
//! # Parsers
//!
//! - [`ascii_table`]: astropy `ascii.commented_header` tables
//! - [`ecsv`]: astropy Enhanced CSV (ECSV 1.0) tables
//! - [`tokenizer`]: quoting-aware field splitting shared by both
//!
//! # Example
//!
//! ```no_run
//! use vast_rust::parsing::ascii_table::parse_commented_header_file;
//! use std::path::Path;
//!
//! let holes = parse_commented_header_file(Path::new("kias_comoving_holes.txt"))
//!     .expect("Failed to parse void holes");
//! println!("{} holes", holes.len());
//! ```

pub mod ascii_table;
pub mod ecsv;
pub mod tokenizer;


pub use ascii_table::{parse_commented_header_file, write_commented_header_file};
pub use ecsv::{parse_ecsv_file, write_ecsv_file};
