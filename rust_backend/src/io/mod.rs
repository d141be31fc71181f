//! Catalog and checkpoint I/O.
//!
//! This module provides loaders that combine the table parsers with the
//! domain types, and the checkpoint store used to pass stage outputs between
//! pipeline stages through the filesystem.
//!
//! # Example
//!
//! ```no_run
//! use vast_rust::core::TableFormat;
//! use vast_rust::io::CatalogLoader;
//! use std::path::Path;
//!
//! let galaxies = CatalogLoader::load(Path::new("nsa_v1_0_1_main.txt"), TableFormat::CommentedHeader)
//!     .expect("Failed to load");
//! println!("Loaded {} galaxies", galaxies.len());
//! ```

pub mod checkpoint;
pub mod loaders;

pub use checkpoint::{CheckpointStatus, CheckpointStore};
pub use loaders::CatalogLoader;
