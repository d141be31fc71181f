//! VAST Rust driver - void finding and galaxy environment classification
//!
//! Drives the VAST VoidFinder library through its two workflows: finding voids
//! in a galaxy redshift survey, and classifying galaxies as void, wall or edge
//! members against a finished void catalog.
//!
//! # Modules
//!
//! - [`core`]: catalog tables, domain types and coordinate conversion
//! - [`parsing`]: astropy commented-header and ECSV table codecs
//! - [`io`]: catalog loaders and stage checkpoints
//! - [`engine`]: traits over the library entry points (and the Python engine)
//! - [`config`]: TOML run configuration
//! - [`pipeline`]: the void-finding and classification pipelines

pub mod config;
pub mod core;
pub mod engine;
pub mod io;
pub mod parsing;
pub mod pipeline;
