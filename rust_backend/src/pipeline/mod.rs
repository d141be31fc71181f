//! The two VAST driver pipelines.
//!
//! - [`void_finding`]: preprocess a galaxy catalog, build its survey mask,
//!   split wall from field galaxies and grow voids
//! - [`classification`]: label each galaxy of a catalog with its environment
//!   relative to a finished void catalog
//!
//! Both are generic over the engine traits in [`crate::engine`].
//!
//! # Example
//!
//! ```ignore
//! use vast_rust::config::PipelineConfig;
//! use vast_rust::engine::python::PyVoidFinder;
//! use vast_rust::pipeline::VoidFindingPipeline;
//!
//! let config = PipelineConfig::from_default_location()?;
//! let pipeline = VoidFindingPipeline::new(config.void_finding()?.clone())?;
//! let report = pipeline.run(&PyVoidFinder::new()?)?;
//! println!("{} wall galaxies", report.wall_count);
//! ```

pub mod classification;
pub mod void_finding;

pub use classification::{ClassificationPipeline, ClassificationReport};
pub use void_finding::{Stage, VoidFindingPipeline, VoidFindingReport};
