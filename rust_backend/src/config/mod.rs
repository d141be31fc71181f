//! Run configuration for both pipelines.
//!
//! # Example
//!
//! ```no_run
//! use vast_rust::config::PipelineConfig;
//!
//! let config = PipelineConfig::from_file("vast.toml").expect("Failed to load config");
//! let void_finding = config.void_finding().expect("Invalid [void_finding] section");
//! println!("Survey: {}", void_finding.survey_name);
//! ```

pub mod settings;

pub use settings::{
    ClassificationConfig, ConfigError, GridSettings, PipelineConfig, VoidFindingConfig,
};
