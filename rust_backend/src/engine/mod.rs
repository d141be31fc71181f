//! Seam between the driver and the void-finding library.
//!
//! The spatial algorithms (survey masks, hole growing, wall/field filtering,
//! point-in-void tests, comoving distance integration) live in VAST
//! VoidFinder. The pipelines only see the traits below, with the library's
//! own data structures carried through as associated types.
//!
//! - [`VoidFinder`]: the four stages of a void-finding run
//! - [`EnvironmentClassifier`]: the per-galaxy classification calls
//! - [`SurveyMaskCodec`]: the mask checkpoint both pipelines share
//!
//! With the `python` feature, [`python::PyVoidFinder`] implements all three
//! by calling the installed `vast` package through an embedded interpreter.

use serde::Serialize;
use std::path::PathBuf;

use crate::core::domain::{DistanceLimits, DistanceMetric, GridShape};

#[cfg(feature = "python")]
pub mod python;

/// Errors raised while calling into the engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Engine unavailable: {0}")]
    Unavailable(String),

    #[error("Python error: {0}")]
    Python(String),

    #[error("Checkpoint codec error: {0}")]
    Codec(String),

    #[error("Unexpected engine output from {call}: {message}")]
    InvalidOutput { call: &'static str, message: String },
}

impl EngineError {
    pub fn invalid_output(call: &'static str, message: impl Into<String>) -> Self {
        EngineError::InvalidOutput {
            call,
            message: message.into(),
        }
    }
}

#[cfg(feature = "python")]
impl From<pyo3::PyErr> for EngineError {
    fn from(err: pyo3::PyErr) -> Self {
        EngineError::Python(err.to_string())
    }
}

/// Survey mask with the angular resolution it was built at.
#[derive(Debug, Clone, PartialEq)]
pub struct SurveyMask<M> {
    pub mask: M,
    pub resolution: i64,
}

/// Wall and field galaxy coordinates plus the hole grid they were binned on.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredGalaxies<C> {
    pub wall: C,
    pub field: C,
    pub grid_shape: GridShape,
    /// Grid origin (minimum x, y, z)
    pub coords_min: C,
}

/// Everything `file_preprocess` hands to the later stages.
#[derive(Debug, Clone)]
pub struct PreprocessOutput<T> {
    pub catalog: T,
    pub dist_limits: DistanceLimits,
    /// Output table of maximal spheres, chosen by the library
    pub maximal_spheres_path: PathBuf,
    /// Output table of void holes, chosen by the library
    pub holes_path: PathBuf,
    pub galaxy_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreprocessRequest {
    pub galaxies_filename: String,
    pub in_directory: PathBuf,
    pub out_directory: PathBuf,
    pub dist_metric: DistanceMetric,
    pub min_z: Option<f64>,
    pub max_z: Option<f64>,
    pub omega_m: f64,
    pub h: Option<f64>,
    pub mag_cut: Option<bool>,
    pub rm_isolated: Option<bool>,
    pub verbose: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaskRequest {
    pub max_z: Option<f64>,
    pub omega_m: f64,
    pub h: Option<f64>,
    pub smooth_mask: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterRequest {
    pub survey_name: String,
    pub out_directory: PathBuf,
    pub dist_limits: DistanceLimits,
    pub dist_metric: DistanceMetric,
    pub magnitude_limit: f64,
    pub mag_cut: Option<bool>,
    pub rm_isolated: Option<bool>,
    pub hole_grid_edge_length: Option<f64>,
    pub h: Option<f64>,
    pub verbose: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FindVoidsRequest {
    pub survey_name: String,
    pub dist_limits: DistanceLimits,
    pub maximal_spheres_path: PathBuf,
    pub holes_path: PathBuf,
    pub potential_voids_path: PathBuf,
    pub num_cpus: Option<usize>,
    pub batch_size: usize,
    pub verbose: u8,
    pub print_after: f64,
    pub save_after: Option<usize>,
    pub use_start_checkpoint: Option<bool>,
    pub hole_grid_edge_length: Option<f64>,
    pub galaxy_map_grid_edge_length: Option<f64>,
    pub hole_center_iter_dist: Option<f64>,
}

/// Serialization of the survey mask checkpoint.
pub trait SurveyMaskCodec {
    type Mask;

    fn encode_mask(&self, mask: &SurveyMask<Self::Mask>) -> Result<Vec<u8>, EngineError>;

    fn decode_mask(&self, bytes: &[u8]) -> Result<SurveyMask<Self::Mask>, EngineError>;
}

/// The library entry points of a void-finding run, in call order.
pub trait VoidFinder: SurveyMaskCodec {
    /// Galaxy catalog as the library holds it after preprocessing
    type Catalog;
    /// A set of Cartesian points (or a single point for `coords_min`)
    type Coordinates;

    /// Read the galaxy file and apply the redshift limits and cosmology.
    fn file_preprocess(
        &self,
        request: &PreprocessRequest,
    ) -> Result<PreprocessOutput<Self::Catalog>, EngineError>;

    fn generate_mask(
        &self,
        catalog: &Self::Catalog,
        request: &MaskRequest,
    ) -> Result<SurveyMask<Self::Mask>, EngineError>;

    /// Split the catalog into wall and field galaxies.
    fn filter_galaxies(
        &self,
        catalog: &Self::Catalog,
        request: &FilterRequest,
    ) -> Result<FilteredGalaxies<Self::Coordinates>, EngineError>;

    /// Grow holes and merge them into voids, writing the output tables.
    fn find_voids(
        &self,
        galaxies: &FilteredGalaxies<Self::Coordinates>,
        mask: &SurveyMask<Self::Mask>,
        request: &FindVoidsRequest,
    ) -> Result<(), EngineError>;

    fn encode_filtered(
        &self,
        galaxies: &FilteredGalaxies<Self::Coordinates>,
    ) -> Result<Vec<u8>, EngineError>;

    fn decode_filtered(
        &self,
        bytes: &[u8],
    ) -> Result<FilteredGalaxies<Self::Coordinates>, EngineError>;

    /// Number of points in a coordinate set.
    fn coordinate_count(&self, coordinates: &Self::Coordinates) -> Result<usize, EngineError>;
}

/// The library calls made while classifying galaxy environments.
pub trait EnvironmentClassifier: SurveyMaskCodec {
    /// Void hole catalog in the library's representation
    type Voids;

    /// Comoving distances (Mpc/h) for each redshift.
    fn z_to_comoving_dist(
        &self,
        redshifts: &[f64],
        omega_m: f64,
        h: f64,
    ) -> Result<Vec<f64>, EngineError>;

    /// Convert the hole table once, before the per-galaxy loop.
    fn prepare_voids(
        &self,
        voids: &crate::core::domain::VoidCatalog,
    ) -> Result<Self::Voids, EngineError>;

    /// Raw environment code for one position; see [`crate::core::domain::VFlag`].
    fn determine_vflag(
        &self,
        x: f64,
        y: f64,
        z: f64,
        voids: &Self::Voids,
        mask: &SurveyMask<Self::Mask>,
    ) -> Result<i64, EngineError>;
}
