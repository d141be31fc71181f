//! Scripted engine shared by the pipeline integration tests.
//!
//! Stands in for VAST VoidFinder: galaxies are plain points, the survey mask is
//! a sphere around the observer, and a galaxy is in a void when it falls
//! inside any hole of the catalog. Every call is recorded so tests can check
//! what the pipelines asked for and in which order.

#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;

use vast_rust::core::domain::{DistanceLimits, GridShape, VFlag, VoidCatalog};
use vast_rust::engine::{
    EngineError, EnvironmentClassifier, FilterRequest, FilteredGalaxies, FindVoidsRequest,
    MaskRequest, PreprocessOutput, PreprocessRequest, SurveyMask, SurveyMaskCodec, VoidFinder,
};

pub type Point = [f64; 3];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SphereMask {
    pub survey_radius: f64,
}

#[derive(Serialize, Deserialize)]
struct FilteredRecord {
    wall: Vec<Point>,
    field: Vec<Point>,
    grid_shape: [usize; 3],
    coords_min: Vec<Point>,
}

/// What `find_voids` was handed, after the checkpoints were decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct FindVoidsCall {
    pub mask: SurveyMask<SphereMask>,
    pub wall: Vec<Point>,
    pub field: Vec<Point>,
    pub grid_shape: GridShape,
    pub request: FindVoidsRequest,
}

pub struct ScriptedEngine {
    pub galaxies: Vec<Point>,
    pub survey_radius: f64,
    /// Galaxies closer to the origin than this are "field"
    pub field_radius: f64,
    /// Name of the call that should fail, if any
    pub fail_on: Option<&'static str>,
    pub calls: RefCell<Vec<&'static str>>,
    pub find_voids_call: RefCell<Option<FindVoidsCall>>,
    pub filter_request: RefCell<Option<FilterRequest>>,
    pub comoving_inputs: RefCell<Vec<f64>>,
}

impl ScriptedEngine {
    pub fn new(galaxies: Vec<Point>) -> Self {
        Self {
            galaxies,
            survey_radius: 300.0,
            field_radius: 20.0,
            fail_on: None,
            calls: RefCell::new(Vec::new()),
            find_voids_call: RefCell::new(None),
            filter_request: RefCell::new(None),
            comoving_inputs: RefCell::new(Vec::new()),
        }
    }

    pub fn failing_on(mut self, call: &'static str) -> Self {
        self.fail_on = Some(call);
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: &'static str) -> Result<(), EngineError> {
        self.calls.borrow_mut().push(call);
        if self.fail_on == Some(call) {
            return Err(EngineError::Python(format!("scripted failure in {}", call)));
        }
        Ok(())
    }

    pub fn mask(&self) -> SurveyMask<SphereMask> {
        SurveyMask {
            mask: SphereMask {
                survey_radius: self.survey_radius,
            },
            resolution: 1,
        }
    }
}

fn norm(p: &Point) -> f64 {
    (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt()
}

fn codec_error(err: serde_json::Error) -> EngineError {
    EngineError::Codec(err.to_string())
}

impl SurveyMaskCodec for ScriptedEngine {
    type Mask = SphereMask;

    fn encode_mask(&self, mask: &SurveyMask<SphereMask>) -> Result<Vec<u8>, EngineError> {
        serde_json::to_vec(&(&mask.mask, mask.resolution)).map_err(codec_error)
    }

    fn decode_mask(&self, bytes: &[u8]) -> Result<SurveyMask<SphereMask>, EngineError> {
        let (mask, resolution): (SphereMask, i64) =
            serde_json::from_slice(bytes).map_err(codec_error)?;
        Ok(SurveyMask { mask, resolution })
    }
}

impl VoidFinder for ScriptedEngine {
    type Catalog = Vec<Point>;
    type Coordinates = Vec<Point>;

    fn file_preprocess(
        &self,
        request: &PreprocessRequest,
    ) -> Result<PreprocessOutput<Vec<Point>>, EngineError> {
        self.record("file_preprocess")?;
        let max = self.galaxies.iter().map(norm).fold(0.0, f64::max);
        let stem = request.galaxies_filename.trim_end_matches(".txt");
        Ok(PreprocessOutput {
            catalog: self.galaxies.clone(),
            dist_limits: DistanceLimits::new(0.0, max),
            maximal_spheres_path: request
                .out_directory
                .join(format!("{}_{}_maximal.txt", stem, request.dist_metric)),
            holes_path: request
                .out_directory
                .join(format!("{}_{}_holes.txt", stem, request.dist_metric)),
            galaxy_count: self.galaxies.len(),
        })
    }

    fn generate_mask(
        &self,
        _catalog: &Vec<Point>,
        _request: &MaskRequest,
    ) -> Result<SurveyMask<SphereMask>, EngineError> {
        self.record("generate_mask")?;
        Ok(self.mask())
    }

    fn filter_galaxies(
        &self,
        catalog: &Vec<Point>,
        request: &FilterRequest,
    ) -> Result<FilteredGalaxies<Vec<Point>>, EngineError> {
        self.record("filter_galaxies")?;
        *self.filter_request.borrow_mut() = Some(request.clone());
        let (field, wall): (Vec<Point>, Vec<Point>) = catalog
            .iter()
            .copied()
            .partition(|p| norm(p) < self.field_radius);
        Ok(FilteredGalaxies {
            wall,
            field,
            grid_shape: GridShape([4, 4, 4]),
            coords_min: vec![[-10.0, -10.0, -10.0]],
        })
    }

    fn find_voids(
        &self,
        galaxies: &FilteredGalaxies<Vec<Point>>,
        mask: &SurveyMask<SphereMask>,
        request: &FindVoidsRequest,
    ) -> Result<(), EngineError> {
        self.record("find_voids")?;
        let write = |path: &PathBuf, content: &str| {
            fs::write(path, content).map_err(|e| EngineError::Python(e.to_string()))
        };
        write(&request.maximal_spheres_path, "# x y z radius flag\n0.0 0.0 0.0 15.0 0\n")?;
        write(&request.holes_path, "# x y z radius flag\n0.0 0.0 0.0 15.0 0\n")?;
        write(&request.potential_voids_path, "1\n")?;

        *self.find_voids_call.borrow_mut() = Some(FindVoidsCall {
            mask: mask.clone(),
            wall: galaxies.wall.clone(),
            field: galaxies.field.clone(),
            grid_shape: galaxies.grid_shape,
            request: request.clone(),
        });
        Ok(())
    }

    fn encode_filtered(
        &self,
        galaxies: &FilteredGalaxies<Vec<Point>>,
    ) -> Result<Vec<u8>, EngineError> {
        serde_json::to_vec(&FilteredRecord {
            wall: galaxies.wall.clone(),
            field: galaxies.field.clone(),
            grid_shape: galaxies.grid_shape.0,
            coords_min: galaxies.coords_min.clone(),
        })
        .map_err(codec_error)
    }

    fn decode_filtered(&self, bytes: &[u8]) -> Result<FilteredGalaxies<Vec<Point>>, EngineError> {
        let record: FilteredRecord = serde_json::from_slice(bytes).map_err(codec_error)?;
        Ok(FilteredGalaxies {
            wall: record.wall,
            field: record.field,
            grid_shape: GridShape(record.grid_shape),
            coords_min: record.coords_min,
        })
    }

    fn coordinate_count(&self, coordinates: &Vec<Point>) -> Result<usize, EngineError> {
        Ok(coordinates.len())
    }
}

impl EnvironmentClassifier for ScriptedEngine {
    /// (centre, radius) per hole
    type Voids = Vec<(Point, f64)>;

    /// 1000 Mpc/h per unit redshift
    fn z_to_comoving_dist(
        &self,
        redshifts: &[f64],
        _omega_m: f64,
        _h: f64,
    ) -> Result<Vec<f64>, EngineError> {
        self.record("z_to_comoving_dist")?;
        self.comoving_inputs.borrow_mut().extend_from_slice(redshifts);
        Ok(redshifts.iter().map(|z| z * 1000.0).collect())
    }

    fn prepare_voids(&self, voids: &VoidCatalog) -> Result<Self::Voids, EngineError> {
        self.record("prepare_voids")?;
        let table = voids.table();
        let column = |name: &str| {
            table
                .f64_values(name)
                .map_err(|e| EngineError::invalid_output("prepare_voids", e.to_string()))
        };
        let (x, y, z, r) = (
            column("x")?,
            column("y")?,
            column("z")?,
            column(voids.radius_column())?,
        );
        Ok((0..x.len()).map(|i| ([x[i], y[i], z[i]], r[i])).collect())
    }

    fn determine_vflag(
        &self,
        x: f64,
        y: f64,
        z: f64,
        voids: &Self::Voids,
        mask: &SurveyMask<SphereMask>,
    ) -> Result<i64, EngineError> {
        self.record("determine_vflag")?;
        let p = [x, y, z];
        if norm(&p) > mask.mask.survey_radius {
            return Ok(VFlag::OutsideSurvey.code());
        }
        let inside = voids.iter().any(|(centre, radius)| {
            let d = [p[0] - centre[0], p[1] - centre[1], p[2] - centre[2]];
            norm(&d) < *radius
        });
        Ok(if inside { VFlag::Void.code() } else { VFlag::Wall.code() })
    }
}
