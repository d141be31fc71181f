//! VAST VoidFinder engine backed by an embedded Python interpreter.
//!
//! Every library structure stays a Python object (`Py<PyAny>`) on the Rust
//! side. Checkpoints are written with `pickle` in the same tuple layout the
//! VoidFinder scripts use, so mask files are interchangeable with theirs.

use pyo3::prelude::*;
use pyo3::types::{PyBytes, PyDict, PyTuple};
use pyo3::IntoPyObjectExt;
use std::path::Path;

use super::{
    EngineError, EnvironmentClassifier, FilterRequest, FilteredGalaxies, FindVoidsRequest,
    MaskRequest, PreprocessOutput, PreprocessRequest, SurveyMask, SurveyMaskCodec, VoidFinder,
};
use crate::core::domain::{DistanceLimits, GridShape, VoidCatalog};
use crate::core::table::ColumnData;

const REQUIRED_MODULES: [&str; 6] = [
    "vast.voidfinder",
    "vast.voidfinder.preprocessing",
    "vast.voidfinder.multizmask",
    "vast.voidfinder.vflag",
    "vast.voidfinder.distance",
    "numpy",
];

/// Engine calling the installed `vast` package.
#[derive(Debug)]
pub struct PyVoidFinder {
    _private: (),
}

impl PyVoidFinder {
    /// Import the library modules up front so a missing install fails before any stage runs.
    pub fn new() -> Result<Self, EngineError> {
        Python::attach(|py| {
            for module in REQUIRED_MODULES {
                py.import(module).map_err(|err| {
                    EngineError::Unavailable(format!("cannot import {}: {}", module, err))
                })?;
            }
            Ok(Self { _private: () })
        })
    }
}

/// VoidFinder joins directory and file names by concatenation.
fn dir_arg(path: &Path) -> String {
    let mut dir = path.to_string_lossy().into_owned();
    if !dir.ends_with('/') && !dir.ends_with(std::path::MAIN_SEPARATOR) {
        dir.push(std::path::MAIN_SEPARATOR);
    }
    dir
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Flatten any array-like (list, tuple, numpy array of any float width) to `f64`s.
fn to_f64_vec(py: Python<'_>, obj: &Bound<'_, PyAny>) -> PyResult<Vec<f64>> {
    let numpy = py.import("numpy")?;
    let kwargs = PyDict::new(py);
    kwargs.set_item("dtype", numpy.getattr("float64")?)?;
    Ok(numpy
        .getattr("asarray")?
        .call((obj,), Some(&kwargs))?
        .call_method0("ravel")?
        .call_method0("tolist")?
        .extract::<Vec<f64>>()?)
}

fn dist_limits_from(
    py: Python<'_>,
    obj: &Bound<'_, PyAny>,
    call: &'static str,
) -> Result<DistanceLimits, EngineError> {
    match to_f64_vec(py, obj)?.as_slice() {
        [min, max] => Ok(DistanceLimits::new(*min, *max)),
        other => Err(EngineError::invalid_output(
            call,
            format!("expected two distance limits, got {}", other.len()),
        )),
    }
}

fn grid_shape_from(obj: &Bound<'_, PyAny>, call: &'static str) -> Result<GridShape, EngineError> {
    let dims: Vec<usize> = obj
        .py()
        .import("builtins")?
        .getattr("list")?
        .call1((obj,))?
        .extract::<Vec<usize>>()?;
    match dims.as_slice() {
        [nx, ny, nz] => Ok(GridShape([*nx, *ny, *nz])),
        other => Err(EngineError::invalid_output(
            call,
            format!("expected a 3-dimensional grid shape, got {} dimensions", other.len()),
        )),
    }
}

/// `(wall, field, grid_shape, coords_min)` as returned by `filter_galaxies`.
type FilterOutput<'py> = (
    Bound<'py, PyAny>,
    Bound<'py, PyAny>,
    Bound<'py, PyAny>,
    Bound<'py, PyAny>,
);

fn dumps(py: Python<'_>, value: Bound<'_, PyTuple>) -> Result<Vec<u8>, EngineError> {
    let pickle = py.import("pickle")?;
    let bytes = pickle
        .call_method1("dumps", (value,))
        .map_err(|err| EngineError::Codec(err.to_string()))?;
    bytes
        .extract::<Vec<u8>>()
        .map_err(|err| EngineError::Codec(err.to_string()))
}

fn loads<'py>(py: Python<'py>, bytes: &[u8]) -> Result<Bound<'py, PyAny>, EngineError> {
    let pickle = py.import("pickle")?;
    pickle
        .call_method1("loads", (PyBytes::new(py, bytes),))
        .map_err(|err| EngineError::Codec(err.to_string()))
}

fn column_to_py<'py>(py: Python<'py>, data: &ColumnData) -> PyResult<Bound<'py, PyAny>> {
    match data {
        ColumnData::Int(values) => values.into_bound_py_any(py),
        ColumnData::Float(values) => values.into_bound_py_any(py),
        ColumnData::Str(values) => values.into_bound_py_any(py),
    }
}

impl SurveyMaskCodec for PyVoidFinder {
    type Mask = Py<PyAny>;

    fn encode_mask(&self, mask: &SurveyMask<Self::Mask>) -> Result<Vec<u8>, EngineError> {
        Python::attach(|py| {
            let value = PyTuple::new(
                py,
                [
                    mask.mask.bind(py).clone(),
                    mask.resolution.into_bound_py_any(py)?,
                ],
            )?;
            dumps(py, value)
        })
    }

    fn decode_mask(&self, bytes: &[u8]) -> Result<SurveyMask<Self::Mask>, EngineError> {
        Python::attach(|py| {
            let (mask, resolution) = loads(py, bytes)?
                .extract::<(Bound<'_, PyAny>, i64)>()
                .map_err(|err| EngineError::Codec(format!("mask checkpoint: {}", err)))?;
            Ok(SurveyMask {
                mask: mask.unbind(),
                resolution,
            })
        })
    }
}

impl VoidFinder for PyVoidFinder {
    type Catalog = Py<PyAny>;
    type Coordinates = Py<PyAny>;

    fn file_preprocess(
        &self,
        request: &PreprocessRequest,
    ) -> Result<PreprocessOutput<Self::Catalog>, EngineError> {
        Python::attach(|py| {
            let preprocessing = py.import("vast.voidfinder.preprocessing")?;

            let kwargs = PyDict::new(py);
            if let Some(mag_cut) = request.mag_cut {
                kwargs.set_item("mag_cut", mag_cut)?;
            }
            if let Some(rm_isolated) = request.rm_isolated {
                kwargs.set_item("rm_isolated", rm_isolated)?;
            }
            kwargs.set_item("dist_metric", request.dist_metric.as_str())?;
            kwargs.set_item("min_z", request.min_z)?;
            kwargs.set_item("max_z", request.max_z)?;
            kwargs.set_item("Omega_M", request.omega_m)?;
            if let Some(h) = request.h {
                kwargs.set_item("h", h)?;
            }
            kwargs.set_item("verbose", request.verbose)?;

            let result = preprocessing.getattr("file_preprocess")?.call(
                (
                    request.galaxies_filename.as_str(),
                    dir_arg(&request.in_directory),
                    dir_arg(&request.out_directory),
                ),
                Some(&kwargs),
            )?;
            let (catalog, dist_limits, out1, out2) = result
                .extract::<(Bound<'_, PyAny>, Bound<'_, PyAny>, String, String)>()
                .map_err(|err| EngineError::invalid_output("file_preprocess", err.to_string()))?;

            Ok(PreprocessOutput {
                galaxy_count: catalog.len()?,
                dist_limits: dist_limits_from(py, &dist_limits, "file_preprocess")?,
                catalog: catalog.unbind(),
                maximal_spheres_path: out1.into(),
                holes_path: out2.into(),
            })
        })
    }

    fn generate_mask(
        &self,
        catalog: &Self::Catalog,
        request: &MaskRequest,
    ) -> Result<SurveyMask<Self::Mask>, EngineError> {
        Python::attach(|py| {
            let multizmask = py.import("vast.voidfinder.multizmask")?;

            let kwargs = PyDict::new(py);
            kwargs.set_item("Omega_M", request.omega_m)?;
            if let Some(h) = request.h {
                kwargs.set_item("h", h)?;
            }
            kwargs.set_item("smooth_mask", request.smooth_mask)?;

            let (mask, resolution) = multizmask
                .getattr("generate_mask")?
                .call((catalog.bind(py), request.max_z), Some(&kwargs))?
                .extract::<(Bound<'_, PyAny>, i64)>()
                .map_err(|err| EngineError::invalid_output("generate_mask", err.to_string()))?;

            Ok(SurveyMask {
                mask: mask.unbind(),
                resolution,
            })
        })
    }

    fn filter_galaxies(
        &self,
        catalog: &Self::Catalog,
        request: &FilterRequest,
    ) -> Result<FilteredGalaxies<Self::Coordinates>, EngineError> {
        Python::attach(|py| {
            let voidfinder = py.import("vast.voidfinder")?;

            let kwargs = PyDict::new(py);
            kwargs.set_item(
                "dist_limits",
                [request.dist_limits.min, request.dist_limits.max],
            )?;
            if let Some(mag_cut) = request.mag_cut {
                kwargs.set_item("mag_cut_flag", mag_cut)?;
            }
            if let Some(rm_isolated) = request.rm_isolated {
                kwargs.set_item("rm_isolated_flag", rm_isolated)?;
            }
            if let Some(edge) = request.hole_grid_edge_length {
                kwargs.set_item("hole_grid_edge_length", edge)?;
            }
            kwargs.set_item("dist_metric", request.dist_metric.as_str())?;
            if let Some(h) = request.h {
                kwargs.set_item("h", h)?;
            }
            kwargs.set_item("magnitude_limit", request.magnitude_limit)?;
            kwargs.set_item("verbose", request.verbose)?;

            let result = voidfinder.getattr("filter_galaxies")?.call(
                (
                    catalog.bind(py),
                    request.survey_name.as_str(),
                    dir_arg(&request.out_directory),
                ),
                Some(&kwargs),
            )?;
            let (wall, field, grid_shape, coords_min) = result
                .extract::<FilterOutput<'_>>()
                .map_err(|err| EngineError::invalid_output("filter_galaxies", err.to_string()))?;

            Ok(FilteredGalaxies {
                grid_shape: grid_shape_from(&grid_shape, "filter_galaxies")?,
                wall: wall.unbind(),
                field: field.unbind(),
                coords_min: coords_min.unbind(),
            })
        })
    }

    fn find_voids(
        &self,
        galaxies: &FilteredGalaxies<Self::Coordinates>,
        mask: &SurveyMask<Self::Mask>,
        request: &FindVoidsRequest,
    ) -> Result<(), EngineError> {
        Python::attach(|py| {
            let voidfinder = py.import("vast.voidfinder")?;

            let kwargs = PyDict::new(py);
            if let Some(save_after) = request.save_after {
                kwargs.set_item("save_after", save_after)?;
            }
            if let Some(use_start_checkpoint) = request.use_start_checkpoint {
                kwargs.set_item("use_start_checkpoint", use_start_checkpoint)?;
            }
            if let Some(edge) = request.hole_grid_edge_length {
                kwargs.set_item("hole_grid_edge_length", edge)?;
            }
            if let Some(edge) = request.galaxy_map_grid_edge_length {
                kwargs.set_item("galaxy_map_grid_edge_length", edge)?;
            }
            if let Some(dist) = request.hole_center_iter_dist {
                kwargs.set_item("hole_center_iter_dist", dist)?;
            }
            kwargs.set_item("maximal_spheres_filename", path_arg(&request.maximal_spheres_path))?;
            kwargs.set_item("void_table_filename", path_arg(&request.holes_path))?;
            kwargs.set_item("potential_voids_filename", path_arg(&request.potential_voids_path))?;
            kwargs.set_item("num_cpus", request.num_cpus)?;
            kwargs.set_item("batch_size", request.batch_size)?;
            kwargs.set_item("verbose", request.verbose)?;
            kwargs.set_item("print_after", request.print_after)?;

            let dist_limits = [request.dist_limits.min, request.dist_limits.max];
            let grid_shape = PyTuple::new(py, galaxies.grid_shape.0)?;
            let args = PyTuple::new(
                py,
                [
                    galaxies.wall.bind(py).clone(),
                    dist_limits.into_bound_py_any(py)?,
                    mask.mask.bind(py).clone(),
                    mask.resolution.into_bound_py_any(py)?,
                    galaxies.coords_min.bind(py).clone(),
                    grid_shape.into_any(),
                    request.survey_name.as_str().into_bound_py_any(py)?,
                ],
            )?;

            voidfinder.getattr("find_voids")?.call(args, Some(&kwargs))?;
            Ok(())
        })
    }

    fn encode_filtered(
        &self,
        galaxies: &FilteredGalaxies<Self::Coordinates>,
    ) -> Result<Vec<u8>, EngineError> {
        Python::attach(|py| {
            let value = PyTuple::new(
                py,
                [
                    galaxies.wall.bind(py).clone(),
                    galaxies.field.bind(py).clone(),
                    PyTuple::new(py, galaxies.grid_shape.0)?.into_any(),
                    galaxies.coords_min.bind(py).clone(),
                ],
            )?;
            dumps(py, value)
        })
    }

    fn decode_filtered(
        &self,
        bytes: &[u8],
    ) -> Result<FilteredGalaxies<Self::Coordinates>, EngineError> {
        Python::attach(|py| {
            let (wall, field, grid_shape, coords_min) = loads(py, bytes)?
                .extract::<FilterOutput<'_>>()
                .map_err(|err| EngineError::Codec(format!("filter checkpoint: {}", err)))?;

            Ok(FilteredGalaxies {
                grid_shape: grid_shape_from(&grid_shape, "filter checkpoint")?,
                wall: wall.unbind(),
                field: field.unbind(),
                coords_min: coords_min.unbind(),
            })
        })
    }

    fn coordinate_count(&self, coordinates: &Self::Coordinates) -> Result<usize, EngineError> {
        Python::attach(|py| Ok(coordinates.bind(py).len()?))
    }
}

impl EnvironmentClassifier for PyVoidFinder {
    type Voids = Py<PyAny>;

    fn z_to_comoving_dist(
        &self,
        redshifts: &[f64],
        omega_m: f64,
        h: f64,
    ) -> Result<Vec<f64>, EngineError> {
        Python::attach(|py| {
            let numpy = py.import("numpy")?;
            let distance = py.import("vast.voidfinder.distance")?;

            // VoidFinder integrates single-precision redshifts
            let kwargs = PyDict::new(py);
            kwargs.set_item("dtype", numpy.getattr("float32")?)?;
            let z = numpy.getattr("asarray")?.call((redshifts,), Some(&kwargs))?;

            let distances = distance
                .getattr("z_to_comoving_dist")?
                .call1((z, omega_m, h))?;
            let distances = to_f64_vec(py, &distances)?;
            if distances.len() != redshifts.len() {
                return Err(EngineError::invalid_output(
                    "z_to_comoving_dist",
                    format!("{} distances for {} redshifts", distances.len(), redshifts.len()),
                ));
            }
            Ok(distances)
        })
    }

    fn prepare_voids(&self, voids: &VoidCatalog) -> Result<Self::Voids, EngineError> {
        Python::attach(|py| {
            let astropy_table = py.import("astropy.table")?;

            let columns = PyDict::new(py);
            for column in voids.table().columns() {
                columns.set_item(column.name.as_str(), column_to_py(py, &column.data)?)?;
            }
            let table = astropy_table.getattr("Table")?.call1((columns,))?;
            Ok(table.unbind())
        })
    }

    fn determine_vflag(
        &self,
        x: f64,
        y: f64,
        z: f64,
        voids: &Self::Voids,
        mask: &SurveyMask<Self::Mask>,
    ) -> Result<i64, EngineError> {
        Python::attach(|py| {
            let vflag = py.import("vast.voidfinder.vflag")?;
            let code = vflag
                .getattr("determine_vflag")?
                .call1((x, y, z, voids.bind(py), mask.mask.bind(py), mask.resolution))?
                .extract::<i64>()
                .map_err(|err| EngineError::invalid_output("determine_vflag", err.to_string()))?;
            Ok(code)
        })
    }
}
