use anyhow::{Context, Result};
use log::{debug, info};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::{ClassificationConfig, ConfigError};
use crate::core::coordinates::{hubble_distance, positions_from_columns, AngleUnit, CartesianPosition};
use crate::core::domain::{DistanceMetric, TableFormat, VFlag};
use crate::core::table::{Column, ColumnData, Table};
use crate::engine::EnvironmentClassifier;
use crate::io::{CatalogLoader, CheckpointStore};

const DISTANCE_COLUMN: &str = "Rgal";
const REDSHIFT_COLUMN: &str = "redshift";
const VFLAG_COLUMN: &str = "vflag";

/// Summary of a completed classification run
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationReport {
    pub output_path: PathBuf,
    pub dist_metric: DistanceMetric,
    pub galaxy_count: usize,
    /// Galaxies with positive distance, i.e. passed to the classifier
    pub classified_count: usize,
    /// Galaxies per raw `vflag` code
    pub vflag_counts: BTreeMap<i64, usize>,
    /// Whether `Rgal` was computed and added to the catalog
    pub computed_rgal: bool,
}

impl ClassificationReport {
    pub fn count(&self, flag: VFlag) -> usize {
        self.vflag_counts.get(&flag.code()).copied().unwrap_or(0)
    }
}

/// Label every galaxy of a catalog with its large-scale environment.
pub struct ClassificationPipeline {
    config: ClassificationConfig,
}

impl ClassificationPipeline {
    pub fn new(config: ClassificationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ClassificationConfig {
        &self.config
    }

    /// Classify the configured catalog and write `<stem>_vflag_<metric>.txt`
    /// next to it.
    pub fn run<E: EnvironmentClassifier>(&self, engine: &E) -> Result<ClassificationReport> {
        let config = &self.config;

        // Step 1: Import voids, galaxies and the survey mask
        info!("Importing data");
        let voids = CatalogLoader::load_void_catalog(&config.void_filename)?;
        let mut galaxies = CatalogLoader::load(&config.galaxy_filename, config.galaxy_file_format)
            .with_context(|| {
                format!("Failed to load galaxy catalog: {}", config.galaxy_filename.display())
            })?;
        let mask_bytes = CheckpointStore::read(&config.mask_filename)?;
        let mask = engine.decode_mask(&mask_bytes).with_context(|| {
            format!("Failed to decode survey mask {}", config.mask_filename.display())
        })?;
        info!(
            "Data and mask imported: {} void holes, {} galaxies",
            voids.hole_count(),
            galaxies.len()
        );

        // Step 2: Distances and Cartesian positions
        info!("Converting coordinate system");
        let (distances, computed_rgal) = galaxy_distances(&mut galaxies, config, engine)?;
        let positions = galaxy_positions(&galaxies, &distances, config.galaxy_file_format)?;
        info!("Coordinates converted");

        // Step 3: Classify galaxies with a positive distance
        info!("Identifying environment");
        let prepared = engine.prepare_voids(&voids).context("Failed to prepare void catalog")?;
        let mut vflags = vec![VFlag::Unclassified.code(); galaxies.len()];
        let mut classified_count = 0;
        for (index, (position, &distance)) in positions.iter().zip(&distances).enumerate() {
            if distance > 0.0 {
                vflags[index] = engine
                    .determine_vflag(position.x, position.y, position.z, &prepared, &mask)
                    .with_context(|| format!("Failed to classify galaxy {}", index))?;
                classified_count += 1;
            }
        }

        let mut vflag_counts = BTreeMap::new();
        for &code in &vflags {
            *vflag_counts.entry(code).or_insert(0) += 1;
        }
        for (&code, &count) in &vflag_counts {
            match VFlag::from_code(code) {
                Some(flag) => debug!("vflag {} ({}): {}", code, flag.label(), count),
                None => debug!("vflag {} (unknown code): {}", code, count),
            }
        }
        galaxies.add_column(Column::new(VFLAG_COLUMN, ColumnData::Int(vflags)))?;
        info!("Environments identified");

        // Step 4: Save next to the input, in the input format
        let output_path = output_path(&config.galaxy_filename, config.dist_metric);
        CatalogLoader::save(&galaxies, &output_path, config.galaxy_file_format)?;
        info!("Classified catalog written to {}", output_path.display());

        Ok(ClassificationReport {
            output_path,
            dist_metric: config.dist_metric,
            galaxy_count: galaxies.len(),
            classified_count,
            vflag_counts,
            computed_rgal,
        })
    }
}

/// `<dir>/<stem>_vflag_<metric>.txt`, where `<stem>` drops the final extension.
///
/// # Examples
///
/// ```
/// use std::path::{Path, PathBuf};
/// use vast_rust::core::DistanceMetric;
/// use vast_rust::pipeline::classification::output_path;
///
/// assert_eq!(
///     output_path(Path::new("/data/nsa_v1_0_1_main.txt"), DistanceMetric::Comoving),
///     PathBuf::from("/data/nsa_v1_0_1_main_vflag_comoving.txt")
/// );
/// ```
pub fn output_path(galaxy_filename: &Path, dist_metric: DistanceMetric) -> PathBuf {
    let stem = galaxy_filename
        .file_stem()
        .map(|stem| stem.to_string_lossy())
        .unwrap_or_default();
    galaxy_filename.with_file_name(format!("{}_vflag_{}.txt", stem, dist_metric))
}

/// Distance of every galaxy in Mpc/h, and whether `Rgal` had to be computed.
///
/// With the comoving metric an existing `Rgal` column is used as is; otherwise
/// distances come from the engine and are stored as a new `Rgal` column. The
/// redshift metric uses the Hubble law.
pub fn galaxy_distances<E: EnvironmentClassifier>(
    galaxies: &mut Table,
    config: &ClassificationConfig,
    engine: &E,
) -> Result<(Vec<f64>, bool)> {
    match config.dist_metric {
        DistanceMetric::Comoving if galaxies.has_column(DISTANCE_COLUMN) => {
            Ok((galaxies.f64_values(DISTANCE_COLUMN)?, false))
        }
        DistanceMetric::Comoving => {
            let redshifts = galaxies.f64_values(REDSHIFT_COLUMN)?;
            let distances = engine
                .z_to_comoving_dist(&redshifts, config.omega_m, config.h)
                .context("Failed to compute comoving distances")?;
            galaxies.add_column(Column::new(DISTANCE_COLUMN, ColumnData::Float(distances.clone())))?;
            debug!("Added {} column for {} galaxies", DISTANCE_COLUMN, distances.len());
            Ok((distances, true))
        }
        DistanceMetric::Redshift => {
            let distances = galaxies
                .f64_values(REDSHIFT_COLUMN)?
                .into_iter()
                .map(|z| hubble_distance(z, config.speed_of_light, config.h))
                .collect();
            Ok((distances, false))
        }
    }
}

/// Cartesian positions from the `ra`/`dec` columns and `distances`.
///
/// Commented-header catalogs store angles in degrees. ECSV columns carry their
/// own unit; a unitless ECSV angle is read as radians.
pub fn galaxy_positions(
    galaxies: &Table,
    distances: &[f64],
    format: TableFormat,
) -> Result<Vec<CartesianPosition>> {
    let ra = angles_in_radians(galaxies, "ra", format)?;
    let dec = angles_in_radians(galaxies, "dec", format)?;
    Ok(positions_from_columns(&ra, &dec, distances, AngleUnit::Radians))
}

fn angles_in_radians(galaxies: &Table, name: &str, format: TableFormat) -> Result<Vec<f64>> {
    let column = galaxies.column(name)?;
    let unit = match format {
        TableFormat::CommentedHeader => AngleUnit::Degrees,
        TableFormat::Ecsv => column
            .unit
            .as_deref()
            .map(AngleUnit::from_unit_str)
            .unwrap_or(AngleUnit::Radians),
    };
    Ok(column
        .to_f64()?
        .into_iter()
        .map(|value| unit.to_radians(value).value())
        .collect())
}
