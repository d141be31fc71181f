use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{ConfigError, VoidFindingConfig};
use crate::core::domain::{DistanceLimits, GridShape};
use crate::engine::{
    FilterRequest, FindVoidsRequest, MaskRequest, PreprocessOutput, PreprocessRequest, VoidFinder,
};
use crate::io::{CheckpointStatus, CheckpointStore};

/// Stages of a void-finding run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Preprocess,
    GenerateMask,
    FilterGalaxies,
    FindVoids,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Preprocess => "preprocess",
            Stage::GenerateMask => "generate_mask",
            Stage::FilterGalaxies => "filter_galaxies",
            Stage::FindVoids => "find_voids",
        };
        f.write_str(name)
    }
}

/// Summary of a completed void-finding run
#[derive(Debug, Clone, Serialize)]
pub struct VoidFindingReport {
    pub survey_name: String,
    pub dist_limits: DistanceLimits,
    pub galaxy_count: usize,
    pub wall_count: usize,
    pub field_count: usize,
    pub mask_resolution: i64,
    pub grid_shape: GridShape,
    pub mask_path: PathBuf,
    pub filter_path: PathBuf,
    pub maximal_spheres_path: PathBuf,
    pub holes_path: PathBuf,
    pub potential_voids_path: PathBuf,
    /// Stages skipped because a checkpoint from an earlier run was reused
    pub reused_stages: Vec<Stage>,
}

/// Preprocess, mask, filter and find voids for one survey.
///
/// Stage outputs cross each boundary through checkpoint files: the mask and
/// the wall/field split are written to disk, dropped, and decoded again
/// before hole finding.
pub struct VoidFindingPipeline {
    config: VoidFindingConfig,
}

impl VoidFindingPipeline {
    /// Create a pipeline after validating `config`
    pub fn new(config: VoidFindingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &VoidFindingConfig {
        &self.config
    }

    /// Run every stage against `engine`.
    pub fn run<E: VoidFinder>(&self, engine: &E) -> Result<VoidFindingReport> {
        let config = &self.config;
        let mask_path = config.mask_checkpoint_path();
        let filter_path = config.filter_checkpoint_path();
        let potential_voids_path = config.potential_voids_path();
        let mut reused_stages = Vec::new();

        // Step 1: Output locations
        for dir in [&config.out_directory, &config.work_directory] {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }

        // Step 2: Preprocess the galaxy catalog
        info!("Preprocessing {}", config.galaxies_filename);
        let PreprocessOutput {
            catalog,
            dist_limits,
            maximal_spheres_path,
            holes_path,
            galaxy_count,
        } = engine
            .file_preprocess(&self.preprocess_request())
            .with_context(|| format!("Stage {} failed", Stage::Preprocess))?;
        info!("Distance limits: {}", dist_limits);
        debug!(
            "Preprocessed {} galaxies; outputs {} and {}",
            galaxy_count,
            maximal_spheres_path.display(),
            holes_path.display()
        );

        // Step 3: Survey mask, written to disk and released
        if self.reuse_checkpoint(&mask_path, Stage::GenerateMask)? {
            reused_stages.push(Stage::GenerateMask);
        } else {
            info!("Generating survey mask");
            let mask = engine
                .generate_mask(&catalog, &self.mask_request())
                .with_context(|| format!("Stage {} failed", Stage::GenerateMask))?;
            let bytes = engine.encode_mask(&mask).context("Failed to encode survey mask")?;
            CheckpointStore::write(&mask_path, &bytes)?;
            info!(
                "Survey mask (resolution {}) saved to {}",
                mask.resolution,
                mask_path.display()
            );
        }

        // Step 4: Wall/field split, after which the catalog is no longer needed
        if self.reuse_checkpoint(&filter_path, Stage::FilterGalaxies)? {
            reused_stages.push(Stage::FilterGalaxies);
        } else {
            info!("Filtering galaxies");
            let filtered = engine
                .filter_galaxies(&catalog, &self.filter_request(dist_limits))
                .with_context(|| format!("Stage {} failed", Stage::FilterGalaxies))?;
            let bytes = engine
                .encode_filtered(&filtered)
                .context("Failed to encode filtered galaxies")?;
            CheckpointStore::write(&filter_path, &bytes)?;
            info!("Filtered galaxies saved to {}", filter_path.display());
        }
        drop(catalog);

        // Step 5: Reload both checkpoints
        let mask = engine
            .decode_mask(&CheckpointStore::read(&mask_path)?)
            .with_context(|| format!("Failed to decode survey mask {}", mask_path.display()))?;
        let filtered = engine
            .decode_filtered(&CheckpointStore::read(&filter_path)?)
            .with_context(|| {
                format!("Failed to decode filtered galaxies {}", filter_path.display())
            })?;
        let wall_count = engine.coordinate_count(&filtered.wall)?;
        let field_count = engine.coordinate_count(&filtered.field)?;
        info!(
            "{} wall and {} field galaxies on a {} hole grid",
            wall_count, field_count, filtered.grid_shape
        );

        // Step 6: Find voids
        info!("Finding voids");
        let request = FindVoidsRequest {
            survey_name: config.survey_name.clone(),
            dist_limits,
            maximal_spheres_path: maximal_spheres_path.clone(),
            holes_path: holes_path.clone(),
            potential_voids_path: potential_voids_path.clone(),
            num_cpus: config.num_cpus,
            batch_size: config.batch_size,
            verbose: config.verbose,
            print_after: config.print_after,
            save_after: config.grid.save_after,
            use_start_checkpoint: config.grid.use_start_checkpoint,
            hole_grid_edge_length: config.grid.hole_grid_edge_length,
            galaxy_map_grid_edge_length: config.grid.galaxy_map_grid_edge_length,
            hole_center_iter_dist: config.grid.hole_center_iter_dist,
        };
        engine
            .find_voids(&filtered, &mask, &request)
            .with_context(|| format!("Stage {} failed", Stage::FindVoids))?;
        info!("Void holes written to {}", holes_path.display());

        Ok(VoidFindingReport {
            survey_name: config.survey_name.clone(),
            dist_limits,
            galaxy_count,
            wall_count,
            field_count,
            mask_resolution: mask.resolution,
            grid_shape: filtered.grid_shape,
            mask_path,
            filter_path,
            maximal_spheres_path,
            holes_path,
            potential_voids_path,
            reused_stages,
        })
    }

    fn preprocess_request(&self) -> PreprocessRequest {
        let config = &self.config;
        PreprocessRequest {
            galaxies_filename: config.galaxies_filename.clone(),
            in_directory: config.in_directory.clone(),
            out_directory: config.out_directory.clone(),
            dist_metric: config.dist_metric,
            min_z: config.min_z,
            max_z: config.max_z,
            omega_m: config.omega_m,
            h: config.h,
            mag_cut: config.mag_cut,
            rm_isolated: config.rm_isolated,
            verbose: config.verbose,
        }
    }

    fn mask_request(&self) -> MaskRequest {
        MaskRequest {
            max_z: self.config.max_z,
            omega_m: self.config.omega_m,
            h: self.config.h,
            smooth_mask: self.config.smooth_mask,
        }
    }

    fn filter_request(&self, dist_limits: DistanceLimits) -> FilterRequest {
        let config = &self.config;
        FilterRequest {
            survey_name: config.survey_name.clone(),
            out_directory: config.out_directory.clone(),
            dist_limits,
            dist_metric: config.dist_metric,
            magnitude_limit: config.magnitude_limit,
            mag_cut: config.mag_cut,
            rm_isolated: config.rm_isolated,
            hole_grid_edge_length: config.grid.hole_grid_edge_length,
            h: config.h,
            verbose: config.verbose,
        }
    }

    fn reuse_checkpoint(&self, path: &Path, stage: Stage) -> Result<bool> {
        if !self.config.resume {
            return Ok(false);
        }
        match CheckpointStore::status(path)? {
            CheckpointStatus::Verified => {
                info!("Skipping {}: reusing {}", stage, path.display());
                Ok(true)
            }
            CheckpointStatus::Unverified => {
                warn!(
                    "Skipping {}: reusing {} without a digest to verify it",
                    stage,
                    path.display()
                );
                Ok(true)
            }
            CheckpointStatus::Corrupt => {
                warn!("Checkpoint {} does not match its digest, rerunning {}", path.display(), stage);
                Ok(false)
            }
            CheckpointStatus::Missing => Ok(false),
        }
    }
}
