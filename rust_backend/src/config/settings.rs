//! Pipeline configuration file support.
//!
//! This module reads the user-set parameters of both pipelines from a TOML
//! file. Each pipeline has its own optional section so that a single file can
//! drive a survey end to end.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::coordinates::SPEED_OF_LIGHT_KM_S;
use crate::core::domain::{DistanceMetric, TableFormat};

/// Error type for configuration loading and validation
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config at '{path}': {message}")]
    Parse { path: String, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Missing [{0}] section in configuration")]
    MissingSection(&'static str),

    #[error("No vast.toml found in standard locations")]
    NotFound,
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    #[serde(default)]
    pub void_finding: Option<VoidFindingConfig>,
    #[serde(default)]
    pub classification: Option<ClassificationConfig>,
}

/// Parameters of the void-finding pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VoidFindingConfig {
    /// Prefix of every file the run produces, e.g. `kias1033_5_main_`
    pub survey_name: String,
    pub in_directory: PathBuf,
    pub out_directory: PathBuf,
    /// Galaxy catalog inside `in_directory` (ra, dec, redshift, Rgal, rabsmag)
    pub galaxies_filename: String,

    /// Worker processes for hole finding; unset uses all but one CPU
    #[serde(default)]
    pub num_cpus: Option<usize>,

    /// Redshift limits; unset uses the limits of the catalog
    #[serde(default)]
    pub min_z: Option<f64>,
    #[serde(default)]
    pub max_z: Option<f64>,

    #[serde(default = "default_omega_m")]
    pub omega_m: f64,
    /// Forwarded only when set
    #[serde(default)]
    pub h: Option<f64>,

    #[serde(default)]
    pub dist_metric: DistanceMetric,

    #[serde(default = "default_magnitude_limit")]
    pub magnitude_limit: f64,
    /// Remove galaxies fainter than `magnitude_limit`; unset uses the library default
    #[serde(default)]
    pub mag_cut: Option<bool>,
    /// Remove isolated galaxies; unset uses the library default
    #[serde(default)]
    pub rm_isolated: Option<bool>,

    #[serde(default = "default_true")]
    pub smooth_mask: bool,

    #[serde(default)]
    pub grid: GridSettings,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_verbose")]
    pub verbose: u8,
    /// Seconds between progress prints inside hole finding
    #[serde(default = "default_print_after")]
    pub print_after: f64,

    /// Reuse valid stage checkpoints from a previous run
    #[serde(default)]
    pub resume: bool,
    /// Directory for the filter checkpoint and the potential-voids list
    #[serde(default = "default_work_directory")]
    pub work_directory: PathBuf,
}

/// Optional hole-finding grid knobs, forwarded only when set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GridSettings {
    #[serde(default)]
    pub hole_grid_edge_length: Option<f64>,
    #[serde(default)]
    pub galaxy_map_grid_edge_length: Option<f64>,
    #[serde(default)]
    pub hole_center_iter_dist: Option<f64>,
    #[serde(default)]
    pub save_after: Option<usize>,
    #[serde(default)]
    pub use_start_checkpoint: Option<bool>,
}

/// Parameters of the environment classification pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassificationConfig {
    /// Void hole catalog (x, y, z, R, voidID)
    pub void_filename: PathBuf,
    /// Survey mask checkpoint written by the void-finding run
    pub mask_filename: PathBuf,
    /// Catalog of objects to classify
    pub galaxy_filename: PathBuf,
    #[serde(default)]
    pub galaxy_file_format: TableFormat,

    #[serde(default)]
    pub dist_metric: DistanceMetric,
    #[serde(default = "default_omega_m")]
    pub omega_m: f64,
    #[serde(default = "default_h")]
    pub h: f64,
    /// km/s
    #[serde(default = "default_speed_of_light")]
    pub speed_of_light: f64,
}

fn default_omega_m() -> f64 {
    0.315
}

fn default_h() -> f64 {
    1.0
}

fn default_speed_of_light() -> f64 {
    SPEED_OF_LIGHT_KM_S
}

fn default_magnitude_limit() -> f64 {
    -20.0
}

fn default_true() -> bool {
    true
}

fn default_batch_size() -> usize {
    10_000
}

fn default_verbose() -> u8 {
    1
}

fn default_print_after() -> f64 {
    5.0
}

fn default_work_directory() -> PathBuf {
    PathBuf::from(".")
}

impl PipelineConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    /// * `Ok(PipelineConfig)` if successful
    /// * `Err(ConfigError)` if the file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text, reporting the key path of any error.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let deserializer = toml::Deserializer::new(content);
        serde_path_to_error::deserialize(deserializer).map_err(|err| ConfigError::Parse {
            path: err.path().to_string(),
            message: err.into_inner().message().to_string(),
        })
    }

    /// Load configuration from the default location.
    ///
    /// Searches for `vast.toml` in:
    /// 1. Current directory
    /// 2. `rust_backend/` directory
    /// 3. Parent directory
    pub fn from_default_location() -> Result<Self, ConfigError> {
        let search_paths = [
            PathBuf::from("vast.toml"),
            PathBuf::from("rust_backend/vast.toml"),
            PathBuf::from("../vast.toml"),
        ];

        for path in search_paths {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Err(ConfigError::NotFound)
    }

    /// The validated `[void_finding]` section.
    pub fn void_finding(&self) -> Result<&VoidFindingConfig, ConfigError> {
        let config = self
            .void_finding
            .as_ref()
            .ok_or(ConfigError::MissingSection("void_finding"))?;
        config.validate()?;
        Ok(config)
    }

    /// The validated `[classification]` section.
    pub fn classification(&self) -> Result<&ClassificationConfig, ConfigError> {
        let config = self
            .classification
            .as_ref()
            .ok_or(ConfigError::MissingSection("classification"))?;
        config.validate()?;
        Ok(config)
    }
}

impl VoidFindingConfig {
    /// Minimal configuration with every optional parameter at its default.
    pub fn new(
        survey_name: impl Into<String>,
        in_directory: impl Into<PathBuf>,
        out_directory: impl Into<PathBuf>,
        galaxies_filename: impl Into<String>,
    ) -> Self {
        Self {
            survey_name: survey_name.into(),
            in_directory: in_directory.into(),
            out_directory: out_directory.into(),
            galaxies_filename: galaxies_filename.into(),
            num_cpus: None,
            min_z: None,
            max_z: None,
            omega_m: default_omega_m(),
            h: None,
            dist_metric: DistanceMetric::default(),
            magnitude_limit: default_magnitude_limit(),
            mag_cut: None,
            rm_isolated: None,
            smooth_mask: true,
            grid: GridSettings::default(),
            batch_size: default_batch_size(),
            verbose: default_verbose(),
            print_after: default_print_after(),
            resume: false,
            work_directory: default_work_directory(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.survey_name.trim().is_empty() {
            return Err(ConfigError::Invalid("'survey_name' must not be empty".into()));
        }
        if self.galaxies_filename.trim().is_empty() {
            return Err(ConfigError::Invalid("'galaxies_filename' must not be empty".into()));
        }
        if let Some(min_z) = self.min_z {
            if min_z < 0.0 {
                return Err(ConfigError::Invalid(format!("'min_z' must be >= 0, got {}", min_z)));
            }
        }
        if let (Some(min_z), Some(max_z)) = (self.min_z, self.max_z) {
            if min_z >= max_z {
                return Err(ConfigError::Invalid(format!(
                    "'min_z' ({}) must be below 'max_z' ({})",
                    min_z, max_z
                )));
            }
        }
        validate_cosmology(self.omega_m, self.h)?;
        if self.num_cpus == Some(0) {
            return Err(ConfigError::Invalid("'num_cpus' must be at least 1".into()));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("'batch_size' must be at least 1".into()));
        }
        if !(self.print_after > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "'print_after' must be positive, got {}",
                self.print_after
            )));
        }
        Ok(())
    }

    /// `<out_directory>/<survey_name>mask.pickle`
    pub fn mask_checkpoint_path(&self) -> PathBuf {
        self.out_directory.join(format!("{}mask.pickle", self.survey_name))
    }

    /// `<work_directory>/<survey_name>filter_galaxies_output.pickle`
    pub fn filter_checkpoint_path(&self) -> PathBuf {
        self.work_directory
            .join(format!("{}filter_galaxies_output.pickle", self.survey_name))
    }

    /// `<work_directory>/<survey_name>potential_voids_list.txt`
    pub fn potential_voids_path(&self) -> PathBuf {
        self.work_directory
            .join(format!("{}potential_voids_list.txt", self.survey_name))
    }
}

impl ClassificationConfig {
    pub fn new(
        void_filename: impl Into<PathBuf>,
        mask_filename: impl Into<PathBuf>,
        galaxy_filename: impl Into<PathBuf>,
    ) -> Self {
        Self {
            void_filename: void_filename.into(),
            mask_filename: mask_filename.into(),
            galaxy_filename: galaxy_filename.into(),
            galaxy_file_format: TableFormat::default(),
            dist_metric: DistanceMetric::default(),
            omega_m: default_omega_m(),
            h: default_h(),
            speed_of_light: default_speed_of_light(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, path) in [
            ("void_filename", &self.void_filename),
            ("mask_filename", &self.mask_filename),
            ("galaxy_filename", &self.galaxy_filename),
        ] {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(format!("'{}' must not be empty", key)));
            }
        }
        validate_cosmology(self.omega_m, Some(self.h))?;
        if !(self.speed_of_light > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "'speed_of_light' must be positive, got {}",
                self.speed_of_light
            )));
        }
        Ok(())
    }
}

fn validate_cosmology(omega_m: f64, h: Option<f64>) -> Result<(), ConfigError> {
    if !(omega_m > 0.0 && omega_m <= 1.0) {
        return Err(ConfigError::Invalid(format!(
            "'omega_m' must be in (0, 1], got {}",
            omega_m
        )));
    }
    if let Some(h) = h {
        if !(h > 0.0) {
            return Err(ConfigError::Invalid(format!("'h' must be positive, got {}", h)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const KIAS: &str = r#"
[void_finding]
survey_name = "kias1033_5_main_"
in_directory = "/data/SDSS/"
out_directory = "/voids/SDSS/"
galaxies_filename = "kias1033_5_MPAJHU_ZdustOS_main.txt"
num_cpus = 1
min_z = 0.0
max_z = 0.114
omega_m = 0.315
dist_metric = "comoving"
magnitude_limit = -20.0

[classification]
void_filename = "/voids/SDSS/nsa_v1_0_1_main_comoving_holes.txt"
mask_filename = "/voids/SDSS/NSA_main_mask.pickle"
galaxy_filename = "/data/SDSS/dr7/nsa_v1_0_1_main.txt"
galaxy_file_format = "commented_header"
"#;

    #[test]
    fn test_parse_full_config() {
        let config = PipelineConfig::from_toml_str(KIAS).unwrap();

        let vf = config.void_finding().unwrap();
        assert_eq!(vf.survey_name, "kias1033_5_main_");
        assert_eq!(vf.num_cpus, Some(1));
        assert_eq!(vf.max_z, Some(0.114));
        assert_eq!(vf.dist_metric, DistanceMetric::Comoving);
        assert_eq!(vf.batch_size, 10_000);
        assert_eq!(vf.print_after, 5.0);
        assert!(vf.smooth_mask);
        assert!(!vf.resume);
        assert_eq!(vf.grid, GridSettings::default());

        let cl = config.classification().unwrap();
        assert_eq!(cl.galaxy_file_format, TableFormat::CommentedHeader);
        assert_eq!(cl.h, 1.0);
        assert_eq!(cl.speed_of_light, 3e5);
    }

    #[test]
    fn test_shipped_config_is_valid() {
        let config = PipelineConfig::from_toml_str(include_str!("../../vast.toml")).unwrap();
        assert!(config.void_finding().is_ok());
        assert!(config.classification().is_ok());
    }

    #[test]
    fn test_checkpoint_paths_follow_survey_name() {
        let config = PipelineConfig::from_toml_str(KIAS).unwrap();
        let vf = config.void_finding().unwrap();

        assert_eq!(
            vf.mask_checkpoint_path(),
            PathBuf::from("/voids/SDSS/kias1033_5_main_mask.pickle")
        );
        assert_eq!(
            vf.filter_checkpoint_path(),
            PathBuf::from("./kias1033_5_main_filter_galaxies_output.pickle")
        );
        assert_eq!(
            vf.potential_voids_path(),
            PathBuf::from("./kias1033_5_main_potential_voids_list.txt")
        );
    }

    #[test]
    fn test_missing_section() {
        let config = PipelineConfig::from_toml_str("").unwrap();
        assert!(matches!(
            config.void_finding(),
            Err(ConfigError::MissingSection("void_finding"))
        ));
        assert!(matches!(
            config.classification(),
            Err(ConfigError::MissingSection("classification"))
        ));
    }

    #[test]
    fn test_parse_error_reports_key_path() {
        let toml = r#"
[void_finding]
survey_name = "s_"
in_directory = "in"
out_directory = "out"
galaxies_filename = "g.txt"
dist_metric = "luminosity"
"#;
        match PipelineConfig::from_toml_str(toml) {
            Err(ConfigError::Parse { path, .. }) => assert_eq!(path, "void_finding.dist_metric"),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let toml = r#"
[classification]
void_filename = "holes.txt"
mask_filename = "mask.pickle"
galaxy_filename = "gal.txt"
Omega_M = 0.3
"#;
        assert!(matches!(
            PipelineConfig::from_toml_str(toml),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_redshift_limits_validation() {
        let mut config = VoidFindingConfig::new("s_", "in", "out", "g.txt");
        config.min_z = Some(0.2);
        config.max_z = Some(0.1);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.min_z = None;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cosmology_validation() {
        let mut config = ClassificationConfig::new("holes.txt", "mask.pickle", "gal.txt");
        assert!(config.validate().is_ok());

        config.omega_m = 1.5;
        assert!(config.validate().is_err());

        config.omega_m = 0.3;
        config.h = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_cpus_and_batch_size_rejected() {
        let mut config = VoidFindingConfig::new("s_", "in", "out", "g.txt");
        config.num_cpus = Some(0);
        assert!(config.validate().is_err());

        config.num_cpus = None;
        config.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_read_error_names_file() {
        let err = PipelineConfig::from_file("/nonexistent/vast.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/vast.toml"));
    }
}
