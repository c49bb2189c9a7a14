//! Run configuration loaded from YAML
//!
//! Every field has a default, so an empty file (or no file at all) runs the
//! published analysis. Example:
//!
//! ```yaml
//! num_psa: 1000
//! neonatal_sim_time: lifetime
//! include_encephalitis: true
//! iteration_failure: skip
//! life_tables:
//!   male: tables/male.yaml
//!   female: tables/female.yaml
//!   general: tables/general.yaml
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use hsvqaly_core::correlation::CorrelationSettings;
use hsvqaly_core::life_table::{LifeTable, LifeTables, SequelaeDuration};
use hsvqaly_core::parameters::{Hsv1Parameters, Hsv2Parameters, NeonatalParameters};
use hsvqaly_core::psa::{IterationFailure, NeonatalSettings, PsaSettings};
use serde::{Deserialize, Serialize};

/// Error types for configuration and input files
#[derive(Debug)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    Serialize(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "IO error: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Parse error: {}", msg),
            ConfigError::Serialize(msg) => write!(f, "Serialization error: {}", msg),
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Which analyses to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Analysis {
    Hsv1,
    Hsv2,
    Neonatal,
    #[default]
    All,
}

impl Analysis {
    pub fn includes_hsv1(self) -> bool {
        matches!(self, Analysis::Hsv1 | Analysis::All)
    }

    pub fn includes_hsv2(self) -> bool {
        matches!(self, Analysis::Hsv2 | Analysis::All)
    }

    pub fn includes_neonatal(self) -> bool {
        matches!(self, Analysis::Neonatal | Analysis::All)
    }
}

/// Paths to male, female and general-population life tables
///
/// Each file is a YAML list of `{age, qx, ax, bx}` rows. Relative paths are
/// resolved against the config file's directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifeTablePaths {
    pub male: PathBuf,
    pub female: PathBuf,
    pub general: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub num_psa: usize,
    pub hsv1_discount: f64,
    pub hsv2_discount: f64,
    pub neonatal_discount: f64,
    pub neonatal_sim_time: SequelaeDuration,
    /// Representative age of infection per incidence age group
    pub ages: Vec<f64>,
    pub age_labels: Vec<String>,
    pub include_encephalitis: bool,
    pub iteration_failure: IterationFailure,
    pub correlation: CorrelationSettings,
    /// Built-in reference tables when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub life_tables: Option<LifeTablePaths>,
    /// Annual live births
    pub births: f64,
    pub hsv1: Hsv1Parameters,
    pub hsv2: Hsv2Parameters,
    pub neonatal: NeonatalParameters,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            num_psa: 1000,
            hsv1_discount: 0.03,
            hsv2_discount: 0.03,
            neonatal_discount: 0.03,
            neonatal_sim_time: SequelaeDuration::Years(15.0),
            ages: vec![21.0, 27.0, 32.0, 42.0],
            age_labels: ["18-24", "25-29", "30-34", "35-49"]
                .into_iter()
                .map(String::from)
                .collect(),
            include_encephalitis: false,
            iteration_failure: IterationFailure::Abort,
            correlation: CorrelationSettings::default(),
            life_tables: None,
            births: 3_791_712.0,
            hsv1: Hsv1Parameters::default(),
            hsv2: Hsv2Parameters::default(),
            neonatal: NeonatalParameters::default(),
        }
    }
}

impl RunConfig {
    /// Load from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_saphyr::Error> {
        serde_saphyr::from_str(yaml)
    }

    /// Save to YAML string
    pub fn to_yaml(&self) -> Result<String, serde_saphyr::ser::Error> {
        serde_saphyr::to_string(self)
    }

    /// Read and validate a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        let mut config =
            Self::from_yaml(&content).map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))?;

        if let (Some(tables), Some(base)) = (config.life_tables.as_mut(), path.parent()) {
            for table in [&mut tables.male, &mut tables.female, &mut tables.general] {
                if table.is_relative() {
                    *table = base.join(&*table);
                }
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_psa == 0 {
            return Err(ConfigError::Invalid("num_psa must be at least 1".into()));
        }
        if self.ages.is_empty() {
            return Err(ConfigError::Invalid("at least one age group is required".into()));
        }
        if self.ages.len() != self.age_labels.len() {
            return Err(ConfigError::Invalid(format!(
                "{} ages but {} age labels",
                self.ages.len(),
                self.age_labels.len()
            )));
        }
        for (name, rate) in [
            ("hsv1_discount", self.hsv1_discount),
            ("hsv2_discount", self.hsv2_discount),
            ("neonatal_discount", self.neonatal_discount),
        ] {
            if !(0.0..1.0).contains(&rate) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be within [0, 1), got {rate}"
                )));
            }
        }
        if !(self.births > 0.0) {
            return Err(ConfigError::Invalid("births must be positive".into()));
        }
        Ok(())
    }

    pub fn hsv1_settings(&self) -> PsaSettings {
        self.hsv_settings(self.hsv1_discount)
    }

    pub fn hsv2_settings(&self) -> PsaSettings {
        self.hsv_settings(self.hsv2_discount)
    }

    fn hsv_settings(&self, discount: f64) -> PsaSettings {
        PsaSettings {
            num_psa: self.num_psa,
            discount,
            ages: self.ages.clone(),
            iteration_failure: self.iteration_failure,
        }
    }

    pub fn neonatal_settings(&self) -> NeonatalSettings {
        NeonatalSettings {
            num_psa: self.num_psa,
            discount: self.neonatal_discount,
            horizon: self.neonatal_sim_time,
            births: self.births,
            correlation: self.correlation,
            iteration_failure: self.iteration_failure,
        }
    }

    /// Load the configured life tables, or the built-in reference tables
    pub fn life_tables(&self) -> Result<LifeTables, ConfigError> {
        let Some(paths) = &self.life_tables else {
            return Ok(LifeTables::reference());
        };
        Ok(LifeTables {
            male: load_life_table(&paths.male)?,
            female: load_life_table(&paths.female)?,
            general: load_life_table(&paths.general)?,
        })
    }
}

fn load_life_table(path: &Path) -> Result<LifeTable, ConfigError> {
    let content = fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
    serde_saphyr::from_str(&content)
        .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hsvqaly_core::life_table::LifeTableRow;
    use tempfile::tempdir;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = RunConfig::from_yaml("num_psa: 50\ninclude_encephalitis: true\n").unwrap();
        assert_eq!(config.num_psa, 50);
        assert!(config.include_encephalitis);
        assert_eq!(config.ages, vec![21.0, 27.0, 32.0, 42.0]);
        assert_eq!(config.neonatal_sim_time, SequelaeDuration::Years(15.0));
        assert_eq!(config.hsv2, Hsv2Parameters::default());
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = RunConfig {
            num_psa: 10,
            neonatal_sim_time: SequelaeDuration::Lifetime,
            iteration_failure: IterationFailure::Skip,
            ..Default::default()
        };
        let yaml = config.to_yaml().unwrap();
        assert_eq!(RunConfig::from_yaml(&yaml).unwrap(), config);
    }

    #[test]
    fn test_validation() {
        let config = RunConfig {
            age_labels: vec!["18-49".into()],
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = RunConfig {
            hsv2_discount: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(RunConfig::default().validate().is_ok());
    }

    #[test]
    fn test_settings_follow_config() {
        let config = RunConfig {
            num_psa: 12,
            hsv1_discount: 0.0,
            neonatal_sim_time: SequelaeDuration::Lifetime,
            ..Default::default()
        };
        assert_eq!(config.hsv1_settings().discount, 0.0);
        assert_eq!(config.hsv2_settings().discount, 0.03);
        assert_eq!(config.hsv2_settings().num_psa, 12);
        assert_eq!(config.neonatal_settings().horizon, SequelaeDuration::Lifetime);
    }

    #[test]
    fn test_load_resolves_relative_table_paths() {
        let dir = tempdir().unwrap();
        let rows: Vec<LifeTableRow> = (0..=3)
            .map(|age| LifeTableRow {
                age,
                qx: if age == 3 { 1.0 } else { 0.01 },
                ax: 0.5,
                bx: 1.0,
            })
            .collect();
        let table_yaml = serde_saphyr::to_string(&rows).unwrap();
        for name in ["male.yaml", "female.yaml", "general.yaml"] {
            fs::write(dir.path().join(name), &table_yaml).unwrap();
        }

        let config_path = dir.path().join("run.yaml");
        fs::write(
            &config_path,
            "num_psa: 5\nlife_tables:\n  male: male.yaml\n  female: female.yaml\n  general: general.yaml\n",
        )
        .unwrap();

        let config = RunConfig::load(&config_path).unwrap();
        let tables = config.life_tables().unwrap();
        assert_eq!(tables.male.max_age(), 3);
        assert!((tables.female.survivors(2.0).unwrap() - 0.99 * 0.99).abs() < 1e-12);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let result = RunConfig::load(&dir.path().join("absent.yaml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
