use cogex_timing::JitterParams;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigurationError;
use crate::relational::RelationalDesign;
use crate::wm::WmDesign;

/// Mean inter-trial interval of the relational block, in seconds.
pub const ITI_BASE_SECS: f64 = 3.0;

/// Event durations in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub fixation_secs: f64,
    pub stimulus_secs: f64,
    pub response_cutoff_secs: f64,
    pub isi: JitterParams,
    pub iti: JitterParams,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            fixation_secs: 0.5,
            stimulus_secs: 0.5,
            response_cutoff_secs: 2.0,
            isi: JitterParams::new(1.0, 0.2, 0.0),
            iti: JitterParams::new(ITI_BASE_SECS, 1.0, 0.0),
        }
    }
}

impl TimingConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        non_negative("timing.fixation_secs", self.fixation_secs)?;
        non_negative("timing.stimulus_secs", self.stimulus_secs)?;
        non_negative("timing.response_cutoff_secs", self.response_cutoff_secs)?;
        self.isi
            .validate()
            .map_err(|source| ConfigurationError::Jitter {
                field: "timing.isi",
                source,
            })?;
        self.iti
            .validate()
            .map_err(|source| ConfigurationError::Jitter {
                field: "timing.iti",
                source,
            })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigurationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigurationError::Duration { field, value })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub wm: WmDesign,
    pub relational: RelationalDesign,
    pub timing: TimingConfig,
    pub rest_duration_secs: f64,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            wm: WmDesign::default(),
            relational: RelationalDesign::default(),
            timing: TimingConfig::default(),
            rest_duration_secs: 120.0,
        }
    }
}

impl ExperimentConfig {
    /// Reads a JSON config; absent fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigLoadError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.wm.validate()?;
        self.relational.validate()?;
        self.timing.validate()?;
        non_negative("rest_duration_secs", self.rest_duration_secs)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Invalid(#[from] ConfigurationError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relational::Strictness;

    #[test]
    fn defaults_are_valid_study_constants() {
        let config = ExperimentConfig::default();
        config.validate().unwrap();
        assert_eq!(config.wm.trial_count(), 24);
        assert_eq!(config.relational.n_trials, 120);
        assert_eq!(config.relational.trials_per_run(), 30);
        assert_eq!(config.timing.iti.mean, ITI_BASE_SECS);
    }

    #[test]
    fn partial_json_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"relational": {"n_runs": 2, "strictness": "best_effort"}, "rest_duration_secs": 5}"#,
        )
        .unwrap();
        let config = ExperimentConfig::from_json_file(&path).unwrap();
        assert_eq!(config.relational.n_runs, 2);
        assert_eq!(config.relational.n_trials, 120);
        assert_eq!(config.relational.strictness, Strictness::BestEffort);
        assert_eq!(config.rest_duration_secs, 5.0);
        assert_eq!(config.wm, WmDesign::default());
    }

    #[test]
    fn invalid_file_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"relational": {"n_trials": 50}}"#).unwrap();
        assert!(matches!(
            ExperimentConfig::from_json_file(&path),
            Err(ConfigLoadError::Invalid(ConfigurationError::TrialCount { .. }))
        ));
    }

    #[test]
    fn negative_durations_are_rejected() {
        let mut config = ExperimentConfig::default();
        config.timing.response_cutoff_secs = -1.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::Duration { .. })
        ));

        let mut config = ExperimentConfig::default();
        config.timing.isi.sd = -0.2;
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::Jitter { field: "timing.isi", .. })
        ));
    }
}
