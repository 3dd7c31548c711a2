use cogex_record::RecordError;
use cogex_timing::JitterError;
use thiserror::Error;

/// Invalid design or timing parameters. Always raised before the first trial.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("{n_trials} relational trials is not a multiple of {configurations} configurations")]
    TrialCount {
        n_trials: usize,
        configurations: usize,
    },
    #[error("{n_trials} trials cannot be split into {n_runs} equal runs")]
    RunSplit { n_trials: usize, n_runs: usize },
    #[error("{0} must be at least 1")]
    Zero(&'static str),
    #[error("expected {expected} distinct stimuli for the response slots, got {found}")]
    StimulusSet { expected: usize, found: usize },
    #[error("{field} must be finite and non-negative, got {value}")]
    Duration { field: &'static str, value: f64 },
    #[error("{field} must be a probability in [0, 1], got {value}")]
    Probability { field: &'static str, value: f64 },
    #[error("invalid {field} jitter: {source}")]
    Jitter {
        field: &'static str,
        #[source]
        source: JitterError,
    },
    #[error("trial order constraints still violated after {attempts} attempts")]
    Unsatisfiable { attempts: usize },
}

/// Failure reported by a display or input driver
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DriverError {
    #[error("presentation failed: {0}")]
    Presentation(String),
    #[error("input failed: {0}")]
    Input(String),
    #[error("session aborted by operator")]
    Aborted,
}

/// Errors that end a session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("trial log write failed: {0}")]
    Record(#[from] RecordError),
}
