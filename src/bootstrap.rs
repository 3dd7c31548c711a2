use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local, Utc};
use cogex_experiment::{ConfigurationError, ExperimentConfig, Strictness};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub const MANIFEST_NAME: &str = "session.json";

/// Seed used when none is given: epoch milliseconds mod 2^31.
pub fn default_seed(now: DateTime<Utc>) -> u64 {
    now.timestamp_millis().rem_euclid(1 << 31) as u64
}

/// Participant ids become file names, so only `[A-Za-z0-9_-]` is allowed.
pub fn check_participant_id(id: &str) -> Result<()> {
    if id.is_empty() {
        bail!("participant id must not be empty");
    }
    if let Some(c) = id
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        bail!("participant id {id:?} contains {c:?}; use letters, digits, '-' or '_'");
    }
    Ok(())
}

/// Command-line settings layered over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub runs: Option<usize>,
    pub best_effort: bool,
}

impl Overrides {
    pub fn apply(
        &self,
        mut config: ExperimentConfig,
    ) -> Result<ExperimentConfig, ConfigurationError> {
        if let Some(runs) = self.runs {
            config.relational.n_runs = runs;
        }
        if self.best_effort {
            config.relational.strictness = Strictness::BestEffort;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Defaults, then the optional JSON file, then command-line overrides.
pub fn load_config(path: Option<&Path>, overrides: &Overrides) -> Result<ExperimentConfig> {
    let base = match path {
        Some(path) => ExperimentConfig::from_json_file(path)?,
        None => ExperimentConfig::default(),
    };
    Ok(overrides.apply(base)?)
}

/// Creates `<root>/<YYYY-MM-DD_HH-MM-SS>/`, suffixing `_2`, `_3`, ... if a
/// session already started in the same second.
pub fn create_run_dir(root: &Path, started: &DateTime<Local>) -> Result<PathBuf> {
    fs::create_dir_all(root).with_context(|| format!("cannot create {}", root.display()))?;
    let stamp = started.format("%Y-%m-%d_%H-%M-%S").to_string();
    for n in 1..=100 {
        let name = if n == 1 {
            stamp.clone()
        } else {
            format!("{stamp}_{n}")
        };
        let dir = root.join(name);
        match fs::create_dir(&dir) {
            Ok(()) => return Ok(dir),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e).with_context(|| format!("cannot create {}", dir.display())),
        }
    }
    bail!("too many sessions started at {stamp} under {}", root.display())
}

/// Everything needed to replay a session.
#[derive(Debug, Serialize)]
pub struct Manifest<'a> {
    pub participant_id: &'a str,
    pub seed: u64,
    pub started_at: String,
    pub simulated: bool,
    pub data_file: String,
    pub version: &'static str,
    pub config: &'a ExperimentConfig,
}

/// Writes the manifest through a temporary file so a crash never leaves a
/// partial `session.json`.
pub fn write_manifest(dir: &Path, manifest: &Manifest<'_>) -> Result<PathBuf> {
    let tmp = dir.join(format!("{MANIFEST_NAME}.tmp"));
    let path = dir.join(MANIFEST_NAME);
    let write = || -> io::Result<()> {
        let mut file = File::create(&tmp)?;
        serde_json::to_writer_pretty(&mut file, manifest)?;
        file.write_all(b"\n")?;
        file.sync_all()?;
        fs::rename(&tmp, &path)?;
        #[cfg(unix)]
        File::open(dir)?.sync_all()?;
        Ok(())
    };
    write().with_context(|| format!("cannot write {}", path.display()))?;
    Ok(path)
}
