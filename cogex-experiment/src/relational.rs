use cogex_core::{RelationalTrialSpec, RuleType, StimulusId};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigurationError;
use crate::plan::{repair, Plan};

pub type Configuration = (StimulusId, StimulusId, RuleType);

/// How the order constraints of the relational block are enforced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strictness {
    /// Unsatisfied constraints after every restart are a configuration error.
    #[default]
    Strict,
    /// Keep the last repaired order and report `satisfied = false`.
    BestEffort,
}

/// Main block design: ordered stimulus pairs crossed with both rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationalDesign {
    pub n_trials: usize,
    pub n_runs: usize,
    pub max_streak: usize,
    pub max_repair_passes: usize,
    pub max_restarts: usize,
    pub strictness: Strictness,
}

impl Default for RelationalDesign {
    fn default() -> Self {
        Self {
            n_trials: 120,
            n_runs: 4,
            max_streak: 3,
            max_repair_passes: 50,
            max_restarts: 100,
            strictness: Strictness::Strict,
        }
    }
}

/// All `(A, B, rule)` configurations with `A != B`, in enumeration order.
pub fn base_configurations() -> Vec<Configuration> {
    let mut configs = Vec::new();
    for a in StimulusId::ALL {
        for b in StimulusId::ALL {
            if a == b {
                continue;
            }
            for rule in RuleType::ALL {
                configs.push((a, b, rule));
            }
        }
    }
    configs
}

impl RelationalDesign {
    pub fn trials_per_run(&self) -> usize {
        self.n_trials / self.n_runs.max(1)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let configurations = base_configurations().len();
        if self.n_trials == 0 {
            return Err(ConfigurationError::Zero("relational.n_trials"));
        }
        if self.n_trials % configurations != 0 {
            return Err(ConfigurationError::TrialCount {
                n_trials: self.n_trials,
                configurations,
            });
        }
        if self.n_runs == 0 {
            return Err(ConfigurationError::Zero("relational.n_runs"));
        }
        if self.n_trials % self.n_runs != 0 {
            return Err(ConfigurationError::RunSplit {
                n_trials: self.n_trials,
                n_runs: self.n_runs,
            });
        }
        if self.max_streak == 0 {
            return Err(ConfigurationError::Zero("relational.max_streak"));
        }
        if self.max_restarts == 0 {
            return Err(ConfigurationError::Zero("relational.max_restarts"));
        }
        Ok(())
    }

    /// True when trial `k` ends a rule streak longer than `max_streak` or
    /// repeats the configuration of trial `k - 1`.
    fn violates(&self, seq: &[Configuration], k: usize) -> bool {
        if k > 0 && seq[k] == seq[k - 1] {
            return true;
        }
        k >= self.max_streak && seq[k - self.max_streak..k].iter().all(|c| c.2 == seq[k].2)
    }

    /// Balanced, shuffled and repaired trial order with run indices assigned.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<Plan<RelationalTrialSpec>, ConfigurationError> {
        self.validate()?;

        let base = base_configurations();
        let reps = self.n_trials / base.len();
        let mut order: Vec<Configuration> = base
            .iter()
            .flat_map(|cfg| std::iter::repeat_n(*cfg, reps))
            .collect();

        let mut satisfied = false;
        let mut attempts = 0;
        while attempts < self.max_restarts && !satisfied {
            attempts += 1;
            order.shuffle(rng);
            satisfied = repair(
                &mut order,
                |seq, k| self.violates(seq, k),
                self.max_streak,
                self.max_repair_passes,
            );
            debug!(attempt = attempts, satisfied, "relational order repaired");
        }
        if !satisfied && self.strictness == Strictness::Strict {
            return Err(ConfigurationError::Unsatisfiable { attempts });
        }

        let per_run = self.trials_per_run();
        let trials = order
            .into_iter()
            .enumerate()
            .map(|(trial_index, (a, b, rule_type))| RelationalTrialSpec {
                trial_index,
                rule_type,
                a,
                b,
                run_index: trial_index / per_run,
            })
            .collect();
        Ok(Plan {
            trials,
            satisfied,
            attempts,
        })
    }

    /// Splits a generated block into its runs, preserving order.
    pub fn runs<'a>(
        &self,
        trials: &'a [RelationalTrialSpec],
    ) -> impl Iterator<Item = &'a [RelationalTrialSpec]> {
        trials.chunk_by(|a, b| a.run_index == b.run_index)
    }
}

/// Longest run of consecutive trials sharing a rule.
pub fn longest_rule_streak(trials: &[RelationalTrialSpec]) -> usize {
    trials
        .chunk_by(|a, b| a.rule_type == b.rule_type)
        .map(<[_]>::len)
        .max()
        .unwrap_or(0)
}
