use cogex_core::{IsiCondition, StimulusId, WmTrialSpec};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::plan::{repair, Plan};

/// Working-memory control block: every stimulus crossed with both delays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WmDesign {
    pub reps: usize,
    pub max_shuffle_attempts: usize,
    pub max_repair_passes: usize,
}

impl Default for WmDesign {
    fn default() -> Self {
        Self {
            reps: 3,
            max_shuffle_attempts: 1000,
            max_repair_passes: 20,
        }
    }
}

impl WmDesign {
    pub fn trial_count(&self) -> usize {
        StimulusId::ALL.len() * IsiCondition::ALL.len() * self.reps
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.reps == 0 {
            return Err(ConfigurationError::Zero("wm.reps"));
        }
        if self.max_shuffle_attempts == 0 {
            return Err(ConfigurationError::Zero("wm.max_shuffle_attempts"));
        }
        Ok(())
    }

    /// Stimulus × delay × repetition, in enumeration order.
    pub fn conditions(&self) -> Vec<(StimulusId, IsiCondition)> {
        StimulusId::ALL
            .into_iter()
            .flat_map(|stim| IsiCondition::ALL.into_iter().map(move |isi| (stim, isi)))
            .flat_map(|cell| std::iter::repeat_n(cell, self.reps))
            .collect()
    }

    /// Shuffled block with no back-to-back repeat of the sample where the
    /// bounded search finds one. Falls back to the last shuffle otherwise.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<Plan<WmTrialSpec>, ConfigurationError> {
        self.validate()?;

        let mut items = self.conditions();
        let mut satisfied = false;
        let mut attempts = 0;
        while attempts < self.max_shuffle_attempts && !satisfied {
            attempts += 1;
            items.shuffle(rng);
            satisfied = repair(&mut items, same_sample, 1, self.max_repair_passes);
        }

        let trials = items
            .into_iter()
            .enumerate()
            .map(|(trial_index, (sample_stim, isi_condition))| WmTrialSpec {
                trial_index,
                sample_stim,
                isi_condition,
            })
            .collect();
        Ok(Plan {
            trials,
            satisfied,
            attempts,
        })
    }
}

fn same_sample(items: &[(StimulusId, IsiCondition)], k: usize) -> bool {
    k > 0 && items[k].0 == items[k - 1].0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    #[test]
    fn each_cell_occurs_exactly_reps_times() {
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let plan = WmDesign::default().generate(&mut rng).unwrap();
            assert_eq!(plan.len(), 24);

            let mut counts: HashMap<(StimulusId, IsiCondition), usize> = HashMap::new();
            for t in &plan.trials {
                *counts.entry((t.sample_stim, t.isi_condition)).or_default() += 1;
            }
            assert_eq!(counts.len(), 8);
            assert!(counts.values().all(|c| *c == 3));
        }
    }

    #[test]
    fn no_adjacent_sample_repeats_when_satisfied() {
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let plan = WmDesign::default().generate(&mut rng).unwrap();
            assert!(plan.satisfied, "seed {seed}");
            for pair in plan.trials.windows(2) {
                assert_ne!(pair[0].sample_stim, pair[1].sample_stim);
            }
        }
    }

    #[test]
    fn trial_indices_are_sequential() {
        let mut rng = StdRng::seed_from_u64(9);
        let plan = WmDesign::default().generate(&mut rng).unwrap();
        for (i, t) in plan.trials.iter().enumerate() {
            assert_eq!(t.trial_index, i);
        }
    }

    #[test]
    fn unconstrained_single_attempt_still_balanced() {
        let design = WmDesign {
            reps: 1,
            max_shuffle_attempts: 1,
            max_repair_passes: 0,
        };
        let mut rng = StdRng::seed_from_u64(1);
        let plan = design.generate(&mut rng).unwrap();
        assert_eq!(plan.len(), 8);
        assert_eq!(plan.attempts, 1);
    }

    #[test]
    fn zero_reps_is_a_configuration_error() {
        let design = WmDesign {
            reps: 0,
            ..WmDesign::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            design.generate(&mut rng),
            Err(ConfigurationError::Zero("wm.reps"))
        );
    }
}
