use cogex_core::{BlockKind, RelationalTrialSpec, StimulusId, WmTrialSpec};
use cogex_record::{MAIN_EVENTS, WM_EVENTS};
use cogex_timing::Jitter;
use rand::Rng;
use serde::Serialize;

use crate::config::TimingConfig;
use crate::error::ConfigurationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Fixation,
    Stimulus(StimulusId),
    Isi,
    Response,
    Iti,
}

/// One scheduled event; `onset` is seconds from trial start.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimedEvent {
    pub name: &'static str,
    pub kind: EventKind,
    pub nominal: f64,
    pub realized: f64,
    pub onset: f64,
}

/// Ordered events of one trial with onsets as cumulative realized durations
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RealizedTiming {
    pub events: Vec<TimedEvent>,
}

impl RealizedTiming {
    fn push(&mut self, name: &'static str, kind: EventKind, nominal: f64, realized: f64) {
        let onset = self.duration();
        self.events.push(TimedEvent {
            name,
            kind,
            nominal,
            realized,
            onset,
        });
    }

    /// Offset at which the last event ends.
    pub fn duration(&self) -> f64 {
        self.events
            .last()
            .map_or(0.0, |event| event.onset + event.realized)
    }

    pub fn event(&self, name: &str) -> Option<&TimedEvent> {
        self.events.iter().find(|event| event.name == name)
    }

    pub fn isi_jitters(&self) -> Vec<f64> {
        self.events
            .iter()
            .filter(|event| event.kind == EventKind::Isi)
            .map(|event| event.realized)
            .collect()
    }

    pub fn iti_jitter(&self) -> Option<f64> {
        self.events
            .iter()
            .find(|event| event.kind == EventKind::Iti)
            .map(|event| event.realized)
    }
}

/// Either kind of trial, for callers that handle both blocks uniformly
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrialSpec {
    Wm(WmTrialSpec),
    Relational(RelationalTrialSpec),
}

impl TrialSpec {
    pub fn block(&self) -> BlockKind {
        match self {
            TrialSpec::Wm(_) => BlockKind::WorkingMemory,
            TrialSpec::Relational(_) => BlockKind::Relational,
        }
    }
}

/// Turns trial specs into event schedules.
///
/// Offsets only: the builder never reads a clock. Jitter is drawn here,
/// once per ISI/ITI, in presentation order.
#[derive(Debug, Clone)]
pub struct TimelineBuilder {
    timing: TimingConfig,
    isi: Jitter,
    iti: Jitter,
}

impl TimelineBuilder {
    pub fn new(timing: &TimingConfig) -> Result<Self, ConfigurationError> {
        timing.validate()?;
        let isi = Jitter::new(timing.isi).map_err(|source| ConfigurationError::Jitter {
            field: "timing.isi",
            source,
        })?;
        let iti = Jitter::new(timing.iti).map_err(|source| ConfigurationError::Jitter {
            field: "timing.iti",
            source,
        })?;
        Ok(Self {
            timing: timing.clone(),
            isi,
            iti,
        })
    }

    pub fn build<R: Rng + ?Sized>(&self, trial: &TrialSpec, rng: &mut R) -> RealizedTiming {
        match trial {
            TrialSpec::Wm(trial) => self.build_wm(trial),
            TrialSpec::Relational(trial) => self.build_relational(trial, rng),
        }
    }

    /// fixation → sample → fixed delay → response window. No jitter.
    pub fn build_wm(&self, trial: &WmTrialSpec) -> RealizedTiming {
        let t = &self.timing;
        let delay = trial.isi_condition.secs();
        let mut timing = RealizedTiming::default();
        timing.push(WM_EVENTS[0], EventKind::Fixation, t.fixation_secs, t.fixation_secs);
        timing.push(
            WM_EVENTS[1],
            EventKind::Stimulus(trial.sample_stim),
            t.stimulus_secs,
            t.stimulus_secs,
        );
        timing.push(WM_EVENTS[2], EventKind::Isi, delay, delay);
        timing.push(
            WM_EVENTS[3],
            EventKind::Response,
            t.response_cutoff_secs,
            t.response_cutoff_secs,
        );
        timing
    }

    /// fixation → three rule items and two test items separated by jittered
    /// ISIs → response window → jittered ITI.
    pub fn build_relational<R: Rng + ?Sized>(
        &self,
        trial: &RelationalTrialSpec,
        rng: &mut R,
    ) -> RealizedTiming {
        let t = &self.timing;
        let items: Vec<StimulusId> = trial
            .rule_sequence()
            .into_iter()
            .chain(trial.test_sequence())
            .collect();

        let mut names = MAIN_EVENTS.iter().copied();
        let mut next_name = || names.next().unwrap_or("unnamed");

        let mut timing = RealizedTiming::default();
        timing.push(next_name(), EventKind::Fixation, t.fixation_secs, t.fixation_secs);
        for (i, stim) in items.iter().enumerate() {
            if i > 0 {
                let isi = self.isi.sample(rng);
                timing.push(next_name(), EventKind::Isi, t.isi.mean, isi);
            }
            timing.push(
                next_name(),
                EventKind::Stimulus(*stim),
                t.stimulus_secs,
                t.stimulus_secs,
            );
        }
        timing.push(
            next_name(),
            EventKind::Response,
            t.response_cutoff_secs,
            t.response_cutoff_secs,
        );
        let iti = self.iti.sample(rng);
        timing.push(next_name(), EventKind::Iti, t.iti.mean, iti);
        timing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cogex_core::{IsiCondition, RuleType};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn relational() -> RelationalTrialSpec {
        RelationalTrialSpec {
            trial_index: 0,
            rule_type: RuleType::Abb,
            a: StimulusId::Star,
            b: StimulusId::Triangle,
            run_index: 0,
        }
    }

    fn builder() -> TimelineBuilder {
        TimelineBuilder::new(&TimingConfig::default()).unwrap()
    }

    #[test]
    fn wm_trial_has_fixed_durations() {
        let trial = WmTrialSpec {
            trial_index: 0,
            sample_stim: StimulusId::Circle,
            isi_condition: IsiCondition::Long,
        };
        let timing = builder().build_wm(&trial);
        let names: Vec<_> = timing.events.iter().map(|e| e.name).collect();
        assert_eq!(names, WM_EVENTS);
        let onsets: Vec<_> = timing.events.iter().map(|e| e.onset).collect();
        assert_eq!(onsets, vec![0.0, 0.5, 1.0, 3.5]);
        assert_eq!(timing.duration(), 5.5);
        assert!(timing.events.iter().all(|e| e.nominal == e.realized));
        assert_eq!(
            timing.event("sample").map(|e| e.kind),
            Some(EventKind::Stimulus(StimulusId::Circle))
        );
    }

    #[test]
    fn relational_events_follow_presentation_order() {
        let mut rng = StdRng::seed_from_u64(42);
        let timing = builder().build_relational(&relational(), &mut rng);
        let names: Vec<_> = timing.events.iter().map(|e| e.name).collect();
        assert_eq!(names, MAIN_EVENTS);

        let shown: Vec<StimulusId> = timing
            .events
            .iter()
            .filter_map(|e| match e.kind {
                EventKind::Stimulus(stim) => Some(stim),
                _ => None,
            })
            .collect();
        use StimulusId::*;
        assert_eq!(shown, vec![Star, Triangle, Triangle, Star, Triangle]);
        assert_eq!(timing.isi_jitters().len(), 4);
        assert!(timing.iti_jitter().is_some());
    }

    #[test]
    fn onsets_are_cumulative_realized_durations() {
        let mut rng = StdRng::seed_from_u64(7);
        let timing = builder().build_relational(&relational(), &mut rng);
        let mut expected = 0.0;
        for event in &timing.events {
            assert!((event.onset - expected).abs() < 1e-12);
            assert!(event.realized >= 0.0);
            expected += event.realized;
        }
        assert!((timing.duration() - expected).abs() < 1e-12);
    }

    #[test]
    fn jitter_is_reproducible_under_a_seed() {
        let b = builder();
        let mut first = StdRng::seed_from_u64(42);
        let mut second = StdRng::seed_from_u64(42);
        assert_eq!(
            b.build_relational(&relational(), &mut first),
            b.build_relational(&relational(), &mut second)
        );
    }

    #[test]
    fn dispatch_matches_block() {
        let spec = TrialSpec::Relational(relational());
        assert_eq!(spec.block(), BlockKind::Relational);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(builder().build(&spec, &mut rng).events.len(), MAIN_EVENTS.len());
    }
}
