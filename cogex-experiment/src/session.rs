use cogex_core::{
    BlockKind, RelationalTrialSpec, ResponseStatus, StimulusId, TrialOutcome, WmTrialSpec,
};
use cogex_record::{RecordError, TrialLogger};
use cogex_timing::{nanos_to_secs, secs_to_nanos, Timer};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::ExperimentConfig;
use crate::driver::{DisplayDriver, Frame, InputDriver};
use crate::error::{ConfigurationError, DriverError, SessionError};
use crate::mapping::{generate_mapping, SlotMapping};
use crate::plan::Plan;
use crate::record::{MainRow, Onsets, OutcomeColumns, WmRow};
use crate::scoring::{score, Response};
use crate::timeline::{EventKind, RealizedTiming, TimelineBuilder};

const WM_INSTRUCTIONS: &str = "Working Memory Task\n\n\
    You will see a shape, then pick the matching shape from 4 options.";
const REST_INSTRUCTIONS: &str = "Rest\n\nPlease fixate on the cross and relax.";
const MAIN_INSTRUCTIONS: &str = "Main Task\n\n\
    You will see a sequence of shapes that follow a pattern.\n\
    Then you will see the start of a new sequence.\n\
    Choose the shape that comes next.";
const END_TEXT: &str = "The experiment is complete. Thank you!";

/// The session's single pseudorandom stream.
pub fn session_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Stream for a simulated participant, independent of the session stream.
pub fn participant_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed ^ 0x9e37_79b9_7f4a_7c15)
}

/// Tallies reported when the session ends
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionSummary {
    pub trials: usize,
    pub responses: usize,
    pub correct: usize,
    pub timeouts: usize,
    pub errors: usize,
    pub rt_total: f64,
    pub wm_plan_satisfied: bool,
    pub main_plan_satisfied: bool,
    pub aborted: bool,
}

impl SessionSummary {
    fn record(&mut self, outcome: &TrialOutcome) {
        self.trials += 1;
        match outcome.status {
            ResponseStatus::Response => {
                self.responses += 1;
                self.rt_total += outcome.rt.unwrap_or_default();
                if outcome.correct {
                    self.correct += 1;
                }
            }
            ResponseStatus::Timeout => self.timeouts += 1,
            ResponseStatus::Error => self.errors += 1,
        }
    }

    pub fn accuracy(&self) -> f64 {
        let scored = self.trials - self.errors;
        if scored == 0 {
            0.0
        } else {
            self.correct as f64 / scored as f64
        }
    }

    pub fn mean_rt(&self) -> Option<f64> {
        (self.responses > 0).then(|| self.rt_total / self.responses as f64)
    }
}

/// Why the block loop stopped early.
enum Halt {
    Aborted,
    Failed(SessionError),
}

impl From<RecordError> for Halt {
    fn from(e: RecordError) -> Self {
        Halt::Failed(e.into())
    }
}

impl From<ConfigurationError> for Halt {
    fn from(e: ConfigurationError) -> Self {
        Halt::Failed(e.into())
    }
}

/// What the drivers produced while a trial's events were presented
struct Presentation {
    onsets: Onsets,
    response: Response,
    response_onset: Option<f64>,
}

/// Runs the blocks in order, one trial at a time, logging each trial as it ends.
pub struct Session<T, R, D, I>
where
    T: Timer<Timestamp = u64>,
    R: Rng,
    D: DisplayDriver,
    I: InputDriver,
{
    pub participant_id: String,
    pub config: ExperimentConfig,
    pub timer: T,
    pub rng: R,
    display: D,
    input: I,
    logger: TrialLogger,
    timeline: TimelineBuilder,
    next_start: f64,
    summary: SessionSummary,
}

impl<T, R, D, I> Session<T, R, D, I>
where
    T: Timer<Timestamp = u64>,
    R: Rng,
    D: DisplayDriver,
    I: InputDriver,
{
    pub fn new(
        participant_id: impl Into<String>,
        config: ExperimentConfig,
        timer: T,
        rng: R,
        display: D,
        input: I,
        logger: TrialLogger,
    ) -> Result<Self, ConfigurationError> {
        config.validate()?;
        let timeline = TimelineBuilder::new(&config.timing)?;
        Ok(Self {
            participant_id: participant_id.into(),
            config,
            timer,
            rng,
            display,
            input,
            logger,
            timeline,
            next_start: 0.0,
            summary: SessionSummary::default(),
        })
    }

    /// Generates both plans, then runs WM → rest → relational.
    ///
    /// Driver failures become error rows; an operator abort ends the session
    /// early with `aborted` set. Logger failures are fatal. Rows already
    /// appended stay on disk in every case.
    pub fn run(mut self) -> Result<SessionSummary, SessionError> {
        let wm_plan = self.config.wm.generate(&mut self.rng)?;
        let main_plan = self.config.relational.generate(&mut self.rng)?;
        self.summary.wm_plan_satisfied = wm_plan.satisfied;
        self.summary.main_plan_satisfied = main_plan.satisfied;
        info!(
            participant = %self.participant_id,
            wm_trials = wm_plan.len(),
            wm_satisfied = wm_plan.satisfied,
            main_trials = main_plan.len(),
            main_satisfied = main_plan.satisfied,
            main_attempts = main_plan.attempts,
            "session plans generated"
        );
        if !wm_plan.satisfied {
            warn!("working-memory order still has back-to-back sample repeats");
        }

        match self.run_blocks(&wm_plan, &main_plan) {
            Ok(()) => match self.show_instructions(END_TEXT) {
                Ok(()) => {}
                Err(Halt::Aborted) => info!("end screen closed by operator"),
                Err(Halt::Failed(e)) => return Err(e),
            },
            Err(Halt::Aborted) => {
                warn!(trials = self.summary.trials, "session aborted by operator");
                self.summary.aborted = true;
            }
            Err(Halt::Failed(e)) => {
                error!(error = %e, trials = self.summary.trials, "session failed");
                return Err(e);
            }
        }

        let rows = self.logger.rows_written();
        self.logger.close()?;
        let summary = self.summary;
        info!(
            rows,
            trials = summary.trials,
            responses = summary.responses,
            timeouts = summary.timeouts,
            errors = summary.errors,
            accuracy = summary.accuracy(),
            mean_rt = summary.mean_rt(),
            "session finished"
        );
        Ok(summary)
    }

    fn run_blocks(
        &mut self,
        wm_plan: &Plan<WmTrialSpec>,
        main_plan: &Plan<RelationalTrialSpec>,
    ) -> Result<(), Halt> {
        for block in BlockKind::sequence() {
            info!(%block, "block started");
            match block {
                BlockKind::WorkingMemory => {
                    self.show_instructions(WM_INSTRUCTIONS)?;
                    for trial in &wm_plan.trials {
                        self.run_wm_trial(trial)?;
                    }
                }
                BlockKind::Rest => self.run_rest()?,
                BlockKind::Relational => {
                    self.show_instructions(MAIN_INSTRUCTIONS)?;
                    let design = self.config.relational.clone();
                    let n_runs = design.n_runs;
                    for (run_index, run) in design.runs(&main_plan.trials).enumerate() {
                        if run_index > 0 {
                            let text = format!(
                                "Break: run {run_index} of {n_runs} complete.\n\n\
                                 Rest for a moment, then continue."
                            );
                            self.show_instructions(&text)?;
                        }
                        for trial in run {
                            self.run_relational_trial(trial)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Shows a text screen once the previous event has run its full course.
    fn show_instructions(&mut self, text: &str) -> Result<(), Halt> {
        self.timer.sleep_until(secs_to_nanos(self.next_start));
        match self.display.instructions(text) {
            Ok(()) => Ok(()),
            Err(DriverError::Aborted) => Err(Halt::Aborted),
            Err(e) => {
                warn!(error = %e, "instruction screen failed");
                Ok(())
            }
        }
    }

    fn run_rest(&mut self) -> Result<(), Halt> {
        self.show_instructions(REST_INSTRUCTIONS)?;
        let start = self.trial_start();
        let duration = self.config.rest_duration_secs;
        match self.display.present(Frame::Rest, duration, start) {
            Ok(_) => {}
            Err(DriverError::Aborted) => return Err(Halt::Aborted),
            Err(e) => warn!(error = %e, "rest screen failed"),
        }
        self.next_start = start + duration;
        Ok(())
    }

    fn run_wm_trial(&mut self, trial: &WmTrialSpec) -> Result<(), Halt> {
        let timing = self.timeline.build_wm(trial);
        let mapping = generate_mapping(&StimulusId::ALL, &mut self.rng)?;
        info!(
            trial = trial.trial_index,
            sample = %trial.sample_stim,
            isi = trial.isi_condition.secs(),
            "wm trial"
        );

        let (outcome, onsets, error) =
            self.present_and_score(&timing, &mapping, trial.correct_stim(), trial.trial_index)?;
        let row = WmRow::new(
            &self.participant_id,
            trial,
            mapping,
            OutcomeColumns::new(&outcome, error),
            onsets,
        );
        self.logger.append_record(BlockKind::WorkingMemory, &row)?;
        self.summary.record(&outcome);
        Ok(())
    }

    fn run_relational_trial(&mut self, trial: &RelationalTrialSpec) -> Result<(), Halt> {
        let timing = self.timeline.build_relational(trial, &mut self.rng);
        let mapping = generate_mapping(&StimulusId::ALL, &mut self.rng)?;
        info!(
            trial = trial.trial_index,
            run = trial.run_index + 1,
            rule = %trial.rule_type,
            a = %trial.a,
            b = %trial.b,
            "main trial"
        );

        let (outcome, onsets, error) = self.present_and_score(
            &timing,
            &mapping,
            trial.correct_next_stim(),
            trial.trial_index,
        )?;
        let row = MainRow::new(
            &self.participant_id,
            trial,
            &timing,
            mapping,
            OutcomeColumns::new(&outcome, error),
            onsets,
        );
        self.logger.append_record(BlockKind::Relational, &row)?;
        self.summary.record(&outcome);
        Ok(())
    }

    /// Presents one trial and scores it. A driver failure yields an error
    /// outcome with whatever onsets were reached; only an abort propagates.
    fn present_and_score(
        &mut self,
        timing: &RealizedTiming,
        mapping: &SlotMapping,
        correct: StimulusId,
        trial_index: usize,
    ) -> Result<(TrialOutcome, Onsets, Option<String>), Halt> {
        let start = self.trial_start();
        let mut presentation = Presentation {
            onsets: Onsets::pending(timing),
            response: Response::none(),
            response_onset: None,
        };
        let result = self.present(timing, mapping, start, &mut presentation);
        self.next_start = start + timing.duration();

        match result {
            Ok(()) => {
                let cutoff = self.config.timing.response_cutoff_secs;
                let onset = presentation.response_onset.unwrap_or(start);
                let outcome = score(correct, mapping, presentation.response, onset, cutoff);
                match outcome.rt {
                    Some(rt) => info!(
                        trial = trial_index,
                        slot = ?outcome.response_slot.map(|s| s.get()),
                        rt,
                        correct = outcome.correct,
                        "response"
                    ),
                    None => warn!(trial = trial_index, "timeout"),
                }
                Ok((outcome, presentation.onsets, None))
            }
            Err(DriverError::Aborted) => Err(Halt::Aborted),
            Err(e) => {
                error!(trial = trial_index, error = %e, "trial failed, continuing");
                Ok((TrialOutcome::error(), presentation.onsets, Some(e.to_string())))
            }
        }
    }

    fn present(
        &mut self,
        timing: &RealizedTiming,
        mapping: &SlotMapping,
        start: f64,
        presentation: &mut Presentation,
    ) -> Result<(), DriverError> {
        for (index, event) in timing.events.iter().enumerate() {
            let frame = match event.kind {
                EventKind::Fixation | EventKind::Isi | EventKind::Iti => Frame::Fixation,
                EventKind::Stimulus(stim) => Frame::Stimulus(stim),
                EventKind::Response => Frame::ResponseScreen(*mapping),
            };
            let actual = self
                .display
                .present(frame, event.realized, start + event.onset)?;
            presentation.onsets.set(index, actual);
            debug!(event = event.name, onset = actual, duration = event.realized, "presented");

            if event.kind == EventKind::Response {
                presentation.response_onset = Some(actual);
                let deadline = actual + self.config.timing.response_cutoff_secs;
                presentation.response = self.input.await_response(deadline)?;
            }
        }
        Ok(())
    }

    /// Session-clock seconds at which the next trial may begin.
    fn trial_start(&self) -> f64 {
        nanos_to_secs(self.timer.now()).max(self.next_start)
    }
}
