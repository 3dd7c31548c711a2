use cogex_core::{ResponseStatus, SlotIndex, StimulusId, TrialOutcome};
use serde::Serialize;

use crate::mapping::SlotMapping;

/// What the input driver reported for one response window
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Response {
    pub slot: Option<SlotIndex>,
    /// Session-clock seconds of the key press.
    pub timestamp: Option<f64>,
}

impl Response {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn pressed(slot: SlotIndex, timestamp: f64) -> Self {
        Self {
            slot: Some(slot),
            timestamp: Some(timestamp),
        }
    }
}

/// Scores one response against the correct stimulus.
///
/// RT is measured from the response-screen onset. Only a press strictly
/// after the onset and strictly before `onset + cutoff` counts; anything
/// else, or no press at all, is a timeout.
pub fn score(
    correct_stim: StimulusId,
    mapping: &SlotMapping,
    response: Response,
    response_onset: f64,
    cutoff: f64,
) -> TrialOutcome {
    let (Some(slot), Some(timestamp)) = (response.slot, response.timestamp) else {
        return TrialOutcome::timeout();
    };
    let rt = timestamp - response_onset;
    if rt <= 0.0 || rt >= cutoff {
        return TrialOutcome::timeout();
    }
    let chosen = mapping.stim_at(slot);
    TrialOutcome {
        status: ResponseStatus::Response,
        chosen_stim: Some(chosen),
        response_slot: Some(slot),
        correct: chosen == correct_stim,
        rt: Some(rt),
    }
}
