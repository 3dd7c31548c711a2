use cogex_core::StimulusId;

use crate::error::DriverError;
use crate::mapping::SlotMapping;
use crate::scoring::Response;

/// What the display shows for one event
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Frame {
    Fixation,
    Stimulus(StimulusId),
    ResponseScreen(SlotMapping),
    Rest,
}

/// Renders frames. Onsets and durations are session-clock seconds.
pub trait DisplayDriver {
    /// Shows `frame` no earlier than `onset` and returns the actual onset.
    fn present(&mut self, frame: Frame, duration: f64, onset: f64) -> Result<f64, DriverError>;

    /// Instruction or break screen between blocks.
    fn instructions(&mut self, _text: &str) -> Result<(), DriverError> {
        Ok(())
    }
}

/// Collects 4AFC key presses.
pub trait InputDriver {
    /// Waits for a press until `deadline` (session-clock seconds). Must
    /// return `Response::none()` rather than block past the deadline.
    fn await_response(&mut self, deadline: f64) -> Result<Response, DriverError>;
}
