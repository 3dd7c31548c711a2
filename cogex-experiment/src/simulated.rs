//! Headless drivers on a [`VirtualClock`] for dry runs and tests.

use cogex_core::{SlotIndex, SLOT_COUNT};
use cogex_timing::{nanos_to_secs, secs_to_nanos, JitterParams, Timer, VirtualClock};
use rand::Rng;
use rand_distr::StandardNormal;

use crate::driver::{DisplayDriver, Frame, InputDriver};
use crate::error::{ConfigurationError, DriverError};
use crate::scoring::Response;

/// Display that jumps the virtual clock to each onset
#[derive(Debug, Clone)]
pub struct SimulatedDisplay {
    clock: VirtualClock,
    pub frames_shown: usize,
}

impl SimulatedDisplay {
    pub fn new(clock: VirtualClock) -> Self {
        Self {
            clock,
            frames_shown: 0,
        }
    }
}

impl DisplayDriver for SimulatedDisplay {
    fn present(&mut self, _frame: Frame, _duration: f64, onset: f64) -> Result<f64, DriverError> {
        self.clock.sleep_until(secs_to_nanos(onset));
        self.frames_shown += 1;
        Ok(nanos_to_secs(self.clock.now()))
    }
}

/// Participant that presses a random slot after a Gaussian RT, or misses.
#[derive(Debug, Clone)]
pub struct SimulatedParticipant<R: Rng> {
    clock: VirtualClock,
    rng: R,
    rt: JitterParams,
    miss_rate: f64,
}

impl<R: Rng> SimulatedParticipant<R> {
    pub fn new(clock: VirtualClock, rng: R) -> Self {
        Self {
            clock,
            rng,
            rt: JitterParams::new(0.8, 0.35, 0.15),
            miss_rate: 0.05,
        }
    }

    pub fn with_miss_rate(mut self, miss_rate: f64) -> Result<Self, ConfigurationError> {
        if !(0.0..=1.0).contains(&miss_rate) {
            return Err(ConfigurationError::Probability {
                field: "miss_rate",
                value: miss_rate,
            });
        }
        self.miss_rate = miss_rate;
        Ok(self)
    }
}

impl<R: Rng> InputDriver for SimulatedParticipant<R> {
    fn await_response(&mut self, deadline: f64) -> Result<Response, DriverError> {
        let miss = self.rng.random_bool(self.miss_rate);
        let z: f64 = self.rng.sample(StandardNormal);
        let rt = (self.rt.mean + self.rt.sd * z).max(self.rt.floor);
        let slot = self.rng.random_range(1..=SLOT_COUNT as u8);

        let pressed_at = nanos_to_secs(self.clock.now()) + rt;
        if miss || pressed_at >= deadline {
            self.clock.sleep_until(secs_to_nanos(deadline));
            return Ok(Response::none());
        }
        self.clock.sleep_until(secs_to_nanos(pressed_at));
        let slot =
            SlotIndex::new(slot).ok_or_else(|| DriverError::Input(format!("bad slot {slot}")))?;
        Ok(Response::pressed(slot, nanos_to_secs(self.clock.now())))
    }
}
