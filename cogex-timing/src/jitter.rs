use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum JitterError {
    #[error("jitter sd must be finite and non-negative, got {0}")]
    InvalidSd(f64),
    #[error("jitter {field} must be finite, got {value}")]
    NonFinite { field: &'static str, value: f64 },
}

/// Gaussian duration with a hard floor, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JitterParams {
    pub mean: f64,
    pub sd: f64,
    pub floor: f64,
}

impl JitterParams {
    pub const fn new(mean: f64, sd: f64, floor: f64) -> Self {
        Self { mean, sd, floor }
    }

    pub fn validate(&self) -> Result<(), JitterError> {
        if !self.mean.is_finite() {
            return Err(JitterError::NonFinite {
                field: "mean",
                value: self.mean,
            });
        }
        if !self.floor.is_finite() {
            return Err(JitterError::NonFinite {
                field: "floor",
                value: self.floor,
            });
        }
        if !self.sd.is_finite() || self.sd < 0.0 {
            return Err(JitterError::InvalidSd(self.sd));
        }
        Ok(())
    }
}

/// Truncated-Gaussian sampler.
///
/// Draws below the floor are clipped to the floor, never redrawn, so a
/// sample costs exactly one draw from the caller's stream.
#[derive(Debug, Clone, Copy)]
pub struct Jitter {
    normal: Normal<f64>,
    floor: f64,
}

impl Jitter {
    pub fn new(params: JitterParams) -> Result<Self, JitterError> {
        params.validate()?;
        let normal =
            Normal::new(params.mean, params.sd).map_err(|_| JitterError::InvalidSd(params.sd))?;
        Ok(Self {
            normal,
            floor: params.floor,
        })
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.normal.sample(rng).max(self.floor)
    }
}

/// One-shot draw of `Gaussian(base, sd)` clipped at `min_value`.
pub fn sample<R: Rng + ?Sized>(
    rng: &mut R,
    base: f64,
    sd: f64,
    min_value: f64,
) -> Result<f64, JitterError> {
    Ok(Jitter::new(JitterParams::new(base, sd, min_value))?.sample(rng))
}
