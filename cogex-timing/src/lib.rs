pub mod jitter;
pub mod timer;

pub use jitter::{Jitter, JitterError, JitterParams};
pub use timer::{nanos_to_secs, secs_to_nanos, HighPrecisionTimer, Timer, VirtualClock};
