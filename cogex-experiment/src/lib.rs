//! Trial design and session orchestration for the working-memory and
//! relational pattern-completion tasks.

pub mod config;
pub mod driver;
pub mod error;
pub mod mapping;
pub mod plan;
pub mod record;
pub mod relational;
pub mod scoring;
pub mod session;
pub mod simulated;
pub mod timeline;
pub mod wm;

pub use config::{ConfigLoadError, ExperimentConfig, TimingConfig, ITI_BASE_SECS};
pub use driver::{DisplayDriver, Frame, InputDriver};
pub use error::{ConfigurationError, DriverError, SessionError};
pub use mapping::{generate_mapping, SlotMapping};
pub use plan::Plan;
pub use relational::{base_configurations, longest_rule_streak, RelationalDesign, Strictness};
pub use scoring::{score, Response};
pub use session::{participant_rng, session_rng, Session, SessionSummary};
pub use simulated::{SimulatedDisplay, SimulatedParticipant};
pub use timeline::{EventKind, RealizedTiming, TimedEvent, TimelineBuilder, TrialSpec};
pub use wm::WmDesign;
