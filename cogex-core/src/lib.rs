pub mod block;
pub mod stimulus;
pub mod trial;

pub use block::BlockKind;
pub use stimulus::{SlotIndex, StimulusId, SLOT_COUNT};
pub use trial::{
    IsiCondition, RelationalTrialSpec, ResponseStatus, RuleType, TrialOutcome, WmTrialSpec,
};
