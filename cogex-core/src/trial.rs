use serde::{Deserialize, Serialize};
use std::fmt;

use crate::stimulus::{SlotIndex, StimulusId};

/// Retention interval of a working-memory trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IsiCondition {
    Short,
    Long,
}

impl IsiCondition {
    pub const ALL: [IsiCondition; 2] = [IsiCondition::Short, IsiCondition::Long];

    pub fn secs(&self) -> f64 {
        match self {
            IsiCondition::Short => 1.0,
            IsiCondition::Long => 2.5,
        }
    }
}

/// Pattern over the three rule items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleType {
    #[serde(rename = "ABA")]
    Aba,
    #[serde(rename = "ABB")]
    Abb,
}

impl RuleType {
    pub const ALL: [RuleType; 2] = [RuleType::Aba, RuleType::Abb];

    pub fn label(&self) -> &'static str {
        match self {
            RuleType::Aba => "ABA",
            RuleType::Abb => "ABB",
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WmTrialSpec {
    pub trial_index: usize,
    pub sample_stim: StimulusId,
    pub isi_condition: IsiCondition,
}

impl WmTrialSpec {
    /// The sample is also the correct 4AFC choice.
    pub fn correct_stim(&self) -> StimulusId {
        self.sample_stim
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationalTrialSpec {
    pub trial_index: usize,
    pub rule_type: RuleType,
    pub a: StimulusId,
    pub b: StimulusId,
    pub run_index: usize,
}

impl RelationalTrialSpec {
    /// `(A, B, rule)` identity used by the balance and repeat constraints.
    pub fn configuration(&self) -> (StimulusId, StimulusId, RuleType) {
        (self.a, self.b, self.rule_type)
    }

    pub fn rule_sequence(&self) -> [StimulusId; 3] {
        match self.rule_type {
            RuleType::Aba => [self.a, self.b, self.a],
            RuleType::Abb => [self.a, self.b, self.b],
        }
    }

    pub fn test_sequence(&self) -> [StimulusId; 2] {
        [self.a, self.b]
    }

    /// ABA continues with A, ABB continues with B.
    pub fn correct_next_stim(&self) -> StimulusId {
        match self.rule_type {
            RuleType::Aba => self.a,
            RuleType::Abb => self.b,
        }
    }
}

/// How a trial ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Response,
    Timeout,
    Error,
}

/// Scored result of one trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialOutcome {
    pub status: ResponseStatus,
    pub chosen_stim: Option<StimulusId>,
    pub response_slot: Option<SlotIndex>,
    pub correct: bool,
    pub rt: Option<f64>,
}

impl TrialOutcome {
    pub fn timeout() -> Self {
        Self {
            status: ResponseStatus::Timeout,
            chosen_stim: None,
            response_slot: None,
            correct: false,
            rt: None,
        }
    }

    pub fn error() -> Self {
        Self {
            status: ResponseStatus::Error,
            ..Self::timeout()
        }
    }
}
