use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of response slots on the 4AFC screen.
pub const SLOT_COUNT: usize = 4;

/// The four shape stimuli used by both tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StimulusId {
    Circle,
    Rectangle,
    Star,
    Triangle,
}

impl StimulusId {
    /// Enumeration order. Design generators iterate in this order before shuffling.
    pub const ALL: [StimulusId; SLOT_COUNT] = [
        StimulusId::Circle,
        StimulusId::Rectangle,
        StimulusId::Star,
        StimulusId::Triangle,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StimulusId::Circle => "circle",
            StimulusId::Rectangle => "rectangle",
            StimulusId::Star => "star",
            StimulusId::Triangle => "triangle",
        }
    }
}

impl fmt::Display for StimulusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One-based position on the response screen, 1..=4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct SlotIndex(u8);

impl SlotIndex {
    pub fn new(slot: u8) -> Option<Self> {
        (1..=SLOT_COUNT as u8).contains(&slot).then_some(Self(slot))
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    /// Zero-based position for indexing slot arrays
    pub fn position(&self) -> usize {
        usize::from(self.0 - 1)
    }

    pub fn all() -> impl Iterator<Item = SlotIndex> {
        (1..=SLOT_COUNT as u8).map(SlotIndex)
    }
}

impl TryFrom<u8> for SlotIndex {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        SlotIndex::new(value).ok_or_else(|| format!("slot {value} outside 1..={SLOT_COUNT}"))
    }
}

impl From<SlotIndex> for u8 {
    fn from(slot: SlotIndex) -> u8 {
        slot.0
    }
}

impl fmt::Display for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
