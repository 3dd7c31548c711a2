use cogex_core::{SlotIndex, StimulusId, SLOT_COUNT};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::error::ConfigurationError;

/// Assignment of stimuli to response slots; slot `n` shows `slots[n - 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SlotMapping {
    slots: [StimulusId; SLOT_COUNT],
}

impl SlotMapping {
    /// Accepts `slots` only if every stimulus appears exactly once.
    pub fn from_slots(slots: [StimulusId; SLOT_COUNT]) -> Result<Self, ConfigurationError> {
        let distinct = distinct_count(&slots);
        if distinct != SLOT_COUNT {
            return Err(ConfigurationError::StimulusSet {
                expected: SLOT_COUNT,
                found: distinct,
            });
        }
        Ok(Self { slots })
    }

    pub fn stim_at(&self, slot: SlotIndex) -> StimulusId {
        self.slots[slot.position()]
    }

    pub fn slot_of(&self, stim: StimulusId) -> Option<SlotIndex> {
        SlotIndex::all()
            .zip(self.slots)
            .find_map(|(slot, s)| (s == stim).then_some(slot))
    }

    pub fn slots(&self) -> &[StimulusId; SLOT_COUNT] {
        &self.slots
    }
}

fn distinct_count(stimuli: &[StimulusId]) -> usize {
    let mut sorted = stimuli.to_vec();
    sorted.sort();
    sorted.dedup();
    sorted.len()
}

/// Uniformly random permutation of `stimuli` over the response slots.
pub fn generate_mapping<R: Rng + ?Sized>(
    stimuli: &[StimulusId],
    rng: &mut R,
) -> Result<SlotMapping, ConfigurationError> {
    let found = distinct_count(stimuli);
    let mut slots: [StimulusId; SLOT_COUNT] = match stimuli.try_into() {
        Ok(slots) if found == SLOT_COUNT => slots,
        _ => {
            return Err(ConfigurationError::StimulusSet {
                expected: SLOT_COUNT,
                found,
            });
        }
    };
    slots.shuffle(rng);
    Ok(SlotMapping { slots })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    #[test]
    fn every_mapping_is_a_bijection() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..500 {
            let mapping = generate_mapping(&StimulusId::ALL, &mut rng).unwrap();
            for slot in SlotIndex::all() {
                assert_eq!(mapping.slot_of(mapping.stim_at(slot)), Some(slot));
            }
            for stim in StimulusId::ALL {
                let slot = mapping.slot_of(stim).unwrap();
                assert_eq!(mapping.stim_at(slot), stim);
            }
        }
    }

    #[test]
    fn every_stimulus_visits_every_slot() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut counts: HashMap<(StimulusId, u8), usize> = HashMap::new();
        for _ in 0..4000 {
            let mapping = generate_mapping(&StimulusId::ALL, &mut rng).unwrap();
            for slot in SlotIndex::all() {
                *counts.entry((mapping.stim_at(slot), slot.get())).or_default() += 1;
            }
        }
        assert_eq!(counts.len(), 16);
        // 1000 expected per cell
        assert!(counts.values().all(|c| (800..1200).contains(c)), "{counts:?}");
    }

    #[test]
    fn malformed_stimulus_sets_are_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        let three = &StimulusId::ALL[..3];
        assert_eq!(
            generate_mapping(three, &mut rng),
            Err(ConfigurationError::StimulusSet {
                expected: 4,
                found: 3
            })
        );
        let duplicated = [
            StimulusId::Circle,
            StimulusId::Circle,
            StimulusId::Star,
            StimulusId::Triangle,
        ];
        assert!(generate_mapping(&duplicated, &mut rng).is_err());
        assert!(SlotMapping::from_slots(duplicated).is_err());
    }

    #[test]
    fn serializes_as_slot_ordered_list() {
        let mapping = SlotMapping::from_slots([
            StimulusId::Star,
            StimulusId::Circle,
            StimulusId::Triangle,
            StimulusId::Rectangle,
        ])
        .unwrap();
        assert_eq!(
            serde_json::to_string(&mapping).unwrap(),
            r#"["star","circle","triangle","rectangle"]"#
        );
    }
}
