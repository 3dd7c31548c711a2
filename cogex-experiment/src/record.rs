use cogex_core::{
    IsiCondition, RelationalTrialSpec, ResponseStatus, RuleType, SlotIndex, StimulusId,
    TrialOutcome, WmTrialSpec,
};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::mapping::SlotMapping;
use crate::timeline::RealizedTiming;

/// Actual onsets per event, serialized as `onset_<event>` columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Onsets(Vec<(&'static str, Option<f64>)>);

impl Onsets {
    /// Every event of `timing`, none presented yet.
    pub fn pending(timing: &RealizedTiming) -> Self {
        Self(timing.events.iter().map(|e| (e.name, None)).collect())
    }

    pub fn set(&mut self, index: usize, onset: f64) {
        if let Some(slot) = self.0.get_mut(index) {
            slot.1 = Some(onset);
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0
            .iter()
            .find(|(event, _)| *event == name)
            .and_then(|(_, onset)| *onset)
    }
}

impl Serialize for Onsets {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (event, onset) in &self.0 {
            map.serialize_entry(&format!("onset_{event}"), onset)?;
        }
        map.end()
    }
}

fn isi_secs<S: Serializer>(isi: &IsiCondition, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(isi.secs())
}

/// Shared outcome columns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutcomeColumns {
    pub response_slot: Option<SlotIndex>,
    pub response_stim: Option<StimulusId>,
    pub correct: bool,
    pub rt: Option<f64>,
    pub outcome: ResponseStatus,
    pub error: Option<String>,
}

impl OutcomeColumns {
    pub fn new(outcome: &TrialOutcome, error: Option<String>) -> Self {
        Self {
            response_slot: outcome.response_slot,
            response_stim: outcome.chosen_stim,
            correct: outcome.correct,
            rt: outcome.rt,
            outcome: outcome.status,
            error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WmRow<'a> {
    pub block: &'static str,
    pub participant_id: &'a str,
    pub trial_index: usize,
    pub sample_stim: StimulusId,
    #[serde(serialize_with = "isi_secs")]
    pub isi_condition: IsiCondition,
    pub correct_stim: StimulusId,
    pub slot_mapping: SlotMapping,
    #[serde(flatten)]
    pub outcome: OutcomeColumns,
    #[serde(flatten)]
    pub onsets: Onsets,
}

impl<'a> WmRow<'a> {
    pub fn new(
        participant_id: &'a str,
        trial: &WmTrialSpec,
        mapping: SlotMapping,
        outcome: OutcomeColumns,
        onsets: Onsets,
    ) -> Self {
        Self {
            block: "wm",
            participant_id,
            trial_index: trial.trial_index,
            sample_stim: trial.sample_stim,
            isi_condition: trial.isi_condition,
            correct_stim: trial.correct_stim(),
            slot_mapping: mapping,
            outcome,
            onsets,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MainRow<'a> {
    pub block: &'static str,
    pub participant_id: &'a str,
    pub trial_index: usize,
    pub run_index: usize,
    pub rule_type: RuleType,
    #[serde(rename = "A_stim")]
    pub a_stim: StimulusId,
    #[serde(rename = "B_stim")]
    pub b_stim: StimulusId,
    pub rule_sequence: [StimulusId; 3],
    pub test_sequence: [StimulusId; 2],
    pub correct_next_stim: StimulusId,
    pub isi_jitters: Vec<f64>,
    pub iti_jitter: Option<f64>,
    pub slot_mapping: SlotMapping,
    #[serde(flatten)]
    pub outcome: OutcomeColumns,
    #[serde(flatten)]
    pub onsets: Onsets,
}

impl<'a> MainRow<'a> {
    pub fn new(
        participant_id: &'a str,
        trial: &RelationalTrialSpec,
        timing: &RealizedTiming,
        mapping: SlotMapping,
        outcome: OutcomeColumns,
        onsets: Onsets,
    ) -> Self {
        Self {
            block: "main",
            participant_id,
            trial_index: trial.trial_index,
            run_index: trial.run_index,
            rule_type: trial.rule_type,
            a_stim: trial.a,
            b_stim: trial.b,
            rule_sequence: trial.rule_sequence(),
            test_sequence: trial.test_sequence(),
            correct_next_stim: trial.correct_next_stim(),
            isi_jitters: timing.isi_jitters(),
            iti_jitter: timing.iti_jitter(),
            slot_mapping: mapping,
            outcome,
            onsets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimingConfig;
    use crate::timeline::TimelineBuilder;
    use cogex_core::BlockKind;
    use cogex_record::{Schema, MAIN_COLUMNS, WM_COLUMNS};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::Value;
    use StimulusId::*;

    fn mapping() -> SlotMapping {
        SlotMapping::from_slots([Triangle, Star, Rectangle, Circle]).unwrap()
    }

    fn columns(value: &Value) -> Vec<String> {
        value.as_object().unwrap().keys().cloned().collect()
    }

    #[test]
    fn wm_row_matches_schema() {
        let trial = WmTrialSpec {
            trial_index: 4,
            sample_stim: Star,
            isi_condition: IsiCondition::Short,
        };
        let timing = TimelineBuilder::new(&TimingConfig::default())
            .unwrap()
            .build_wm(&trial);
        let row = WmRow::new(
            "p1",
            &trial,
            mapping(),
            OutcomeColumns::new(&TrialOutcome::timeout(), None),
            Onsets::pending(&timing),
        );
        let value = serde_json::to_value(&row).unwrap();
        let mut got = columns(&value);
        let mut want: Vec<String> = WM_COLUMNS.iter().map(|c| c.to_string()).collect();
        got.sort();
        want.sort();
        assert_eq!(got, want);
        assert_eq!(value["isi_condition"], 1.0);
        assert_eq!(value["outcome"], "timeout");
        Schema::for_block(BlockKind::WorkingMemory)
            .unwrap()
            .check(value.as_object().unwrap())
            .unwrap();
    }

    #[test]
    fn main_row_matches_schema() {
        let trial = RelationalTrialSpec {
            trial_index: 17,
            rule_type: RuleType::Aba,
            a: Circle,
            b: Triangle,
            run_index: 0,
        };
        let mut rng = StdRng::seed_from_u64(1);
        let timing = TimelineBuilder::new(&TimingConfig::default())
            .unwrap()
            .build_relational(&trial, &mut rng);
        let mut onsets = Onsets::pending(&timing);
        onsets.set(0, 12.0);
        let row = MainRow::new(
            "p1",
            &trial,
            &timing,
            mapping(),
            OutcomeColumns::new(&TrialOutcome::error(), Some("display lost".into())),
            onsets,
        );
        let value = serde_json::to_value(&row).unwrap();
        Schema::for_block(BlockKind::Relational)
            .unwrap()
            .check(value.as_object().unwrap())
            .unwrap();
        assert_eq!(columns(&value).len(), MAIN_COLUMNS.len());
        assert_eq!(value["A_stim"], "circle");
        assert_eq!(value["rule_type"], "ABA");
        assert_eq!(value["correct_next_stim"], "circle");
        assert_eq!(value["onset_fixation"], 12.0);
        assert_eq!(value["onset_item1"], Value::Null);
        assert_eq!(value["isi_jitters"].as_array().unwrap().len(), 4);
        assert_eq!(value["error"], "display lost");
    }
}
