use cogex_core::BlockKind;
use serde_json::Value;

use crate::error::RecordError;
use crate::Row;

/// Events of a working-memory trial, in presentation order.
pub const WM_EVENTS: &[&str] = &["fixation", "sample", "delay", "response"];

/// Events of a relational trial, in presentation order.
pub const MAIN_EVENTS: &[&str] = &[
    "fixation", "item1", "isi1", "item2", "isi2", "item3", "isi3", "test1", "isi4", "test2",
    "response", "iti",
];

pub const WM_COLUMNS: &[&str] = &[
    "block",
    "participant_id",
    "trial_index",
    "sample_stim",
    "isi_condition",
    "correct_stim",
    "response_slot",
    "response_stim",
    "correct",
    "rt",
    "slot_mapping",
    "onset_fixation",
    "onset_sample",
    "onset_delay",
    "onset_response",
    "outcome",
    "error",
];

pub const MAIN_COLUMNS: &[&str] = &[
    "block",
    "participant_id",
    "trial_index",
    "run_index",
    "rule_type",
    "A_stim",
    "B_stim",
    "rule_sequence",
    "test_sequence",
    "correct_next_stim",
    "isi_jitters",
    "iti_jitter",
    "response_slot",
    "response_stim",
    "correct",
    "rt",
    "slot_mapping",
    "onset_fixation",
    "onset_item1",
    "onset_isi1",
    "onset_item2",
    "onset_isi2",
    "onset_item3",
    "onset_isi3",
    "onset_test1",
    "onset_isi4",
    "onset_test2",
    "onset_response",
    "onset_iti",
    "outcome",
    "error",
];

/// Fixed column set of one block's rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    pub block: BlockKind,
    pub columns: &'static [&'static str],
}

static WM_SCHEMA: Schema = Schema {
    block: BlockKind::WorkingMemory,
    columns: WM_COLUMNS,
};

static MAIN_SCHEMA: Schema = Schema {
    block: BlockKind::Relational,
    columns: MAIN_COLUMNS,
};

impl Schema {
    pub fn for_block(block: BlockKind) -> Result<&'static Schema, RecordError> {
        match block {
            BlockKind::WorkingMemory => Ok(&WM_SCHEMA),
            BlockKind::Relational => Ok(&MAIN_SCHEMA),
            BlockKind::Rest => Err(RecordError::UnloggedBlock(block)),
        }
    }

    /// Rejects rows with missing or extra columns, or the wrong `block` tag.
    pub fn check(&self, row: &Row) -> Result<(), RecordError> {
        let missing: Vec<String> = self
            .columns
            .iter()
            .filter(|col| !row.contains_key(**col))
            .map(|col| col.to_string())
            .collect();
        let extra: Vec<String> = row
            .keys()
            .filter(|key| !self.columns.iter().any(|col| *col == key.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() || !extra.is_empty() {
            return Err(RecordError::Schema {
                block: self.block,
                missing,
                extra,
            });
        }

        let expected = self.block.record_tag();
        match row.get("block") {
            Some(Value::String(tag)) if Some(tag.as_str()) == expected => Ok(()),
            other => Err(RecordError::BlockMismatch {
                expected: self.block,
                found: other.map(Value::to_string).unwrap_or_default(),
            }),
        }
    }

    /// Copies `row` into schema column order.
    pub(crate) fn ordered(&self, row: &Row) -> Row {
        self.columns
            .iter()
            .filter_map(|col| row.get(*col).map(|v| (col.to_string(), v.clone())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wm_row() -> Row {
        WM_COLUMNS
            .iter()
            .map(|c| (c.to_string(), Value::Null))
            .chain([("block".to_string(), json!("wm"))])
            .collect()
    }

    #[test]
    fn onset_columns_cover_every_event() {
        for event in MAIN_EVENTS {
            let column = format!("onset_{event}");
            assert!(MAIN_COLUMNS.iter().any(|c| *c == column));
        }
        for event in WM_EVENTS {
            let column = format!("onset_{event}");
            assert!(WM_COLUMNS.iter().any(|c| *c == column));
        }
    }

    #[test]
    fn complete_row_passes() {
        let schema = Schema::for_block(BlockKind::WorkingMemory).unwrap();
        assert!(schema.check(&wm_row()).is_ok());
    }

    #[test]
    fn missing_and_extra_columns_are_reported() {
        let schema = Schema::for_block(BlockKind::WorkingMemory).unwrap();
        let mut row = wm_row();
        row.remove("rt");
        row.insert("reaction".into(), json!(0.4));
        match schema.check(&row) {
            Err(RecordError::Schema { missing, extra, .. }) => {
                assert_eq!(missing, vec!["rt".to_string()]);
                assert_eq!(extra, vec!["reaction".to_string()]);
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn wrong_block_tag_is_rejected() {
        let schema = Schema::for_block(BlockKind::WorkingMemory).unwrap();
        let mut row = wm_row();
        row.insert("block".into(), json!("main"));
        assert!(matches!(
            schema.check(&row),
            Err(RecordError::BlockMismatch { .. })
        ));
    }

    #[test]
    fn rest_has_no_schema() {
        assert!(Schema::for_block(BlockKind::Rest).is_err());
    }
}
