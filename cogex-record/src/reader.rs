use cogex_core::BlockKind;
use serde_json::Value;
use std::path::Path;

use crate::error::RecordError;
use crate::schema::Schema;
use crate::Row;

/// One validated row read back from a trial log
#[derive(Debug, Clone, PartialEq)]
pub struct LogRow {
    pub block: BlockKind,
    pub fields: Row,
}

impl LogRow {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecoveredLog {
    pub rows: Vec<LogRow>,
    /// A trailing unterminated fragment (a write cut short) was skipped.
    pub torn_tail: bool,
}

impl RecoveredLog {
    pub fn rows_for(&self, block: BlockKind) -> impl Iterator<Item = &LogRow> {
        self.rows.iter().filter(move |row| row.block == block)
    }
}

/// Reads every complete row of a trial log, validating each against its schema.
///
/// Only an unterminated final line is tolerated; a malformed complete line
/// is corruption and is reported as an error.
pub fn read_log(path: impl AsRef<Path>) -> Result<RecoveredLog, RecordError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(RecordError::io(path))?;

    let mut log = RecoveredLog::default();
    for (idx, line) in bytes.split_inclusive(|b| *b == b'\n').enumerate() {
        let Some(body) = line.strip_suffix(b"\n") else {
            // Only the last chunk can lack a newline.
            log.torn_tail = true;
            break;
        };
        if body.is_empty() {
            continue;
        }
        log.rows.push(parse_row(path, idx + 1, body)?);
    }
    Ok(log)
}

fn parse_row(path: &Path, line: usize, body: &[u8]) -> Result<LogRow, RecordError> {
    let corrupt = |reason: String| RecordError::Corrupt {
        path: path.to_path_buf(),
        line,
        reason,
    };
    let fields = match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(fields)) => fields,
        Ok(_) => return Err(corrupt("not a JSON object".into())),
        Err(e) => return Err(corrupt(e.to_string())),
    };
    let block = fields
        .get("block")
        .and_then(Value::as_str)
        .and_then(BlockKind::from_record_tag)
        .ok_or_else(|| corrupt("missing or unknown block tag".into()))?;
    Schema::for_block(block)?
        .check(&fields)
        .map_err(|e| corrupt(e.to_string()))?;
    Ok(LogRow { block, fields })
}
