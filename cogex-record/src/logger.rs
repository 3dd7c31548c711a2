use cogex_core::BlockKind;
use serde::Serialize;
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::RecordError;
use crate::schema::Schema;
use crate::Row;

/// Exclusive writer of a session's data file.
///
/// Rows are never buffered: each `append` performs one `write_all` of a
/// complete line, then flushes and syncs before returning.
#[derive(Debug)]
pub struct TrialLogger {
    file: File,
    path: PathBuf,
    rows: usize,
}

impl TrialLogger {
    /// Opens `path` for appending, creating it if needed.
    ///
    /// A torn trailing fragment left by an earlier crash is cut back to the
    /// last complete line so new rows never fuse with it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RecordError> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)
            .map_err(RecordError::io(&path))?;
        trim_torn_tail(&mut file, &path)?;
        debug!(path = %path.display(), "trial log opened");
        Ok(Self {
            file,
            path,
            rows: 0,
        })
    }

    /// Rows appended through this handle.
    pub fn rows_written(&self) -> usize {
        self.rows
    }

    /// Validates `row` against the block's schema and persists it.
    pub fn append(&mut self, block: BlockKind, row: &Row) -> Result<(), RecordError> {
        let schema = Schema::for_block(block)?;
        schema.check(row)?;

        let mut line = serde_json::to_vec(&schema.ordered(row))?;
        line.push(b'\n');

        write_durably(&mut self.file, &line).map_err(RecordError::io(&self.path))?;
        self.rows += 1;
        Ok(())
    }

    /// Serializes a typed record and appends it.
    pub fn append_record<T: Serialize>(
        &mut self,
        block: BlockKind,
        record: &T,
    ) -> Result<(), RecordError> {
        match serde_json::to_value(record)? {
            Value::Object(row) => self.append(block, &row),
            _ => Err(RecordError::NotAnObject),
        }
    }

    pub fn close(self) -> Result<(), RecordError> {
        self.file.sync_all().map_err(RecordError::io(&self.path))?;
        debug!(path = %self.path.display(), rows = self.rows, "trial log closed");
        Ok(())
    }
}

fn write_durably(file: &mut File, line: &[u8]) -> io::Result<()> {
    file.write_all(line)?;
    file.flush()?;
    file.sync_data()
}

fn read_all(file: &mut File, buf: &mut Vec<u8>) -> io::Result<()> {
    file.seek(SeekFrom::Start(0))?;
    file.read_to_end(buf)?;
    Ok(())
}

fn trim_torn_tail(file: &mut File, path: &Path) -> Result<(), RecordError> {
    let len = file.metadata().map_err(RecordError::io(path))?.len();
    if len == 0 {
        return Ok(());
    }
    let mut contents = Vec::with_capacity(len as usize);
    read_all(file, &mut contents).map_err(RecordError::io(path))?;
    if contents.last() == Some(&b'\n') {
        return Ok(());
    }
    let keep = contents
        .iter()
        .rposition(|b| *b == b'\n')
        .map_or(0, |pos| pos + 1);
    warn!(
        path = %path.display(),
        discarded_bytes = contents.len() - keep,
        "discarding torn trailing row"
    );
    file.set_len(keep as u64).map_err(RecordError::io(path))?;
    file.sync_all().map_err(RecordError::io(path))
}
