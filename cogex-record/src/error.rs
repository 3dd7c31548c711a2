use cogex_core::BlockKind;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("{block} row does not match schema: missing {missing:?}, unexpected {extra:?}")]
    Schema {
        block: BlockKind,
        missing: Vec<String>,
        extra: Vec<String>,
    },
    #[error("row tagged {found:?} appended to the {expected} block")]
    BlockMismatch { expected: BlockKind, found: String },
    #[error("the {0} block has no data rows")]
    UnloggedBlock(BlockKind),
    #[error("row must serialize to a JSON object")]
    NotAnObject,
    #[error("{path}: line {line} is not a valid row: {reason}")]
    Corrupt {
        path: PathBuf,
        line: usize,
        reason: String,
    },
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode row: {0}")]
    Encode(#[from] serde_json::Error),
}

impl RecordError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> RecordError {
        let path = path.into();
        move |source| RecordError::Io { path, source }
    }

    /// Schema violations are fatal for the session; the caller must not keep writing.
    pub fn is_schema(&self) -> bool {
        matches!(
            self,
            RecordError::Schema { .. }
                | RecordError::BlockMismatch { .. }
                | RecordError::NotAnObject
        )
    }
}
