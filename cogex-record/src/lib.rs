//! Append-only, crash-safe trial log.
//!
//! One JSON object per line. A row is on disk (flushed and synced) before
//! [`TrialLogger::append`] returns, so a session killed at any point leaves
//! a file whose complete lines are all valid rows.

pub mod error;
pub mod logger;
pub mod reader;
pub mod schema;

pub use error::RecordError;
pub use logger::TrialLogger;
pub use reader::{read_log, LogRow, RecoveredLog};
pub use schema::{Schema, MAIN_COLUMNS, MAIN_EVENTS, WM_COLUMNS, WM_EVENTS};

pub type Row = serde_json::Map<String, serde_json::Value>;
