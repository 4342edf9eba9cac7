// crates/trimline-core/src/error.rs
//
// Error taxonomy shared by every crate in the workspace.
//
// Only structural failures travel as `TimelineError`. A single frame that
// cannot be decoded is stored as a placeholder in the cache; `DecodeMiss`
// exists so decoders can name the condition in logs, not so callers see it.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, TimelineError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimelineError {
    /// One frame could not be decoded. Never aborts a batch.
    #[error("frame at {timestamp_ms}ms could not be decoded")]
    DecodeMiss { timestamp_ms: i64 },

    /// The source could not be opened at all.
    #[error("source unavailable: {}: {reason}", .path.display())]
    SourceUnavailable { path: PathBuf, reason: String },

    /// Rejected before any I/O happens.
    #[error("invalid trim range {start_ms}..{end_ms}: {reason}")]
    TrimRangeInvalid {
        start_ms: i64,
        end_ms:   i64,
        reason:   &'static str,
    },

    /// Read, write or mux failure in the middle of an export.
    #[error("trim export failed while {stage}: {reason}")]
    TrimIo { stage: &'static str, reason: String },

    #[error("no source is loaded")]
    NoSource,

    #[error("invalid timeline config: {0}")]
    InvalidConfig(&'static str),
}

impl TimelineError {
    pub fn trim_io(stage: &'static str, err: impl std::fmt::Display) -> Self {
        Self::TrimIo { stage, reason: err.to_string() }
    }
}
