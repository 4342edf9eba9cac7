// crates/trimline-core/src/media_types.rs
//
// Types that flow across the channels between trimline-media and the view.
// No egui, no ffmpeg — just plain data.

use std::path::PathBuf;
use std::sync::Arc;

use uuid::Uuid;

use crate::error::TimelineError;

/// A downscaled RGBA image for one strip cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub width:  u32,
    pub height: u32,
    pub rgba:   Arc<[u8]>,
}

/// One strip cell. `image == None` means the decode failed or is pending;
/// the renderer draws a bordered placeholder for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedFrame {
    pub timestamp_ms: i64,
    pub image:        Option<Thumbnail>,
}

impl CachedFrame {
    pub fn placeholder(timestamp_ms: i64) -> Self {
        Self { timestamp_ms, image: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    /// First batch of level 0 right after a source load.
    Eager,
    Background,
}

/// Contiguous run of timestamps to decode for one zoom level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    pub level:      usize,
    pub timestamps: Vec<i64>,
    pub priority:   Priority,
}

/// Work the view asks the media layer to do. Drained by the engine each frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaRequest {
    EnsureLevel { generation: u64, plan: BatchPlan },
}

/// Stage of a running trim/export job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimPhase {
    Idle,
    Demuxing,
    Copying { track: usize },
    Muxing,
    Done,
    Failed,
}

/// Results sent from the MediaWorker background threads to the host.
#[derive(Debug)]
pub enum MediaResult {
    Thumbnails  { generation: u64, level: usize, frames: Vec<CachedFrame> },
    /// A thumbnail job could not open the source; its batch is abandoned.
    SourceError { generation: u64, level: usize, error: TimelineError },
    TrimPhase   { job_id: Uuid, phase: TrimPhase },
    TrimDone    { job_id: Uuid, path: PathBuf },
    TrimFailed  { job_id: Uuid, error: TimelineError },
}
