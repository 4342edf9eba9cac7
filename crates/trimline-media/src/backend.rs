// crates/trimline-media/src/backend.rs
//
// MediaBackend: everything the worker and the engine need from a media
// library, behind one trait so tests can run without FFmpeg.

use std::path::{Path, PathBuf};

use trimline_core::media_types::TrimPhase;
use trimline_core::{TimelineError, TrimRange};

use crate::decode::FrameDecoder;

pub trait MediaBackend: Send + Sync + 'static {
    type Decoder: FrameDecoder;

    /// Header-only duration probe. Runs on the caller's thread.
    fn probe_duration_ms(&self, path: &Path) -> anyhow::Result<i64>;

    /// Opens an independent decoder producing `width`x`height` thumbnails.
    fn open_decoder(&self, path: &Path, width: u32, height: u32) -> anyhow::Result<Self::Decoder>;

    /// Blocking stream-copy export with its own source handles.
    fn export_trim(
        &self,
        src:      &Path,
        dst:      &Path,
        range:    &TrimRange,
        on_phase: &mut dyn FnMut(TrimPhase),
    ) -> Result<PathBuf, TimelineError>;
}

#[cfg(feature = "ffmpeg")]
pub use self::ffmpeg_backend::FfmpegBackend;

#[cfg(feature = "ffmpeg")]
mod ffmpeg_backend {
    use std::path::{Path, PathBuf};

    use trimline_core::media_types::TrimPhase;
    use trimline_core::{TimelineError, TrimRange};

    use super::MediaBackend;
    use crate::decode::FfmpegFrameDecoder;
    use crate::{probe, remux};

    #[derive(Debug)]
    pub struct FfmpegBackend(());

    impl FfmpegBackend {
        /// Initialises FFmpeg once for the process.
        pub fn new() -> anyhow::Result<Self> {
            ffmpeg_the_third::init()?;
            Ok(Self(()))
        }
    }

    impl MediaBackend for FfmpegBackend {
        type Decoder = FfmpegFrameDecoder;

        fn probe_duration_ms(&self, path: &Path) -> anyhow::Result<i64> {
            probe::probe_duration_ms(path)
        }

        fn open_decoder(&self, path: &Path, width: u32, height: u32) -> anyhow::Result<FfmpegFrameDecoder> {
            FfmpegFrameDecoder::open(path, width, height)
        }

        fn export_trim(
            &self,
            src:      &Path,
            dst:      &Path,
            range:    &TrimRange,
            on_phase: &mut dyn FnMut(TrimPhase),
        ) -> Result<PathBuf, TimelineError> {
            remux::export_trim(src, dst, range, on_phase)
        }
    }
}
