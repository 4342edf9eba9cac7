// crates/trimline-media/src/lib.rs
//
// Everything that touches FFmpeg or a background thread.
//
//   backend  — MediaBackend trait + FfmpegBackend
//   decode   — per-frame thumbnail decoding
//   probe    — header-only duration probe
//   trim     — container-agnostic stream-copy pipeline
//   remux    — FFmpeg Demuxer / Muxer for the trim pipeline
//   worker   — per-level thumbnail threads, rayon decode pool, export threads
//   engine   — TimelineEngine, the facade hosts talk to

pub mod backend;
pub mod decode;
pub mod engine;
#[cfg(feature = "ffmpeg")]
mod helpers;
#[cfg(feature = "ffmpeg")]
pub mod probe;
#[cfg(feature = "ffmpeg")]
pub mod remux;
pub mod trim;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::MediaBackend;
#[cfg(feature = "ffmpeg")]
pub use backend::FfmpegBackend;
pub use engine::TimelineEngine;
pub use trimline_core::MediaResult;
pub use worker::MediaWorker;
