// crates/trimline-media/src/probe.rs
//
// Header-only probing: duration of a source, in milliseconds. No decoding, so
// it is cheap enough to run on the caller's thread when a source is set.

use std::path::Path;

use anyhow::{anyhow, Result};
use tracing::info;

use ffmpeg_the_third as ffmpeg;
use ffmpeg::format::input;
use ffmpeg::media::Type;

use crate::helpers::time::to_us;

/// Container duration, falling back to the video (then audio) stream duration.
/// Fails if the file cannot be opened, has no video stream, or reports no
/// usable duration.
pub fn probe_duration_ms(path: &Path) -> Result<i64> {
    let ctx = input(path)?;
    if ctx.streams().best(Type::Video).is_none() {
        return Err(anyhow!("no video stream"));
    }

    let ms = ctx.duration() * 1000 / ffmpeg::ffi::AV_TIME_BASE as i64;
    if ms > 0 {
        info!("[media] duration {ms}ms ← {}", path.display());
        return Ok(ms);
    }

    let stream = ctx
        .streams()
        .best(Type::Video)
        .or_else(|| ctx.streams().best(Type::Audio))
        .ok_or_else(|| anyhow!("no stream with a duration"))?;
    let ms = to_us(stream.duration(), stream.time_base()) / 1000;
    if ms > 0 {
        info!("[media] duration {ms}ms (stream) ← {}", path.display());
        return Ok(ms);
    }
    Err(anyhow!("duration unknown"))
}
