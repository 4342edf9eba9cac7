// crates/trimline-media/src/helpers/seek.rs
//
// Backward seek to the sync point at or before a timestamp, with soft-fail.
//
// Every seek in the crate routes through here: the thumbnail decoder when it
// jumps, and each per-track reader of the remux backend. Whether a failure is
// fatal is the caller's decision; this only reports it.

use ffmpeg_the_third as ffmpeg;
use tracing::warn;

/// Seek `ictx` to `target_us` microseconds from the start of the file.
///
/// Returns `true` if the seek succeeded or was skipped because the target is
/// the start of the file. Returns `false` on failure; the demuxer then keeps
/// reading from its current position.
///
/// The range is `..=target`, so the demuxer lands on the keyframe before the
/// target and the caller discards pre-roll by timestamp.
///
/// `avformat_seek_file(max_ts = 0)` fails with EPERM on Windows for a freshly
/// opened context, so a zero target is skipped. Callers that need to rewind a
/// used context to zero reopen it instead.
pub fn seek_to_us(
    ictx:      &mut ffmpeg::format::context::Input,
    target_us: i64,
    label:     &str,
) -> bool {
    if target_us <= 0 {
        return true;
    }
    // AV_TIME_BASE is microseconds.
    match ictx.seek(target_us, ..=target_us) {
        Ok(()) => true,
        Err(e) => {
            warn!(
                "[seek] soft-fail in {label} at {:.3}s: {e}; reading from current position",
                target_us as f64 / 1e6
            );
            false
        }
    }
}
