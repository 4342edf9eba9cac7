// crates/trimline-media/src/decode.rs
//
// FrameDecoder: "give me an RGBA thumbnail for the frame at t".
// FfmpegFrameDecoder: stateful implementation that keeps one open input and
// decodes forward when the next request is close ahead, seeking otherwise.

use trimline_core::{Thumbnail, TimelineError};

/// One decoder handle. Each rayon worker owns its own, so implementations
/// need `Send` but never `Sync`.
pub trait FrameDecoder: Send {
    /// Thumbnail of the frame displayed at `timestamp_ms`.
    ///
    /// Errors are per-frame (`DecodeMiss`); the caller stores a placeholder
    /// and moves on.
    fn decode_at(&mut self, timestamp_ms: i64) -> Result<Thumbnail, TimelineError>;
}

#[cfg(feature = "ffmpeg")]
pub use self::live::FfmpegFrameDecoder;

#[cfg(feature = "ffmpeg")]
mod live {
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use anyhow::{anyhow, Result};
    use tracing::debug;

    use ffmpeg_the_third as ffmpeg;
    use ffmpeg::format::{input, Pixel};
    use ffmpeg::media::Type;
    use ffmpeg::software::scaling::{context::Context as SwsContext, flag::Flags};
    use ffmpeg::Rational;

    use trimline_core::{Thumbnail, TimelineError};

    use super::FrameDecoder;
    use crate::helpers::seek::seek_to_us;
    use crate::helpers::time::{from_us, to_us};

    /// Forward jumps up to this far are decoded through instead of seeking.
    const MAX_FORWARD_DECODE_MS: i64 = 2000;

    pub struct FfmpegFrameDecoder {
        path:      PathBuf,
        ictx:      ffmpeg::format::context::Input,
        decoder:   ffmpeg::decoder::video::Video,
        scaler:    SwsContext,
        video_idx: usize,
        time_base: Rational,
        /// pts of the last decoded frame, `None` right after open.
        last_pts:  Option<i64>,
        out_w:     u32,
        out_h:     u32,
    }

    // `scaler` is the only field that is not `Send`: SwsContext wraps a raw
    // `*mut SwsContext`. It is created in `open` and used only through
    // `&mut self`, so it moves with the decoder and is never shared.
    unsafe impl Send for FfmpegFrameDecoder {}

    impl FfmpegFrameDecoder {
        pub fn open(path: &Path, out_w: u32, out_h: u32) -> Result<Self> {
            let ictx = input(path)?;
            let (video_idx, time_base) = {
                let stream = ictx
                    .streams()
                    .best(Type::Video)
                    .ok_or_else(|| anyhow!("no video stream"))?;
                (stream.index(), stream.time_base())
            };

            // Second context for decoder params (Parameters borrows from the
            // stream, which borrows ictx).
            let ictx2 = input(path)?;
            let stream2 = ictx2
                .stream(video_idx)
                .ok_or_else(|| anyhow!("video stream {video_idx} disappeared"))?;
            let dec_ctx = ffmpeg::codec::context::Context::from_parameters(stream2.parameters())?;
            let decoder = dec_ctx.decoder().video()?;

            let (out_w, out_h) = (out_w.max(2) & !1, out_h.max(2) & !1);
            let scaler = SwsContext::get(
                decoder.format(), decoder.width(), decoder.height(),
                Pixel::RGBA, out_w, out_h, Flags::BILINEAR,
            )?;

            Ok(Self {
                path: path.to_path_buf(),
                ictx,
                decoder,
                scaler,
                video_idx,
                time_base,
                last_pts: None,
                out_w,
                out_h,
            })
        }

        fn ms_to_pts(&self, ms: i64) -> i64 {
            from_us(ms * 1000, self.time_base)
        }

        fn needs_seek(&self, target_pts: i64) -> bool {
            match self.last_pts {
                None => true,
                Some(last) => {
                    target_pts <= last || target_pts > last + self.ms_to_pts(MAX_FORWARD_DECODE_MS)
                }
            }
        }

        /// Decodes forward until a frame at or past `target_pts`; at EOF the
        /// last decoded frame stands in.
        fn advance_to(&mut self, target_pts: i64) -> Option<Vec<u8>> {
            let mut last_raw: Option<ffmpeg::util::frame::video::Video> = None;
            for (stream, packet) in self.ictx.packets().flatten() {
                if stream.index() != self.video_idx {
                    continue;
                }
                if self.decoder.send_packet(&packet).is_err() {
                    continue;
                }
                let mut decoded = ffmpeg::util::frame::video::Video::empty();
                while self.decoder.receive_frame(&mut decoded).is_ok() {
                    let pts = decoded.pts().unwrap_or(self.last_pts.unwrap_or(0) + 1);
                    self.last_pts = Some(pts);
                    // Pre-roll from the keyframe is decoded but never scaled.
                    if pts < target_pts {
                        last_raw = Some(decoded.clone());
                        continue;
                    }
                    return self.scale(&decoded);
                }
            }
            last_raw.and_then(|frame| self.scale(&frame))
        }

        fn scale(&mut self, frame: &ffmpeg::util::frame::video::Video) -> Option<Vec<u8>> {
            let mut out = ffmpeg::util::frame::video::Video::empty();
            self.scaler.run(frame, &mut out).ok()?;
            Some(destripe(&out, self.out_w, self.out_h))
        }
    }

    impl FrameDecoder for FfmpegFrameDecoder {
        fn decode_at(&mut self, timestamp_ms: i64) -> Result<Thumbnail, TimelineError> {
            let miss = TimelineError::DecodeMiss { timestamp_ms };
            let target_pts = self.ms_to_pts(timestamp_ms);

            if self.needs_seek(target_pts) {
                if timestamp_ms <= 0 && self.last_pts.is_some() {
                    // A used context cannot seek to zero portably; start over.
                    *self = Self::open(&self.path, self.out_w, self.out_h).map_err(|e| {
                        debug!("[thumbs] reopen {}: {e}", self.path.display());
                        miss.clone()
                    })?;
                } else {
                    seek_to_us(&mut self.ictx, timestamp_ms * 1000, "thumbnail");
                    self.decoder.flush();
                }
            }

            let rgba = self.advance_to(target_pts).ok_or(miss)?;
            debug!(
                "[thumbs] {}ms decoded (pts {:.3}s)",
                timestamp_ms,
                to_us(self.last_pts.unwrap_or(0), self.time_base) as f64 / 1e6
            );
            Ok(Thumbnail { width: self.out_w, height: self.out_h, rgba: Arc::from(rgba) })
        }
    }

    /// Copies only the visible pixels of a scaled RGBA frame, dropping the
    /// stride padding.
    fn destripe(frame: &ffmpeg::util::frame::video::Video, w: u32, h: u32) -> Vec<u8> {
        let stride = frame.stride(0);
        let raw = frame.data(0);
        let row_bytes = w as usize * 4;
        (0..h as usize)
            .flat_map(|row| &raw[row * stride..row * stride + row_bytes])
            .copied()
            .collect()
    }
}
