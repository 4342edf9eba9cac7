// crates/trimline-media/src/remux.rs
//
// FFmpeg implementation of the trim pipeline's Demuxer / Muxer.
//
// Reading: one input context per track, so every track seeks to its own sync
// point and reads at its own pace without sharing demuxer state.
// Writing: stream copy. Codec parameters are copied verbatim, codec tags are
// cleared (a source tag may be invalid in the output container) and packet
// times are rewritten in the output stream's time base.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Result};
use tracing::debug;

use ffmpeg_the_third as ffmpeg;
use ffmpeg::format::{input, output};
use ffmpeg::media::Type;
use ffmpeg::{codec, encoder, Packet, Rational};

use trimline_core::media_types::TrimPhase;
use trimline_core::{TimelineError, TrimRange};

use crate::helpers::seek::seek_to_us;
use crate::helpers::time::{from_us, rescale, to_us};
use crate::trim::{
    export_trim_file, trim_tracks, Demuxer, Muxer, Sample, TrackDescriptor, TrackKind,
};

// ── Types ─────────────────────────────────────────────────────────────────────

/// Per-track format: the source stream and its codec parameters, copied so
/// the output stream can be declared without touching the input context.
pub struct FfmpegFormat {
    pub stream_index: usize,
    pub time_base:    Rational,
    parameters:       codec::Parameters,
}

pub struct FfmpegPacket {
    packet:    Packet,
    time_base: Rational,
}

// ── Demuxer ───────────────────────────────────────────────────────────────────

pub struct FfmpegDemuxer {
    tracks:  Vec<TrackDescriptor<FfmpegFormat>>,
    readers: Vec<ffmpeg::format::context::Input>,
}

impl FfmpegDemuxer {
    pub fn open(path: &Path) -> Result<Self> {
        let header = input(path)?;
        let mut tracks = Vec::new();
        for stream in header.streams() {
            let kind = match stream.parameters().medium() {
                Type::Video => TrackKind::Video,
                Type::Audio => TrackKind::Audio,
                other => {
                    debug!("[trim] skipping stream {} ({other:?})", stream.index());
                    continue;
                }
            };
            let mut parameters = codec::Parameters::new();
            unsafe {
                let ret = ffmpeg::ffi::avcodec_parameters_copy(
                    parameters.as_mut_ptr(),
                    stream.parameters().as_ptr(),
                );
                if ret < 0 {
                    bail!("avcodec_parameters_copy (stream {}) failed: {ret}", stream.index());
                }
            }
            tracks.push(TrackDescriptor {
                index: tracks.len(),
                kind,
                format: FfmpegFormat {
                    stream_index: stream.index(),
                    time_base: stream.time_base(),
                    parameters,
                },
            });
        }

        let readers = tracks
            .iter()
            .map(|_| input(path))
            .collect::<Result<Vec<_>, _>>()?;
        debug!("[trim] {} tracks ← {}", tracks.len(), path.display());
        Ok(Self { tracks, readers })
    }
}

impl Demuxer for FfmpegDemuxer {
    type Format = FfmpegFormat;
    type Payload = FfmpegPacket;

    fn tracks(&self) -> &[TrackDescriptor<FfmpegFormat>] {
        &self.tracks
    }

    fn seek_to_sync(&mut self, track: usize, at_us: i64) -> Result<()> {
        let reader = self
            .readers
            .get_mut(track)
            .ok_or_else(|| anyhow!("no reader for track {track}"))?;
        // A failed seek only costs time: pre-roll is filtered by pts.
        seek_to_us(reader, at_us, "trim");
        Ok(())
    }

    fn next_sample(&mut self, track: usize) -> Result<Option<Sample<FfmpegPacket>>> {
        let (stream_index, time_base) = {
            let f = &self.tracks[track].format;
            (f.stream_index, f.time_base)
        };
        for item in self.readers[track].packets() {
            let (stream, packet) = item?;
            if stream.index() != stream_index {
                continue;
            }
            let Some(pts) = packet.pts().or(packet.dts()) else {
                continue;
            };
            return Ok(Some(Sample {
                pts_us:  to_us(pts, time_base),
                dts_us:  packet.dts().map(|dts| to_us(dts, time_base)),
                is_sync: packet.is_key(),
                payload: FfmpegPacket { packet, time_base },
            }));
        }
        Ok(None)
    }
}

// ── Muxer ─────────────────────────────────────────────────────────────────────

pub struct FfmpegMuxer {
    octx:   ffmpeg::format::context::Output,
    out_tb: Vec<Rational>,
    tracks: usize,
}

impl FfmpegMuxer {
    /// The container format is guessed from `path`'s extension.
    pub fn create(path: &Path) -> Result<Self> {
        Ok(Self { octx: output(path)?, out_tb: Vec::new(), tracks: 0 })
    }
}

impl Muxer for FfmpegMuxer {
    type Format = FfmpegFormat;
    type Payload = FfmpegPacket;

    fn add_track(&mut self, track: &TrackDescriptor<FfmpegFormat>) -> Result<usize> {
        let format = &track.format;
        let index = {
            let mut ost = self.octx.add_stream(encoder::find(codec::Id::None))?;
            ost.set_time_base(format.time_base);
            ost.index()
        };
        unsafe {
            let codecpar = (**(*self.octx.as_mut_ptr()).streams.add(index)).codecpar;
            let ret = ffmpeg::ffi::avcodec_parameters_copy(codecpar, format.parameters.as_ptr());
            if ret < 0 {
                bail!("avcodec_parameters_copy (output {index}) failed: {ret}");
            }
            (*codecpar).codec_tag = 0;
        }
        self.tracks += 1;
        Ok(index)
    }

    fn write_header(&mut self) -> Result<()> {
        self.octx.write_header()?;
        // The muxer may pick its own time base per stream during the header.
        self.out_tb = (0..self.tracks)
            .map(|i| {
                self.octx
                    .stream(i)
                    .map(|s| s.time_base())
                    .ok_or_else(|| anyhow!("output stream {i} missing after header"))
            })
            .collect::<Result<_>>()?;
        Ok(())
    }

    fn write_sample(&mut self, track: usize, sample: Sample<FfmpegPacket>) -> Result<()> {
        let out_tb = *self
            .out_tb
            .get(track)
            .ok_or_else(|| anyhow!("sample for undeclared track {track}"))?;
        let FfmpegPacket { mut packet, time_base } = sample.payload;
        packet.set_pts(Some(from_us(sample.pts_us, out_tb)));
        packet.set_dts(sample.dts_us.map(|dts| from_us(dts, out_tb)));
        packet.set_duration(rescale(packet.duration(), time_base, out_tb));
        packet.set_position(-1);
        packet.set_stream(track);
        packet.write_interleaved(&mut self.octx)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.octx.write_trailer()?;
        Ok(())
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Stream-copies `range` of `src` into `dst`. Blocking; runs on the export
/// thread.
pub fn export_trim(
    src:      &Path,
    dst:      &Path,
    range:    &TrimRange,
    on_phase: &mut dyn FnMut(TrimPhase),
) -> Result<PathBuf, TimelineError> {
    range.validate()?;
    export_trim_file(dst, on_phase, |staged, on_phase| {
        let mut demuxer = FfmpegDemuxer::open(src)
            .map_err(|e| TimelineError::trim_io("opening source", format!("{e:#}")))?;
        let mut muxer = FfmpegMuxer::create(staged)
            .map_err(|e| TimelineError::trim_io("creating output", format!("{e:#}")))?;
        trim_tracks(&mut demuxer, &mut muxer, range, on_phase).map(|_| ())
    })
}
