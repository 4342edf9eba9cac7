// crates/trimline-media/src/testing.rs
//
// In-memory media used by the unit tests: a synthetic demuxer/muxer pair for
// the trim pipeline and a backend that "decodes" solid-colour thumbnails.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};

use trimline_core::media_types::{Thumbnail, TrimPhase};
use trimline_core::{TimelineError, TrimRange};

use crate::backend::MediaBackend;
use crate::decode::FrameDecoder;
use crate::trim::{
    export_trim_file, trim_tracks, Demuxer, Muxer, Sample, TrackDescriptor, TrackKind,
};

// ── Trim fakes ────────────────────────────────────────────────────────────────

/// A track with samples every `interval_us`, a sync sample every
/// `gop_samples` samples.
#[derive(Debug, Clone)]
pub struct FakeTrack {
    pub kind:        TrackKind,
    pub duration_us: i64,
    pub interval_us: i64,
    pub gop_samples: i64,
}

impl FakeTrack {
    pub fn video(duration_ms: i64, interval_us: i64, gop_us: i64) -> Self {
        Self {
            kind: TrackKind::Video,
            duration_us: duration_ms * 1000,
            interval_us,
            gop_samples: (gop_us / interval_us).max(1),
        }
    }

    pub fn audio(duration_ms: i64, interval_us: i64) -> Self {
        Self { kind: TrackKind::Audio, duration_us: duration_ms * 1000, interval_us, gop_samples: 1 }
    }
}

pub struct FakeDemuxer {
    tracks:     Vec<TrackDescriptor<FakeTrack>>,
    cursors:    Vec<i64>,
    reads:      usize,
    fail_after: Option<usize>,
}

impl FakeDemuxer {
    pub fn new(tracks: Vec<FakeTrack>) -> Self {
        let cursors = vec![0; tracks.len()];
        let tracks = tracks
            .into_iter()
            .enumerate()
            .map(|(index, format)| TrackDescriptor { index, kind: format.kind, format })
            .collect();
        Self { tracks, cursors, reads: 0, fail_after: None }
    }

    /// Every read after the first `reads` fails.
    pub fn failing_after(mut self, reads: usize) -> Self {
        self.fail_after = Some(reads);
        self
    }
}

impl Demuxer for FakeDemuxer {
    type Format = FakeTrack;
    type Payload = u64;

    fn tracks(&self) -> &[TrackDescriptor<FakeTrack>] {
        &self.tracks
    }

    fn seek_to_sync(&mut self, track: usize, at_us: i64) -> Result<()> {
        let t = &self.tracks[track].format;
        let k = at_us.max(0) / t.interval_us;
        self.cursors[track] = k - k % t.gop_samples;
        Ok(())
    }

    fn next_sample(&mut self, track: usize) -> Result<Option<Sample<u64>>> {
        self.reads += 1;
        if self.fail_after.is_some_and(|n| self.reads > n) {
            bail!("simulated read error");
        }
        let t = &self.tracks[track].format;
        let k = self.cursors[track];
        let pts = k * t.interval_us;
        if pts >= t.duration_us {
            return Ok(None);
        }
        self.cursors[track] += 1;
        Ok(Some(Sample {
            pts_us:  pts,
            dts_us:  Some(pts),
            is_sync: k % t.gop_samples == 0,
            payload: k as u64,
        }))
    }
}

#[derive(Debug, Default)]
pub struct FakeMuxer {
    pub tracks:   Vec<TrackKind>,
    pub written:  Vec<(usize, Sample<u64>)>,
    pub finished: bool,
    header:       bool,
    file:         Option<PathBuf>,
}

impl FakeMuxer {
    /// Writes one line per sample to `path` on finish.
    pub fn to_file(path: &Path) -> Self {
        Self { file: Some(path.to_path_buf()), ..Self::default() }
    }
}

impl Muxer for FakeMuxer {
    type Format = FakeTrack;
    type Payload = u64;

    fn add_track(&mut self, track: &TrackDescriptor<FakeTrack>) -> Result<usize> {
        self.tracks.push(track.kind);
        Ok(self.tracks.len() - 1)
    }

    fn write_header(&mut self) -> Result<()> {
        self.header = true;
        Ok(())
    }

    fn write_sample(&mut self, track: usize, sample: Sample<u64>) -> Result<()> {
        if !self.header {
            bail!("sample before header");
        }
        self.written.push((track, sample));
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(path) = &self.file {
            let body: String = self
                .written
                .iter()
                .map(|(track, s)| format!("{track} {}\n", s.pts_us))
                .collect();
            std::fs::write(path, body)?;
        }
        self.finished = true;
        Ok(())
    }
}

// ── Backend fakes ─────────────────────────────────────────────────────────────

/// First byte of the file stem; fills every pixel of that source's thumbnails.
pub fn tag_of(path: &Path) -> u8 {
    path.file_stem()
        .and_then(|s| s.to_str())
        .and_then(|s| s.bytes().next())
        .unwrap_or(0)
}

#[derive(Debug, Default)]
pub struct FakeBackend {
    durations: HashMap<PathBuf, i64>,
    misses:    Vec<i64>,
    delay:     Duration,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(mut self, path: impl AsRef<Path>, duration_ms: i64) -> Self {
        self.durations.insert(path.as_ref().to_path_buf(), duration_ms);
        self
    }

    pub fn missing_at(mut self, timestamp_ms: i64) -> Self {
        self.misses.push(timestamp_ms);
        self
    }

    /// Sleeps this long per decoded frame.
    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

pub struct FakeDecoder {
    tag:    u8,
    width:  u32,
    height: u32,
    misses: Vec<i64>,
    delay:  Duration,
}

impl FrameDecoder for FakeDecoder {
    fn decode_at(&mut self, timestamp_ms: i64) -> Result<Thumbnail, TimelineError> {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        if self.misses.contains(&timestamp_ms) {
            return Err(TimelineError::DecodeMiss { timestamp_ms });
        }
        let len = self.width as usize * self.height as usize * 4;
        Ok(Thumbnail {
            width:  self.width,
            height: self.height,
            rgba:   Arc::from(vec![self.tag; len]),
        })
    }
}

impl MediaBackend for FakeBackend {
    type Decoder = FakeDecoder;

    fn probe_duration_ms(&self, path: &Path) -> Result<i64> {
        self.durations
            .get(path)
            .copied()
            .ok_or_else(|| anyhow!("no such file: {}", path.display()))
    }

    fn open_decoder(&self, path: &Path, width: u32, height: u32) -> Result<FakeDecoder> {
        self.probe_duration_ms(path)?;
        Ok(FakeDecoder {
            tag: tag_of(path),
            width,
            height,
            misses: self.misses.clone(),
            delay: self.delay,
        })
    }

    fn export_trim(
        &self,
        src:      &Path,
        dst:      &Path,
        range:    &TrimRange,
        on_phase: &mut dyn FnMut(TrimPhase),
    ) -> Result<PathBuf, TimelineError> {
        range.validate()?;
        export_trim_file(dst, on_phase, |staged, on_phase| {
            let duration_ms = self
                .probe_duration_ms(src)
                .map_err(|e| TimelineError::trim_io("opening source", format!("{e:#}")))?;
            let mut demuxer = FakeDemuxer::new(vec![
                FakeTrack::video(duration_ms, 33_333, 1_000_000),
                FakeTrack::audio(duration_ms, 21_333),
            ]);
            let mut muxer = FakeMuxer::to_file(staged);
            trim_tracks(&mut demuxer, &mut muxer, range, on_phase).map(|_| ())
        })
    }
}
