// crates/trimline-media/src/trim.rs
//
// Stream-copy trim pipeline, independent of any container library.
//
// Phases reported through `on_phase`:
//   Demuxing  — tracks enumerated, output tracks declared, readers seeked
//   Copying   — samples with pts in [start, end) appended, pts/dts shifted
//               by -start; reported again whenever the copied track changes
//   Muxing    — output finalised
//   Done | Failed
//
// Each track has its own read cursor. Cursors are advanced smallest
// decode-time first so the muxer receives interleaved input.
//
// The output is written to a temp file beside the destination and renamed into
// place only after the muxer finished. On any error the temp file is dropped,
// so a failed export never leaves a partial file behind.

use std::path::{Path, PathBuf};

use tempfile::Builder;
use tracing::{debug, info, warn};

use trimline_core::media_types::TrimPhase;
use trimline_core::{TimelineError, TrimRange};

/// One compressed sample. Times are microseconds from the start of the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample<P> {
    pub pts_us:  i64,
    pub dts_us:  Option<i64>,
    pub is_sync: bool,
    pub payload: P,
}

impl<P> Sample<P> {
    fn order_key(&self) -> i64 {
        self.dts_us.unwrap_or(self.pts_us)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Video,
    Audio,
}

/// One elementary stream of the source. `format` is whatever the muxer needs
/// to declare the matching output stream.
#[derive(Debug, Clone)]
pub struct TrackDescriptor<F> {
    pub index:  usize,
    pub kind:   TrackKind,
    pub format: F,
}

pub trait Demuxer {
    type Format;
    type Payload;

    fn tracks(&self) -> &[TrackDescriptor<Self::Format>];
    /// Positions the reader of `track` at the sync sample at or before `at_us`.
    fn seek_to_sync(&mut self, track: usize, at_us: i64) -> anyhow::Result<()>;
    /// Next sample of `track` in decode order; `None` at end of stream.
    fn next_sample(&mut self, track: usize) -> anyhow::Result<Option<Sample<Self::Payload>>>;
}

pub trait Muxer {
    type Format;
    type Payload;

    /// Declares an output track; returns its index.
    fn add_track(&mut self, track: &TrackDescriptor<Self::Format>) -> anyhow::Result<usize>;
    fn write_header(&mut self) -> anyhow::Result<()>;
    fn write_sample(&mut self, track: usize, sample: Sample<Self::Payload>) -> anyhow::Result<()>;
    fn finish(&mut self) -> anyhow::Result<()>;
}

/// What was copied for one track; times are output-relative microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackSummary {
    pub samples:      usize,
    pub first_pts_us: Option<i64>,
    pub last_pts_us:  Option<i64>,
}

struct Cursor<P> {
    output:  usize,
    pending: Option<Sample<P>>,
    done:    bool,
    summary: TrackSummary,
}

/// Copies `range` from `demuxer` into `muxer`. Does not emit `Done`/`Failed`;
/// `export_trim_file` does.
pub fn trim_tracks<D, M>(
    demuxer:  &mut D,
    muxer:    &mut M,
    range:    &TrimRange,
    on_phase: &mut dyn FnMut(TrimPhase),
) -> Result<Vec<TrackSummary>, TimelineError>
where
    D: Demuxer,
    M: Muxer<Format = D::Format, Payload = D::Payload>,
{
    range.validate()?;
    let start_us = range.start_ms * 1000;
    let end_us = range.end_ms * 1000;

    // ── Demuxing ─────────────────────────────────────────────────────────────
    on_phase(TrimPhase::Demuxing);
    let count = demuxer.tracks().len();
    if count == 0 {
        return Err(TimelineError::trim_io("reading tracks", "source has no tracks"));
    }

    let mut cursors = Vec::with_capacity(count);
    for track in 0..count {
        let output = muxer
            .add_track(&demuxer.tracks()[track])
            .map_err(|e| TimelineError::trim_io("declaring output track", format!("{e:#}")))?;
        demuxer
            .seek_to_sync(track, start_us)
            .map_err(|e| TimelineError::trim_io("seeking", format!("{e:#}")))?;
        cursors.push(Cursor {
            output,
            pending: None,
            done: false,
            summary: TrackSummary { samples: 0, first_pts_us: None, last_pts_us: None },
        });
    }
    muxer
        .write_header()
        .map_err(|e| TimelineError::trim_io("writing header", format!("{e:#}")))?;

    // ── Copying ──────────────────────────────────────────────────────────────
    let mut current_track: Option<usize> = None;
    loop {
        for (track, cursor) in cursors.iter_mut().enumerate() {
            if cursor.pending.is_none() && !cursor.done {
                fill(demuxer, track, cursor, start_us, end_us)?;
            }
        }

        let next = cursors
            .iter()
            .enumerate()
            .filter_map(|(track, c)| c.pending.as_ref().map(|s| (track, s.order_key())))
            .min_by_key(|&(_, key)| key)
            .map(|(track, _)| track);
        let Some(track) = next else { break };

        if current_track != Some(track) {
            on_phase(TrimPhase::Copying { track });
            current_track = Some(track);
        }

        let cursor = &mut cursors[track];
        let Some(mut sample) = cursor.pending.take() else { continue };
        sample.pts_us -= start_us;
        sample.dts_us = sample.dts_us.map(|dts| dts - start_us);

        let summary = &mut cursor.summary;
        summary.samples += 1;
        summary.first_pts_us = Some(summary.first_pts_us.map_or(sample.pts_us, |p| p.min(sample.pts_us)));
        summary.last_pts_us = Some(summary.last_pts_us.map_or(sample.pts_us, |p| p.max(sample.pts_us)));

        muxer
            .write_sample(cursor.output, sample)
            .map_err(|e| TimelineError::trim_io("writing sample", format!("{e:#}")))?;
    }

    // ── Muxing ───────────────────────────────────────────────────────────────
    on_phase(TrimPhase::Muxing);
    muxer
        .finish()
        .map_err(|e| TimelineError::trim_io("finalising output", format!("{e:#}")))?;

    let summaries: Vec<TrackSummary> = cursors.into_iter().map(|c| c.summary).collect();
    for (track, s) in summaries.iter().enumerate() {
        debug!("[trim] track {track}: {} samples", s.samples);
    }
    Ok(summaries)
}

/// Reads `track` until the next sample inside `[start, end)`, or marks it done
/// once a sample lies past `end` or the stream ends.
fn fill<D: Demuxer>(
    demuxer:  &mut D,
    track:    usize,
    cursor:   &mut Cursor<D::Payload>,
    start_us: i64,
    end_us:   i64,
) -> Result<(), TimelineError> {
    loop {
        let sample = demuxer
            .next_sample(track)
            .map_err(|e| TimelineError::trim_io("reading sample", format!("{e:#}")))?;
        let Some(sample) = sample else {
            cursor.done = true;
            return Ok(());
        };
        if sample.pts_us > end_us {
            cursor.done = true;
            return Ok(());
        }
        if sample.pts_us >= start_us && sample.pts_us < end_us {
            cursor.pending = Some(sample);
            return Ok(());
        }
    }
}

/// Runs `copy` against a temp file next to `dst` and moves it into place on
/// success. Emits `Done` or `Failed` after everything `copy` reported.
///
/// The temp file keeps `dst`'s extension so container libraries that pick
/// the output format from the file name still see the right one.
pub fn export_trim_file<F>(
    dst:      &Path,
    on_phase: &mut dyn FnMut(TrimPhase),
    copy:     F,
) -> Result<PathBuf, TimelineError>
where
    F: FnOnce(&Path, &mut dyn FnMut(TrimPhase)) -> Result<(), TimelineError>,
{
    let result = stage_and_persist(dst, on_phase, copy);
    match &result {
        Ok(path) => {
            info!("[trim] done → {}", path.display());
            on_phase(TrimPhase::Done);
        }
        Err(e) => {
            warn!("[trim] failed: {e}");
            on_phase(TrimPhase::Failed);
        }
    }
    result
}

fn stage_and_persist<F>(
    dst:      &Path,
    on_phase: &mut dyn FnMut(TrimPhase),
    copy:     F,
) -> Result<PathBuf, TimelineError>
where
    F: FnOnce(&Path, &mut dyn FnMut(TrimPhase)) -> Result<(), TimelineError>,
{
    let dir = match dst.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let suffix = dst
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    let staged = Builder::new()
        .prefix(".trimline-")
        .suffix(&suffix)
        .tempfile_in(dir)
        .map_err(|e| TimelineError::trim_io("creating output", e))?;
    debug!("[trim] staging in {}", staged.path().display());

    // On error `staged` drops here and the temp file is removed.
    copy(staged.path(), on_phase)?;

    staged
        .persist(dst)
        .map_err(|e| TimelineError::trim_io("moving output into place", e.error))?;
    Ok(dst.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeDemuxer, FakeMuxer, FakeTrack};

    fn source() -> FakeDemuxer {
        FakeDemuxer::new(vec![
            FakeTrack::video(30_000, 33_333, 1_000_000),
            FakeTrack::audio(30_000, 21_333),
        ])
    }

    #[test]
    fn every_track_spans_the_trimmed_duration() {
        let range = TrimRange::new(5_000, 12_000, 30_000, 1000).unwrap();
        let mut demuxer = source();
        let mut muxer = FakeMuxer::default();
        let summaries = trim_tracks(&mut demuxer, &mut muxer, &range, &mut |_| {}).unwrap();

        assert_eq!(summaries.len(), 2);
        for (track, s) in summaries.iter().enumerate() {
            let first = s.first_pts_us.unwrap();
            let last = s.last_pts_us.unwrap();
            let interval = demuxer.tracks()[track].format.interval_us;
            assert!(first >= 0 && first < interval, "track {track} starts at {first}");
            let span = last + interval;
            assert!((span - 7_000_000).abs() <= interval, "track {track} spans {span}");
        }
    }

    #[test]
    fn timestamps_are_rebased_to_the_range_start() {
        let range = TrimRange::new(2_000, 4_000, 30_000, 1000).unwrap();
        let mut demuxer = FakeDemuxer::new(vec![FakeTrack::video(30_000, 500_000, 1_000_000)]);
        let mut muxer = FakeMuxer::default();
        trim_tracks(&mut demuxer, &mut muxer, &range, &mut |_| {}).unwrap();

        let pts: Vec<i64> = muxer.written.iter().map(|(_, s)| s.pts_us).collect();
        assert_eq!(pts, vec![0, 500_000, 1_000_000, 1_500_000]);
        assert!(muxer.finished);
    }

    #[test]
    fn output_is_interleaved_by_decode_time() {
        let range = TrimRange::new(0, 3_000, 30_000, 1000).unwrap();
        let mut demuxer = source();
        let mut muxer = FakeMuxer::default();
        trim_tracks(&mut demuxer, &mut muxer, &range, &mut |_| {}).unwrap();

        let keys: Vec<i64> = muxer.written.iter().map(|(_, s)| s.order_key()).collect();
        assert!(keys.windows(2).all(|w| w[0] <= w[1]));
        assert!(muxer.written.iter().any(|(t, _)| *t == 0));
        assert!(muxer.written.iter().any(|(t, _)| *t == 1));
    }

    #[test]
    fn phases_run_in_order() {
        let range = TrimRange::new(0, 2_000, 30_000, 1000).unwrap();
        let mut demuxer = source();
        let mut muxer = FakeMuxer::default();
        let mut phases = Vec::new();
        trim_tracks(&mut demuxer, &mut muxer, &range, &mut |p| phases.push(p)).unwrap();

        assert_eq!(phases.first(), Some(&TrimPhase::Demuxing));
        assert_eq!(phases.last(), Some(&TrimPhase::Muxing));
        assert!(phases.contains(&TrimPhase::Copying { track: 1 }));
    }

    #[test]
    fn failed_copy_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let dst = dir.path().join("clip_trim.mp4");
        let range = TrimRange::new(0, 5_000, 30_000, 1000).unwrap();
        let mut phases = Vec::new();

        let result = export_trim_file(&dst, &mut |p| phases.push(p), |tmp, on_phase| {
            let mut demuxer = source().failing_after(20);
            let mut muxer = FakeMuxer::to_file(tmp);
            trim_tracks(&mut demuxer, &mut muxer, &range, on_phase).map(|_| ())
        });

        assert!(matches!(result, Err(TimelineError::TrimIo { .. })));
        assert_eq!(phases.last(), Some(&TrimPhase::Failed));
        assert!(!dst.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn successful_copy_is_moved_into_place() {
        let dir = tempfile::tempdir().unwrap();
        let dst = dir.path().join("clip_trim.mp4");
        let range = TrimRange::new(1_000, 5_000, 30_000, 1000).unwrap();
        let mut phases = Vec::new();

        let path = export_trim_file(&dst, &mut |p| phases.push(p), |tmp, on_phase| {
            let mut demuxer = source();
            let mut muxer = FakeMuxer::to_file(tmp);
            trim_tracks(&mut demuxer, &mut muxer, &range, on_phase).map(|_| ())
        })
        .unwrap();

        assert_eq!(path, dst);
        assert!(std::fs::metadata(&dst).unwrap().len() > 0);
        assert_eq!(phases.last(), Some(&TrimPhase::Done));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn invalid_range_is_rejected_before_io() {
        let mut range = TrimRange::new(0, 5_000, 30_000, 1000).unwrap();
        range.start_ms = 4_500;
        let mut demuxer = source();
        let mut muxer = FakeMuxer::default();
        let mut phases = Vec::new();
        let err = trim_tracks(&mut demuxer, &mut muxer, &range, &mut |p| phases.push(p)).unwrap_err();
        assert!(matches!(err, TimelineError::TrimRangeInvalid { .. }));
        assert!(phases.is_empty());
        assert!(muxer.tracks.is_empty());
    }

    #[test]
    fn output_declares_one_track_per_source_track() {
        let range = TrimRange::new(0, 2_000, 30_000, 1000).unwrap();
        let mut demuxer = source();
        let mut muxer = FakeMuxer::default();
        trim_tracks(&mut demuxer, &mut muxer, &range, &mut |_| {}).unwrap();
        assert_eq!(muxer.tracks, vec![TrackKind::Video, TrackKind::Audio]);
    }
}
