// crates/trimline-media/src/engine.rs
//
// TimelineEngine: the host-facing facade. Owns the view state machine and the
// MediaWorker and moves work between them.
//
// Everything here runs on the host's UI thread. The host calls `pump()` once
// per frame to apply finished background work, and `tick(dt)` to advance
// animations. Every call that can make the view want more thumbnails ends by
// dispatching its queued requests to the worker.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use trimline_core::gesture::{GestureState, PinchInput};
use trimline_core::helpers::time::file_stamp;
use trimline_core::media_types::{MediaRequest, MediaResult, TrimPhase};
use trimline_core::render::DrawOp;
use trimline_core::{Result, TimelineConfig, TimelineError, TimelineListener, TimelineView, TrimRange};

use crate::backend::MediaBackend;
use crate::worker::MediaWorker;

struct ActiveExport {
    job_id: Uuid,
    dst:    PathBuf,
    phase:  TrimPhase,
}

pub struct TimelineEngine<B: MediaBackend> {
    view:       TimelineView,
    worker:     MediaWorker<B>,
    backend:    Arc<B>,
    source:     Option<PathBuf>,
    output_dir: PathBuf,
    export:     Option<ActiveExport>,
}

impl<B: MediaBackend> TimelineEngine<B> {
    /// `output_dir` receives exported clips. The listener is called from
    /// inside engine methods on the caller's thread.
    pub fn new(
        config:     TimelineConfig,
        backend:    B,
        output_dir: impl Into<PathBuf>,
        listener:   Box<dyn TimelineListener>,
    ) -> anyhow::Result<Self> {
        let view = TimelineView::new(config, listener)?;
        let backend = Arc::new(backend);
        let thumb_size = {
            let c = view.config();
            (c.thumb_width.round().max(1.0) as u32, c.thumb_height.round().max(1.0) as u32)
        };
        let worker = MediaWorker::new(Arc::clone(&backend), view.zoom_table().len(), thumb_size)?;
        Ok(Self {
            view,
            worker,
            backend,
            source: None,
            output_dir: output_dir.into(),
            export: None,
        })
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn view(&self) -> &TimelineView {
        &self.view
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn set_output_dir(&mut self, dir: impl Into<PathBuf>) {
        self.output_dir = dir.into();
    }

    /// Phase of the running export, `Idle` when none is running.
    pub fn export_phase(&self) -> TrimPhase {
        self.export.as_ref().map_or(TrimPhase::Idle, |e| e.phase)
    }

    pub fn is_exporting(&self) -> bool {
        self.export.is_some()
    }

    // ── Commands ─────────────────────────────────────────────────────────────

    /// Replaces the source. The cache is cleared before this returns and
    /// thumbnails still decoding for the previous source are discarded.
    ///
    /// Only the container header is read here; an unreadable file leaves the
    /// engine without a source and returns `SourceUnavailable`.
    pub fn set_source(&mut self, path: impl Into<PathBuf>) -> Result<i64> {
        let path = path.into();
        let generation = self.view.reset_source();
        self.worker.set_generation(generation);
        self.source = Some(path.clone());

        match self.backend.probe_duration_ms(&path) {
            Ok(duration_ms) => {
                info!("[media] source {} ({duration_ms}ms)", path.display());
                self.view.set_duration(duration_ms);
                self.dispatch();
                Ok(duration_ms)
            }
            Err(e) => {
                warn!("[media] cannot open {}: {e:#}", path.display());
                self.source = None;
                self.view.unload_source();
                self.worker.set_generation(self.view.generation());
                Err(TimelineError::SourceUnavailable { path, reason: format!("{e:#}") })
            }
        }
    }

    /// Overrides the probed duration, e.g. once a player knows it exactly.
    pub fn set_duration(&mut self, duration_ms: i64) -> Result<()> {
        if !self.view.has_source() {
            return Err(TimelineError::NoSource);
        }
        self.view.set_duration(duration_ms);
        self.dispatch();
        Ok(())
    }

    /// Playback position from the host's player. Never calls the listener.
    pub fn set_playhead_position(&mut self, position_ms: i64) {
        self.view.set_playhead_position(position_ms);
        self.dispatch();
    }

    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.view.set_viewport(width, height);
        self.dispatch();
    }

    pub fn enable_trim_mode(&mut self, enabled: bool) -> Result<()> {
        self.view.enable_trim_mode(enabled)
    }

    /// Starts exporting the current trim range and returns the destination.
    /// The outcome arrives through `on_trim_complete` during a later `pump()`.
    pub fn export_trim(&mut self) -> Result<PathBuf> {
        if let Some(active) = &self.export {
            return Err(TimelineError::trim_io(
                "starting export",
                format!("export to {} still running", active.dst.display()),
            ));
        }
        let range = self.view.export_range()?;
        let src = self.source.clone().ok_or(TimelineError::NoSource)?;
        let dst = self.output_path(&src, &range);

        let job_id = Uuid::new_v4();
        self.worker.start_export(job_id, src, dst.clone(), range);
        self.export = Some(ActiveExport { job_id, dst: dst.clone(), phase: TrimPhase::Idle });
        Ok(dst)
    }

    /// `<stem>_trim_<start>-<end>.<ext>` inside `output_dir`.
    pub fn output_path(&self, src: &Path, range: &TrimRange) -> PathBuf {
        let stem = src
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "clip".to_string());
        let ext = src
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| "mp4".to_string());
        self.output_dir.join(format!(
            "{stem}_trim_{}-{}.{ext}",
            file_stamp(range.start_ms),
            file_stamp(range.end_ms)
        ))
    }

    // ── Frame loop ───────────────────────────────────────────────────────────

    /// Applies everything the worker finished since the last call. Returns
    /// true if anything arrived (the host should repaint).
    pub fn pump(&mut self) -> bool {
        let mut changed = false;
        while let Ok(result) = self.worker.rx.try_recv() {
            changed = true;
            self.handle(result);
        }
        self.dispatch();
        changed
    }

    /// Advances animations. Returns true while the host should keep
    /// repainting.
    pub fn tick(&mut self, dt: Duration) -> bool {
        let animating = self.view.tick(dt);
        self.dispatch();
        animating || self.export.is_some()
    }

    pub fn render(&self) -> Vec<DrawOp> {
        self.view.render()
    }

    // ── Input ────────────────────────────────────────────────────────────────

    pub fn tap(&mut self, x: f32) {
        self.view.tap(x);
        self.dispatch();
    }

    pub fn drag_begin(&mut self, x: f32) {
        self.view.drag_begin(x);
    }

    pub fn drag_update(&mut self, x: f32, dx: f32) {
        self.view.drag_update(x, dx);
        self.dispatch();
    }

    pub fn drag_end(&mut self, velocity_x: f32) {
        self.view.drag_end(velocity_x);
        self.dispatch();
    }

    pub fn pinch(&mut self, input: PinchInput) {
        self.view.pinch(input);
        self.dispatch();
    }

    pub fn pinch_end(&mut self) {
        self.view.pinch_end();
        self.dispatch();
    }

    pub fn gesture_state(&self) -> GestureState {
        self.view.gesture_state()
    }

    // ── Internals ────────────────────────────────────────────────────────────

    fn handle(&mut self, result: MediaResult) {
        match result {
            MediaResult::Thumbnails { generation, level, frames } => {
                self.view.apply_thumbnails(generation, level, frames);
            }
            MediaResult::SourceError { generation, level, error } => {
                self.view.source_error(generation, level, &error);
            }
            MediaResult::TrimPhase { job_id, phase } => match self.export.as_mut() {
                Some(active) if active.job_id == job_id => {
                    debug!("[trim] {job_id}: {phase:?}");
                    active.phase = phase;
                }
                _ => debug!("[trim] phase for unknown job {job_id}"),
            },
            MediaResult::TrimDone { job_id, path } => {
                if self.finish_export(job_id) {
                    self.view.finish_trim(Ok(path));
                }
            }
            MediaResult::TrimFailed { job_id, error } => {
                if self.finish_export(job_id) {
                    self.view.finish_trim(Err(error));
                }
            }
        }
    }

    fn finish_export(&mut self, job_id: Uuid) -> bool {
        match &self.export {
            Some(active) if active.job_id == job_id => {
                self.export = None;
                true
            }
            _ => {
                warn!("[trim] result for unknown job {job_id}");
                false
            }
        }
    }

    fn dispatch(&mut self) {
        for request in self.view.take_requests() {
            let MediaRequest::EnsureLevel { generation, plan } = request;
            match &self.source {
                Some(src) => self.worker.ensure_level(generation, src.clone(), plan),
                None => debug!("[thumbs] request for level {} without a source", plan.level),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::thread;

    use super::*;
    use crate::testing::FakeBackend;

    #[derive(Default, Clone)]
    struct Outcomes(Rc<RefCell<Vec<std::result::Result<PathBuf, TimelineError>>>>);

    impl TimelineListener for Outcomes {
        fn on_trim_complete(&mut self, result: Result<PathBuf>) {
            self.0.borrow_mut().push(result);
        }
    }

    fn engine(backend: FakeBackend, out: &Path, listener: Outcomes) -> TimelineEngine<FakeBackend> {
        let config = TimelineConfig { thumb_width: 8.0, thumb_height: 4.0, ..TimelineConfig::default() };
        let mut engine = TimelineEngine::new(config, backend, out, Box::new(listener)).unwrap();
        engine.set_viewport(400.0, 80.0);
        engine
    }

    /// Pumps until `done` holds or five seconds pass.
    fn pump_until(engine: &mut TimelineEngine<FakeBackend>, done: impl Fn(&TimelineEngine<FakeBackend>) -> bool) {
        for _ in 0..500 {
            engine.pump();
            if done(engine) {
                return;
            }
            thread::sleep(Duration::from_millis(10));
        }
        panic!("condition never met");
    }

    fn level0_tags(engine: &TimelineEngine<FakeBackend>) -> Vec<u8> {
        engine
            .view()
            .cache()
            .frames(0)
            .iter()
            .filter_map(|f| f.image.as_ref().map(|i| i.rgba[0]))
            .collect()
    }

    #[test]
    fn switching_sources_never_shows_old_frames() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FakeBackend::new().source("a.mp4", 30_000).source("b.mp4", 30_000);
        let mut engine = engine(backend, dir.path(), Outcomes::default());

        assert_eq!(engine.set_source("a.mp4").unwrap(), 30_000);
        pump_until(&mut engine, |e| !e.view().cache().frames(0).is_empty());
        assert!(level0_tags(&engine).iter().all(|&t| t == b'a'));

        engine.set_source("b.mp4").unwrap();
        assert!(engine.view().cache().frames(0).is_empty());
        pump_until(&mut engine, |e| !e.view().cache().frames(0).is_empty());
        let tags = level0_tags(&engine);
        assert!(!tags.is_empty());
        assert!(tags.iter().all(|&t| t == b'b'));
    }

    #[test]
    fn unreadable_source_is_reported_and_unloaded() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(FakeBackend::new(), dir.path(), Outcomes::default());
        let err = engine.set_source("missing.mp4").unwrap_err();
        assert!(matches!(err, TimelineError::SourceUnavailable { .. }));
        assert!(!engine.view().has_source());
        assert!(engine.source().is_none());
        assert!(matches!(engine.enable_trim_mode(true), Err(TimelineError::NoSource)));
    }

    #[test]
    fn export_requires_trim_mode() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FakeBackend::new().source("a.mp4", 30_000);
        let mut engine = engine(backend, dir.path(), Outcomes::default());
        engine.set_source("a.mp4").unwrap();
        assert!(matches!(engine.export_trim(), Err(TimelineError::TrimRangeInvalid { .. })));
    }

    #[test]
    fn export_writes_the_clip_and_reports_completion() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.mp4");
        let backend = FakeBackend::new().source(&src, 30_000);
        let outcomes = Outcomes::default();
        let mut engine = engine(backend, dir.path(), outcomes.clone());
        engine.set_source(&src).unwrap();
        engine.enable_trim_mode(true).unwrap();

        let dst = engine.export_trim().unwrap();
        assert_eq!(dst, dir.path().join("a_trim_00m00s000-00m30s000.mp4"));
        assert!(engine.is_exporting());
        assert!(matches!(engine.export_trim(), Err(TimelineError::TrimIo { .. })));

        pump_until(&mut engine, |_| !outcomes.0.borrow().is_empty());
        let result = outcomes.0.borrow_mut().remove(0);
        assert_eq!(result.unwrap(), dst);
        assert!(dst.exists());
        assert!(!engine.is_exporting());
        assert!(engine.view().trim_range().is_none());
    }
}
