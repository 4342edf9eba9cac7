// crates/trimline-core/src/view.rs
//
// TimelineView — the single-threaded state machine behind the filmstrip.
//
// The host calls into it from the UI thread only:
//   input      → drag_begin / drag_update / drag_end / tap / pinch / pinch_end
//   time       → tick(dt) advances zoom, fling and seek animations
//   media      → apply_thumbnails / source_error with batches from the worker
//   output     → render() display list, take_requests() decode work,
//                and TimelineListener callbacks
//
// Listener callbacks fire synchronously from inside these calls. Positions are
// only reported for user-driven movement; `set_playhead_position` runs under
// the `programmatic_update` guard.

use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::animation::{ScrollAnimation, ZoomAnimation, ZoomVisual};
use crate::cache::{AppendRejected, ThumbnailCache};
use crate::config::TimelineConfig;
use crate::error::{Result, TimelineError};
use crate::gesture::{GestureController, GestureState, PinchInput, TapAction};
use crate::media_types::{CachedFrame, MediaRequest, Priority};
use crate::render::{DrawOp, RenderInput, TimelineRenderer};
use crate::sync::{StripContent, StripGeometry};
use crate::trim::TrimRange;
use crate::zoom::{ZoomDirection, ZoomTable};

/// Host callbacks. Every method has an empty default so hosts implement only
/// what they use.
pub trait TimelineListener {
    /// The timestamp under the playhead changed because of user input.
    fn on_position_changed(&mut self, _position_ms: i64) {}
    fn on_trim_range_changed(&mut self, _start_ms: i64, _end_ms: i64) {}
    /// Trim mode was entered or left, including when the view drops it on
    /// its own (new source, changed duration, finished export).
    fn on_trim_mode_changed(&mut self, _active: bool) {}
    fn on_trim_complete(&mut self, _result: Result<PathBuf>) {}
}

/// Listener that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl TimelineListener for NoopListener {}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    pub scroll_offset_px:    f32,
    pub active_level:        usize,
    pub duration_ms:         i64,
    pub current_position_ms: i64,
}

pub struct TimelineView {
    config:   TimelineConfig,
    zoom:     ZoomTable,
    cache:    ThumbnailCache,
    state:    ViewState,
    gesture:  GestureController,
    renderer: TimelineRenderer,

    view_width:  f32,
    view_height: f32,
    has_source:  bool,
    /// Set when a worker reported the source unreadable; stops re-requests.
    media_failed: bool,

    zoom_anim:   Option<ZoomAnimation>,
    scroll_anim: Option<ScrollAnimation>,
    /// `(timestamp, view x)` to restore once the active level has frames
    /// covering it.
    pending_anchor: Option<(i64, f32)>,
    programmatic_update: bool,

    requests: Vec<MediaRequest>,
    listener: Box<dyn TimelineListener>,
}

impl TimelineView {
    pub fn new(config: TimelineConfig, listener: Box<dyn TimelineListener>) -> Result<Self> {
        config.validate()?;
        let zoom = ZoomTable::new(&config.zoom_intervals_ms)?;
        let gesture = GestureController::new(&config);
        Ok(Self {
            config,
            zoom,
            cache: ThumbnailCache::new(),
            state: ViewState {
                scroll_offset_px:    0.0,
                active_level:        0,
                duration_ms:         0,
                current_position_ms: 0,
            },
            gesture,
            renderer: TimelineRenderer,
            view_width: 0.0,
            view_height: 0.0,
            has_source: false,
            media_failed: false,
            zoom_anim: None,
            scroll_anim: None,
            pending_anchor: None,
            programmatic_update: false,
            requests: Vec::new(),
            listener,
        })
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn cache(&self) -> &ThumbnailCache {
        &self.cache
    }

    pub fn zoom_table(&self) -> &ZoomTable {
        &self.zoom
    }

    pub fn gesture_state(&self) -> GestureState {
        self.gesture.state()
    }

    pub fn trim_range(&self) -> Option<TrimRange> {
        self.gesture.trim_range()
    }

    pub fn has_source(&self) -> bool {
        self.has_source
    }

    pub fn generation(&self) -> u64 {
        self.cache.generation()
    }

    pub fn is_animating(&self) -> bool {
        self.zoom_anim.is_some() || self.scroll_anim.is_some()
    }

    fn geometry(&self) -> StripGeometry {
        StripGeometry::new(self.config.cell_width(), self.view_width)
    }

    fn content(&self, level: usize) -> StripContent<'_> {
        StripContent {
            frames:      self.cache.frames(level),
            interval_ms: self.zoom.level(level).sample_interval_ms,
            duration_ms: self.state.duration_ms,
        }
    }

    fn visual(&self) -> ZoomVisual {
        self.zoom_anim
            .as_ref()
            .map(ZoomAnimation::visual)
            .unwrap_or(ZoomVisual::IDENTITY)
    }

    /// Timestamp drawn at screen x, accounting for an in-flight zoom.
    fn time_at(&self, x: f32) -> i64 {
        let unscaled = self.visual().invert(x);
        self.geometry()
            .time_at_view_x(unscaled, self.state.scroll_offset_px, self.content(self.state.active_level))
    }

    fn handle_xs(&self) -> (f32, f32) {
        let Some(range) = self.gesture.trim_range() else {
            return (f32::NAN, f32::NAN);
        };
        let g = self.geometry();
        let c = self.content(self.state.active_level);
        let v = self.visual();
        let offset = self.state.scroll_offset_px;
        (
            v.apply(g.view_x_of_time(range.start_ms, offset, c)),
            v.apply(g.view_x_of_time(range.end_ms, offset, c)),
        )
    }

    // ── Source lifecycle ─────────────────────────────────────────────────────

    /// Starts a new source generation: cache, animations, trim mode and queued
    /// requests are discarded. Returns the new generation.
    pub fn reset_source(&mut self) -> u64 {
        let generation = self.cache.clear();
        self.requests.clear();
        self.zoom_anim = None;
        self.scroll_anim = None;
        self.pending_anchor = None;
        self.leave_trim();
        self.gesture.end_gesture();
        self.state = ViewState {
            scroll_offset_px:    -self.geometry().center(),
            active_level:        0,
            duration_ms:         0,
            current_position_ms: 0,
        };
        self.has_source = true;
        self.media_failed = false;
        info!("[timeline] source generation {generation}");
        generation
    }

    /// Drops the current source entirely (it could not be opened).
    pub fn unload_source(&mut self) {
        self.reset_source();
        self.has_source = false;
    }

    pub fn set_duration(&mut self, duration_ms: i64) {
        let duration_ms = duration_ms.max(0);
        self.state.duration_ms = duration_ms;
        self.state.current_position_ms = self.state.current_position_ms.min(duration_ms);

        if let Some(range) = self.gesture.trim_range() {
            if range.source_duration_ms() != duration_ms {
                warn!("[timeline] duration changed to {duration_ms}ms; leaving trim mode");
                self.leave_trim();
            }
        }

        debug!("[timeline] duration {duration_ms}ms");
        self.request_initial_batches();
        self.resync_offset();
        self.maybe_prefetch();
    }

    pub fn set_viewport(&mut self, width: f32, height: f32) {
        if width == self.view_width && height == self.view_height {
            return;
        }
        self.view_width = width.max(0.0);
        self.view_height = height.max(0.0);
        if self.has_source && self.zoom_anim.is_none() {
            self.resync_offset();
            self.maybe_prefetch();
        }
    }

    /// Moves the playhead to `position_ms` without notifying the listener.
    ///
    /// Ignored while the user is dragging, pinching or flinging so playback
    /// updates do not fight the finger.
    pub fn set_playhead_position(&mut self, position_ms: i64) {
        if !self.has_source || self.gesture.state() != GestureState::Idle || self.is_animating() {
            return;
        }
        let position_ms = position_ms.clamp(0, self.state.duration_ms);
        let target = self.geometry().time_to_offset(position_ms, self.content(self.state.active_level));

        self.programmatic_update = true;
        self.apply_scroll(target);
        self.state.current_position_ms = position_ms;
        self.programmatic_update = false;
    }

    // ── Media plumbing ───────────────────────────────────────────────────────

    /// Drains decode work queued since the last call.
    pub fn take_requests(&mut self) -> Vec<MediaRequest> {
        std::mem::take(&mut self.requests)
    }

    /// Applies a decoded batch. Returns false if it was stale or rejected.
    pub fn apply_thumbnails(&mut self, generation: u64, level: usize, frames: Vec<CachedFrame>) -> bool {
        if level >= self.zoom.len() {
            warn!("[thumbs] batch for unknown level {level}");
            return false;
        }
        let interval = self.zoom.level(level).sample_interval_ms;
        match self.cache.append(generation, level, interval, frames) {
            Ok(count) => debug!("[thumbs] level {level}: {count} frames cached"),
            Err(AppendRejected::StaleGeneration { batch, current }) => {
                debug!("[thumbs] dropped batch from generation {batch} (current {current})");
                return false;
            }
            Err(err) => {
                warn!("[thumbs] level {level}: batch rejected: {err:?}");
                self.cache.abandon_batch(level);
                return false;
            }
        }

        if level == self.state.active_level {
            if self.pending_anchor.is_some() {
                self.try_apply_anchor();
            } else if self.zoom_anim.is_none()
                && self.scroll_anim.is_none()
                && self.gesture.state() == GestureState::Idle
            {
                self.resync_offset();
            }
            self.maybe_prefetch();
        }
        true
    }

    /// A thumbnail job could not read the source.
    pub fn source_error(&mut self, generation: u64, level: usize, error: &TimelineError) {
        if generation != self.cache.generation() {
            return;
        }
        warn!("[thumbs] level {level}: {error}");
        self.cache.abandon_batch(level);
        self.media_failed = true;
    }

    fn request_initial_batches(&mut self) {
        for level in 0..self.zoom.len() {
            let priority = if level == 0 { Priority::Eager } else { Priority::Background };
            self.request_level(level, self.config.initial_batch, priority);
        }
    }

    fn request_level(&mut self, level: usize, frame_budget: usize, priority: Priority) {
        if !self.has_source || self.media_failed || self.state.duration_ms <= 0 {
            return;
        }
        let interval = self.zoom.level(level).sample_interval_ms;
        let plan = self
            .cache
            .ensure_level(level, interval, frame_budget, self.state.duration_ms, priority);
        if let Some(plan) = plan {
            debug!(
                "[thumbs] request level {level}: {} frames from {}ms",
                plan.timestamps.len(),
                plan.timestamps.first().copied().unwrap_or(0),
            );
            self.requests.push(MediaRequest::EnsureLevel { generation: self.cache.generation(), plan });
        }
    }

    /// Requests the next batch when the loaded strip ends less than
    /// `prefetch_screens` view widths past the right edge.
    fn maybe_prefetch(&mut self) {
        if self.view_width <= 0.0 {
            return;
        }
        let level = self.state.active_level;
        let (loaded_end, complete) = {
            let c = self.content(level);
            (self.geometry().end_position(c), c.is_complete())
        };
        if complete {
            return;
        }
        let visible_end = self.state.scroll_offset_px + self.view_width;
        if loaded_end - visible_end < self.config.prefetch_screens * self.view_width {
            let budget = self.cache.len(level) + self.config.incremental_batch;
            self.request_level(level, budget, Priority::Background);
        }
    }

    // ── Scrolling ────────────────────────────────────────────────────────────

    /// Sets the scroll offset (clamped) and recomputes the position.
    /// Returns true if clamping changed the requested offset.
    fn apply_scroll(&mut self, offset: f32) -> bool {
        let (clamped, position) = {
            let g = self.geometry();
            let c = self.content(self.state.active_level);
            let clamped = g.clamp_offset(offset, c);
            (clamped, g.offset_to_time(clamped, c))
        };
        self.state.scroll_offset_px = clamped;
        let changed = position != self.state.current_position_ms;
        self.state.current_position_ms = position;
        if changed && !self.programmatic_update {
            self.listener.on_position_changed(position);
        }
        self.maybe_prefetch();
        clamped != offset
    }

    /// Re-derives the offset from the stored position after the loaded run
    /// or the viewport changed. Never notifies.
    fn resync_offset(&mut self) {
        let g = self.geometry();
        let offset = g.time_to_offset(self.state.current_position_ms, self.content(self.state.active_level));
        self.state.scroll_offset_px = offset;
    }

    // ── Input ────────────────────────────────────────────────────────────────

    pub fn tap(&mut self, x: f32) {
        if !self.has_source {
            return;
        }
        self.pending_anchor = None;
        let (start_x, end_x) = self.handle_xs();
        match self.gesture.tap(x, start_x, end_x) {
            TapAction::Seek { x } => {
                let target = {
                    let g = self.geometry();
                    let c = self.content(self.state.active_level);
                    g.time_to_offset(self.time_at(x), c)
                };
                let duration = Duration::from_millis(self.config.seek_animation_ms as u64);
                self.scroll_anim = Some(ScrollAnimation::seek(self.state.scroll_offset_px, target, duration));
            }
            TapAction::HandleHit(handle) => debug!("[timeline] tap on {handle:?} handle"),
            TapAction::Ignored => {}
        }
    }

    pub fn drag_begin(&mut self, x: f32) {
        if !self.has_source {
            return;
        }
        self.scroll_anim = None;
        self.pending_anchor = None;
        let (start_x, end_x) = self.handle_xs();
        match self.gesture.hit_handle(x, start_x, end_x) {
            Some(handle) => self.gesture.begin_trim_drag(handle),
            None => self.gesture.begin_pan(),
        }
    }

    /// `x` is the pointer position, `dx` the movement since the last update.
    pub fn drag_update(&mut self, x: f32, dx: f32) {
        if !self.has_source {
            return;
        }
        match self.gesture.state() {
            GestureState::TrimDragStart | GestureState::TrimDragEnd => {
                let to_ms = self.time_at(x);
                if let Some(range) = self.gesture.drag_trim(to_ms) {
                    self.listener.on_trim_range_changed(range.start_ms, range.end_ms);
                }
            }
            GestureState::Scrolling => self.pan(dx),
            GestureState::Idle => {
                self.gesture.begin_pan();
                self.pan(dx);
            }
            GestureState::Zooming => {}
        }
    }

    /// `velocity_x` is the pointer velocity at release in px/s.
    pub fn drag_end(&mut self, velocity_x: f32) {
        if self.gesture.state() == GestureState::Scrolling {
            let velocity = self.gesture.fling_velocity(velocity_x);
            if velocity.abs() >= self.config.fling_stop_velocity {
                self.scroll_anim = Some(ScrollAnimation::Fling {
                    velocity,
                    friction:      self.config.fling_friction,
                    stop_velocity: self.config.fling_stop_velocity,
                });
            }
        }
        if self.gesture.state() != GestureState::Zooming {
            self.gesture.end_gesture();
        }
    }

    fn pan(&mut self, dx: f32) {
        let delta = self.gesture.pan_delta(dx);
        self.apply_scroll(self.state.scroll_offset_px + delta);
    }

    pub fn pinch(&mut self, input: PinchInput) {
        if !self.has_source {
            return;
        }
        self.scroll_anim = None;
        self.pending_anchor = None;
        if let Some(direction) = self.gesture.pinch(input) {
            self.begin_zoom(direction, input.focal_x);
        }
    }

    pub fn pinch_end(&mut self) {
        self.gesture.end_gesture();
    }

    // ── Zoom ─────────────────────────────────────────────────────────────────

    fn begin_zoom(&mut self, direction: ZoomDirection, focal_x: f32) {
        let active = self.state.active_level;
        let base = self.zoom_anim.as_ref().map_or(active, |a| a.to_level);
        let Some(target) = self.zoom.adjacent(base, direction) else {
            debug!("[timeline] zoom {direction:?} past the last level ignored");
            return;
        };

        let mut start_scale = 1.0;
        if let Some(prev) = self.zoom_anim.take() {
            // Re-pivot the in-flight scale onto the new focal point so the
            // strip does not jump.
            let v = prev.visual();
            start_scale = v.scale;
            self.state.scroll_offset_px -= (v.focal_x - focal_x) * (1.0 - v.scale) / v.scale;
        }

        let anchor_ms = self.geometry().time_at_view_x(
            focal_x,
            self.state.scroll_offset_px,
            self.content(active),
        );
        let end_scale =
            self.zoom.level(active).sample_interval_ms as f32 / target.sample_interval_ms as f32;

        let budget = self.anchor_budget(target.index, anchor_ms);
        self.request_level(target.index, budget, Priority::Background);

        debug!(
            "[timeline] zoom {active} -> {} around {anchor_ms}ms at x={focal_x:.0}",
            target.index
        );
        self.zoom_anim = Some(ZoomAnimation::new(
            active,
            target.index,
            focal_x,
            anchor_ms,
            start_scale,
            end_scale,
            Duration::from_millis(self.config.zoom_animation_ms as u64),
        ));
    }

    fn finish_zoom(&mut self, anim: ZoomAnimation) {
        self.state.active_level = anim.to_level;
        info!(
            "[timeline] zoom level {} ({}ms/frame)",
            anim.to_level,
            self.zoom.level(anim.to_level).sample_interval_ms
        );
        self.pending_anchor = Some((anim.anchor_ms, anim.focal_x));
        self.try_apply_anchor();
    }

    /// Frames `level` needs so `anchor_ms` plus one screen is loaded.
    fn anchor_budget(&self, level: usize, anchor_ms: i64) -> usize {
        let interval = self.zoom.level(level).sample_interval_ms;
        let cells_per_view = (self.view_width / self.config.cell_width()).ceil().max(1.0) as usize;
        (anchor_ms / interval).max(0) as usize + 1 + cells_per_view
    }

    fn anchor_reachable(&self, anchor_ms: i64, focal_x: f32) -> bool {
        let g = self.geometry();
        let c = self.content(self.state.active_level);
        if c.is_complete() {
            return true;
        }
        let Some(last) = c.frames.last() else {
            return false;
        };
        if last.timestamp_ms < anchor_ms {
            return false;
        }
        let needed = g.time_to_position(anchor_ms, c) + (g.center() - focal_x).max(0.0);
        g.end_position(c) >= needed
    }

    fn try_apply_anchor(&mut self) {
        let Some((anchor_ms, focal_x)) = self.pending_anchor else {
            return;
        };
        let reachable = self.anchor_reachable(anchor_ms, focal_x);
        let pos = self
            .geometry()
            .time_to_position(anchor_ms, self.content(self.state.active_level));
        self.apply_scroll(pos - focal_x);

        if reachable {
            self.pending_anchor = None;
        } else {
            let level = self.state.active_level;
            let budget = self.anchor_budget(level, anchor_ms);
            self.request_level(level, budget, Priority::Background);
        }
    }

    // ── Animation clock ──────────────────────────────────────────────────────

    /// Advances animations by `dt`. Returns true while anything is still
    /// moving, so the host knows to keep repainting.
    pub fn tick(&mut self, dt: Duration) -> bool {
        let mut animating = false;

        if let Some(anim) = self.zoom_anim.as_mut() {
            if anim.advance(dt) {
                if let Some(done) = self.zoom_anim.take() {
                    self.finish_zoom(done);
                }
            } else {
                animating = true;
            }
        }

        if let Some(mut anim) = self.scroll_anim.take() {
            let (next, running) = anim.step(self.state.scroll_offset_px, dt);
            let clamped = self.apply_scroll(next);
            if running && !clamped {
                self.scroll_anim = Some(anim);
                animating = true;
            }
        }

        animating
    }

    // ── Trim mode ────────────────────────────────────────────────────────────

    /// Entering selects the whole source and reports it to the listener.
    pub fn enable_trim_mode(&mut self, enabled: bool) -> Result<()> {
        if !enabled {
            if self.leave_trim().is_some() {
                debug!("[timeline] trim mode off");
            }
            return Ok(());
        }
        if !self.has_source {
            return Err(TimelineError::NoSource);
        }
        if self.gesture.is_trim_active() {
            return Ok(());
        }
        let range = TrimRange::whole(self.state.duration_ms, self.config.min_trim_ms)?;
        self.scroll_anim = None;
        self.gesture.enter_trim(range);
        debug!("[timeline] trim mode on: {}..{}ms", range.start_ms, range.end_ms);
        self.listener.on_trim_mode_changed(true);
        self.listener.on_trim_range_changed(range.start_ms, range.end_ms);
        Ok(())
    }

    fn leave_trim(&mut self) -> Option<TrimRange> {
        let range = self.gesture.exit_trim();
        if range.is_some() {
            self.listener.on_trim_mode_changed(false);
        }
        range
    }

    /// The range to export, re-validated.
    pub fn export_range(&self) -> Result<TrimRange> {
        if !self.has_source {
            return Err(TimelineError::NoSource);
        }
        let range = self.gesture.trim_range().ok_or(TimelineError::TrimRangeInvalid {
            start_ms: 0,
            end_ms:   0,
            reason:   "trim mode is not active",
        })?;
        range.validate()?;
        Ok(range)
    }

    /// Reports an export outcome. Success leaves trim mode; failure keeps the
    /// range so the user can retry.
    pub fn finish_trim(&mut self, result: Result<PathBuf>) {
        match &result {
            Ok(path) => {
                info!("[trim] wrote {}", path.display());
                self.leave_trim();
            }
            Err(err) => warn!("[trim] {err}"),
        }
        self.listener.on_trim_complete(result);
    }

    // ── Rendering ────────────────────────────────────────────────────────────

    pub fn render(&self) -> Vec<DrawOp> {
        let level = self.state.active_level;
        let input = RenderInput {
            geometry:      self.geometry(),
            content:       self.content(level),
            scroll_offset: self.state.scroll_offset_px,
            thumb_width:   self.config.thumb_width,
            thumb_height:  self.config.thumb_height,
            view_height:   self.view_height,
            level,
            level_count:   self.zoom.len(),
            position_ms:   self.state.current_position_ms,
            trim:          self.gesture.trim_range(),
            dragged:       self.gesture.dragged_handle(),
            zoom:          self.zoom_anim.as_ref().map(ZoomAnimation::visual),
        };
        self.renderer.render(&input)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Position(i64),
        Range(i64, i64),
        TrimMode(bool),
        Complete(bool),
    }

    #[derive(Default, Clone)]
    struct Recorder(Rc<RefCell<Vec<Event>>>);

    impl TimelineListener for Recorder {
        fn on_position_changed(&mut self, position_ms: i64) {
            self.0.borrow_mut().push(Event::Position(position_ms));
        }
        fn on_trim_range_changed(&mut self, start_ms: i64, end_ms: i64) {
            self.0.borrow_mut().push(Event::Range(start_ms, end_ms));
        }
        fn on_trim_mode_changed(&mut self, active: bool) {
            self.0.borrow_mut().push(Event::TrimMode(active));
        }
        fn on_trim_complete(&mut self, result: Result<PathBuf>) {
            self.0.borrow_mut().push(Event::Complete(result.is_ok()));
        }
    }

    impl Recorder {
        fn take(&self) -> Vec<Event> {
            std::mem::take(&mut *self.0.borrow_mut())
        }
    }

    /// Serves every queued request with placeholder frames until the view
    /// stops asking.
    fn fulfil(view: &mut TimelineView) {
        for _ in 0..100 {
            let requests = view.take_requests();
            if requests.is_empty() {
                return;
            }
            for MediaRequest::EnsureLevel { generation, plan } in requests {
                let frames = plan.timestamps.iter().map(|&ts| CachedFrame::placeholder(ts)).collect();
                view.apply_thumbnails(generation, plan.level, frames);
            }
        }
        panic!("view never stopped requesting");
    }

    fn test_config() -> TimelineConfig {
        TimelineConfig { thumb_width: 98.0, ..TimelineConfig::default() }
    }

    fn loaded_view(duration_ms: i64) -> (TimelineView, Recorder) {
        let recorder = Recorder::default();
        let mut view = TimelineView::new(test_config(), Box::new(recorder.clone())).unwrap();
        view.set_viewport(400.0, 80.0);
        view.reset_source();
        view.set_duration(duration_ms);
        fulfil(&mut view);
        (view, recorder)
    }

    fn run_animations(view: &mut TimelineView) {
        for _ in 0..200 {
            if !view.tick(Duration::from_millis(16)) {
                return;
            }
        }
        panic!("animation never finished");
    }

    #[test]
    fn load_requests_a_first_batch_for_every_level() {
        let recorder = Recorder::default();
        let mut view = TimelineView::new(TimelineConfig::default(), Box::new(recorder)).unwrap();
        view.set_viewport(400.0, 80.0);
        view.reset_source();
        view.set_duration(60_000);
        let requests = view.take_requests();
        assert_eq!(requests.len(), 4);
        let MediaRequest::EnsureLevel { plan, .. } = &requests[0];
        assert_eq!(plan.priority, Priority::Eager);
        assert_eq!(plan.timestamps.len(), 20);
    }

    #[test]
    fn programmatic_position_does_not_notify() {
        let (mut view, recorder) = loaded_view(60_000);
        view.set_playhead_position(10_000);
        assert_eq!(view.state().current_position_ms, 10_000);
        assert!(recorder.take().is_empty());

        view.drag_begin(200.0);
        view.drag_update(190.0, -10.0);
        view.drag_end(0.0);
        assert_eq!(recorder.take(), vec![Event::Position(10_080)]);
    }

    #[test]
    fn tap_seeks_the_tapped_time_under_the_playhead() {
        let (mut view, recorder) = loaded_view(60_000);
        view.set_playhead_position(10_000);
        view.tap(300.0);
        run_animations(&mut view);
        assert_eq!(view.state().current_position_ms, 11_000);
        assert_eq!(recorder.take().last(), Some(&Event::Position(11_000)));
    }

    #[test]
    fn taps_outside_handles_are_ignored_in_trim_mode() {
        let (mut view, recorder) = loaded_view(60_000);
        view.set_playhead_position(10_000);
        view.enable_trim_mode(true).unwrap();
        assert_eq!(recorder.take(), vec![Event::TrimMode(true), Event::Range(0, 60_000)]);

        view.tap(300.0);
        assert!(!view.tick(Duration::from_millis(16)));
        assert_eq!(view.state().current_position_ms, 10_000);
        assert!(recorder.take().is_empty());
    }

    #[test]
    fn dragging_the_start_handle_reports_the_clamped_range() {
        let (mut view, recorder) = loaded_view(60_000);
        view.enable_trim_mode(true).unwrap();
        recorder.take();

        // Position 0: the start handle sits under the playhead.
        view.drag_begin(205.0);
        assert_eq!(view.gesture_state(), GestureState::TrimDragStart);
        view.drag_update(500.0, 295.0);
        view.drag_end(0.0);

        assert_eq!(recorder.take(), vec![Event::Range(3000, 60_000)]);
        assert_eq!(view.state().current_position_ms, 0);
    }

    #[test]
    fn tapping_a_handle_leaves_playback_and_panning_alone() {
        let (mut view, recorder) = loaded_view(60_000);
        view.enable_trim_mode(true).unwrap();
        recorder.take();

        // Position 0: the start handle sits under the playhead at x=200.
        view.tap(200.0);
        assert_eq!(view.gesture_state(), GestureState::Idle);

        view.set_playhead_position(10_000);
        assert_eq!(view.state().current_position_ms, 10_000);

        let before = view.state().scroll_offset_px;
        view.drag_begin(350.0);
        view.drag_update(300.0, -50.0);
        assert_eq!(view.gesture_state(), GestureState::Scrolling);
        view.drag_end(0.0);

        assert!((view.state().scroll_offset_px - (before + 40.0)).abs() < 1e-3);
        assert_eq!(view.trim_range().map(|r| (r.start_ms, r.end_ms)), Some((0, 60_000)));
        assert!(recorder.take().iter().all(|e| matches!(e, Event::Position(_))));
    }

    #[test]
    fn a_tapped_handle_can_still_be_dragged() {
        let (mut view, recorder) = loaded_view(60_000);
        view.enable_trim_mode(true).unwrap();
        recorder.take();

        view.tap(200.0);
        view.drag_begin(205.0);
        assert_eq!(view.gesture_state(), GestureState::TrimDragStart);
        view.drag_update(500.0, 295.0);
        view.drag_end(0.0);
        assert_eq!(recorder.take(), vec![Event::Range(3000, 60_000)]);
        assert_eq!(view.gesture_state(), GestureState::Idle);
    }

    #[test]
    fn panning_near_the_loaded_end_requests_the_next_batch() {
        let recorder = Recorder::default();
        let mut view = TimelineView::new(test_config(), Box::new(recorder)).unwrap();
        view.set_viewport(400.0, 80.0);
        view.reset_source();
        view.set_duration(60_000);
        for MediaRequest::EnsureLevel { generation, plan } in view.take_requests() {
            let frames = plan.timestamps.iter().map(|&ts| CachedFrame::placeholder(ts)).collect();
            view.apply_thumbnails(generation, plan.level, frames);
        }
        assert_eq!(view.cache().len(0), 20);
        assert!(view.take_requests().is_empty());

        // 20 frames end at strip x=1900; with a 400px view the next batch is
        // due once the right edge passes 1900 - 2 * 400 = 1100.
        view.drag_begin(300.0);
        view.drag_update(300.0, -1000.0);
        assert_eq!(view.state().scroll_offset_px, 600.0);
        assert!(view.take_requests().is_empty());

        view.drag_update(300.0, -250.0);
        view.drag_end(0.0);
        assert_eq!(view.state().scroll_offset_px, 800.0);
        let requests = view.take_requests();
        assert_eq!(requests.len(), 1);
        let MediaRequest::EnsureLevel { plan, .. } = &requests[0];
        assert_eq!(plan.level, 0);
        assert_eq!(plan.priority, Priority::Background);
        assert_eq!(plan.timestamps.first(), Some(&20_000));
        assert_eq!(plan.timestamps.len(), test_config().incremental_batch);
    }

    #[test]
    fn duration_change_drops_trim_mode_and_tells_the_listener() {
        let (mut view, recorder) = loaded_view(60_000);
        view.enable_trim_mode(true).unwrap();
        recorder.take();

        view.set_duration(45_000);
        assert!(view.trim_range().is_none());
        assert_eq!(recorder.take(), vec![Event::TrimMode(false)]);

        view.set_duration(45_000);
        assert!(recorder.take().is_empty());
    }

    #[test]
    fn zoom_keeps_the_focal_timestamp_in_place() {
        let (mut view, _recorder) = loaded_view(60_000);
        view.set_playhead_position(10_000);
        fulfil(&mut view);

        let before = view.time_at(300.0);
        assert_eq!(before, 11_000);

        view.pinch(PinchInput { scale: 1.3, focal_x: 300.0, span_delta_px: 40.0 });
        view.pinch_end();
        fulfil(&mut view);
        run_animations(&mut view);
        fulfil(&mut view);

        assert_eq!(view.state().active_level, 1);
        let after = view.time_at(300.0);
        assert!((after - before).abs() <= 10, "{before} -> {after}");
    }

    #[test]
    fn second_pinch_mid_animation_targets_the_next_level() {
        let (mut view, _recorder) = loaded_view(60_000);
        view.pinch(PinchInput { scale: 1.3, focal_x: 200.0, span_delta_px: 40.0 });
        view.tick(Duration::from_millis(100));
        view.pinch(PinchInput { scale: 1.3, focal_x: 200.0, span_delta_px: 40.0 });
        view.pinch_end();
        fulfil(&mut view);
        run_animations(&mut view);
        assert_eq!(view.state().active_level, 2);
    }

    #[test]
    fn batches_from_a_replaced_source_are_dropped() {
        let recorder = Recorder::default();
        let mut view = TimelineView::new(TimelineConfig::default(), Box::new(recorder)).unwrap();
        view.set_viewport(400.0, 80.0);
        view.reset_source();
        view.set_duration(30_000);
        let old = view.take_requests();

        view.reset_source();
        view.set_duration(30_000);
        for MediaRequest::EnsureLevel { generation, plan } in old {
            let frames = plan.timestamps.iter().map(|&ts| CachedFrame::placeholder(ts)).collect();
            assert!(!view.apply_thumbnails(generation, plan.level, frames));
        }
        assert_eq!(view.cache().len(0), 0);
    }

    #[test]
    fn export_requires_trim_mode() {
        let (mut view, recorder) = loaded_view(60_000);
        assert!(matches!(view.export_range(), Err(TimelineError::TrimRangeInvalid { .. })));
        view.enable_trim_mode(true).unwrap();
        assert_eq!(view.export_range().unwrap().duration_ms(), 60_000);

        view.finish_trim(Ok(PathBuf::from("out.mp4")));
        assert!(view.trim_range().is_none());
        assert_eq!(recorder.take().last(), Some(&Event::Complete(true)));
    }
}
