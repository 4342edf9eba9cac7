// crates/trimline-core/src/gesture.rs
//
// Gesture interpretation. The controller owns the gesture state and, while
// trim mode is active, the trim range. It turns raw input into decisions
// (scroll by this much, seek here, step zoom that way, move this handle) and
// leaves applying them to `TimelineView`.

use crate::config::TimelineConfig;
use crate::trim::{TrimHandle, TrimRange};
use crate::zoom::ZoomDirection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureState {
    Idle,
    Scrolling,
    Zooming,
    TrimDragStart,
    TrimDragEnd,
}

/// One pinch update from the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinchInput {
    /// Scale factor since the previous update (1.0 = unchanged).
    pub scale:         f32,
    /// View x of the point between the fingers.
    pub focal_x:       f32,
    /// Change of the finger span since the previous update, in pixels.
    pub span_delta_px: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TapAction {
    /// Trim mode inactive: seek so view x lands under the playhead.
    Seek { x: f32 },
    /// Trim mode active and a handle was hit. The state is unchanged: the
    /// drag starts with the next `drag_begin` on that handle.
    HandleHit(TrimHandle),
    /// Trim mode active and nothing was hit.
    Ignored,
}

#[derive(Debug, Clone)]
pub struct GestureController {
    state:           GestureState,
    trim:            Option<TrimRange>,
    pan_damping:     f32,
    hit_tolerance:   f32,
    scale_threshold: f32,
    min_span_px:     f32,
    pinch_scale:     f32,
    pinch_span:      f32,
}

impl GestureController {
    pub fn new(config: &TimelineConfig) -> Self {
        Self {
            state:           GestureState::Idle,
            trim:            None,
            pan_damping:     config.pan_damping,
            hit_tolerance:   config.handle_hit_tolerance_px,
            scale_threshold: config.zoom_scale_threshold,
            min_span_px:     config.min_pinch_span_px,
            pinch_scale:     1.0,
            pinch_span:      0.0,
        }
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    pub fn set_state(&mut self, state: GestureState) {
        self.state = state;
    }

    // ── Trim mode ────────────────────────────────────────────────────────────

    pub fn trim_range(&self) -> Option<TrimRange> {
        self.trim
    }

    pub fn is_trim_active(&self) -> bool {
        self.trim.is_some()
    }

    pub fn enter_trim(&mut self, range: TrimRange) {
        self.trim = Some(range);
    }

    pub fn exit_trim(&mut self) -> Option<TrimRange> {
        if matches!(self.state, GestureState::TrimDragStart | GestureState::TrimDragEnd) {
            self.state = GestureState::Idle;
        }
        self.trim.take()
    }

    /// Handle within tolerance of `x`, preferring the nearer one.
    pub fn hit_handle(&self, x: f32, start_x: f32, end_x: f32) -> Option<TrimHandle> {
        self.trim?;
        let ds = (x - start_x).abs();
        let de = (x - end_x).abs();
        match (ds <= self.hit_tolerance, de <= self.hit_tolerance) {
            (true, true) if de < ds => Some(TrimHandle::End),
            (true, _)               => Some(TrimHandle::Start),
            (false, true)           => Some(TrimHandle::End),
            (false, false)          => None,
        }
    }

    pub fn tap(&mut self, x: f32, start_x: f32, end_x: f32) -> TapAction {
        if !self.is_trim_active() {
            return TapAction::Seek { x };
        }
        match self.hit_handle(x, start_x, end_x) {
            Some(handle) => TapAction::HandleHit(handle),
            None => TapAction::Ignored,
        }
    }

    pub fn begin_trim_drag(&mut self, handle: TrimHandle) {
        self.state = match handle {
            TrimHandle::Start => GestureState::TrimDragStart,
            TrimHandle::End   => GestureState::TrimDragEnd,
        };
    }

    pub fn dragged_handle(&self) -> Option<TrimHandle> {
        match self.state {
            GestureState::TrimDragStart => Some(TrimHandle::Start),
            GestureState::TrimDragEnd   => Some(TrimHandle::End),
            _ => None,
        }
    }

    /// Moves the dragged handle to `to_ms`. Returns the clamped range.
    pub fn drag_trim(&mut self, to_ms: i64) -> Option<TrimRange> {
        let handle = self.dragged_handle()?;
        let range = self.trim.as_mut()?;
        range.drag(handle, to_ms);
        Some(*range)
    }

    // ── Pan / fling ──────────────────────────────────────────────────────────

    pub fn begin_pan(&mut self) {
        self.state = GestureState::Scrolling;
    }

    /// Scroll offset change for a finger movement of `dx` pixels.
    pub fn pan_delta(&self, dx: f32) -> f32 {
        -dx * self.pan_damping
    }

    pub fn fling_velocity(&self, vx: f32) -> f32 {
        vx * self.pan_damping
    }

    pub fn end_gesture(&mut self) {
        self.state = GestureState::Idle;
        self.reset_pinch();
    }

    // ── Pinch ────────────────────────────────────────────────────────────────

    /// Accumulates pinch input; returns a direction once both the scale and
    /// the span thresholds have been crossed.
    pub fn pinch(&mut self, input: PinchInput) -> Option<ZoomDirection> {
        if input.scale <= 0.0 || !input.scale.is_finite() {
            return None;
        }
        self.state = GestureState::Zooming;
        self.pinch_scale *= input.scale;
        self.pinch_span += input.span_delta_px;

        if self.pinch_span.abs() < self.min_span_px {
            return None;
        }
        let upper = 1.0 + self.scale_threshold;
        let direction = if self.pinch_scale >= upper {
            ZoomDirection::In
        } else if self.pinch_scale <= 1.0 / upper {
            ZoomDirection::Out
        } else {
            return None;
        };
        self.reset_pinch();
        Some(direction)
    }

    fn reset_pinch(&mut self) {
        self.pinch_scale = 1.0;
        self.pinch_span = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> GestureController {
        GestureController::new(&TimelineConfig::default())
    }

    #[test]
    fn small_pinch_jitter_is_ignored() {
        let mut g = controller();
        for _ in 0..10 {
            let step = g.pinch(PinchInput { scale: 1.01, focal_x: 100.0, span_delta_px: 1.0 });
            assert_eq!(step, None);
        }
    }

    #[test]
    fn large_scale_without_span_change_is_ignored() {
        let mut g = controller();
        let step = g.pinch(PinchInput { scale: 1.5, focal_x: 100.0, span_delta_px: 4.0 });
        assert_eq!(step, None);
    }

    #[test]
    fn spreading_fingers_steps_in_and_pinching_steps_out() {
        let mut g = controller();
        let in_step = g.pinch(PinchInput { scale: 1.3, focal_x: 100.0, span_delta_px: 40.0 });
        assert_eq!(in_step, Some(ZoomDirection::In));
        let out_step = g.pinch(PinchInput { scale: 0.7, focal_x: 100.0, span_delta_px: -40.0 });
        assert_eq!(out_step, Some(ZoomDirection::Out));
    }

    #[test]
    fn taps_seek_only_outside_trim_mode() {
        let mut g = controller();
        assert_eq!(g.tap(50.0, 0.0, 0.0), TapAction::Seek { x: 50.0 });

        g.enter_trim(TrimRange::whole(10_000, 1000).unwrap());
        assert_eq!(g.tap(50.0, 100.0, 400.0), TapAction::Ignored);
        assert_eq!(g.tap(110.0, 100.0, 400.0), TapAction::HandleHit(TrimHandle::Start));
        assert_eq!(g.tap(390.0, 100.0, 400.0), TapAction::HandleHit(TrimHandle::End));
    }

    #[test]
    fn tapping_a_handle_leaves_the_controller_idle() {
        let mut g = controller();
        g.enter_trim(TrimRange::whole(10_000, 1000).unwrap());
        g.tap(110.0, 100.0, 400.0);
        assert_eq!(g.state(), GestureState::Idle);
        assert_eq!(g.dragged_handle(), None);
    }

    #[test]
    fn overlapping_handles_prefer_the_nearer_one() {
        let mut g = controller();
        g.enter_trim(TrimRange::whole(10_000, 1000).unwrap());
        assert_eq!(g.hit_handle(118.0, 100.0, 120.0), Some(TrimHandle::End));
        assert_eq!(g.hit_handle(102.0, 100.0, 120.0), Some(TrimHandle::Start));
    }

    #[test]
    fn pan_is_damped_and_inverted() {
        let g = controller();
        assert!((g.pan_delta(10.0) + 8.0).abs() < 1e-5);
    }
}
