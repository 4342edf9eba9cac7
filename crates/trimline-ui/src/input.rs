// crates/trimline-ui/src/input.rs
//
// Maps egui pointer and touch input onto the engine's gesture calls.
//
//   primary drag         → drag_begin / drag_update / drag_end(velocity)
//   click                → tap
//   pinch or ctrl+wheel  → pinch(scale, focal, span) … pinch_end
//
// egui reports zoom as a per-frame factor without a finger span, so the span
// change is derived from a nominal two-finger spread.

use egui::{Pos2, Rect, Response, Ui};

use trimline_core::gesture::PinchInput;
use trimline_media::{MediaBackend, TimelineEngine};

const NOMINAL_SPAN_PX: f32 = 200.0;

/// `None` when the frame carries no zoom.
pub fn pinch_input(zoom_delta: f32, focal_x: f32) -> Option<PinchInput> {
    if !zoom_delta.is_finite() || zoom_delta <= 0.0 || (zoom_delta - 1.0).abs() < 1e-4 {
        return None;
    }
    Some(PinchInput {
        scale:         zoom_delta,
        focal_x,
        span_delta_px: (zoom_delta - 1.0) * NOMINAL_SPAN_PX,
    })
}

#[derive(Debug, Default)]
pub struct GestureMapper {
    dragging: bool,
    pinching: bool,
}

impl GestureMapper {
    /// `rect` is the strip's screen rect; the engine works in strip-local x.
    pub fn handle<B: MediaBackend>(
        &mut self,
        ui:       &Ui,
        response: &Response,
        rect:     Rect,
        engine:   &mut TimelineEngine<B>,
    ) {
        let (zoom_delta, touching, hover, velocity, press_origin) = ui.input(|i| {
            (
                i.zoom_delta(),
                i.multi_touch().is_some(),
                i.pointer.hover_pos(),
                i.pointer.velocity(),
                i.pointer.press_origin(),
            )
        });
        let local_x = |p: Pos2| p.x - rect.min.x;

        // ── Pinch ────────────────────────────────────────────────────────────
        if response.hovered() || self.pinching {
            let focal_x = hover.map_or(rect.width() / 2.0, local_x);
            if let Some(pinch) = pinch_input(zoom_delta, focal_x) {
                if self.dragging {
                    engine.drag_end(0.0);
                    self.dragging = false;
                }
                engine.pinch(pinch);
                self.pinching = true;
            } else if self.pinching && !touching {
                engine.pinch_end();
                self.pinching = false;
            }
        }
        if self.pinching || touching {
            return;
        }

        // ── Drag / tap ───────────────────────────────────────────────────────
        if response.drag_started() {
            let x = press_origin.or(response.interact_pointer_pos()).map_or(0.0, local_x);
            engine.drag_begin(x);
            self.dragging = true;
        }
        if self.dragging && response.dragged() {
            if let Some(p) = response.interact_pointer_pos() {
                engine.drag_update(local_x(p), response.drag_delta().x);
            }
        }
        if self.dragging && response.drag_stopped() {
            engine.drag_end(velocity.x);
            self.dragging = false;
        }
        if response.clicked() {
            if let Some(p) = response.interact_pointer_pos() {
                engine.tap(local_x(p));
            }
        }
    }
}
