// crates/trimline-core/src/config.rs
//
// Tunables for the timeline strip. Nothing here is persisted by the core;
// the host may build one from JSON (see trimline-ui --config).

use serde::{Deserialize, Serialize};

use crate::error::{Result, TimelineError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    // ── Strip geometry ───────────────────────────────────────────────────────
    pub thumb_width:   f32,
    pub thumb_height:  f32,
    /// Gap between two thumbnail cells.
    pub spacing:       f32,

    // ── Zoom ─────────────────────────────────────────────────────────────────
    /// Sampling interval per zoom level, coarsest first. Must strictly decrease.
    pub zoom_intervals_ms:    Vec<i64>,
    /// Accumulated pinch scale must leave `[1/(1+t), 1+t]` to count as a step.
    pub zoom_scale_threshold: f32,
    /// Accumulated finger-span change required on top of the scale threshold.
    pub min_pinch_span_px:    f32,
    pub zoom_animation_ms:    u32,

    // ── Thumbnail loading ────────────────────────────────────────────────────
    /// Frames decoded per level right after a source is loaded.
    pub initial_batch:     usize,
    /// Frames added each time the viewport nears the loaded edge.
    pub incremental_batch: usize,
    /// Trigger the next batch when fewer than this many view widths remain.
    pub prefetch_screens:  f32,

    // ── Gestures ─────────────────────────────────────────────────────────────
    pub pan_damping:             f32,
    /// Exponential decay rate of a fling, per second.
    pub fling_friction:          f32,
    pub fling_stop_velocity:     f32,
    pub seek_animation_ms:       u32,
    pub handle_hit_tolerance_px: f32,

    // ── Trim ─────────────────────────────────────────────────────────────────
    pub min_trim_ms: i64,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            thumb_width:             96.0,
            thumb_height:            54.0,
            spacing:                 2.0,
            zoom_intervals_ms:       vec![1000, 500, 250, 125],
            zoom_scale_threshold:    0.15,
            min_pinch_span_px:       20.0,
            zoom_animation_ms:       250,
            initial_batch:           20,
            incremental_batch:       20,
            prefetch_screens:        2.0,
            pan_damping:             0.8,
            fling_friction:          4.0,
            fling_stop_velocity:     20.0,
            seek_animation_ms:       200,
            handle_hit_tolerance_px: 24.0,
            min_trim_ms:             1000,
        }
    }
}

impl TimelineConfig {
    /// Width of one thumbnail cell including its trailing gap.
    pub fn cell_width(&self) -> f32 {
        self.thumb_width + self.spacing
    }

    pub fn validate(&self) -> Result<()> {
        if self.thumb_width <= 0.0 || self.thumb_height <= 0.0 || self.spacing < 0.0 {
            return Err(TimelineError::InvalidConfig("thumbnail size must be positive"));
        }
        if self.zoom_intervals_ms.is_empty() {
            return Err(TimelineError::InvalidConfig("at least one zoom level is required"));
        }
        if self.zoom_intervals_ms[0] <= 0 {
            return Err(TimelineError::InvalidConfig("zoom intervals must be positive"));
        }
        if self.zoom_intervals_ms.windows(2).any(|w| w[1] <= 0 || w[1] >= w[0]) {
            return Err(TimelineError::InvalidConfig(
                "zoom intervals must strictly decrease with level index",
            ));
        }
        if self.initial_batch == 0 || self.incremental_batch == 0 {
            return Err(TimelineError::InvalidConfig("batch sizes must be positive"));
        }
        if !(0.0..=1.0).contains(&self.pan_damping) || self.pan_damping == 0.0 {
            return Err(TimelineError::InvalidConfig("pan damping must be in (0, 1]"));
        }
        if self.min_trim_ms <= 0 {
            return Err(TimelineError::InvalidConfig("minimum trim duration must be positive"));
        }
        Ok(())
    }
}
