// crates/trimline-core/src/render.rs
//
// Timeline renderer: turns a snapshot of the view into a flat list of draw
// operations. The host paints them in order; nothing here knows about egui.
//
// Paint order:
//   1. thumbnails / placeholders (scaled about the focal point mid-zoom)
//   2. trim shading, trim border, trim handles
//   3. playhead
//   4. zoom indicator

use crate::animation::ZoomVisual;
use crate::helpers::time::format_timestamp;
use crate::media_types::Thumbnail;
use crate::sync::{StripContent, StripGeometry};
use crate::trim::{TrimHandle, TrimRange};

/// Width of a trim handle grip in pixels.
pub const HANDLE_WIDTH: f32 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Thumbnail {
        rect:         Rect,
        level:        usize,
        timestamp_ms: i64,
        image:        Thumbnail,
    },
    /// Decode miss or not-yet-decoded cell: bordered empty box.
    Placeholder { rect: Rect },
    /// Dimmed region outside the trim range.
    TrimShade { rect: Rect },
    TrimBorder { rect: Rect },
    TrimHandle { rect: Rect, handle: TrimHandle, active: bool },
    Playhead { x: f32, top: f32, bottom: f32 },
    ZoomIndicator {
        level:       usize,
        level_count: usize,
        interval_ms: i64,
        label:       String,
    },
}

/// Everything the renderer reads for one frame.
#[derive(Debug, Clone, Copy)]
pub struct RenderInput<'a> {
    pub geometry:      StripGeometry,
    pub content:       StripContent<'a>,
    pub scroll_offset: f32,
    pub thumb_width:   f32,
    pub thumb_height:  f32,
    pub view_height:   f32,
    pub level:         usize,
    pub level_count:   usize,
    pub position_ms:   i64,
    pub trim:          Option<TrimRange>,
    pub dragged:       Option<TrimHandle>,
    /// Transient zoom scale; `None` outside a zoom animation.
    pub zoom:          Option<ZoomVisual>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TimelineRenderer;

impl TimelineRenderer {
    pub fn render(&self, input: &RenderInput<'_>) -> Vec<DrawOp> {
        let mut ops = Vec::new();
        let visual = input.zoom.unwrap_or(ZoomVisual::IDENTITY);
        let strip_y = ((input.view_height - input.thumb_height) / 2.0).max(0.0);

        self.push_cells(input, visual, strip_y, &mut ops);
        if let Some(range) = input.trim {
            self.push_trim(input, visual, strip_y, range, &mut ops);
        }

        ops.push(DrawOp::Playhead {
            x:      input.geometry.center(),
            top:    0.0,
            bottom: input.view_height,
        });
        ops.push(DrawOp::ZoomIndicator {
            level:       input.level,
            level_count: input.level_count,
            interval_ms: input.content.interval_ms,
            label:       format!(
                "{}  ·  {}/{}  ·  {}ms/frame",
                format_timestamp(input.position_ms),
                input.level + 1,
                input.level_count,
                input.content.interval_ms,
            ),
        });
        ops
    }

    fn push_cells(&self, input: &RenderInput<'_>, visual: ZoomVisual, y: f32, ops: &mut Vec<DrawOp>) {
        let frames = input.content.frames;
        if frames.is_empty() {
            return;
        }
        let cell = input.geometry.cell_px;
        let left_pos = input.scroll_offset + visual.invert(0.0);
        let right_pos = input.scroll_offset + visual.invert(input.geometry.view_width);
        let (lo, hi) = if left_pos <= right_pos { (left_pos, right_pos) } else { (right_pos, left_pos) };

        let first = ((lo / cell).floor().max(0.0)) as usize;
        let last = ((hi / cell).ceil().max(0.0) as usize).min(frames.len() - 1);
        if first > last {
            return;
        }

        for (i, frame) in frames.iter().enumerate().take(last + 1).skip(first) {
            let x = visual.apply(i as f32 * cell - input.scroll_offset);
            let rect = Rect::new(x, y, input.thumb_width * visual.scale, input.thumb_height);
            match &frame.image {
                Some(image) => ops.push(DrawOp::Thumbnail {
                    rect,
                    level:        input.level,
                    timestamp_ms: frame.timestamp_ms,
                    image:        image.clone(),
                }),
                None => ops.push(DrawOp::Placeholder { rect }),
            }
        }
    }

    fn push_trim(
        &self,
        input:  &RenderInput<'_>,
        visual: ZoomVisual,
        y:      f32,
        range:  TrimRange,
        ops:    &mut Vec<DrawOp>,
    ) {
        let g = input.geometry;
        let start_x = visual.apply(g.view_x_of_time(range.start_ms, input.scroll_offset, input.content));
        let end_x = visual.apply(g.view_x_of_time(range.end_ms, input.scroll_offset, input.content));
        let h = input.thumb_height;

        if start_x > 0.0 {
            ops.push(DrawOp::TrimShade { rect: Rect::new(0.0, y, start_x, h) });
        }
        if end_x < g.view_width {
            ops.push(DrawOp::TrimShade { rect: Rect::new(end_x, y, g.view_width - end_x, h) });
        }
        ops.push(DrawOp::TrimBorder { rect: Rect::new(start_x, y, end_x - start_x, h) });
        ops.push(DrawOp::TrimHandle {
            rect:   Rect::new(start_x - HANDLE_WIDTH, y, HANDLE_WIDTH, h),
            handle: TrimHandle::Start,
            active: input.dragged == Some(TrimHandle::Start),
        });
        ops.push(DrawOp::TrimHandle {
            rect:   Rect::new(end_x, y, HANDLE_WIDTH, h),
            handle: TrimHandle::End,
            active: input.dragged == Some(TrimHandle::End),
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::media_types::CachedFrame;

    fn frames(n: i64) -> Vec<CachedFrame> {
        (0..n)
            .map(|i| CachedFrame {
                timestamp_ms: i * 1000,
                image: (i % 2 == 0).then(|| Thumbnail { width: 1, height: 1, rgba: Arc::from(vec![0u8; 4]) }),
            })
            .collect()
    }

    fn input<'a>(frames: &'a [CachedFrame], offset: f32) -> RenderInput<'a> {
        RenderInput {
            geometry:      StripGeometry::new(100.0, 400.0),
            content:       StripContent { frames, interval_ms: 1000, duration_ms: 60_000 },
            scroll_offset: offset,
            thumb_width:   98.0,
            thumb_height:  54.0,
            view_height:   80.0,
            level:         0,
            level_count:   4,
            position_ms:   0,
            trim:          None,
            dragged:       None,
            zoom:          None,
        }
    }

    #[test]
    fn decode_misses_render_as_placeholders() {
        let frames = frames(4);
        let ops = TimelineRenderer.render(&input(&frames, -200.0));
        let thumbs = ops.iter().filter(|op| matches!(op, DrawOp::Thumbnail { .. })).count();
        let holes = ops.iter().filter(|op| matches!(op, DrawOp::Placeholder { .. })).count();
        assert_eq!((thumbs, holes), (2, 2));
    }

    #[test]
    fn only_visible_cells_are_emitted() {
        let frames = frames(60);
        let ops = TimelineRenderer.render(&input(&frames, 1000.0));
        let cells: Vec<f32> = ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Thumbnail { rect, .. } | DrawOp::Placeholder { rect } => Some(rect.x),
                _ => None,
            })
            .collect();
        assert!(cells.len() <= 6);
        assert!(cells.iter().all(|&x| x > -100.0 && x < 400.0));
    }

    #[test]
    fn playhead_sits_at_view_centre() {
        let frames = frames(10);
        let ops = TimelineRenderer.render(&input(&frames, 0.0));
        assert!(ops.iter().any(|op| matches!(op, DrawOp::Playhead { x, .. } if *x == 200.0)));
    }

    #[test]
    fn trim_overlay_brackets_the_range() {
        let frames = frames(60);
        let mut inp = input(&frames, 0.0);
        inp.trim = Some(TrimRange::new(2000, 5000, 60_000, 1000).unwrap());
        let ops = TimelineRenderer.render(&inp);
        let border = ops.iter().find_map(|op| match op {
            DrawOp::TrimBorder { rect } => Some(*rect),
            _ => None,
        });
        let border = border.expect("border");
        assert_eq!(border.x, 200.0);
        assert_eq!(border.right(), 500.0);
        let shades = ops.iter().filter(|op| matches!(op, DrawOp::TrimShade { .. })).count();
        assert_eq!(shades, 1);
    }
}
