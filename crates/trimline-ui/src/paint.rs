// crates/trimline-ui/src/paint.rs
//
// Paints the core's DrawOp list with egui.
//
// Thumbnails are uploaded once and kept as textures keyed by
// (generation, level, timestamp). Seeing a new generation drops every
// texture of the previous source.

use std::collections::HashMap;

use egui::{
    Align2, Color32, ColorImage, CornerRadius, FontId, Painter, Pos2, Rect, Shape, Stroke,
    StrokeKind, TextureHandle, TextureOptions, Vec2,
};

use trimline_core::render::{self, DrawOp};
use trimline_core::trim::TrimHandle;
use trimline_core::Thumbnail;

use crate::theme::{
    DARK_BG_0, DARK_BORDER, DARK_TEXT_DIM, HANDLE, HANDLE_ACTIVE, PLACEHOLDER, PLAYHEAD,
    TRIM_BORDER, TRIM_SHADE,
};

#[derive(Default)]
pub struct TextureCache {
    generation: u64,
    textures:   HashMap<(usize, i64), TextureHandle>,
}

impl TextureCache {
    fn get(
        &mut self,
        ctx:          &egui::Context,
        generation:   u64,
        level:        usize,
        timestamp_ms: i64,
        image:        &Thumbnail,
    ) -> &TextureHandle {
        if generation != self.generation {
            self.textures.clear();
            self.generation = generation;
        }
        self.textures.entry((level, timestamp_ms)).or_insert_with(|| {
            ctx.load_texture(
                format!("thumb-{generation}-{level}-{timestamp_ms}"),
                ColorImage::from_rgba_unmultiplied(
                    [image.width as usize, image.height as usize],
                    &image.rgba,
                ),
                TextureOptions::LINEAR,
            )
        })
    }

    pub fn clear(&mut self) {
        self.textures.clear();
    }
}

fn to_screen(origin: Pos2, r: render::Rect) -> Rect {
    Rect::from_min_size(origin + Vec2::new(r.x, r.y), Vec2::new(r.w, r.h))
}

fn placeholder(painter: &Painter, rect: Rect) {
    painter.rect_filled(rect, 2.0, PLACEHOLDER);
    painter.rect_stroke(rect, 2.0, Stroke::new(1.0, DARK_BORDER), StrokeKind::Inside);
}

/// Paints `ops` into `rect`; op coordinates are relative to `rect.min`.
pub fn paint_timeline(
    painter:    &Painter,
    rect:       Rect,
    ops:        &[DrawOp],
    textures:   &mut TextureCache,
    generation: u64,
) {
    painter.rect_filled(rect, 0.0, DARK_BG_0);
    let origin = rect.min;
    let uv = Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0));

    for op in ops {
        match op {
            DrawOp::Thumbnail { rect: r, level, timestamp_ms, image } => {
                let dst = to_screen(origin, *r);
                let expected = image.width as usize * image.height as usize * 4;
                if image.rgba.len() != expected || expected == 0 {
                    placeholder(painter, dst);
                    continue;
                }
                let tex = textures.get(painter.ctx(), generation, *level, *timestamp_ms, image);
                painter.image(tex.id(), dst, uv, Color32::WHITE);
            }
            DrawOp::Placeholder { rect: r } => placeholder(painter, to_screen(origin, *r)),
            DrawOp::TrimShade { rect: r } => {
                painter.rect_filled(to_screen(origin, *r), 0.0, TRIM_SHADE);
            }
            DrawOp::TrimBorder { rect: r } => {
                painter.rect_stroke(
                    to_screen(origin, *r),
                    0.0,
                    Stroke::new(2.0, TRIM_BORDER),
                    StrokeKind::Inside,
                );
            }
            DrawOp::TrimHandle { rect: r, handle, active } => {
                let dst = to_screen(origin, *r);
                let fill = if *active { HANDLE_ACTIVE } else { HANDLE };
                // Rounded on the side facing away from the selection.
                let radius = match handle {
                    TrimHandle::Start => CornerRadius { nw: 4, sw: 4, ne: 0, se: 0 },
                    TrimHandle::End => CornerRadius { nw: 0, sw: 0, ne: 4, se: 4 },
                };
                painter.rect_filled(dst, radius, fill);
                let grip = dst.height() * 0.3;
                painter.line_segment(
                    [dst.center_top() + Vec2::new(0.0, grip), dst.center_bottom() - Vec2::new(0.0, grip)],
                    Stroke::new(2.0, DARK_BG_0),
                );
            }
            DrawOp::Playhead { x, top, bottom } => {
                let top = origin + Vec2::new(*x, *top);
                let bottom = origin + Vec2::new(*x, *bottom);
                painter.line_segment([top, bottom], Stroke::new(2.0, PLAYHEAD));
                painter.add(Shape::convex_polygon(
                    vec![top + Vec2::new(-6.0, 0.0), top + Vec2::new(6.0, 0.0), top + Vec2::new(0.0, 8.0)],
                    PLAYHEAD,
                    Stroke::NONE,
                ));
            }
            DrawOp::ZoomIndicator { level, level_count, label, .. } => {
                for i in 0..*level_count {
                    let center = rect.left_top() + Vec2::new(10.0 + i as f32 * 10.0, 10.0);
                    if i == *level {
                        painter.circle_filled(center, 3.5, TRIM_BORDER);
                    } else {
                        painter.circle_stroke(center, 3.0, Stroke::new(1.0, DARK_TEXT_DIM));
                    }
                }
                painter.text(
                    rect.right_top() + Vec2::new(-8.0, 4.0),
                    Align2::RIGHT_TOP,
                    label,
                    FontId::monospace(11.0),
                    DARK_TEXT_DIM,
                );
            }
        }
    }
}
