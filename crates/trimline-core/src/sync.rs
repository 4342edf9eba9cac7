// crates/trimline-core/src/sync.rs
//
// Playhead / scroll synchronisation.
//
// Coordinate spaces:
//   strip position — pixels from the left edge of frame 0; frame `i` starts
//                    at `i * cell_px`.
//   view x         — pixels from the left edge of the viewport;
//                    `view_x = strip_pos - scroll_offset`.
//
// The playhead is pinned at `view_width / 2`, so the timestamp under it is the
// timestamp at strip position `scroll_offset + view_width / 2`. Between two
// cached frames the timestamp is interpolated by the fractional cell offset,
// which gives sub-interval precision from coarse samples.

use crate::media_types::CachedFrame;

/// The cached run of one zoom level plus what is needed to interpret it.
#[derive(Debug, Clone, Copy)]
pub struct StripContent<'a> {
    pub frames:      &'a [CachedFrame],
    pub interval_ms: i64,
    pub duration_ms: i64,
}

impl StripContent<'_> {
    /// True once the run covers the whole source.
    pub fn is_complete(&self) -> bool {
        self.frames
            .last()
            .is_some_and(|f| f.timestamp_ms + self.interval_ms > self.duration_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StripGeometry {
    pub cell_px:    f32,
    pub view_width: f32,
}

impl StripGeometry {
    pub fn new(cell_px: f32, view_width: f32) -> Self {
        Self { cell_px, view_width }
    }

    /// View x of the playhead.
    pub fn center(&self) -> f32 {
        self.view_width / 2.0
    }

    /// Strip position of the last representable instant: the duration for a
    /// complete run, the last loaded frame otherwise.
    pub fn end_position(&self, content: StripContent<'_>) -> f32 {
        let Some(last) = content.frames.last() else {
            return 0.0;
        };
        let last_pos = (content.frames.len() - 1) as f32 * self.cell_px;
        if content.is_complete() {
            let tail_ms = (content.duration_ms - last.timestamp_ms).max(0);
            last_pos + tail_ms as f32 / content.interval_ms as f32 * self.cell_px
        } else {
            last_pos
        }
    }

    /// `[min, max]` scroll offsets that keep the playhead on the strip.
    pub fn scroll_bounds(&self, content: StripContent<'_>) -> (f32, f32) {
        let min = -self.center();
        (min, min + self.end_position(content))
    }

    pub fn clamp_offset(&self, offset: f32, content: StripContent<'_>) -> f32 {
        let (min, max) = self.scroll_bounds(content);
        offset.clamp(min, max)
    }

    /// Timestamp at a strip position.
    pub fn position_to_time(&self, pos: f32, content: StripContent<'_>) -> i64 {
        let frames = content.frames;
        let Some(last) = frames.last() else {
            return 0;
        };
        let pos = pos.max(0.0);
        let idx = (pos / self.cell_px).floor() as usize;

        let t = if idx + 1 < frames.len() {
            let frac = ((pos - idx as f32 * self.cell_px) / self.cell_px) as f64;
            let t0 = frames[idx].timestamp_ms as f64;
            let t1 = frames[idx + 1].timestamp_ms as f64;
            t0 + frac * (t1 - t0)
        } else {
            let last_pos = (frames.len() - 1) as f32 * self.cell_px;
            let frac = ((pos - last_pos) / self.cell_px) as f64;
            last.timestamp_ms as f64 + frac * content.interval_ms as f64
        };
        (t.round() as i64).clamp(0, content.duration_ms.max(0))
    }

    /// Strip position of a timestamp. Exact inverse of `position_to_time`
    /// within the loaded run.
    pub fn time_to_position(&self, t_ms: i64, content: StripContent<'_>) -> f32 {
        let frames = content.frames;
        let Some(last) = frames.last() else {
            return 0.0;
        };
        let t = t_ms.clamp(0, content.duration_ms.max(0));
        let idx = frames.partition_point(|f| f.timestamp_ms < t);

        if idx == frames.len() {
            let last_pos = (frames.len() - 1) as f32 * self.cell_px;
            let tail = (t - last.timestamp_ms) as f32 / content.interval_ms as f32 * self.cell_px;
            return (last_pos + tail).min(self.end_position(content));
        }
        let at = &frames[idx];
        if at.timestamp_ms == t || idx == 0 {
            return idx as f32 * self.cell_px;
        }
        let prev = &frames[idx - 1];
        let span = (at.timestamp_ms - prev.timestamp_ms) as f32;
        let frac = (t - prev.timestamp_ms) as f32 / span;
        (idx - 1) as f32 * self.cell_px + frac * self.cell_px
    }

    /// Timestamp under the playhead for a scroll offset.
    pub fn offset_to_time(&self, offset: f32, content: StripContent<'_>) -> i64 {
        self.position_to_time(offset + self.center(), content)
    }

    /// Scroll offset that centres `t_ms` under the playhead, clamped.
    pub fn time_to_offset(&self, t_ms: i64, content: StripContent<'_>) -> f32 {
        let offset = self.time_to_position(t_ms, content) - self.center();
        self.clamp_offset(offset, content)
    }

    /// Timestamp drawn at view x for a scroll offset.
    pub fn time_at_view_x(&self, x: f32, offset: f32, content: StripContent<'_>) -> i64 {
        self.position_to_time(offset + x, content)
    }

    /// View x at which `t_ms` is drawn for a scroll offset.
    pub fn view_x_of_time(&self, t_ms: i64, offset: f32, content: StripContent<'_>) -> f32 {
        self.time_to_position(t_ms, content) - offset
    }
}
