// crates/trimline-core/src/cache.rs
//
// Per-zoom-level thumbnail store.
//
// Every level is an append-only run of frames at `interval * i`, truncated at
// the source duration. Batches are planned here (so two requests never cover
// the same timestamps) and accepted back only when they carry the current
// source generation and start exactly where the run ends.

use std::collections::HashMap;

use crate::media_types::{BatchPlan, CachedFrame, Priority};

#[derive(Debug, Default)]
struct LevelFrames {
    frames:    Vec<CachedFrame>,
    in_flight: bool,
}

impl LevelFrames {
    fn next_timestamp(&self, interval_ms: i64) -> i64 {
        self.frames
            .last()
            .map(|f| f.timestamp_ms + interval_ms)
            .unwrap_or(0)
    }
}

/// Why a decoded batch was not applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendRejected {
    /// The batch was decoded for a source that has since been replaced.
    StaleGeneration { batch: u64, current: u64 },
    /// The batch does not continue the run without a gap or duplicate.
    OutOfOrder { expected_ms: i64, got_ms: i64 },
    Empty,
}

#[derive(Debug, Default)]
pub struct ThumbnailCache {
    generation: u64,
    levels:     HashMap<usize, LevelFrames>,
}

impl ThumbnailCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Source epoch. Every batch must be tagged with the value current when it
    /// was planned.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Drops every level and starts a new generation. Returns the new one.
    pub fn clear(&mut self) -> u64 {
        self.levels.clear();
        self.generation += 1;
        self.generation
    }

    pub fn frames(&self, level: usize) -> &[CachedFrame] {
        self.levels
            .get(&level)
            .map(|l| l.frames.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self, level: usize) -> usize {
        self.frames(level).len()
    }

    pub fn is_in_flight(&self, level: usize) -> bool {
        self.levels.get(&level).is_some_and(|l| l.in_flight)
    }

    /// True once the run reaches the last timestamp `<= duration_ms`.
    pub fn is_complete(&self, level: usize, interval_ms: i64, duration_ms: i64) -> bool {
        match self.levels.get(&level) {
            Some(l) if !l.frames.is_empty() => l.next_timestamp(interval_ms) > duration_ms,
            _ => duration_ms < 0,
        }
    }

    /// Plans the next batch for `level` so it holds up to `frame_budget` frames.
    ///
    /// Returns `None` when the level already holds the budget, is complete,
    /// or has a batch in flight. The returned timestamps continue the run at
    /// `interval_ms` spacing and never pass `duration_ms`.
    ///
    /// ```
    /// use trimline_core::cache::ThumbnailCache;
    /// use trimline_core::media_types::Priority;
    ///
    /// let mut cache = ThumbnailCache::new();
    /// let plan = cache.ensure_level(0, 1000, 50, 30_000, Priority::Eager).unwrap();
    /// assert_eq!(plan.timestamps.len(), 31);
    /// assert_eq!(*plan.timestamps.last().unwrap(), 30_000);
    /// ```
    pub fn ensure_level(
        &mut self,
        level:        usize,
        interval_ms:  i64,
        frame_budget: usize,
        duration_ms:  i64,
        priority:     Priority,
    ) -> Option<BatchPlan> {
        if interval_ms <= 0 || duration_ms < 0 {
            return None;
        }
        let entry = self.levels.entry(level).or_default();
        if entry.in_flight || entry.frames.len() >= frame_budget {
            return None;
        }

        let start = entry.next_timestamp(interval_ms);
        let wanted = frame_budget - entry.frames.len();
        let timestamps: Vec<i64> = (0..wanted as i64)
            .map(|i| start + i * interval_ms)
            .take_while(|&ts| ts <= duration_ms)
            .collect();
        if timestamps.is_empty() {
            return None;
        }

        entry.in_flight = true;
        Some(BatchPlan { level, timestamps, priority })
    }

    /// Applies a decoded batch. Returns the new frame count for the level.
    pub fn append(
        &mut self,
        generation:  u64,
        level:       usize,
        interval_ms: i64,
        frames:      Vec<CachedFrame>,
    ) -> Result<usize, AppendRejected> {
        if generation != self.generation {
            return Err(AppendRejected::StaleGeneration { batch: generation, current: self.generation });
        }
        let Some(first) = frames.first() else {
            return Err(AppendRejected::Empty);
        };

        let entry = self.levels.entry(level).or_default();
        let expected = entry.next_timestamp(interval_ms);
        if first.timestamp_ms != expected {
            entry.in_flight = false;
            return Err(AppendRejected::OutOfOrder { expected_ms: expected, got_ms: first.timestamp_ms });
        }
        if let Some(bad) = frames
            .windows(2)
            .find(|w| w[1].timestamp_ms != w[0].timestamp_ms + interval_ms)
        {
            entry.in_flight = false;
            return Err(AppendRejected::OutOfOrder {
                expected_ms: bad[0].timestamp_ms + interval_ms,
                got_ms:      bad[1].timestamp_ms,
            });
        }

        entry.frames.extend(frames);
        entry.in_flight = false;
        Ok(entry.frames.len())
    }

    /// Releases the in-flight mark of a level whose batch will never arrive.
    pub fn abandon_batch(&mut self, level: usize) {
        if let Some(entry) = self.levels.get_mut(&level) {
            entry.in_flight = false;
        }
    }
}
