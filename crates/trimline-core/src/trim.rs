// crates/trimline-core/src/trim.rs
//
// The in/out range selected while trim mode is active.
//
// Invariant after every operation:
//   0 <= start_ms < end_ms <= duration_ms  and  end_ms - start_ms >= min_trim_ms

use crate::error::{Result, TimelineError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimRange {
    pub start_ms:    i64,
    pub end_ms:      i64,
    duration_ms:     i64,
    min_trim_ms:     i64,
}

/// Which handle a drag moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimHandle {
    Start,
    End,
}

impl TrimRange {
    /// The whole source, used as the default when trim mode is entered.
    pub fn whole(duration_ms: i64, min_trim_ms: i64) -> Result<Self> {
        Self::new(0, duration_ms, duration_ms, min_trim_ms)
    }

    pub fn new(start_ms: i64, end_ms: i64, duration_ms: i64, min_trim_ms: i64) -> Result<Self> {
        let invalid = |reason| TimelineError::TrimRangeInvalid { start_ms, end_ms, reason };
        if min_trim_ms <= 0 {
            return Err(invalid("minimum trim duration must be positive"));
        }
        if duration_ms < min_trim_ms {
            return Err(invalid("source is shorter than the minimum trim duration"));
        }
        if start_ms < 0 || end_ms > duration_ms {
            return Err(invalid("range lies outside the source"));
        }
        if start_ms >= end_ms {
            return Err(invalid("start must precede end"));
        }
        if end_ms - start_ms < min_trim_ms {
            return Err(invalid("range is shorter than the minimum trim duration"));
        }
        Ok(Self { start_ms, end_ms, duration_ms, min_trim_ms })
    }

    pub fn duration_ms(&self) -> i64 {
        self.end_ms - self.start_ms
    }

    pub fn source_duration_ms(&self) -> i64 {
        self.duration_ms
    }

    /// Moves the start handle; it never crosses `end - min_trim_ms`.
    pub fn drag_start(&mut self, to_ms: i64) {
        self.start_ms = to_ms.clamp(0, self.end_ms - self.min_trim_ms);
    }

    /// Moves the end handle; it never crosses `start + min_trim_ms`.
    ///
    /// ```
    /// use trimline_core::TrimRange;
    /// let mut range = TrimRange::new(500, 4000, 30_000, 1000).unwrap();
    /// range.drag_end(200);
    /// assert_eq!((range.start_ms, range.end_ms), (500, 1500));
    /// ```
    pub fn drag_end(&mut self, to_ms: i64) {
        self.end_ms = to_ms.clamp(self.start_ms + self.min_trim_ms, self.duration_ms);
    }

    pub fn drag(&mut self, handle: TrimHandle, to_ms: i64) {
        match handle {
            TrimHandle::Start => self.drag_start(to_ms),
            TrimHandle::End   => self.drag_end(to_ms),
        }
    }

    /// Re-checks the invariant; used right before an export starts.
    pub fn validate(&self) -> Result<()> {
        Self::new(self.start_ms, self.end_ms, self.duration_ms, self.min_trim_ms).map(|_| ())
    }
}
