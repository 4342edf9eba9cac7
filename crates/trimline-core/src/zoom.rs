// crates/trimline-core/src/zoom.rs
//
// Discrete zoom levels. Level 0 is the coarsest (widest sampling interval);
// every higher index samples more densely.

use crate::error::{Result, TimelineError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoomLevel {
    pub index:              usize,
    pub sample_interval_ms: i64,
}

/// Direction of one zoom step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDirection {
    /// Towards denser sampling (higher index).
    In,
    /// Towards coarser sampling (lower index).
    Out,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoomTable {
    levels: Vec<ZoomLevel>,
}

impl ZoomTable {
    /// Builds a table from per-level intervals, coarsest first.
    ///
    /// ```
    /// use trimline_core::ZoomTable;
    /// let table = ZoomTable::new(&[1000, 500, 250]).unwrap();
    /// assert_eq!(table.level(7).sample_interval_ms, 250);
    /// assert!(ZoomTable::new(&[500, 1000]).is_err());
    /// ```
    pub fn new(intervals_ms: &[i64]) -> Result<Self> {
        if intervals_ms.is_empty() {
            return Err(TimelineError::InvalidConfig("at least one zoom level is required"));
        }
        if intervals_ms.iter().any(|&i| i <= 0) {
            return Err(TimelineError::InvalidConfig("zoom intervals must be positive"));
        }
        if intervals_ms.windows(2).any(|w| w[1] >= w[0]) {
            return Err(TimelineError::InvalidConfig(
                "zoom intervals must strictly decrease with level index",
            ));
        }
        let levels = intervals_ms
            .iter()
            .enumerate()
            .map(|(index, &sample_interval_ms)| ZoomLevel { index, sample_interval_ms })
            .collect();
        Ok(Self { levels })
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn clamp_index(&self, index: usize) -> usize {
        index.min(self.levels.len() - 1)
    }

    /// The level at `index`, clamped into the table.
    pub fn level(&self, index: usize) -> ZoomLevel {
        self.levels[self.clamp_index(index)]
    }

    pub fn levels(&self) -> &[ZoomLevel] {
        &self.levels
    }

    /// The neighbouring level in `direction`, or `None` at either end.
    pub fn adjacent(&self, index: usize, direction: ZoomDirection) -> Option<ZoomLevel> {
        let index = self.clamp_index(index);
        match direction {
            ZoomDirection::In if index + 1 < self.levels.len() => Some(self.levels[index + 1]),
            ZoomDirection::Out if index > 0 => Some(self.levels[index - 1]),
            _ => None,
        }
    }
}
