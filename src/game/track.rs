//! Track Geometry
//!
//! Pure geometry: lane count plus start, finish and checkpoint positions
//! expressed as ratios of the track length.

use serde::{Deserialize, Serialize};

/// Static layout of the race track.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackGeometry {
    /// Total track length in track units.
    pub length: f64,
    /// Start line as a ratio of `length`.
    pub start_ratio: f64,
    /// Finish line as a ratio of `length`.
    pub finish_ratio: f64,
    /// Number of parallel lanes (one racer per lane).
    pub lane_count: usize,
    /// Checkpoints as ratios of the start-to-finish span, each in (0, 1).
    pub checkpoint_ratios: Vec<f64>,
}

impl Default for TrackGeometry {
    fn default() -> Self {
        Self {
            length: 1000.0,
            start_ratio: 0.05,
            finish_ratio: 0.95,
            lane_count: 4,
            checkpoint_ratios: vec![1.0 / 3.0, 2.0 / 3.0],
        }
    }
}

impl TrackGeometry {
    /// Position of the start line.
    #[inline]
    pub fn start(&self) -> f64 {
        self.length * self.start_ratio
    }

    /// Position of the finish line.
    #[inline]
    pub fn finish(&self) -> f64 {
        self.length * self.finish_ratio
    }

    /// Distance from start to finish.
    #[inline]
    pub fn span(&self) -> f64 {
        self.finish() - self.start()
    }

    /// Absolute position of a checkpoint ratio.
    #[inline]
    pub fn position_at(&self, ratio: f64) -> f64 {
        self.start() + self.span() * ratio
    }

    /// Absolute positions of every configured checkpoint, in order.
    pub fn checkpoint_positions(&self) -> Vec<f64> {
        self.checkpoint_ratios
            .iter()
            .map(|&r| self.position_at(r))
            .collect()
    }

    /// Clamp a position into [start, finish].
    #[inline]
    pub fn clamp(&self, position: f64) -> f64 {
        position.max(self.start()).min(self.finish())
    }

    /// Fraction of the course completed at `position`, in [0, 1].
    pub fn progress(&self, position: f64) -> f64 {
        let span = self.span();
        if span <= 0.0 {
            return 0.0;
        }
        ((position - self.start()) / span).clamp(0.0, 1.0)
    }
}
