use serde::Serialize;

use super::metrics::ImageMetrics;

pub const BASE_CONFIDENCE: u32 = 40;
pub const MAX_CONFIDENCE: u32 = 95;

// Each table is scanned in order; the first threshold strictly exceeded awards
// its points. Signals are scored independently of one another.
const SHARPNESS_POINTS: [(f64, u32); 4] = [(800.0, 30), (500.0, 25), (200.0, 15), (100.0, 8)];
const CONTRAST_POINTS: [(f64, u32); 4] = [(50.0, 15), (40.0, 12), (25.0, 8), (15.0, 4)];
const AREA_POINTS: [(u64, u32); 3] = [(1_000_000, 10), (500_000, 6), (200_000, 3)];
// Open intervals, narrowest first.
const BRIGHTNESS_POINTS: [((f64, f64), u32); 3] = [
    ((80.0, 180.0), 20),
    ((60.0, 200.0), 12),
    ((40.0, 220.0), 5),
];

fn points_above<T: PartialOrd + Copy>(table: &[(T, u32)], value: T) -> u32 {
    table
        .iter()
        .find(|(threshold, _)| value > *threshold)
        .map_or(0, |&(_, points)| points)
}

fn points_within(table: &[((f64, f64), u32)], value: f64) -> u32 {
    table
        .iter()
        .find(|((low, high), _)| value > *low && value < *high)
        .map_or(0, |&(_, points)| points)
}

/// Per-signal contributions to the confidence score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConfidenceBreakdown {
    pub sharpness: u32,
    pub brightness: u32,
    pub contrast: u32,
    pub resolution: u32,
}

impl ConfidenceBreakdown {
    pub fn raw_total(&self) -> u32 {
        BASE_CONFIDENCE + self.sharpness + self.brightness + self.contrast + self.resolution
    }

    /// Final score, capped at 95.
    pub fn score(&self) -> u32 {
        self.raw_total().min(MAX_CONFIDENCE)
    }
}

/// Scores how far the measurements can be trusted, not how good the roof is.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfidenceScorer;

impl ConfidenceScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn breakdown(&self, metrics: &ImageMetrics) -> ConfidenceBreakdown {
        ConfidenceBreakdown {
            sharpness: points_above(&SHARPNESS_POINTS, metrics.sharpness),
            brightness: points_within(&BRIGHTNESS_POINTS, metrics.brightness),
            contrast: points_above(&CONTRAST_POINTS, metrics.contrast),
            resolution: points_above(&AREA_POINTS, metrics.total_area),
        }
    }

    pub fn score(&self, metrics: &ImageMetrics) -> u32 {
        self.breakdown(metrics).score()
    }
}
