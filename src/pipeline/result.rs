use serde::{Serialize, Serializer};
use std::time::Duration;

use super::condition::RoofCondition;
use super::metrics::ImageMetrics;

/// Round to `decimals` places, ties to even.
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round_ties_even() / scale
}

pub(crate) fn serialize_seconds<S: Serializer>(
    duration: &Duration,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round_to(duration.as_secs_f64(), 2))
}

/// Rounded view of the signals, as shown in reports.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub brightness: f64,
    pub contrast: f64,
    pub sharpness: f64,
    pub roof_area_m2: f64,
}

impl MetricsSummary {
    pub fn new(metrics: &ImageMetrics, roof_area_m2: f64) -> Self {
        Self {
            brightness: round_to(metrics.brightness, 1),
            contrast: round_to(metrics.contrast, 1),
            sharpness: round_to(metrics.sharpness, 1),
            roof_area_m2: round_to(roof_area_m2, 1),
        }
    }
}

/// Outcome of one analysis. Built once by the pipeline and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub roof_condition: RoofCondition,
    pub usable_area_percent: u32,
    /// Pre-cap system size, kW, one decimal.
    pub system_size_kw: f64,
    pub confidence: u32,
    pub notes: String,
    #[serde(serialize_with = "serialize_seconds")]
    pub analysis_time: Duration,
    pub image_size: String,
    pub image_metrics: MetricsSummary,
    pub raw_metrics: ImageMetrics,
}

impl AnalysisResult {
    pub fn notes_for(condition: RoofCondition, usable_percent: u32, confidence: u32) -> String {
        format!(
            "{} roof, {}% usable area, {}% confidence",
            condition.title(),
            usable_percent,
            confidence
        )
    }

    pub fn roof_area_m2(&self) -> f64 {
        self.image_metrics.roof_area_m2
    }

    /// Same result with the timing zeroed, for comparing two runs.
    pub fn without_timing(&self) -> Self {
        Self {
            analysis_time: Duration::ZERO,
            ..self.clone()
        }
    }
}
