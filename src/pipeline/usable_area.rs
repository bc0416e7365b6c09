use tracing::debug;

use super::metrics::ImageMetrics;

const BRIGHTNESS_REFERENCE: f64 = 128.0;
const BRIGHTNESS_FACTOR_CAP: f64 = 1.2;
const CONTRAST_REFERENCE: f64 = 40.0;
const CONTRAST_FACTOR_CAP: f64 = 1.1;
const SHARPNESS_REFERENCE: f64 = 500.0;
const SHARPNESS_FACTOR_CAP: f64 = 1.1;

pub const MIN_USABLE_PERCENT: f64 = 15.0;
pub const MAX_USABLE_PERCENT: f64 = 90.0;

/// Clamped usable-area estimate. Downstream sizing uses the fractional value;
/// reports use the truncated whole percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UsableArea {
    percent: f64,
}

impl UsableArea {
    pub fn percent(&self) -> f64 {
        self.percent
    }

    pub fn fraction(&self) -> f64 {
        self.percent / 100.0
    }

    pub fn whole_percent(&self) -> u32 {
        self.percent.trunc() as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrectionFactors {
    pub brightness: f64,
    pub contrast: f64,
    pub sharpness: f64,
}

impl CorrectionFactors {
    pub fn from_metrics(metrics: &ImageMetrics) -> Self {
        Self {
            brightness: (metrics.brightness / BRIGHTNESS_REFERENCE).min(BRIGHTNESS_FACTOR_CAP),
            contrast: (metrics.contrast / CONTRAST_REFERENCE).min(CONTRAST_FACTOR_CAP),
            sharpness: (metrics.sharpness / SHARPNESS_REFERENCE).min(SHARPNESS_FACTOR_CAP),
        }
    }

    pub fn product(&self) -> f64 {
        self.brightness * self.contrast * self.sharpness
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UsableAreaEstimator;

impl UsableAreaEstimator {
    pub fn new() -> Self {
        Self
    }

    pub fn estimate(&self, metrics: &ImageMetrics, condition_multiplier: f64) -> UsableArea {
        let base = metrics.coverage_percent();
        let factors = CorrectionFactors::from_metrics(metrics);
        let raw = base * factors.product() * condition_multiplier;

        let percent = if raw.is_nan() {
            MIN_USABLE_PERCENT
        } else {
            raw.clamp(MIN_USABLE_PERCENT, MAX_USABLE_PERCENT)
        };
        debug!(base, raw, percent, "usable area estimated");

        UsableArea { percent }
    }
}
