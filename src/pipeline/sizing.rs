use tracing::debug;

use super::condition::RoofCondition;
use super::metrics::ImageMetrics;
use super::usable_area::UsableArea;

/// Roof area assumed for a frame with no pixels, in m².
pub const BASE_ROOF_AREA_M2: f64 = 50.0;
/// Pixels that add one m² to the base roof area.
pub const PIXELS_PER_EXTRA_M2: f64 = 50_000.0;
/// Nominal footprint of a single panel, in m².
pub const PANEL_FOOTPRINT_M2: f64 = 1.65;
pub const PANEL_KW: f64 = 0.4;

pub const MIN_SYSTEM_KW: f64 = 2.0;
pub const MAX_SYSTEM_KW: f64 = 20.0;

const EXCELLENT_BONUS: f64 = 1.1;
const POOR_PENALTY: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionClass {
    High,
    Medium,
    Low,
}

impl ResolutionClass {
    pub fn from_megapixels(megapixels: f64) -> Self {
        if megapixels > 2.0 {
            ResolutionClass::High
        } else if megapixels > 1.0 {
            ResolutionClass::Medium
        } else {
            ResolutionClass::Low
        }
    }

    /// How much of the pixel-derived area is trusted at this resolution.
    pub fn area_multiplier(&self) -> f64 {
        match self {
            ResolutionClass::High => 1.2,
            ResolutionClass::Medium => 1.0,
            ResolutionClass::Low => 0.8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SystemSizing {
    pub resolution: ResolutionClass,
    pub roof_area_m2: f64,
    pub max_panels: u32,
    /// Installable capacity, clamped to [2, 20] kW.
    pub system_kw: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RoofAreaAndSystemSizer;

impl RoofAreaAndSystemSizer {
    pub fn new() -> Self {
        Self
    }

    pub fn size(
        &self,
        metrics: &ImageMetrics,
        usable: UsableArea,
        condition: RoofCondition,
    ) -> SystemSizing {
        let resolution = ResolutionClass::from_megapixels(metrics.megapixels());
        let roof_area_m2 = usable.fraction()
            * resolution.area_multiplier()
            * (BASE_ROOF_AREA_M2 + metrics.total_area as f64 / PIXELS_PER_EXTRA_M2);

        let max_panels = (roof_area_m2 / PANEL_FOOTPRINT_M2).floor() as u32;
        let mut system_kw = max_panels as f64 * PANEL_KW;

        match condition {
            RoofCondition::Excellent => system_kw *= EXCELLENT_BONUS,
            RoofCondition::Poor => system_kw *= POOR_PENALTY,
            RoofCondition::Good | RoofCondition::Fair => {}
        }

        let system_kw = system_kw.clamp(MIN_SYSTEM_KW, MAX_SYSTEM_KW);
        debug!(?resolution, roof_area_m2, max_panels, system_kw, "system sized");

        SystemSizing {
            resolution,
            roof_area_m2,
            max_panels,
            system_kw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::usable_area::UsableAreaEstimator;

    fn metrics(width: u32, height: u32, coverage: f64) -> ImageMetrics {
        let total_area = width as u64 * height as u64;
        ImageMetrics {
            width,
            height,
            brightness: 128.0,
            contrast: 40.0,
            sharpness: 500.0,
            total_area,
            significant_contour_area: total_area as f64 * coverage,
        }
    }

    fn usable(metrics: &ImageMetrics) -> UsableArea {
        UsableAreaEstimator::new().estimate(metrics, 1.0)
    }

    #[test]
    fn resolution_classes() {
        assert_eq!(ResolutionClass::from_megapixels(2.07), ResolutionClass::High);
        assert_eq!(ResolutionClass::from_megapixels(2.0), ResolutionClass::Medium);
        assert_eq!(ResolutionClass::from_megapixels(1.0), ResolutionClass::Low);
        assert_eq!(ResolutionClass::Low.area_multiplier(), 0.8);
    }

    #[test]
    fn full_hd_excellent_roof() {
        let m = ImageMetrics {
            brightness: 150.0,
            contrast: 60.0,
            sharpness: 900.0,
            ..metrics(1920, 1080, 0.4)
        };
        let sizing = RoofAreaAndSystemSizer::new().size(&m, usable(&m), RoofCondition::Excellent);

        assert_eq!(sizing.resolution, ResolutionClass::High);
        assert!((sizing.roof_area_m2 - 62.258).abs() < 1e-3);
        assert_eq!(sizing.max_panels, 37);
        assert!((sizing.system_kw - 16.28).abs() < 1e-9);
    }

    #[test]
    fn small_poor_roof_is_floored() {
        let m = metrics(100, 100, 0.0);
        let sizing = RoofAreaAndSystemSizer::new().size(&m, usable(&m), RoofCondition::Poor);
        // 0.15 * 0.8 * 50.2 = 6.024 m², 3 panels, 1.2 kW * 0.7
        assert!((sizing.roof_area_m2 - 6.024).abs() < 1e-9);
        assert_eq!(sizing.max_panels, 3);
        assert_eq!(sizing.system_kw, MIN_SYSTEM_KW);
    }

    #[test]
    fn huge_roof_is_capped() {
        let m = metrics(8000, 6000, 0.95);
        let u = UsableAreaEstimator::new().estimate(&m, 1.0);
        let sizing = RoofAreaAndSystemSizer::new().size(&m, u, RoofCondition::Good);
        assert!(sizing.max_panels > 50);
        assert_eq!(sizing.system_kw, MAX_SYSTEM_KW);
    }

    #[test]
    fn good_and_fair_are_unadjusted() {
        let m = metrics(1200, 1000, 0.3);
        let sizer = RoofAreaAndSystemSizer::new();
        let good = sizer.size(&m, usable(&m), RoofCondition::Good);
        let fair = sizer.size(&m, usable(&m), RoofCondition::Fair);
        assert_eq!(good.system_kw, fair.system_kw);
        assert!((good.system_kw - good.max_panels as f64 * PANEL_KW).abs() < 1e-9);
    }
}
