use image::{DynamicImage, GenericImageView};
use std::time::Instant;
use tracing::{debug, info, instrument};

use super::condition::{ConditionClassifier, QualitySignals};
use super::confidence::ConfidenceScorer;
use super::metrics::{ExtractionParams, ImageMetricsExtractor};
use super::result::{round_to, AnalysisResult, MetricsSummary};
use super::sizing::RoofAreaAndSystemSizer;
use super::usable_area::UsableAreaEstimator;
use crate::error::ExtractionError;

/// Runs extraction, classification, usable-area, sizing and confidence in
/// order. Holds no per-image state, so one instance can serve many threads.
#[derive(Debug, Clone, Default)]
pub struct AnalysisPipeline {
    extractor: ImageMetricsExtractor,
    classifier: ConditionClassifier,
    usable_area: UsableAreaEstimator,
    sizer: RoofAreaAndSystemSizer,
    scorer: ConfidenceScorer,
}

impl AnalysisPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_extraction_params(params: ExtractionParams) -> Self {
        Self {
            extractor: ImageMetricsExtractor::with_params(params),
            ..Self::default()
        }
    }

    #[instrument(skip_all, fields(dimensions = ?image.dimensions()))]
    pub fn analyze(&self, image: &DynamicImage) -> Result<AnalysisResult, ExtractionError> {
        let start = Instant::now();

        let metrics = self.extractor.extract(image)?;
        let classification = self.classifier.classify(QualitySignals::from(&metrics));
        debug!(condition = %classification.condition, multiplier = classification.multiplier);

        let usable = self.usable_area.estimate(&metrics, classification.multiplier);
        let sizing = self.sizer.size(&metrics, usable, classification.condition);
        let confidence = self.scorer.breakdown(&metrics);
        debug!(?confidence, "confidence scored");

        let usable_area_percent = usable.whole_percent();
        let confidence = confidence.score();
        let elapsed = start.elapsed();

        info!(
            condition = %classification.condition,
            usable_area_percent,
            system_kw = sizing.system_kw,
            confidence,
            elapsed_ms = elapsed.as_millis() as u64,
            "analysis complete"
        );

        Ok(AnalysisResult {
            roof_condition: classification.condition,
            usable_area_percent,
            system_size_kw: round_to(sizing.system_kw, 1),
            confidence,
            notes: AnalysisResult::notes_for(
                classification.condition,
                usable_area_percent,
                confidence,
            ),
            analysis_time: elapsed,
            image_size: metrics.dimensions_label(),
            image_metrics: MetricsSummary::new(&metrics, sizing.roof_area_m2),
            raw_metrics: metrics,
        })
    }
}

/// Analyze a decoded buffer with the default parameters.
pub fn analyze(image: &DynamicImage) -> Result<AnalysisResult, ExtractionError> {
    AnalysisPipeline::new().analyze(image)
}
