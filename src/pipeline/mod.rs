pub mod analysis_pipeline;
pub mod condition;
pub mod confidence;
pub mod contours;
pub mod metrics;
pub mod result;
pub mod sizing;
pub mod usable_area;

pub use analysis_pipeline::{analyze, AnalysisPipeline};
pub use condition::{Classification, ConditionClassifier, QualitySignals, RoofCondition};
pub use confidence::{ConfidenceBreakdown, ConfidenceScorer};
pub use metrics::{ExtractionParams, ImageMetrics, ImageMetricsExtractor};
pub use result::{AnalysisResult, MetricsSummary};
pub use sizing::{ResolutionClass, RoofAreaAndSystemSizer, SystemSizing};
pub use usable_area::{UsableArea, UsableAreaEstimator};
